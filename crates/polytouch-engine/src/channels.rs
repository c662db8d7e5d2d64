//! MIDI channel pool for independent-channel (per-touch pitch bend) mode.
//!
//! Standard pitch bend is a per-channel message, so each finger that wants
//! an independent bend stream must own a distinct channel for its lifetime.
//! The pool hands channels out round-robin and tracks ownership so a
//! channel is never double-assigned.

/// Identifier of a touch, stable from down to up.
pub type TouchId = u64;

#[derive(Clone, Copy, Debug)]
struct Owner {
    touch: TouchId,
    /// Allocation sequence number, for oldest-first eviction.
    seq: u64,
}

/// Ownership table over a contiguous channel range `0..pool_size`.
///
/// One reserved channel (the fixed shared channel) is never handed out, so
/// pooled touches cannot clobber the fixed-channel performer.
#[derive(Debug)]
pub struct ChannelPool {
    slots: [Option<Owner>; 16],
    pool_size: u8,
    reserved: u8,
    /// Channel granted last, biasing the next scan so reuse spreads
    /// round-robin instead of always starting from slot 0.
    last_assigned: Option<u8>,
    next_seq: u64,
}

impl ChannelPool {
    pub fn new(pool_size: u8, reserved: u8) -> Self {
        Self {
            slots: [None; 16],
            pool_size: pool_size.clamp(1, 16),
            reserved,
            last_assigned: None,
            next_seq: 0,
        }
    }

    /// Hand out the first free channel at or after the cursor, skipping the
    /// reserved index. Returns `None` when every candidate is owned.
    pub fn acquire(&mut self, touch: TouchId) -> Option<u8> {
        let n = self.pool_size;
        let start = match self.last_assigned {
            Some(last) => (last + 1) % n,
            None => 0,
        };
        for offset in 0..n {
            let channel = (start + offset) % n;
            if channel == self.reserved {
                continue;
            }
            if self.slots[channel as usize].is_none() {
                self.slots[channel as usize] = Some(Owner {
                    touch,
                    seq: self.next_seq,
                });
                self.next_seq += 1;
                self.last_assigned = Some(channel);
                return Some(channel);
            }
        }
        None
    }

    /// Clear a channel's owner. Idempotent: releasing a free or
    /// out-of-range channel is a no-op.
    pub fn release(&mut self, channel: u8) {
        if let Some(slot) = self.slots.get_mut(channel as usize) {
            *slot = None;
        }
    }

    /// Evict the longest-held channel, returning it and its former owner.
    pub fn steal_oldest(&mut self) -> Option<(u8, TouchId)> {
        let (channel, owner) = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(ch, slot)| slot.map(|o| (ch as u8, o)))
            .min_by_key(|(_, o)| o.seq)?;
        self.slots[channel as usize] = None;
        Some((channel, owner.touch))
    }

    pub fn owner_of(&self, channel: u8) -> Option<TouchId> {
        self.slots
            .get(channel as usize)
            .and_then(|slot| slot.map(|o| o.touch))
    }

    pub fn allocated_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn clear(&mut self) {
        self.slots = [None; 16];
        self.last_assigned = None;
    }
}

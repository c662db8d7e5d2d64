//! Per-touch gesture state.
//!
//! A session is created at touch-down, owned exclusively by that touch,
//! and discarded at touch-up (or when the touch leaves the surface).

use std::collections::HashMap;

use crate::channels::TouchId;

/// The channel a touch plays on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelAssignment {
    /// Exclusively owned pool channel; returned to the pool at touch-up.
    Pooled(u8),
    /// The fixed shared channel; many touches may use it concurrently.
    Shared(u8),
}

impl ChannelAssignment {
    #[inline]
    pub fn channel(&self) -> u8 {
        match *self {
            Self::Pooled(ch) | Self::Shared(ch) => ch,
        }
    }

    #[inline]
    pub fn is_pooled(&self) -> bool {
        matches!(self, Self::Pooled(_))
    }
}

/// Mutable state of one active touch.
#[derive(Clone, Debug)]
pub struct TouchSession {
    /// Note struck at touch-down.
    pub origin_note: u8,
    /// Note currently sounding.
    pub current_note: u8,
    /// Note before the last transition, for glide hysteresis.
    pub previous_note: u8,
    /// Row at the last note transition.
    pub row: usize,
    /// X where the sounding note was struck (bend reference); reset on
    /// every retrigger.
    pub origin_x: f32,
    pub channel: ChannelAssignment,
    /// Cell currently highlighted for this touch.
    pub highlighted: Option<(usize, usize)>,
}

/// Session storage keyed by touch identifier.
///
/// Move/up events for unknown touches are the caller's cue to ignore the
/// event; a touch that began over a dead cell never gets a session.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<TouchId, TouchSession>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: TouchId, session: TouchSession) {
        self.sessions.insert(id, session);
    }

    pub fn get(&self, id: TouchId) -> Option<&TouchSession> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: TouchId) -> Option<&mut TouchSession> {
        self.sessions.get_mut(&id)
    }

    pub fn remove(&mut self, id: TouchId) -> Option<TouchSession> {
        self.sessions.remove(&id)
    }

    pub fn contains(&self, id: TouchId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (TouchId, TouchSession)> + '_ {
        self.sessions.drain()
    }
}

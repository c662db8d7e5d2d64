//! Gesture translator: the per-touch state machine.
//!
//! Turns a stream of touch events into MIDI messages and highlight
//! changes. Pure event-in/actions-out: no UI loop, no device, so every
//! rule is testable in isolation.

use polytouch_midi::{MidiMessage, PITCH_BEND_CENTER, PITCH_BEND_MAX};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::channels::{ChannelPool, TouchId};
use crate::config::{AftertouchMode, ExhaustPolicy, GridLayout, InstrumentConfig};
use crate::grid::NoteGrid;
use crate::session::{ChannelAssignment, SessionTable, TouchSession};

/// Fraction of a key width below which horizontal displacement produces
/// no bend, suppressing touch jitter around the strike point.
const BEND_DEAD_ZONE: f32 = 1.0 / 6.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchPhase {
    Down,
    Move,
    Up,
}

/// One touch event as delivered by the host UI, one finger per id.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchEvent {
    pub id: TouchId,
    pub x: f32,
    pub y: f32,
    /// Raw hardware pressure (0.0..=255.0) when the device reports one.
    pub pressure: Option<f32>,
    pub phase: TouchPhase,
}

impl TouchEvent {
    pub fn down(id: TouchId, x: f32, y: f32) -> Self {
        Self {
            id,
            x,
            y,
            pressure: None,
            phase: TouchPhase::Down,
        }
    }

    pub fn moved(id: TouchId, x: f32, y: f32) -> Self {
        Self {
            id,
            x,
            y,
            pressure: None,
            phase: TouchPhase::Move,
        }
    }

    pub fn up(id: TouchId, x: f32, y: f32) -> Self {
        Self {
            id,
            x,
            y,
            pressure: None,
            phase: TouchPhase::Up,
        }
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = Some(pressure);
        self
    }
}

/// Request to change a cell's rendered highlight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HighlightChange {
    Set { row: usize, col: usize },
    Clear { row: usize, col: usize },
}

/// One output of the translator, in emission order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Action {
    Midi(MidiMessage),
    Highlight(HighlightChange),
}

pub type Actions = SmallVec<[Action; 8]>;

/// The state machine. Owns the channel pool and the session table; they
/// are mutated only through `handle`, `release_all`, and nothing else.
pub struct GestureTranslator {
    pool: ChannelPool,
    sessions: SessionTable,
}

impl GestureTranslator {
    pub fn new(config: &InstrumentConfig) -> Self {
        Self {
            pool: ChannelPool::new(config.pool_size(), config.shared_channel()),
            sessions: SessionTable::new(),
        }
    }

    /// Process one touch event against the current config and grid.
    pub fn handle(
        &mut self,
        event: &TouchEvent,
        config: &InstrumentConfig,
        grid: &NoteGrid,
    ) -> Actions {
        match event.phase {
            TouchPhase::Down => self.touch_down(event, config, grid),
            TouchPhase::Move => self.touch_move(event, config, grid),
            TouchPhase::Up => self.end_session(event.id),
        }
    }

    /// Active (sounding) touch count.
    pub fn active_touches(&self) -> usize {
        self.sessions.len()
    }

    /// Force-close every session: note-off and bend reset per touch,
    /// highlights cleared, the pool emptied. The emergency-stop path.
    pub fn release_all(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        for (_, session) in self.sessions.drain() {
            let channel = session.channel.channel();
            actions.push(Action::Midi(MidiMessage::note_off(
                channel,
                session.current_note,
            )));
            if session.channel.is_pooled() {
                actions.push(Action::Midi(MidiMessage::bend_center(channel)));
            }
            if let Some((row, col)) = session.highlighted {
                actions.push(Action::Highlight(HighlightChange::Clear { row, col }));
            }
        }
        self.pool.clear();
        actions
    }

    fn touch_down(
        &mut self,
        event: &TouchEvent,
        config: &InstrumentConfig,
        grid: &NoteGrid,
    ) -> Actions {
        let mut actions = Actions::new();

        if self.sessions.contains(event.id) {
            debug!("duplicate touch-down for id {}, ignoring", event.id);
            return actions;
        }

        // Dead cells and off-surface touches pass through to the host UI.
        let Some(cell) = grid.resolve(event.x, event.y) else {
            return actions;
        };
        let Some(note) = cell.note else {
            return actions;
        };

        let channel = self.assign_channel(event.id, config, &mut actions);
        if channel.is_pooled() {
            // The channel's previous occupant may have left residual bend.
            actions.push(Action::Midi(MidiMessage::bend_center(channel.channel())));
        }

        let velocity = pressure_value(config, cell.bounds.center_y(), event.y, event.pressure);
        actions.push(Action::Midi(MidiMessage::note_on(
            channel.channel(),
            note,
            velocity,
        )));
        actions.push(Action::Highlight(HighlightChange::Set {
            row: cell.row,
            col: cell.col,
        }));

        self.sessions.insert(
            event.id,
            TouchSession {
                origin_note: note,
                current_note: note,
                previous_note: note,
                row: cell.row,
                origin_x: event.x,
                channel,
                highlighted: Some((cell.row, cell.col)),
            },
        );

        actions
    }

    fn assign_channel(
        &mut self,
        id: TouchId,
        config: &InstrumentConfig,
        actions: &mut Actions,
    ) -> ChannelAssignment {
        if !config.pitch_bend {
            return ChannelAssignment::Shared(config.shared_channel());
        }
        if let Some(channel) = self.pool.acquire(id) {
            return ChannelAssignment::Pooled(channel);
        }
        match config.exhaust_policy {
            ExhaustPolicy::FallBackToShared => {
                warn!("channel pool exhausted, new touch uses shared channel");
                ChannelAssignment::Shared(config.shared_channel())
            }
            ExhaustPolicy::StealOldest => {
                if let Some((channel, old_touch)) = self.pool.steal_oldest() {
                    // Close the evicted touch cleanly before reusing its
                    // channel, keeping note-on/off pairing intact.
                    if let Some(old) = self.sessions.remove(old_touch) {
                        actions.push(Action::Midi(MidiMessage::note_off(
                            channel,
                            old.current_note,
                        )));
                        actions.push(Action::Midi(MidiMessage::bend_center(channel)));
                        if let Some((row, col)) = old.highlighted {
                            actions.push(Action::Highlight(HighlightChange::Clear { row, col }));
                        }
                    }
                    warn!("channel pool exhausted, stole channel {channel} from touch {old_touch}");
                }
                match self.pool.acquire(id) {
                    Some(channel) => ChannelAssignment::Pooled(channel),
                    None => ChannelAssignment::Shared(config.shared_channel()),
                }
            }
        }
    }

    fn touch_move(
        &mut self,
        event: &TouchEvent,
        config: &InstrumentConfig,
        grid: &NoteGrid,
    ) -> Actions {
        let mut actions = Actions::new();

        // Leaving the playable surface (or sliding onto a dead cell) ends
        // the gesture exactly as a touch-up would.
        let hit = grid
            .resolve(event.x, event.y)
            .and_then(|cell| cell.note.map(|note| (cell, note)));
        let Some((cell, note)) = hit else {
            return self.end_session(event.id);
        };

        // Stale event: the touch never opened a session (dead-cell down).
        let Some(session) = self.sessions.get_mut(event.id) else {
            return actions;
        };

        let channel = session.channel.channel();

        // Glide: retrigger on note change, except that in independent-bend
        // mode movement within the same row bends the original note
        // instead. Crossing rows always retriggers.
        let retrigger =
            note != session.previous_note && (!config.pitch_bend || cell.row != session.row);
        if retrigger {
            let velocity = pressure_value(config, cell.bounds.center_y(), event.y, event.pressure);
            actions.push(Action::Midi(MidiMessage::note_off(
                channel,
                session.current_note,
            )));
            actions.push(Action::Midi(MidiMessage::note_on(channel, note, velocity)));
            session.current_note = note;
            session.row = cell.row;
            // Bend is measured from where the sounding note was struck.
            session.origin_x = event.x;
        }
        session.previous_note = note;

        // Independent-bend mode sends a bend on every move. Touches that
        // fell back to the shared channel do not bend: it would warp every
        // note sounding there.
        if config.pitch_bend && session.channel.is_pooled() {
            let value = bend_value(config, grid, session.origin_x, event.x);
            actions.push(Action::Midi(MidiMessage::pitch_bend(channel, value)));
        }

        match config.aftertouch {
            AftertouchMode::Off => {}
            AftertouchMode::Poly => {
                let pressure =
                    pressure_value(config, cell.bounds.center_y(), event.y, event.pressure);
                actions.push(Action::Midi(MidiMessage::poly_aftertouch(
                    channel,
                    session.current_note,
                    pressure,
                )));
            }
            AftertouchMode::Channel => {
                let pressure =
                    pressure_value(config, cell.bounds.center_y(), event.y, event.pressure);
                actions.push(Action::Midi(MidiMessage::channel_aftertouch(
                    channel, pressure,
                )));
            }
        }

        // Swap the highlight once per cell boundary crossed.
        let pos = (cell.row, cell.col);
        if session.highlighted != Some(pos) {
            if let Some((row, col)) = session.highlighted.take() {
                actions.push(Action::Highlight(HighlightChange::Clear { row, col }));
            }
            actions.push(Action::Highlight(HighlightChange::Set {
                row: pos.0,
                col: pos.1,
            }));
            session.highlighted = Some(pos);
        }

        actions
    }

    /// Shared by touch-up and leave-surface. Removing the session first
    /// makes the cleanup idempotent: a second signal finds nothing.
    fn end_session(&mut self, id: TouchId) -> Actions {
        let mut actions = Actions::new();
        let Some(session) = self.sessions.remove(id) else {
            return actions;
        };

        let channel = session.channel.channel();
        actions.push(Action::Midi(MidiMessage::note_off(
            channel,
            session.current_note,
        )));
        if session.channel.is_pooled() {
            actions.push(Action::Midi(MidiMessage::bend_center(channel)));
            self.pool.release(channel);
        }
        if let Some((row, col)) = session.highlighted {
            actions.push(Action::Highlight(HighlightChange::Clear { row, col }));
        }

        actions
    }
}

/// Map horizontal displacement from the strike point to a 14-bit bend.
///
/// One key width is one semitone on the rectangular grid and two on the
/// Janko grid, scaled by the configured bend range so full deflection
/// lands on the wire limits.
fn bend_value(config: &InstrumentConfig, grid: &NoteGrid, origin_x: f32, x: f32) -> u16 {
    let key_w = grid.key_width();
    let dx = x - origin_x;
    if dx.abs() < key_w * BEND_DEAD_ZONE {
        return PITCH_BEND_CENTER;
    }
    let dx = match grid.layout() {
        GridLayout::Sonome => dx,
        GridLayout::Janko => dx * 2.0,
    };
    let semitones = dx / key_w;
    let value =
        PITCH_BEND_CENTER as f32 + semitones * (PITCH_BEND_CENTER as f32 / config.bend_range() as f32);
    value.round().clamp(0.0, PITCH_BEND_MAX as f32) as u16
}

/// Velocity/pressure shared by touch-down and move: hardware pressure when
/// available and enabled, else vertical distance from the key center, else
/// the configured default. Always clamped to the MIDI range.
fn pressure_value(
    config: &InstrumentConfig,
    key_center_y: f32,
    y: f32,
    raw_pressure: Option<f32>,
) -> u8 {
    let value = match raw_pressure {
        Some(raw) if config.hardware_pressure => (raw / 2.0).round(),
        _ if config.vertical_expression => {
            config.velocity() as f32 - (key_center_y - y).abs().round() * config.sensitivity as f32
        }
        _ => config.velocity() as f32,
    };
    value.clamp(0.0, 127.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;

    // Surface of 25 x 4 keys, each 60x100 px. Key (row, col) spans
    // x: [60*col, 60*col+60), y: [100*row, 100*row+100).
    fn base_config() -> InstrumentConfig {
        InstrumentConfig {
            grid: GridConfig {
                layout: GridLayout::Sonome,
                rows: 4,
                keys_per_row: 25,
                low_note: 36,
                row_interval: 5,
                surface_width: 1500.0,
                surface_height: 400.0,
            },
            vertical_expression: false,
            aftertouch: AftertouchMode::Off,
            ..Default::default()
        }
    }

    fn bend_config() -> InstrumentConfig {
        InstrumentConfig {
            pitch_bend: true,
            pool_size: 10,
            channel: 9,
            bend_range_semitones: 12,
            ..base_config()
        }
    }

    fn midi(actions: &[Action]) -> Vec<MidiMessage> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Midi(m) => Some(*m),
                Action::Highlight(_) => None,
            })
            .collect()
    }

    fn bends(actions: &[Action]) -> Vec<u16> {
        midi(actions)
            .iter()
            .filter_map(|m| match m {
                MidiMessage::PitchBend { value, .. } => Some(*value),
                _ => None,
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Touch-down
    // -----------------------------------------------------------------------

    #[test]
    fn test_down_emits_note_on_at_default_velocity() {
        let config = base_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        // Key (0, 2): note 36 + 2 = 38
        let actions = tr.handle(&TouchEvent::down(1, 150.0, 50.0), &config, &grid);

        assert_eq!(
            midi(&actions),
            vec![MidiMessage::note_on(0, 38, 127)]
        );
        assert_eq!(tr.active_touches(), 1);
    }

    #[test]
    fn test_down_off_surface_is_ignored() {
        let config = base_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        let actions = tr.handle(&TouchEvent::down(1, -10.0, 50.0), &config, &grid);
        assert!(actions.is_empty());
        assert_eq!(tr.active_touches(), 0);
    }

    #[test]
    fn test_down_on_dead_cell_is_ignored() {
        let mut config = base_config();
        config.grid.low_note = 120;
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        // Key (0, 10) would be note 130: dead
        let actions = tr.handle(&TouchEvent::down(1, 630.0, 50.0), &config, &grid);
        assert!(actions.is_empty());
        assert_eq!(tr.active_touches(), 0);
    }

    #[test]
    fn test_duplicate_down_is_ignored() {
        let config = base_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 150.0, 50.0), &config, &grid);
        let actions = tr.handle(&TouchEvent::down(1, 150.0, 50.0), &config, &grid);
        assert!(actions.is_empty());
        assert_eq!(tr.active_touches(), 1);
    }

    #[test]
    fn test_down_in_bend_mode_resets_bend_before_note_on() {
        let config = bend_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        let actions = tr.handle(&TouchEvent::down(1, 150.0, 50.0), &config, &grid);

        assert_eq!(
            midi(&actions),
            vec![
                MidiMessage::bend_center(0),
                MidiMessage::note_on(0, 38, 127),
            ]
        );
    }

    #[test]
    fn test_down_highlights_cell() {
        let config = base_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        let actions = tr.handle(&TouchEvent::down(1, 150.0, 150.0), &config, &grid);
        assert!(actions
            .iter()
            .any(|a| *a == Action::Highlight(HighlightChange::Set { row: 1, col: 2 })));
    }

    // -----------------------------------------------------------------------
    // Velocity / pressure formula
    // -----------------------------------------------------------------------

    #[test]
    fn test_vertical_expression_reduces_velocity_off_center() {
        let mut config = base_config();
        config.vertical_expression = true;
        config.sensitivity = 3;
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        // Key (0, 0) center y = 50; touch 20 px above it
        let actions = tr.handle(&TouchEvent::down(1, 30.0, 70.0), &config, &grid);
        assert_eq!(
            midi(&actions),
            vec![MidiMessage::note_on(0, 36, 127 - 20 * 3)]
        );
    }

    #[test]
    fn test_vertical_expression_floors_at_zero() {
        let mut config = base_config();
        config.vertical_expression = true;
        config.sensitivity = 4;
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        // 45 px off center * 4 = 180 > 127
        let actions = tr.handle(&TouchEvent::down(1, 30.0, 95.0), &config, &grid);
        assert_eq!(midi(&actions), vec![MidiMessage::note_on(0, 36, 0)]);
    }

    #[test]
    fn test_hardware_pressure_is_halved() {
        let mut config = base_config();
        config.hardware_pressure = true;
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        let actions = tr.handle(
            &TouchEvent::down(1, 30.0, 50.0).with_pressure(200.0),
            &config,
            &grid,
        );
        assert_eq!(midi(&actions), vec![MidiMessage::note_on(0, 36, 100)]);
    }

    #[test]
    fn test_hardware_pressure_absent_falls_back() {
        let mut config = base_config();
        config.hardware_pressure = true;
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        let actions = tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);
        assert_eq!(midi(&actions), vec![MidiMessage::note_on(0, 36, 127)]);
    }

    // -----------------------------------------------------------------------
    // Glide
    // -----------------------------------------------------------------------

    #[test]
    fn test_fixed_mode_retriggers_on_note_change() {
        let config = base_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);
        // Slide one key right, same row: note 36 -> 37
        let actions = tr.handle(&TouchEvent::moved(1, 90.0, 50.0), &config, &grid);

        assert_eq!(
            midi(&actions),
            vec![
                MidiMessage::note_off(0, 36),
                MidiMessage::note_on(0, 37, 127),
            ]
        );
    }

    #[test]
    fn test_move_within_cell_emits_nothing_in_fixed_mode() {
        let config = base_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);
        let actions = tr.handle(&TouchEvent::moved(1, 40.0, 60.0), &config, &grid);
        assert!(actions.is_empty());
    }

    #[test]
    fn test_bend_mode_same_row_never_retriggers() {
        let config = bend_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);
        // Slide four keys right within the row
        for x in [90.0, 150.0, 210.0, 270.0] {
            let actions = tr.handle(&TouchEvent::moved(1, x, 50.0), &config, &grid);
            let messages = midi(&actions);
            assert!(
                messages.iter().all(|m| !m.is_note_on() && !m.is_note_off()),
                "same-row move must not retrigger, got {messages:?}"
            );
        }
    }

    #[test]
    fn test_bend_mode_row_cross_retriggers() {
        let config = bend_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);
        // Small horizontal displacement, but one row up: note 36 -> 41
        let actions = tr.handle(&TouchEvent::moved(1, 35.0, 150.0), &config, &grid);
        let messages = midi(&actions);

        assert_eq!(messages[0], MidiMessage::note_off(0, 36));
        assert_eq!(messages[1], MidiMessage::note_on(0, 41, 127));
    }

    #[test]
    fn test_retrigger_resets_bend_reference() {
        let config = bend_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);
        // Cross to row 1 far to the right; the new strike point becomes
        // the bend origin, so the bend sent with the retrigger is center.
        let actions = tr.handle(&TouchEvent::moved(1, 330.0, 150.0), &config, &grid);
        assert_eq!(bends(&actions), vec![PITCH_BEND_CENTER]);
    }

    // -----------------------------------------------------------------------
    // Pitch bend
    // -----------------------------------------------------------------------

    #[test]
    fn test_bend_dead_zone_keeps_center() {
        let config = bend_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);
        // 3 px < 60 px / 6
        let actions = tr.handle(&TouchEvent::moved(1, 33.0, 50.0), &config, &grid);
        assert_eq!(bends(&actions), vec![PITCH_BEND_CENTER]);
    }

    #[test]
    fn test_bend_monotonic_and_clamped() {
        let config = bend_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);

        let mut last = PITCH_BEND_CENTER;
        for dx in [15.0, 60.0, 180.0, 420.0, 720.0, 1200.0] {
            let actions = tr.handle(&TouchEvent::moved(1, 30.0 + dx, 50.0), &config, &grid);
            let value = bends(&actions)[0];
            assert!(value >= last, "bend must grow with displacement");
            assert!(value <= PITCH_BEND_MAX);
            last = value;
        }
        // 720 px = 12 keys = the full 12-semitone range
        assert_eq!(last, PITCH_BEND_MAX);
    }

    #[test]
    fn test_bend_one_semitone_scale() {
        let config = bend_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);
        // One key width right = +1 semitone of a 12-semitone range
        let actions = tr.handle(&TouchEvent::moved(1, 90.0, 50.0), &config, &grid);
        assert_eq!(bends(&actions), vec![8192 + 8192 / 12 + 1]); // 8875, rounded
    }

    #[test]
    fn test_bend_downward_clamps_at_zero() {
        let config = bend_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 1470.0, 50.0), &config, &grid);
        let actions = tr.handle(&TouchEvent::moved(1, 30.0, 50.0), &config, &grid);
        assert_eq!(bends(&actions), vec![0]);
    }

    #[test]
    fn test_janko_doubles_displacement() {
        let mut sonome_cfg = bend_config();
        sonome_cfg.bend_range_semitones = 12;
        let sonome_grid = NoteGrid::new(&sonome_cfg.grid);

        let mut janko_cfg = bend_config();
        janko_cfg.grid.layout = GridLayout::Janko;
        let janko_grid = NoteGrid::new(&janko_cfg.grid);

        let mut tr_s = GestureTranslator::new(&sonome_cfg);
        let mut tr_j = GestureTranslator::new(&janko_cfg);

        tr_s.handle(&TouchEvent::down(1, 30.0, 50.0), &sonome_cfg, &sonome_grid);
        tr_j.handle(&TouchEvent::down(1, 30.0, 50.0), &janko_cfg, &janko_grid);

        // 90 px = 1.5 key widths; 1.5 and 3.0 semitones of a 12-semitone
        // range scale to exactly 1024 and 2048 bend steps.
        let s = bends(&tr_s.handle(&TouchEvent::moved(1, 120.0, 50.0), &sonome_cfg, &sonome_grid))[0];
        let j = bends(&tr_j.handle(&TouchEvent::moved(1, 120.0, 50.0), &janko_cfg, &janko_grid))[0];

        assert_eq!(s, 8192 + 1024);
        assert_eq!(j, 8192 + 2048);
    }

    #[test]
    fn test_no_bend_messages_when_mode_disabled() {
        let config = base_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);
        let actions = tr.handle(&TouchEvent::moved(1, 300.0, 50.0), &config, &grid);
        assert!(bends(&actions).is_empty());
    }

    // -----------------------------------------------------------------------
    // Aftertouch
    // -----------------------------------------------------------------------

    #[test]
    fn test_poly_aftertouch_on_move() {
        let mut config = base_config();
        config.aftertouch = AftertouchMode::Poly;
        config.vertical_expression = true;
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);
        // Stay in the cell, drift 10 px above center
        let actions = tr.handle(&TouchEvent::moved(1, 30.0, 60.0), &config, &grid);

        assert_eq!(
            midi(&actions),
            vec![MidiMessage::poly_aftertouch(0, 36, 127 - 10 * 3)]
        );
    }

    #[test]
    fn test_channel_aftertouch_on_move() {
        let mut config = base_config();
        config.aftertouch = AftertouchMode::Channel;
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);
        let actions = tr.handle(&TouchEvent::moved(1, 40.0, 50.0), &config, &grid);

        assert_eq!(
            midi(&actions),
            vec![MidiMessage::channel_aftertouch(0, 127)]
        );
    }

    // -----------------------------------------------------------------------
    // Touch-up and cancellation
    // -----------------------------------------------------------------------

    #[test]
    fn test_up_closes_session_and_frees_channel() {
        let config = bend_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);
        let actions = tr.handle(&TouchEvent::up(1, 30.0, 50.0), &config, &grid);

        assert_eq!(
            midi(&actions),
            vec![MidiMessage::note_off(0, 36), MidiMessage::bend_center(0)]
        );
        assert_eq!(tr.active_touches(), 0);

        // Round-robin: the next touch gets channel 1, not 0
        let actions = tr.handle(&TouchEvent::down(2, 30.0, 50.0), &config, &grid);
        assert!(midi(&actions).contains(&MidiMessage::note_on(1, 36, 127)));
    }

    #[test]
    fn test_stale_move_and_up_are_ignored() {
        let config = base_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        assert!(tr.handle(&TouchEvent::moved(9, 30.0, 50.0), &config, &grid).is_empty());
        assert!(tr.handle(&TouchEvent::up(9, 30.0, 50.0), &config, &grid).is_empty());
    }

    #[test]
    fn test_leave_surface_is_implicit_up_exactly_once() {
        let config = bend_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);
        let actions = tr.handle(&TouchEvent::moved(1, 30.0, 1000.0), &config, &grid);
        assert_eq!(
            midi(&actions),
            vec![MidiMessage::note_off(0, 36), MidiMessage::bend_center(0)]
        );

        // The up that follows finds no session: cleanup ran exactly once.
        let actions = tr.handle(&TouchEvent::up(1, 30.0, 1000.0), &config, &grid);
        assert!(actions.is_empty());
    }

    // -----------------------------------------------------------------------
    // Pool exhaustion policies
    // -----------------------------------------------------------------------

    #[test]
    fn test_exhaustion_falls_back_to_shared_channel() {
        let mut config = bend_config();
        config.pool_size = 2;
        config.channel = 0;
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        // Pool of 2 with channel 0 reserved: only channel 1 allocable.
        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);
        let actions = tr.handle(&TouchEvent::down(2, 90.0, 50.0), &config, &grid);

        // Second touch plays on the shared channel, without a bend reset.
        assert_eq!(midi(&actions), vec![MidiMessage::note_on(0, 37, 127)]);

        // And it does not bend.
        let actions = tr.handle(&TouchEvent::moved(2, 300.0, 50.0), &config, &grid);
        assert!(bends(&actions).is_empty());
    }

    #[test]
    fn test_exhaustion_steal_oldest_closes_victim() {
        let mut config = bend_config();
        config.pool_size = 2;
        config.channel = 0;
        config.exhaust_policy = ExhaustPolicy::StealOldest;
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);
        let actions = tr.handle(&TouchEvent::down(2, 90.0, 50.0), &config, &grid);

        // Victim closed first, then the new note on the reclaimed channel.
        assert_eq!(
            midi(&actions),
            vec![
                MidiMessage::note_off(1, 36),
                MidiMessage::bend_center(1),
                MidiMessage::bend_center(1),
                MidiMessage::note_on(1, 37, 127),
            ]
        );
        assert_eq!(tr.active_touches(), 1);

        // The evicted touch is gone; its events are stale now.
        assert!(tr.handle(&TouchEvent::moved(1, 40.0, 50.0), &config, &grid).is_empty());
    }

    // -----------------------------------------------------------------------
    // Highlight
    // -----------------------------------------------------------------------

    #[test]
    fn test_highlight_swaps_once_per_cell_crossing() {
        let config = base_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);

        // Move within the cell: no highlight traffic
        let actions = tr.handle(&TouchEvent::moved(1, 40.0, 50.0), &config, &grid);
        assert!(actions
            .iter()
            .all(|a| !matches!(a, Action::Highlight(_))));

        // Cross into the next cell: exactly one clear and one set
        let actions = tr.handle(&TouchEvent::moved(1, 90.0, 50.0), &config, &grid);
        let highlights: Vec<_> = actions
            .iter()
            .filter_map(|a| match a {
                Action::Highlight(h) => Some(*h),
                _ => None,
            })
            .collect();
        assert_eq!(
            highlights,
            vec![
                HighlightChange::Clear { row: 0, col: 0 },
                HighlightChange::Set { row: 0, col: 1 },
            ]
        );
    }

    // -----------------------------------------------------------------------
    // Release-all (panic path)
    // -----------------------------------------------------------------------

    #[test]
    fn test_release_all_closes_every_session() {
        let config = bend_config();
        let grid = NoteGrid::new(&config.grid);
        let mut tr = GestureTranslator::new(&config);

        tr.handle(&TouchEvent::down(1, 30.0, 50.0), &config, &grid);
        tr.handle(&TouchEvent::down(2, 90.0, 50.0), &config, &grid);
        tr.handle(&TouchEvent::down(3, 150.0, 150.0), &config, &grid);

        let actions = tr.release_all();
        let offs = actions
            .iter()
            .filter(|a| matches!(a, Action::Midi(m) if m.is_note_off()))
            .count();
        assert_eq!(offs, 3);
        assert_eq!(tr.active_touches(), 0);

        // Pool fully reclaimed: a new touch allocates again from the start
        let actions = tr.handle(&TouchEvent::down(4, 30.0, 50.0), &config, &grid);
        assert!(!midi(&actions).is_empty());
    }
}

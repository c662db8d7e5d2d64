//! The playable instrument: engine plus MIDI sink behind one facade.

use std::sync::Arc;

use arc_swap::ArcSwap;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::debug;

use polytouch_engine::{
    Action, GestureTranslator, HighlightChange, InstrumentConfig, NoteGrid, TouchEvent,
};
use polytouch_midi::MidiSink;

use crate::builder::InstrumentBuilder;
use crate::error::Result;

/// Capacity of the highlight queue the UI drains.
const HIGHLIGHT_QUEUE_CAPACITY: usize = 1024;

/// Everything the per-touch critical section mutates: the channel pool and
/// session table (inside the translator), the grid, and the sink. One lock,
/// so concurrent down/up events for different fingers cannot race on a
/// pool slot.
struct EngineState {
    translator: GestureTranslator,
    grid: NoteGrid,
    sink: Box<dyn MidiSink>,
}

/// Multitouch grid instrument.
///
/// The host UI feeds one [`TouchEvent`] per finger through
/// [`on_touch_down`](Self::on_touch_down) /
/// [`on_touch_move`](Self::on_touch_move) /
/// [`on_touch_up`](Self::on_touch_up); MIDI goes to the configured sink
/// and highlight changes are queued for [`highlight_events`](Self::highlight_events).
pub struct Instrument {
    state: Mutex<EngineState>,
    config: ArcSwap<InstrumentConfig>,
    highlight_tx: Sender<HighlightChange>,
    highlight_rx: Receiver<HighlightChange>,
}

impl Instrument {
    pub fn builder() -> InstrumentBuilder {
        InstrumentBuilder::default()
    }

    pub(crate) fn new(config: InstrumentConfig, sink: Box<dyn MidiSink>) -> Self {
        let (highlight_tx, highlight_rx) = bounded(HIGHLIGHT_QUEUE_CAPACITY);
        let translator = GestureTranslator::new(&config);
        let grid = NoteGrid::new(&config.grid);
        Self {
            state: Mutex::new(EngineState {
                translator,
                grid,
                sink,
            }),
            config: ArcSwap::from_pointee(config),
            highlight_tx,
            highlight_rx,
        }
    }

    pub fn on_touch_down(&self, id: u64, x: f32, y: f32, pressure: Option<f32>) {
        let mut event = TouchEvent::down(id, x, y);
        event.pressure = pressure;
        self.dispatch(event);
    }

    pub fn on_touch_move(&self, id: u64, x: f32, y: f32, pressure: Option<f32>) {
        let mut event = TouchEvent::moved(id, x, y);
        event.pressure = pressure;
        self.dispatch(event);
    }

    pub fn on_touch_up(&self, id: u64, x: f32, y: f32) {
        self.dispatch(TouchEvent::up(id, x, y));
    }

    fn dispatch(&self, event: TouchEvent) {
        let config = self.config.load();
        let mut state = self.state.lock();
        let EngineState {
            translator,
            grid,
            sink,
        } = &mut *state;

        for action in translator.handle(&event, &config, grid) {
            match action {
                Action::Midi(msg) => {
                    // Per-event errors degrade gracefully: drop the
                    // message, keep the surface responsive.
                    if let Err(e) = sink.send(msg) {
                        debug!("MIDI message dropped: {e}");
                    }
                }
                Action::Highlight(change) => {
                    if self.highlight_tx.try_send(change).is_err() {
                        debug!("highlight queue full, change dropped");
                    }
                }
            }
        }
    }

    /// Receiver of highlight changes for the rendering layer. The channel
    /// is multi-consumer; draining from any clone is fine.
    pub fn highlight_events(&self) -> Receiver<HighlightChange> {
        self.highlight_rx.clone()
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<InstrumentConfig> {
        self.config.load_full()
    }

    /// Swap in a new configuration and rebuild the grid.
    ///
    /// Active touches are closed first (note-off + channel release), since
    /// sessions recorded against the old grid would glide nonsensically on
    /// the new one.
    pub fn update_config(&self, config: InstrumentConfig) -> Result<()> {
        config.validate()?;

        let mut state = self.state.lock();
        let EngineState {
            translator, sink, ..
        } = &mut *state;
        for action in translator.release_all() {
            match action {
                Action::Midi(msg) => {
                    if let Err(e) = sink.send(msg) {
                        debug!("MIDI message dropped: {e}");
                    }
                }
                Action::Highlight(change) => {
                    let _ = self.highlight_tx.try_send(change);
                }
            }
        }

        state.translator = GestureTranslator::new(&config);
        state.grid = NoteGrid::new(&config.grid);
        self.config.store(Arc::new(config));
        Ok(())
    }

    /// Emergency stop: close every session, then all-notes-off and bend
    /// recenter on all 16 channels.
    pub fn panic(&self) -> Result<()> {
        let mut state = self.state.lock();
        let EngineState {
            translator, sink, ..
        } = &mut *state;
        for action in translator.release_all() {
            match action {
                Action::Midi(msg) => sink.send(msg)?,
                Action::Highlight(change) => {
                    let _ = self.highlight_tx.try_send(change);
                }
            }
        }
        sink.panic()?;
        Ok(())
    }

    /// Program change on the shared channel.
    pub fn set_program(&self, program: u8) -> Result<()> {
        let channel = self.config.load().shared_channel();
        self.state.lock().sink.program_change(channel, program)?;
        Ok(())
    }

    /// Modulation wheel on the shared channel.
    pub fn set_modulation(&self, value: u8) -> Result<()> {
        let channel = self.config.load().shared_channel();
        self.state.lock().sink.modulation(channel, value)?;
        Ok(())
    }

    /// Reverb send on the shared channel.
    pub fn set_reverb(&self, value: u8) -> Result<()> {
        let channel = self.config.load().shared_channel();
        self.state.lock().sink.reverb(channel, value)?;
        Ok(())
    }

    /// Number of currently sounding touches.
    pub fn active_touches(&self) -> usize {
        self.state.lock().translator.active_touches()
    }
}

//! Hardware/virtual MIDI port backend.
//!
//! Owns the `midir` connection on a dedicated thread for platform
//! thread-safety; callers talk to it through a bounded command channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use midir::{MidiOutput, MidiOutputConnection};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::message::MidiMessage;
use crate::sink::MidiSink;

/// Information about an available MIDI output port.
#[derive(Debug, Clone)]
pub struct MidiPortInfo {
    /// Port index (for connection)
    pub index: usize,
    /// Port name
    pub name: String,
}

enum PortCommand {
    Connect(usize, Sender<Result<String>>),
    Disconnect,
    Send(MidiMessage),
    Shutdown,
}

/// MIDI port sink with asynchronous message delivery.
///
/// Messages sent while no port is connected are dropped with a debug log;
/// connection failures surface once, from `connect`, never from the
/// per-touch hot path.
pub struct PortSink {
    command_tx: Sender<PortCommand>,
    connected_port: Arc<arc_swap::ArcSwap<Option<String>>>,
    is_connected: Arc<AtomicBool>,
}

impl PortSink {
    pub fn new() -> Self {
        let (command_tx, command_rx) = bounded(1024);
        let connected_port = Arc::new(arc_swap::ArcSwap::new(Arc::new(None)));
        let is_connected = Arc::new(AtomicBool::new(false));

        let connected_port_clone = Arc::clone(&connected_port);
        let is_connected_clone = Arc::clone(&is_connected);

        thread::Builder::new()
            .name("midi-output-thread".to_string())
            .spawn(move || {
                Self::output_thread(command_rx, connected_port_clone, is_connected_clone);
            })
            .expect("Failed to spawn MIDI output thread");

        Self {
            command_tx,
            connected_port,
            is_connected,
        }
    }

    fn output_thread(
        command_rx: Receiver<PortCommand>,
        connected_port: Arc<arc_swap::ArcSwap<Option<String>>>,
        is_connected: Arc<AtomicBool>,
    ) {
        let mut connection: Option<MidiOutputConnection> = None;

        loop {
            match command_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(PortCommand::Connect(index, reply)) => {
                    if let Some(conn) = connection.take() {
                        drop(conn);
                    }

                    match Self::open_port(index) {
                        Ok((conn, name)) => {
                            connection = Some(conn);
                            is_connected.store(true, Ordering::SeqCst);
                            connected_port.store(Arc::new(Some(name.clone())));
                            info!("connected to MIDI port: {name}");
                            let _ = reply.send(Ok(name));
                        }
                        Err(e) => {
                            is_connected.store(false, Ordering::SeqCst);
                            connected_port.store(Arc::new(None));
                            let _ = reply.send(Err(e));
                        }
                    }
                }
                Ok(PortCommand::Disconnect) => {
                    if let Some(conn) = connection.take() {
                        drop(conn);
                        is_connected.store(false, Ordering::SeqCst);
                        connected_port.store(Arc::new(None));
                    }
                }
                Ok(PortCommand::Send(msg)) => {
                    if let Some(ref mut conn) = connection {
                        let _ = conn.send(&msg.to_bytes());
                    } else {
                        debug!("cannot send MIDI message: no port connected");
                    }
                }
                Ok(PortCommand::Shutdown) => {
                    if let Some(conn) = connection.take() {
                        drop(conn);
                    }
                    break;
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn open_port(index: usize) -> Result<(MidiOutputConnection, String)> {
        let midi_output = MidiOutput::new("polytouch-output")?;

        let ports = midi_output.ports();
        let port = ports
            .get(index)
            .ok_or_else(|| Error::Device(format!("MIDI output port {index} not found")))?;

        let port_name = midi_output
            .port_name(port)
            .unwrap_or_else(|_| format!("Port {index}"));

        let connection = midi_output.connect(port, "polytouch")?;

        Ok((connection, port_name))
    }

    /// Enumerate available MIDI output ports. Empty on enumeration failure.
    pub fn list_ports() -> Vec<MidiPortInfo> {
        let mut ports_info = Vec::new();
        if let Ok(midi_output) = MidiOutput::new("polytouch-port-list") {
            let ports = midi_output.ports();
            for (index, port) in ports.iter().enumerate() {
                let name = midi_output
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Port {index}"));
                ports_info.push(MidiPortInfo { index, name });
            }
        }
        ports_info
    }

    /// Connect to a port by index. Blocks until the output thread reports
    /// the result, so selection failures are diagnosed here and only here.
    pub fn connect(&self, index: usize) -> Result<String> {
        let (reply_tx, reply_rx) = bounded(1);
        self.command_tx
            .send(PortCommand::Connect(index, reply_tx))
            .map_err(|_| Error::Port("MIDI output thread not running".into()))?;
        reply_rx
            .recv_timeout(Duration::from_secs(5))
            .map_err(|_| Error::Port("MIDI output thread did not respond".into()))?
    }

    /// Connect to the first port whose name contains `name`
    /// (case-insensitive).
    pub fn connect_by_name(&self, name: &str) -> Result<String> {
        let ports = Self::list_ports();
        let port = ports
            .iter()
            .find(|p| p.name.to_lowercase().contains(&name.to_lowercase()))
            .ok_or_else(|| Error::Device(format!("no MIDI output port matching '{name}'")))?;
        self.connect(port.index)
    }

    /// Connect by name, falling back to the first available port when no
    /// name matches.
    pub fn connect_by_name_or_default(&self, name: &str) -> Result<String> {
        match self.connect_by_name(name) {
            Ok(connected) => Ok(connected),
            Err(Error::Device(_)) => {
                tracing::warn!("MIDI port '{name}' not found, using default output");
                self.connect(0)
            }
            Err(e) => Err(e),
        }
    }

    pub fn disconnect(&self) {
        let _ = self.command_tx.send(PortCommand::Disconnect);
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::SeqCst)
    }

    pub fn connected_port_name(&self) -> Option<String> {
        self.connected_port.load().as_ref().clone()
    }
}

impl Default for PortSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiSink for PortSink {
    fn send(&mut self, msg: MidiMessage) -> Result<()> {
        if let Err(e) = self.command_tx.try_send(PortCommand::Send(msg)) {
            debug!("MIDI output command channel full or disconnected: {e}");
        }
        Ok(())
    }
}

impl Drop for PortSink {
    fn drop(&mut self) {
        let _ = self.command_tx.send(PortCommand::Shutdown);
    }
}

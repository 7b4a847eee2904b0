//! Input arbitration
//!
//! Two detached listener loops (keyboard, sensor) publish into a single-slot
//! mailbox drained by the playback tick. Events are not queued: a new event
//! overwrites an unread one, so the tick only ever observes the most recent
//! signal.

mod sensor;

pub use sensor::{parse_sensor_line, SensorReading};

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::Receiver;

/// A discrete input signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A key identifier from the keyboard source
    Keyboard(String),
    /// A parsed reading from the distance sensor
    Sensor(SensorReading),
}

/// Single-slot, overwrite-on-publish event handoff.
#[derive(Clone, Default)]
pub struct Mailbox {
    slot: Arc<Mutex<Option<InputEvent>>>,
}

impl Mailbox {
    /// Publish an event, overwriting any unread one.
    pub fn publish(&self, event: InputEvent) {
        *self.slot.lock().unwrap() = Some(event);
    }

    /// Take and clear the most recent unread event.
    pub fn take(&self) -> Option<InputEvent> {
        self.slot.lock().unwrap().take()
    }
}

/// Owns the listener loops and the mailbox polled by the playback tick.
///
/// Listener threads are detached; they run for the lifetime of the process
/// and end only when their source closes. They never touch playback state;
/// all they can do is publish event values into the mailbox.
pub struct InputArbiter {
    mailbox: Mailbox,
}

impl InputArbiter {
    pub fn new() -> Self {
        Self {
            mailbox: Mailbox::default(),
        }
    }

    /// A publishing handle onto the shared mailbox.
    pub fn mailbox(&self) -> Mailbox {
        self.mailbox.clone()
    }

    /// Non-blocking: return and clear the most recent unread event.
    pub fn poll_latest(&self) -> Option<InputEvent> {
        self.mailbox.take()
    }

    /// Spawn the keyboard listener: blocks on `keys`, normalizes each
    /// identifier and publishes it. Runs until the sending side disappears.
    pub fn listen_keyboard(&self, keys: Receiver<String>) {
        let mailbox = self.mailbox.clone();
        thread::spawn(move || {
            for key in keys.iter() {
                mailbox.publish(InputEvent::Keyboard(normalize_key(&key)));
            }
            log::info!("keyboard listener stopped");
        });
    }

    /// Spawn the sensor listener: accumulates bytes from `port`, splits them
    /// into newline-terminated lines and publishes every reading that
    /// parses. Malformed lines are discarded. Runs until the source closes.
    pub fn listen_sensor(&self, port: Box<dyn Read + Send>) {
        let mailbox = self.mailbox.clone();
        thread::spawn(move || sensor::listen(port, mailbox));
    }
}

impl Default for InputArbiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Map presentation-layer key names onto the core vocabulary.
pub fn normalize_key(key: &str) -> String {
    let key = key.trim().to_ascii_lowercase();
    match key.as_str() {
        "escape" => "esc".to_string(),
        " " => "space".to_string(),
        _ => key,
    }
}

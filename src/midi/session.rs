//! MIDI device session
//!
//! Owns the driver handle and at most one open input port. Raw messages from
//! the driver thread are decoded, forwarded to the jog callback and appended
//! to the message log. Connection changes are written to the same log so it
//! doubles as an audit trail for the setup screen.

use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, trace, warn};

use super::driver::{DriverFactory, InputDriver, MidirDriver, RawCallback};
use super::log::{MessageLog, RawMessage, MAX_LOG_SIZE};


/// Jog callback: (channel 1 = left / 2 = right, delta in degrees).
/// Invoked synchronously on the driver thread.
pub type JogCallback = Arc<dyn Fn(u8, f32) + Send + Sync>;

/// Failures reported by the session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("MIDI driver unavailable: {0}")]
    DriverUnavailable(String),

    #[error("MIDI system not initialized")]
    NotInitialized,

    #[error("MIDI device index {index} out of range ({count} ports available)")]
    PortIndexOutOfRange { index: usize, count: usize },

    #[error("MIDI device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to open MIDI port: {0}")]
    PortOpen(String),

    #[error("failed to close MIDI port: {0}")]
    PortClose(String),
}

/// A port as seen in one enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    NotConnected,
    Connected(DeviceDescriptor),
}

/// What `refresh` did with the previously connected device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Nothing was connected; the device list was rebuilt
    Refreshed,
    /// The previous device was found again and reopened
    Reconnected(String),
    /// The previous device is gone (or failed to reopen); the session is disconnected
    ReconnectFailed(String),
}

/// Single-port MIDI input session
pub struct DeviceSession {
    factory: DriverFactory,
    driver: Option<Box<dyn InputDriver>>,
    state: SessionState,
    log: Arc<MessageLog>,
    jog_callback: Arc<RwLock<Option<JogCallback>>>,
}

impl DeviceSession {
    /// Create a session whose driver handles come from `factory`
    pub fn new(factory: DriverFactory) -> Self {
        Self::with_log_limit(factory, MAX_LOG_SIZE)
    }

    pub fn with_log_limit(factory: DriverFactory, log_limit: usize) -> Self {
        Self {
            factory,
            driver: None,
            state: SessionState::NotConnected,
            log: Arc::new(MessageLog::with_limit(log_limit)),
            jog_callback: Arc::new(RwLock::new(None)),
        }
    }

    /// Session backed by the platform MIDI system
    pub fn midir(client_name: &str, log_limit: usize) -> Self {
        Self::with_log_limit(MidirDriver::factory(client_name), log_limit)
    }

    /// Acquire the driver handle. Does nothing if already initialized.
    pub fn initialize(&mut self) -> Result<(), SessionError> {
        if self.driver.is_some() {
            return Ok(());
        }

        match (self.factory)() {
            Ok(driver) => {
                self.driver = Some(driver);
                info!("MIDI system initialized successfully");
                Ok(())
            }
            Err(e) => {
                error!("MIDI initialization error: {}", e);
                Err(e)
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.driver.is_some()
    }

    /// Display names of the available input ports. Empty on any failure.
    pub fn enumerate(&self) -> Vec<String> {
        let Some(driver) = self.driver.as_ref() else {
            return Vec::new();
        };

        match driver.port_names() {
            Ok(names) => names,
            Err(e) => {
                warn!("Error getting MIDI devices: {}", e);
                Vec::new()
            }
        }
    }

    /// Open the port at `index`, replacing any current connection
    pub fn connect(&mut self, index: usize) -> Result<(), SessionError> {
        if self.driver.is_none() {
            warn!("Cannot connect to MIDI device {}: not initialized", index);
            return Err(SessionError::NotInitialized);
        }

        self.disconnect();

        let count = self.enumerate().len();
        if index >= count {
            let e = SessionError::PortIndexOutOfRange { index, count };
            warn!("{}", e);
            return Err(e);
        }

        let bridge = self.bridge();
        let driver = self.driver.as_mut().ok_or(SessionError::NotInitialized)?;
        let name = match driver.open(index, bridge) {
            Ok(name) => name,
            Err(e) => {
                warn!("MIDI connection error: {}", e);
                return Err(e);
            }
        };

        info!("Connected to MIDI device: {}", name);
        self.log.push(RawMessage::status(format!("Connected to: {}", name)));
        self.state = SessionState::Connected(DeviceDescriptor { index, name });
        Ok(())
    }

    /// Open the first port whose display name equals `name`
    pub fn connect_by_name(&mut self, name: &str) -> Result<(), SessionError> {
        if self.driver.is_none() {
            return Err(SessionError::NotInitialized);
        }

        match self.enumerate().iter().position(|port| port == name) {
            Some(index) => self.connect(index),
            None => {
                warn!("MIDI device not found: {}", name);
                Err(SessionError::DeviceNotFound(name.to_string()))
            }
        }
    }

    /// Close the current port. No-op when not connected.
    pub fn disconnect(&mut self) {
        let SessionState::Connected(device) = std::mem::take(&mut self.state) else {
            return;
        };

        if let Some(driver) = self.driver.as_mut() {
            if let Err(e) = driver.close() {
                warn!("MIDI disconnection error: {}", e);
            }
        }

        info!("Disconnected from MIDI device: {}", device.name);
        self.log.push(RawMessage::status(format!("Disconnected from: {}", device.name)));
    }

    /// Recreate the driver handle so the device list is rebuilt, then try to
    /// reopen the previously connected device by name.
    ///
    /// The driver has no hot-plug notifications; recreating the handle is the
    /// only way to see devices that appeared or vanished.
    pub fn refresh(&mut self) -> Result<RefreshOutcome, SessionError> {
        if self.driver.is_none() {
            return Err(SessionError::NotInitialized);
        }

        let previous = self.connected_device_name().map(str::to_string);
        self.disconnect();

        self.driver = None;
        match (self.factory)() {
            Ok(driver) => self.driver = Some(driver),
            Err(e) => {
                error!("MIDI refresh error: {}", e);
                return Err(e);
            }
        }
        info!("MIDI device list refreshed");

        let Some(name) = previous else {
            return Ok(RefreshOutcome::Refreshed);
        };

        match self.connect_by_name(&name) {
            Ok(()) => Ok(RefreshOutcome::Reconnected(name)),
            Err(e) => {
                warn!("Could not reconnect to {} after refresh: {}", name, e);
                Ok(RefreshOutcome::ReconnectFailed(name))
            }
        }
    }

    /// Disconnect and release the driver handle
    pub fn shutdown(&mut self) {
        self.disconnect();
        if self.driver.take().is_some() {
            info!("MIDI system shutdown");
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected(_))
    }

    pub fn connected_device_name(&self) -> Option<&str> {
        match &self.state {
            SessionState::Connected(device) => Some(&device.name),
            SessionState::NotConnected => None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Register the jog-wheel callback, replacing any previous one
    pub fn set_jog_callback<F>(&self, callback: F)
    where
        F: Fn(u8, f32) + Send + Sync + 'static,
    {
        *self.jog_callback.write() = Some(Arc::new(callback));
    }

    /// Register an already shared jog-wheel callback
    pub fn set_shared_jog_callback(&self, callback: JogCallback) {
        *self.jog_callback.write() = Some(callback);
    }

    pub fn clear_jog_callback(&self) {
        *self.jog_callback.write() = None;
    }

    /// Shared handle to the message log for UI readers
    pub fn message_log(&self) -> Arc<MessageLog> {
        Arc::clone(&self.log)
    }

    pub fn recent_messages(&self, max_count: usize) -> Vec<RawMessage> {
        self.log.recent(max_count)
    }

    pub fn clear_message_log(&self) {
        self.log.clear();
    }

    /// Callback installed on the open port: decode, notify jog listener, log
    fn bridge(&self) -> RawCallback {
        let log = Arc::clone(&self.log);
        let jog_callback = Arc::clone(&self.jog_callback);

        Box::new(move |timestamp, data| {
            if data.is_empty() {
                return;
            }

            let decoded = super::decode(data);

            if let Some(jog) = decoded.jog {
                // Release the slot before calling so the callback may re-register itself
                let callback = jog_callback.read().clone();
                if let Some(callback) = callback {
                    callback(jog.channel, jog.delta);
                }
            }

            trace!("MIDI: {}", decoded.description);
            log.push(RawMessage::new(data.to_vec(), timestamp, decoded.description));
        })
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

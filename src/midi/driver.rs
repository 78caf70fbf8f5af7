//! Platform MIDI input drivers
//!
//! The session talks to hardware only through [`InputDriver`]. [`MidirDriver`]
//! is the real backend; tests use the scripted driver in [`fake`].

use midir::{Ignore, MidiInput, MidiInputConnection};
use std::time::Instant;
use tracing::debug;

use super::session::SessionError;

/// Raw-message callback: (seconds since driver start, bytes).
/// Runs on the driver's input thread.
pub type RawCallback = Box<dyn FnMut(f64, &[u8]) + Send + 'static>;

/// Creates a fresh driver handle; called on initialize and on every refresh
pub type DriverFactory = Box<dyn Fn() -> Result<Box<dyn InputDriver>, SessionError>>;

/// A platform MIDI input handle with at most one open port
pub trait InputDriver {
    /// Display names of the available input ports, in driver order
    fn port_names(&self) -> Result<Vec<String>, SessionError>;

    /// Open the port at `index` with every message class enabled and install
    /// `callback`. Returns the port's display name.
    fn open(&mut self, index: usize, callback: RawCallback) -> Result<String, SessionError>;

    /// Close the open port, if any
    fn close(&mut self) -> Result<(), SessionError>;
}

enum PortState {
    Idle(MidiInput),
    Open(MidiInputConnection<()>),
    /// Transient state while ownership moves between `Idle` and `Open`
    Detached,
}

/// [`InputDriver`] backed by `midir`
pub struct MidirDriver {
    client_name: String,
    state: PortState,
    started: Instant,
}

impl MidirDriver {
    pub fn new(client_name: &str) -> Result<Self, SessionError> {
        let input = MidiInput::new(client_name)
            .map_err(|e| SessionError::DriverUnavailable(e.to_string()))?;

        Ok(Self {
            client_name: client_name.to_string(),
            state: PortState::Idle(input),
            started: Instant::now(),
        })
    }

    /// Factory producing a new `midir` client each time it is called
    pub fn factory(client_name: &str) -> DriverFactory {
        let client_name = client_name.to_string();
        Box::new(move || Ok(Box::new(MidirDriver::new(&client_name)?) as Box<dyn InputDriver>))
    }

    fn names_of(input: &MidiInput) -> Result<Vec<String>, SessionError> {
        input
            .ports()
            .iter()
            .map(|port| {
                input
                    .port_name(port)
                    .map_err(|e| SessionError::DriverUnavailable(e.to_string()))
            })
            .collect()
    }
}

impl InputDriver for MidirDriver {
    fn port_names(&self) -> Result<Vec<String>, SessionError> {
        match &self.state {
            PortState::Idle(input) => Self::names_of(input),
            _ => {
                // An open connection owns the client, so scan with a short-lived one
                let scanner = MidiInput::new(&format!("{} Scanner", self.client_name))
                    .map_err(|e| SessionError::DriverUnavailable(e.to_string()))?;
                Self::names_of(&scanner)
            }
        }
    }

    fn open(&mut self, index: usize, mut callback: RawCallback) -> Result<String, SessionError> {
        let mut input = match std::mem::replace(&mut self.state, PortState::Detached) {
            PortState::Idle(input) => input,
            PortState::Open(conn) => {
                self.state = PortState::Open(conn);
                return Err(SessionError::PortOpen("a port is already open".to_string()));
            }
            PortState::Detached => {
                return Err(SessionError::DriverUnavailable("driver handle lost".to_string()));
            }
        };

        let ports = input.ports();
        let Some(port) = ports.get(index) else {
            let count = ports.len();
            self.state = PortState::Idle(input);
            return Err(SessionError::PortIndexOutOfRange { index, count });
        };

        let name = match input.port_name(port) {
            Ok(name) => name,
            Err(e) => {
                self.state = PortState::Idle(input);
                return Err(SessionError::PortOpen(e.to_string()));
            }
        };

        // Deliver everything: sysex, timing clock and active sensing included
        input.ignore(Ignore::None);

        let started = self.started;
        let result = input.connect(
            port,
            &self.client_name,
            move |_stamp, data, _| callback(started.elapsed().as_secs_f64(), data),
            (),
        );

        match result {
            Ok(conn) => {
                debug!("midir input connected: {}", name);
                self.state = PortState::Open(conn);
                Ok(name)
            }
            Err(e) => {
                let reason = e.to_string();
                self.state = PortState::Idle(e.into_inner());
                Err(SessionError::PortOpen(reason))
            }
        }
    }

    fn close(&mut self) -> Result<(), SessionError> {
        match std::mem::replace(&mut self.state, PortState::Detached) {
            PortState::Open(conn) => {
                let (input, ()) = conn.close();
                self.state = PortState::Idle(input);
                Ok(())
            }
            PortState::Idle(input) => {
                self.state = PortState::Idle(input);
                Ok(())
            }
            PortState::Detached => Err(SessionError::PortClose("driver handle lost".to_string())),
        }
    }
}

/// Scripted in-memory driver for exercising the session without hardware
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Shared state behind every driver a [`FakeBackend`] creates.
    /// Survives driver recreation, like the OS device list does.
    #[derive(Default)]
    pub(crate) struct BackendState {
        pub ports: Vec<String>,
        pub callback: Option<RawCallback>,
        pub open_index: Option<usize>,
        pub fail_open: bool,
        pub fail_close: bool,
        pub fail_create: bool,
        pub drivers_created: usize,
    }

    #[derive(Clone, Default)]
    pub(crate) struct FakeBackend {
        pub state: Arc<Mutex<BackendState>>,
    }

    impl FakeBackend {
        pub fn with_ports(ports: &[&str]) -> Self {
            let backend = Self::default();
            backend.state.lock().ports = ports.iter().map(|p| p.to_string()).collect();
            backend
        }

        pub fn factory(&self) -> DriverFactory {
            let state = self.state.clone();
            Box::new(move || {
                let mut guard = state.lock();
                if guard.fail_create {
                    return Err(SessionError::DriverUnavailable("no MIDI backend".to_string()));
                }
                guard.drivers_created += 1;
                Ok(Box::new(FakeDriver { state: state.clone() }) as Box<dyn InputDriver>)
            })
        }

        pub fn set_ports(&self, ports: &[&str]) {
            self.state.lock().ports = ports.iter().map(|p| p.to_string()).collect();
        }

        /// Deliver bytes through the installed callback, as the driver thread would
        pub fn send(&self, timestamp: f64, data: &[u8]) -> bool {
            let mut callback = self.state.lock().callback.take();
            let delivered = match callback.as_mut() {
                Some(cb) => {
                    cb(timestamp, data);
                    true
                }
                None => false,
            };
            let mut guard = self.state.lock();
            if guard.callback.is_none() && guard.open_index.is_some() {
                guard.callback = callback;
            }
            delivered
        }

        pub fn is_open(&self) -> bool {
            self.state.lock().open_index.is_some()
        }
    }

    pub(crate) struct FakeDriver {
        state: Arc<Mutex<BackendState>>,
    }

    impl InputDriver for FakeDriver {
        fn port_names(&self) -> Result<Vec<String>, SessionError> {
            Ok(self.state.lock().ports.clone())
        }

        fn open(&mut self, index: usize, callback: RawCallback) -> Result<String, SessionError> {
            let mut state = self.state.lock();
            if state.fail_open {
                return Err(SessionError::PortOpen("device busy".to_string()));
            }
            let name = state
                .ports
                .get(index)
                .cloned()
                .ok_or(SessionError::PortIndexOutOfRange {
                    index,
                    count: state.ports.len(),
                })?;
            state.callback = Some(callback);
            state.open_index = Some(index);
            Ok(name)
        }

        fn close(&mut self) -> Result<(), SessionError> {
            let mut state = self.state.lock();
            state.callback = None;
            state.open_index = None;
            if state.fail_close {
                return Err(SessionError::PortClose("device unplugged".to_string()));
            }
            Ok(())
        }
    }
}

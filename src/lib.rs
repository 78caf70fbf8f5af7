//! Gamma VJ controller input core
//!
//! Decodes MIDI from DJ controllers (DDJ-REV1 family), keeps a bounded signal
//! log for the setup screen and turns jog-wheel ticks into dial angles.

pub mod cli;
pub mod config;
pub mod midi;
pub mod monitor;

pub use midi::log::{MessageLog, RawMessage};
pub use midi::rotation::RotationAggregator;
pub use midi::session::{DeviceSession, JogCallback, RefreshOutcome, SessionError, SessionState};

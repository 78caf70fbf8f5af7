//! Jog wheel angle accumulation
//!
//! Ticks arrive on the driver thread while the UI thread reads the angles, so
//! each accumulator is an `AtomicU32` holding the bits of an `f32`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use super::session::JogCallback;

/// Channel of the left jog wheel
pub const LEFT_CHANNEL: u8 = 1;

/// Channel of the right jog wheel
pub const RIGHT_CHANNEL: u8 = 2;

/// Point-in-time copy of both wheel angles
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotationSnapshot {
    pub left: f32,
    pub right: f32,
}

/// Accumulates jog deltas into angles in `[0, 360)`
#[derive(Debug, Default)]
pub struct RotationAggregator {
    left: AtomicU32,
    right: AtomicU32,
}

impl RotationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, channel: u8) -> Option<&AtomicU32> {
        match channel {
            LEFT_CHANNEL => Some(&self.left),
            RIGHT_CHANNEL => Some(&self.right),
            _ => None,
        }
    }

    /// Add `delta` degrees to a wheel. Unknown channels and non-finite deltas are ignored.
    pub fn apply(&self, channel: u8, delta: f32) {
        if !delta.is_finite() {
            return;
        }
        let Some(slot) = self.slot(channel) else {
            return;
        };

        // Only the driver thread writes, but a CAS loop keeps concurrent writers correct too
        let mut current = slot.load(Ordering::Acquire);
        loop {
            let next = normalize(f32::from_bits(current) + delta).to_bits();
            match slot.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Current angle of a wheel, `None` for unknown channels
    pub fn angle(&self, channel: u8) -> Option<f32> {
        self.slot(channel)
            .map(|slot| f32::from_bits(slot.load(Ordering::Acquire)))
    }

    pub fn left(&self) -> f32 {
        f32::from_bits(self.left.load(Ordering::Acquire))
    }

    pub fn right(&self) -> f32 {
        f32::from_bits(self.right.load(Ordering::Acquire))
    }

    pub fn snapshot(&self) -> RotationSnapshot {
        RotationSnapshot {
            left: self.left(),
            right: self.right(),
        }
    }

    pub fn reset(&self) {
        self.left.store(0f32.to_bits(), Ordering::Release);
        self.right.store(0f32.to_bits(), Ordering::Release);
    }

    /// Jog callback that feeds this aggregator, for `DeviceSession::set_jog_callback`
    pub fn jog_callback(self: &Arc<Self>) -> JogCallback {
        let dials = Arc::clone(self);
        Arc::new(move |channel, delta| dials.apply(channel, delta))
    }
}

/// Wrap an angle into `[0, 360)` by whole turns.
///
/// Values beyond two turns are reduced with `rem_euclid` first, since past
/// 2^33 a single ±360 step no longer changes an f32. A value that rounds to
/// exactly 360.0 after adding a turn wraps again to 0.0.
fn normalize(mut angle: f32) -> f32 {
    if angle.abs() >= 720.0 {
        angle = angle.rem_euclid(360.0);
    }
    loop {
        if angle >= 360.0 {
            angle -= 360.0;
        } else if angle < 0.0 {
            angle += 360.0;
        } else {
            return angle;
        }
    }
}

//! DDJ-REV1 jog wheel decoding
//!
//! The jog wheels report relative encoder ticks as Control Change messages on
//! channel 1 (left deck) and channel 2 (right deck). Each tick is a fixed step;
//! the controller never sends an absolute position.

/// Degrees of rotation per encoder tick
pub const JOG_STEP_DEGREES: f32 = 0.2;

/// Controller numbers used by the jog wheels (finger on / finger off surfaces)
pub const JOG_CONTROLLERS: [u8; 2] = [0x21, 0x22];

/// Value byte of a clockwise tick
pub const JOG_CLOCKWISE: u8 = 0x41;

/// Value byte of a counter-clockwise tick
pub const JOG_COUNTER_CLOCKWISE: u8 = 0x3F;

/// One decoded jog-wheel tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JogEvent {
    /// Logical channel: 1 = left wheel, 2 = right wheel
    pub channel: u8,
    /// Signed rotation in degrees (positive is clockwise)
    pub delta: f32,
}

/// Detect a jog-wheel tick in raw bytes
pub fn jog_event(data: &[u8]) -> Option<JogEvent> {
    let &[status, controller, value, ..] = data else {
        return None;
    };

    let channel = match status {
        0xB0 => 1,
        0xB1 => 2,
        _ => return None,
    };

    if !JOG_CONTROLLERS.contains(&controller) {
        return None;
    }

    let delta = match value {
        JOG_CLOCKWISE => JOG_STEP_DEGREES,
        JOG_COUNTER_CLOCKWISE => -JOG_STEP_DEGREES,
        _ => return None,
    };

    Some(JogEvent { channel, delta })
}

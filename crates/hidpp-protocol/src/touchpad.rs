//! TouchPadRawXY (feature page 0x6100) dual-touch payload decoding.
//!
//! A raw-XY broadcast rides in a long report whose feature-access params hold
//! a 16-bit timestamp followed by two packed 7-byte touch records:
//!
//! ```text
//! params[0..2]   timestamp, little-endian
//! params[2..9]   touch record 0: x_m x_l y_m y_l z area id
//! params[9..16]  touch record 1: same layout
//! ```
//!
//! The two high bits of `x_m`/`y_m` carry contact type/status, the low six
//! bits extend the matching low byte to a full coordinate. The id byte packs
//! the finger id in its high nibble; its low bits are overloaded per record:
//! record 0 carries the end-of-frame and spurious flags, record 1 carries the
//! total finger count of the gesture.
//!
//! A physical report carries at most two contacts; gestures with more fingers
//! are split across frames, with `end_of_frame` closing the sequence.

use crate::report::LONG_PARAM_LEN;

/// Bytes in one packed touch record.
pub const TOUCH_RECORD_LEN: usize = 7;
/// Param bytes of a raw-XY broadcast (the long-frame param area).
pub const RAW_XY_PARAM_LEN: usize = LONG_PARAM_LEN;

/// One decoded contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TouchPoint {
    /// Horizontal position (14 significant bits).
    pub x: u16,
    /// Vertical position (14 significant bits).
    pub y: u16,
    /// Contact pressure.
    pub z: u8,
    /// Contact area.
    pub area: u8,
    /// Tracking id, stable for the lifetime of the contact.
    pub finger_id: u8,
    /// Two contact-type bits from the top of `x_m`.
    pub contact_type: u8,
    /// Two contact-status bits from the top of `y_m`.
    pub contact_status: u8,
}

/// One decoded raw-XY broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchFrame {
    /// Device timestamp.
    pub timestamp: u16,
    /// Set on the last frame of a multi-frame gesture.
    pub end_of_frame: bool,
    /// Set when the device flags the frame as spurious.
    pub spurious: bool,
    /// Fingers in the whole gesture, not just in this frame.
    pub finger_count: u8,
    /// Up to two contacts carried by this frame.
    pub fingers: [Option<TouchPoint>; 2],
}

fn decode_record(params: &[u8; RAW_XY_PARAM_LEN], base: usize) -> TouchPoint {
    let x_m = params[base];
    let y_m = params[base + 2];
    TouchPoint {
        contact_type: x_m >> 6,
        x: u16::from(x_m & 0x3F) << 8 | u16::from(params[base + 1]),
        contact_status: y_m >> 6,
        y: u16::from(y_m & 0x3F) << 8 | u16::from(params[base + 3]),
        z: params[base + 4],
        area: params[base + 5],
        finger_id: params[base + 6] >> 4,
    }
}

/// Decode the feature-access params of a raw-XY broadcast.
///
/// The second record is only populated when the device's frame-splitting
/// convention says it is valid: on a closing frame of a four-finger gesture,
/// or on a non-closing frame with at least two fingers down.
#[must_use]
pub fn decode_raw_xy(params: &[u8; RAW_XY_PARAM_LEN]) -> TouchFrame {
    let first_id = params[2 + TOUCH_RECORD_LEN - 1];
    let second_id = params[2 + 2 * TOUCH_RECORD_LEN - 1];

    let end_of_frame = first_id & 0x01 != 0;
    let spurious = (first_id >> 1) & 0x01 != 0;
    let finger_count = second_id & 0x0F;

    let mut fingers = [None, None];
    if finger_count != 0 {
        fingers[0] = Some(decode_record(params, 2));
        if (end_of_frame && finger_count == 4) || (!end_of_frame && finger_count >= 2) {
            fingers[1] = Some(decode_record(params, 2 + TOUCH_RECORD_LEN));
        }
    }

    TouchFrame {
        timestamp: u16::from_le_bytes([params[0], params[1]]),
        end_of_frame,
        spurious,
        finger_count,
        fingers,
    }
}

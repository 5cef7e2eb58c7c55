//! HID++ wire protocol: report framing, answer correlation, touch decoding.
//!
//! This crate is intentionally I/O-free and allocation-free on hot paths.
//! It provides pure functions and types that can be tested without hardware;
//! the stateful session layer lives in `hidpp-device`.

pub mod ids;
pub mod report;
pub mod touchpad;

pub use ids::{DEVICE_INDEX_WIRED, HIDPP_ERROR, LOGITECH_VENDOR_ID, ROOT_FEATURE_INDEX};
pub use report::{
    LONG_PARAM_LEN, LONG_REPORT_LEN, Report, ReportKind, SHORT_PARAM_LEN, SHORT_REPORT_LEN,
    WireError,
};
pub use touchpad::{RAW_XY_PARAM_LEN, TouchFrame, TouchPoint, decode_raw_xy};

//! Typed wrappers over individual HID++ feature pages.
//!
//! Each submodule covers one feature page: plain functions taking a
//! [`DeviceSession`](crate::DeviceSession) plus the feature index previously
//! resolved through [`root::get_feature`]. Resolution is the caller's job so
//! that one lookup can serve many commands.

pub mod device_name;
pub mod root;
pub mod touchpad;

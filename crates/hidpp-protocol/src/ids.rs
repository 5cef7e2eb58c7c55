//! HID++ report ids, feature pages, and function constants.

/// Logitech USB vendor ID.
pub const LOGITECH_VENDOR_ID: u16 = 0x046D;

/// Feature index of the root feature, fixed by the protocol.
pub const ROOT_FEATURE_INDEX: u8 = 0x00;

/// Sentinel in the feature-index position of an answer that marks a
/// device-reported error instead of command output.
pub const HIDPP_ERROR: u8 = 0x8F;

/// Device index addressing the device on the other end of a wired link or a
/// single-device receiver.
pub const DEVICE_INDEX_WIRED: u8 = 0xFF;

/// First byte of every report on the wire.
pub mod report_ids {
    /// Short HID++ report (7 bytes).
    pub const HIDPP_SHORT: u8 = 0x10;
    /// Long HID++ report (20 bytes).
    pub const HIDPP_LONG: u8 = 0x11;
    /// Short DJ (Unifying receiver) report.
    pub const DJ_SHORT: u8 = 0x20;
    /// Long DJ (Unifying receiver) report.
    pub const DJ_LONG: u8 = 0x21;
}

/// Error codes carried in an error answer (see [`HIDPP_ERROR`]).
///
/// [`HIDPP_ERROR`]: crate::ids::HIDPP_ERROR
pub mod error_codes {
    /// Unknown or unsupported sub id. HID++ 1.0 devices answer every
    /// feature-indexed command with this code, which makes it double as the
    /// legacy-device signal.
    pub const INVALID_SUBID: u8 = 0x01;
    /// Register address not available on this device.
    pub const INVALID_ADDRESS: u8 = 0x02;
    /// Value rejected by the device.
    pub const INVALID_VALUE: u8 = 0x03;
    /// Device temporarily busy.
    pub const BUSY: u8 = 0x07;
    /// Request not available in the current context.
    pub const REQUEST_UNAVAILABLE: u8 = 0x0A;
}

/// Feature pages addressable through the root feature.
pub mod feature_pages {
    /// Root feature (feature resolution, protocol version).
    pub const ROOT: u16 = 0x0000;
    /// GetDeviceNameType.
    pub const DEVICE_NAME_TYPE: u16 = 0x0005;
    /// TouchPadRawXY.
    pub const TOUCHPAD_RAW_XY: u16 = 0x6100;
}

/// Function/software-id bytes for the root feature.
pub mod root_functions {
    /// GetFeature: feature id (u16 BE) in, (feature index, feature type) out.
    pub const GET_FEATURE: u8 = 0x01;
    /// GetProtocolVersion: no params in, (major, minor) out.
    pub const GET_PROTOCOL_VERSION: u8 = 0x11;
}

/// Function bytes for the GetDeviceNameType feature (page 0x0005).
pub mod device_name_functions {
    /// Name length in bytes.
    pub const GET_COUNT: u8 = 0x01;
    /// One payload-sized chunk of the name, starting at the given offset.
    pub const GET_DEVICE_NAME: u8 = 0x11;
    /// Device type byte.
    pub const GET_TYPE: u8 = 0x21;
}

/// Function bytes for the TouchPadRawXY feature (page 0x6100).
pub mod touchpad_functions {
    /// Static sensor geometry.
    pub const GET_RAW_INFO: u8 = 0x01;
    /// Raw reporting mode flags.
    pub const SET_RAW_REPORT_STATE: u8 = 0x21;
}

/// DJ receiver notification constants.
pub mod dj {
    /// Offset of the report type byte in a DJ report.
    pub const REPORT_TYPE_OFFSET: usize = 2;
    /// Offset of the first notification param in a DJ report.
    pub const REPORT_PARAMS_OFFSET: usize = 3;
    /// Connection-status notification report type.
    pub const NOTIF_CONNECTION_STATUS: u8 = 0x42;
    /// Index of the status byte within the notification params.
    pub const CONNECTION_STATUS_PARAM_STATUS: usize = 0;
    /// Status value flagging a lost link.
    pub const STATUS_LINKLOSS: u8 = 0x40;
}

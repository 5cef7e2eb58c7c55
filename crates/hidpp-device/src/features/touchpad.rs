//! Touchpad raw-XY feature (page 0x6100): sensor geometry and raw reporting
//! mode. Decoding the raw frames themselves is pure and lives in
//! `hidpp_protocol::touchpad`.

use hidpp_protocol::ids::touchpad_functions;

use crate::session::DeviceSession;
use crate::HidppResult;

/// Sensor geometry and capabilities, straight from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTouchInfo {
    pub x_size: u16,
    pub y_size: u16,
    pub z_range: u8,
    pub area_range: u8,
    pub max_contacts: u8,
    /// Sensor origin corner code.
    pub origin: u8,
    /// Resolution in dots per inch.
    pub resolution: u16,
}

/// Raw reporting mode switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawReportState {
    /// Send raw touch reports instead of (or alongside) standard HID.
    pub raw_reports: bool,
    /// 16-bit pressure, no area byte.
    pub force_vs_area: bool,
    /// Enhanced sensor sensitivity.
    pub sensor_enhanced: bool,
}

impl RawReportState {
    fn to_wire(self) -> u8 {
        u8::from(self.raw_reports)
            | u8::from(self.force_vs_area) << 1
            | u8::from(self.sensor_enhanced) << 2
    }
}

/// Query sensor geometry.
///
/// # Errors
///
/// Transaction failures from the underlying command.
pub fn get_raw_info(session: &DeviceSession, feature_index: u8) -> HidppResult<RawTouchInfo> {
    let answer =
        session.send_feature_command(feature_index, touchpad_functions::GET_RAW_INFO, &[])?;
    Ok(RawTouchInfo {
        x_size: u16::from(answer.param(0)) << 8 | u16::from(answer.param(1)),
        y_size: u16::from(answer.param(2)) << 8 | u16::from(answer.param(3)),
        z_range: answer.param(4),
        area_range: answer.param(5),
        max_contacts: answer.param(7),
        origin: answer.param(8),
        resolution: u16::from(answer.param(13)) << 8 | u16::from(answer.param(14)),
    })
}

/// Switch the sensor's raw reporting mode.
///
/// # Errors
///
/// Transaction failures from the underlying command.
pub fn set_raw_report_state(
    session: &DeviceSession,
    feature_index: u8,
    state: RawReportState,
) -> HidppResult<()> {
    session.send_feature_command(
        feature_index,
        touchpad_functions::SET_RAW_REPORT_STATE,
        &[state.to_wire()],
    )?;
    Ok(())
}

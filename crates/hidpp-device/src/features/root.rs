//! Root feature (page 0x0000): feature resolution and protocol version.
//!
//! The root feature is always at feature index 0; everything else must be
//! resolved through it before use.

use tracing::debug;

use hidpp_protocol::ids::{error_codes, root_functions, ROOT_FEATURE_INDEX};

use crate::session::DeviceSession;
use crate::{HidppError, HidppResult};

/// Where a feature page lives on this particular device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureEntry {
    /// Device-assigned feature index, usable in feature-access commands.
    pub index: u8,
    /// Feature type flags as reported by the device (obsolete/hidden bits).
    pub kind: u8,
}

/// Protocol version pair reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

/// Resolve a feature page id to its index on this device.
///
/// Returns `None` when the device does not expose the page (the root feature
/// answers with index 0, its own slot, for unknown pages).
///
/// # Errors
///
/// Transaction failures from the underlying command.
pub fn get_feature(session: &DeviceSession, feature_id: u16) -> HidppResult<Option<FeatureEntry>> {
    let params = feature_id.to_be_bytes();
    let answer = session.send_feature_command(
        ROOT_FEATURE_INDEX,
        root_functions::GET_FEATURE,
        &params,
    )?;
    let index = answer.param(0);
    if index == 0 {
        debug!(feature_id, "feature not present on device");
        return Ok(None);
    }
    Ok(Some(FeatureEntry { index, kind: answer.param(1) }))
}

/// Query the protocol version spoken by the device.
///
/// HID++ 1.0 devices cannot parse the query at all and bounce it through the
/// error report with the invalid-sub-id code; that echo is the defined way
/// such devices identify themselves, so it becomes `Ok` version 1.0 here.
///
/// # Errors
///
/// Transaction failures, and protocol errors other than the legacy signal.
pub fn get_protocol_version(session: &DeviceSession) -> HidppResult<ProtocolVersion> {
    match session.send_feature_command(
        ROOT_FEATURE_INDEX,
        root_functions::GET_PROTOCOL_VERSION,
        &[],
    ) {
        Ok(answer) => Ok(ProtocolVersion { major: answer.param(0), minor: answer.param(1) }),
        Err(HidppError::Protocol { code: error_codes::INVALID_SUBID }) => {
            debug!("legacy error echo, assuming protocol 1.0");
            Ok(ProtocolVersion { major: 1, minor: 0 })
        }
        Err(err) => Err(err),
    }
}

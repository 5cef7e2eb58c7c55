//! Device name and type feature (page 0x0005).

use hidpp_protocol::ids::device_name_functions;

use crate::session::DeviceSession;
use crate::HidppResult;

/// Broad device category reported alongside the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Keyboard,
    RemoteControl,
    Numpad,
    Mouse,
    Touchpad,
    Trackball,
    Presenter,
    /// Code not covered by this crate's table; kept verbatim.
    Other(u8),
}

impl From<u8> for DeviceType {
    fn from(raw: u8) -> Self {
        match raw {
            0 => Self::Keyboard,
            1 => Self::RemoteControl,
            2 => Self::Numpad,
            3 => Self::Mouse,
            4 => Self::Touchpad,
            5 => Self::Trackball,
            6 => Self::Presenter,
            other => Self::Other(other),
        }
    }
}

/// Declared length of the device name in bytes.
///
/// # Errors
///
/// Transaction failures from the underlying command.
pub fn get_name_length(session: &DeviceSession, feature_index: u8) -> HidppResult<u8> {
    let answer =
        session.send_feature_command(feature_index, device_name_functions::GET_COUNT, &[])?;
    Ok(answer.param(0))
}

/// One chunk of the device name starting at `offset`, up to the answer
/// frame's param capacity.
///
/// # Errors
///
/// Transaction failures from the underlying command.
pub fn get_name_chunk(
    session: &DeviceSession,
    feature_index: u8,
    offset: u8,
) -> HidppResult<Vec<u8>> {
    let answer = session.send_feature_command(
        feature_index,
        device_name_functions::GET_DEVICE_NAME,
        &[offset],
    )?;
    Ok(answer.params().to_vec())
}

/// Fetch the full device name, assembling as many chunks as the declared
/// length requires. Interior NULs and trailing padding are trimmed; non-UTF-8
/// bytes are replaced rather than failing the call.
///
/// # Errors
///
/// Transaction failures from any of the underlying commands.
pub fn get_device_name(session: &DeviceSession, feature_index: u8) -> HidppResult<String> {
    let total = usize::from(get_name_length(session, feature_index)?);
    let mut raw = Vec::with_capacity(total);
    while raw.len() < total {
        let chunk = get_name_chunk(session, feature_index, raw.len() as u8)?;
        let remaining = total - raw.len();
        let take = chunk.len().min(remaining);
        if take == 0 {
            // A device answering with an empty chunk would loop forever;
            // settle for what we have.
            break;
        }
        raw.extend_from_slice(&chunk[..take]);
    }
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    raw.truncate(end);
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

/// Query the broad device category.
///
/// # Errors
///
/// Transaction failures from the underlying command.
pub fn get_device_type(session: &DeviceSession, feature_index: u8) -> HidppResult<DeviceType> {
    let answer =
        session.send_feature_command(feature_index, device_name_functions::GET_TYPE, &[])?;
    Ok(DeviceType::from(answer.param(0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_table() {
        assert_eq!(DeviceType::from(3), DeviceType::Mouse);
        assert_eq!(DeviceType::from(4), DeviceType::Touchpad);
        assert_eq!(DeviceType::from(9), DeviceType::Other(9));
    }
}

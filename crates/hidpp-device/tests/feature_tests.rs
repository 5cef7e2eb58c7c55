//! Feature wrappers exercised against a scripted device double covering the
//! root, device-name and touchpad pages.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hidpp_device::features::device_name::{self, DeviceType};
use hidpp_device::features::root::{self, ProtocolVersion};
use hidpp_device::features::touchpad::{self, RawReportState};
use hidpp_device::transport::mock::MockTransport;
use hidpp_device::{DeviceSession, RawHidTransport, SessionBuilder, SessionConfig};
use hidpp_protocol::ids::{feature_pages, report_ids};
use hidpp_protocol::{HIDPP_ERROR, LONG_REPORT_LEN, Report};

const NAME_FEATURE_INDEX: u8 = 0x03;
const TOUCHPAD_FEATURE_INDEX: u8 = 0x0A;
const DEVICE_NAME: &[u8] = b"K400 Plus Touchpad";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn fast_session(transport: &Arc<MockTransport>) -> Arc<DeviceSession> {
    SessionBuilder::new(Arc::clone(transport) as Arc<dyn RawHidTransport>)
        .config(SessionConfig { answer_timeout: Duration::from_millis(500), ..Default::default() })
        .build()
}

/// Answer params for one scripted question, by (feature index, function).
fn scripted_answer(question: &Report) -> Vec<u8> {
    match (question.feature_index(), question.funcindex_clientid()) {
        (0x00, 0x01) => {
            let page = u16::from(question.param(0)) << 8 | u16::from(question.param(1));
            match page {
                feature_pages::DEVICE_NAME_TYPE => vec![NAME_FEATURE_INDEX, 0x00],
                feature_pages::TOUCHPAD_RAW_XY => vec![TOUCHPAD_FEATURE_INDEX, 0x00],
                _ => vec![0x00, 0x00],
            }
        }
        (0x00, 0x11) => vec![0x04, 0x02],
        (NAME_FEATURE_INDEX, 0x01) => vec![DEVICE_NAME.len() as u8],
        (NAME_FEATURE_INDEX, 0x11) => {
            let offset = usize::from(question.param(0)).min(DEVICE_NAME.len());
            DEVICE_NAME[offset..].iter().copied().take(16).collect()
        }
        (NAME_FEATURE_INDEX, 0x21) => vec![0x04],
        (TOUCHPAD_FEATURE_INDEX, 0x01) => vec![
            0x0E, 0x74, // x_size 3700
            0x09, 0xB0, // y_size 2480
            0xFF, // z_range
            0x10, // area_range
            0x00, 0x02, // max_contacts at [7]
            0x01, // origin
            0x00, 0x00, 0x00, 0x00, 0x03, 0xE8, // resolution 1000 at [13..15]
        ],
        (TOUCHPAD_FEATURE_INDEX, 0x21) => vec![question.param(0)],
        _ => vec![],
    }
}

/// Run the scripted device until the session goes quiet.
fn spawn_device(session: &Arc<DeviceSession>, transport: &Arc<MockTransport>) -> JoinHandle<()> {
    let session = Arc::clone(session);
    let transport = Arc::clone(transport);
    thread::spawn(move || {
        while let Some(raw) = transport.wait_for_send(Duration::from_millis(300)) {
            let question = Report::decode(&raw).expect("session transmits well-formed frames");
            let params = scripted_answer(&question);
            let mut answer = vec![0u8; LONG_REPORT_LEN];
            answer[0] = report_ids::HIDPP_LONG;
            answer[1] = question.device_index();
            answer[2] = question.feature_index();
            answer[3] = question.funcindex_clientid();
            answer[4..4 + params.len()].copy_from_slice(&params);
            session.handle_raw_event(&answer);
        }
    })
}

#[test]
fn test_feature_resolution() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let transport = Arc::new(MockTransport::new());
    let session = fast_session(&transport);
    let device = spawn_device(&session, &transport);

    let entry = root::get_feature(&session, feature_pages::TOUCHPAD_RAW_XY)?
        .ok_or("touchpad page should resolve")?;
    assert_eq!(entry.index, TOUCHPAD_FEATURE_INDEX);

    assert_eq!(root::get_feature(&session, 0x1981)?, None, "unknown page resolves to nothing");

    device.join().map_err(|_| "device panicked")?;
    Ok(())
}

#[test]
fn test_protocol_version() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let transport = Arc::new(MockTransport::new());
    let session = fast_session(&transport);
    let device = spawn_device(&session, &transport);

    let version = root::get_protocol_version(&session)?;
    assert_eq!(version, ProtocolVersion { major: 4, minor: 2 });

    device.join().map_err(|_| "device panicked")?;
    Ok(())
}

#[test]
fn test_protocol_version_legacy_fallback() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let transport = Arc::new(MockTransport::new());
    let session = fast_session(&transport);

    // A 1.0 device bounces the query through the error report with the
    // invalid-sub-id code.
    let device = {
        let session = Arc::clone(&session);
        let transport = Arc::clone(&transport);
        thread::spawn(move || {
            let raw = transport.wait_for_send(Duration::from_secs(2)).expect("question sent");
            let echo = [report_ids::HIDPP_SHORT, raw[1], HIDPP_ERROR, raw[2], raw[3], 0x01, 0x00];
            session.handle_raw_event(&echo);
        })
    };

    let version = root::get_protocol_version(&session)?;
    assert_eq!(version, ProtocolVersion { major: 1, minor: 0 });

    device.join().map_err(|_| "device panicked")?;
    Ok(())
}

#[test]
fn test_device_name_assembled_from_chunks() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let transport = Arc::new(MockTransport::new());
    let session = fast_session(&transport);
    let device = spawn_device(&session, &transport);

    assert_eq!(device_name::get_name_length(&session, NAME_FEATURE_INDEX)?, 18);

    // 18 declared bytes and a 16-byte chunk size force two chunk requests.
    let name = device_name::get_device_name(&session, NAME_FEATURE_INDEX)?;
    assert_eq!(name, "K400 Plus Touchpad");

    let chunk_requests: Vec<u8> = transport
        .sent_history()
        .iter()
        .filter(|raw| raw[2] == NAME_FEATURE_INDEX && raw[3] == 0x11)
        .map(|raw| raw[4])
        .collect();
    assert_eq!(chunk_requests, vec![0, 16], "second chunk starts where the first ended");

    device.join().map_err(|_| "device panicked")?;
    Ok(())
}

#[test]
fn test_device_name_trims_padding() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let transport = Arc::new(MockTransport::new());
    let session = fast_session(&transport);

    // Device declaring a padded length: 12 bytes for an 8-byte name.
    let device = {
        let session = Arc::clone(&session);
        let transport = Arc::clone(&transport);
        thread::spawn(move || {
            while let Some(raw) = transport.wait_for_send(Duration::from_millis(300)) {
                let params: Vec<u8> = match raw[3] {
                    0x01 => vec![12],
                    _ => b"Touchpad\0\0\0\0".to_vec(),
                };
                let mut answer = vec![0u8; LONG_REPORT_LEN];
                answer[..4].copy_from_slice(&[report_ids::HIDPP_LONG, raw[1], raw[2], raw[3]]);
                answer[4..4 + params.len()].copy_from_slice(&params);
                session.handle_raw_event(&answer);
            }
        })
    };

    let name = device_name::get_device_name(&session, NAME_FEATURE_INDEX)?;
    assert_eq!(name, "Touchpad");

    device.join().map_err(|_| "device panicked")?;
    Ok(())
}

#[test]
fn test_device_type() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let transport = Arc::new(MockTransport::new());
    let session = fast_session(&transport);
    let device = spawn_device(&session, &transport);

    let kind = device_name::get_device_type(&session, NAME_FEATURE_INDEX)?;
    assert_eq!(kind, DeviceType::Touchpad);

    device.join().map_err(|_| "device panicked")?;
    Ok(())
}

#[test]
fn test_touchpad_raw_info() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let transport = Arc::new(MockTransport::new());
    let session = fast_session(&transport);
    let device = spawn_device(&session, &transport);

    let info = touchpad::get_raw_info(&session, TOUCHPAD_FEATURE_INDEX)?;
    assert_eq!(info.x_size, 3700);
    assert_eq!(info.y_size, 2480);
    assert_eq!(info.z_range, 0xFF);
    assert_eq!(info.area_range, 0x10);
    assert_eq!(info.max_contacts, 2);
    assert_eq!(info.origin, 1);
    assert_eq!(info.resolution, 1000);

    device.join().map_err(|_| "device panicked")?;
    Ok(())
}

#[test]
fn test_touchpad_set_raw_report_state() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let transport = Arc::new(MockTransport::new());
    let session = fast_session(&transport);
    let device = spawn_device(&session, &transport);

    let state = RawReportState { raw_reports: true, force_vs_area: true, sensor_enhanced: false };
    touchpad::set_raw_report_state(&session, TOUCHPAD_FEATURE_INDEX, state)?;

    let sent = transport.sent_history();
    let request = sent.last().ok_or("nothing sent")?;
    assert_eq!(request[2], TOUCHPAD_FEATURE_INDEX);
    assert_eq!(request[3], 0x21);
    assert_eq!(request[4], 0b011, "raw + force bits set, enhanced clear");

    device.join().map_err(|_| "device panicked")?;
    Ok(())
}

//! Fixed-size HID++ report framing and unframing.
//!
//! All functions are pure and allocation-free.
//!
//! # Wire layout
//!
//! ```text
//! Byte 0: report id (0x10 short, 0x11 long)
//! Byte 1: device index (0xFF = wired / receiver itself)
//! Bytes 2..: payload, 5 bytes short / 18 bytes long, with two views
//!   feature-access:  feature_index | funcindex_clientid | params
//!   register-access: sub_id        | reg_address        | params
//! ```
//!
//! The two views share byte offsets; which one applies is a property of the
//! conversation, not of the frame. `funcindex_clientid` packs the function in
//! the high nibble and a caller-chosen software id in the low nibble.

use thiserror::Error;

use crate::ids::{HIDPP_ERROR, report_ids};

/// Total wire length of a short HID++ report.
pub const SHORT_REPORT_LEN: usize = 7;
/// Total wire length of a long HID++ report.
pub const LONG_REPORT_LEN: usize = 20;
/// Payload bytes following the report id and device index, short frame.
pub const SHORT_PAYLOAD_LEN: usize = SHORT_REPORT_LEN - 2;
/// Payload bytes following the report id and device index, long frame.
pub const LONG_PAYLOAD_LEN: usize = LONG_REPORT_LEN - 2;
/// Param capacity of a short frame under either payload view.
pub const SHORT_PARAM_LEN: usize = SHORT_PAYLOAD_LEN - 2;
/// Param capacity of a long frame under either payload view.
pub const LONG_PARAM_LEN: usize = LONG_PAYLOAD_LEN - 2;

/// Framing and unframing failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// A parameter block does not fit the chosen frame kind.
    #[error("parameter block of {len} bytes exceeds the {max}-byte capacity")]
    InvalidParamLength {
        /// Bytes supplied by the caller.
        len: usize,
        /// Capacity of the chosen frame kind.
        max: usize,
    },
    /// An inbound buffer length does not match the length implied by its
    /// report id. The frame must be discarded before interpretation.
    #[error("report id {report_id:#04x} does not come in frames of {len} bytes")]
    InvalidFrameSize {
        /// Report id declared in byte 0.
        report_id: u8,
        /// Actual buffer length.
        len: usize,
    },
    /// Byte 0 is not a HID++ report id.
    #[error("unknown HID++ report id {0:#04x}")]
    UnsupportedReportId(u8),
}

/// The two HID++ frame sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// 7-byte frame, 3 param bytes.
    Short,
    /// 20-byte frame, 16 param bytes.
    Long,
}

impl ReportKind {
    /// Report id carried in byte 0 of the frame.
    #[must_use]
    pub const fn report_id(self) -> u8 {
        match self {
            Self::Short => report_ids::HIDPP_SHORT,
            Self::Long => report_ids::HIDPP_LONG,
        }
    }

    /// Total frame length on the wire.
    #[must_use]
    pub const fn wire_len(self) -> usize {
        match self {
            Self::Short => SHORT_REPORT_LEN,
            Self::Long => LONG_REPORT_LEN,
        }
    }

    /// Param capacity under either payload view.
    #[must_use]
    pub const fn param_len(self) -> usize {
        match self {
            Self::Short => SHORT_PARAM_LEN,
            Self::Long => LONG_PARAM_LEN,
        }
    }

    /// Classify a report id.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnsupportedReportId`] for anything that is not a
    /// HID++ short or long id.
    pub fn from_report_id(report_id: u8) -> Result<Self, WireError> {
        match report_id {
            report_ids::HIDPP_SHORT => Ok(Self::Short),
            report_ids::HIDPP_LONG => Ok(Self::Long),
            other => Err(WireError::UnsupportedReportId(other)),
        }
    }
}

/// One HID++ report.
///
/// The payload is stored at long capacity; for short reports the tail stays
/// zeroed, so equality and round-tripping behave uniformly for both kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    kind: ReportKind,
    device_index: u8,
    payload: [u8; LONG_PAYLOAD_LEN],
}

impl Report {
    /// Build a feature-access request. Always framed long; receivers expect
    /// feature-indexed commands in long frames.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidParamLength`] when `params` exceeds the
    /// long-frame capacity.
    pub fn feature_access(
        device_index: u8,
        feature_index: u8,
        funcindex_clientid: u8,
        params: &[u8],
    ) -> Result<Self, WireError> {
        Self::with_payload(ReportKind::Long, device_index, feature_index, funcindex_clientid, params)
    }

    /// Build a register-access request in the chosen frame kind.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidParamLength`] when `params` exceeds the
    /// capacity of `kind`.
    pub fn register_access(
        kind: ReportKind,
        device_index: u8,
        sub_id: u8,
        reg_address: u8,
        params: &[u8],
    ) -> Result<Self, WireError> {
        Self::with_payload(kind, device_index, sub_id, reg_address, params)
    }

    fn with_payload(
        kind: ReportKind,
        device_index: u8,
        header0: u8,
        header1: u8,
        params: &[u8],
    ) -> Result<Self, WireError> {
        if params.len() > kind.param_len() {
            return Err(WireError::InvalidParamLength {
                len: params.len(),
                max: kind.param_len(),
            });
        }
        let mut payload = [0u8; LONG_PAYLOAD_LEN];
        payload[0] = header0;
        payload[1] = header1;
        payload[2..2 + params.len()].copy_from_slice(params);
        Ok(Self { kind, device_index, payload })
    }

    /// Validate and unframe an inbound buffer.
    ///
    /// The buffer length must match the length implied by the declared report
    /// id exactly; otherwise the frame is rejected before interpretation.
    ///
    /// # Errors
    ///
    /// [`WireError::UnsupportedReportId`] for a non-HID++ byte 0,
    /// [`WireError::InvalidFrameSize`] for a length mismatch.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        let report_id = *data.first().ok_or(WireError::InvalidFrameSize {
            report_id: 0,
            len: 0,
        })?;
        let kind = ReportKind::from_report_id(report_id)?;
        if data.len() != kind.wire_len() {
            return Err(WireError::InvalidFrameSize { report_id, len: data.len() });
        }
        let mut payload = [0u8; LONG_PAYLOAD_LEN];
        payload[..data.len() - 2].copy_from_slice(&data[2..]);
        Ok(Self { kind, device_index: data[1], payload })
    }

    /// Frame the report into `out`, returning the number of wire bytes.
    pub fn encode(&self, out: &mut [u8; LONG_REPORT_LEN]) -> usize {
        let wire_len = self.kind.wire_len();
        out.fill(0);
        out[0] = self.kind.report_id();
        out[1] = self.device_index;
        out[2..wire_len].copy_from_slice(&self.payload[..wire_len - 2]);
        wire_len
    }

    /// Frame kind (short or long).
    #[must_use]
    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    /// Addressed device index.
    #[must_use]
    pub fn device_index(&self) -> u8 {
        self.device_index
    }

    /// Feature-access view: feature index byte.
    #[must_use]
    pub fn feature_index(&self) -> u8 {
        self.payload[0]
    }

    /// Feature-access view: function (high nibble) and software id (low
    /// nibble) byte.
    #[must_use]
    pub fn funcindex_clientid(&self) -> u8 {
        self.payload[1]
    }

    /// Register-access view: sub id byte (same offset as the feature index).
    #[must_use]
    pub fn sub_id(&self) -> u8 {
        self.payload[0]
    }

    /// Register-access view: register address byte.
    #[must_use]
    pub fn reg_address(&self) -> u8 {
        self.payload[1]
    }

    /// Param bytes, sized for this frame kind. Both payload views share them.
    #[must_use]
    pub fn params(&self) -> &[u8] {
        &self.payload[2..2 + self.kind.param_len()]
    }

    /// One param byte, or zero past the frame's capacity. Keeps feature
    /// parsers total over device-controlled answer sizes.
    #[must_use]
    pub fn param(&self, index: usize) -> u8 {
        self.params().get(index).copied().unwrap_or(0)
    }

    /// Whether this answer reports an error instead of command output.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.feature_index() == HIDPP_ERROR
    }

    /// Error code of an error answer: the byte after the echoed sub id and
    /// address of the offending request.
    #[must_use]
    pub fn error_code(&self) -> u8 {
        self.param(1)
    }

    /// Correlate an inbound candidate against an outstanding question.
    ///
    /// Matches a normal answer (identical feature index and
    /// function/software id), or a HID++ 1.0 error echo: such devices cannot
    /// parse feature-indexed commands and bounce the offending bytes back
    /// through the error report, so the echoed sub id and address line up
    /// with the question's feature index and function byte.
    #[must_use]
    pub fn is_answer_to(&self, question: &Report) -> bool {
        let direct = self.feature_index() == question.feature_index()
            && self.funcindex_clientid() == question.funcindex_clientid();
        let legacy_echo = self.feature_index() == HIDPP_ERROR
            && self.funcindex_clientid() == question.feature_index()
            && self.param(0) == question.funcindex_clientid();
        direct || legacy_echo
    }
}

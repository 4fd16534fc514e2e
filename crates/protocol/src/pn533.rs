//! PN533 host-controller frame codec
//!
//! The PN533 contactless controller is driven over USB bulk endpoints with
//! normal information frames:
//!
//! ```text
//! 00 00 FF LEN LCS TFI CMD DATA... DCS 00
//! ```
//!
//! `LEN` counts `TFI`, `CMD` and `DATA`. `LCS` makes `LEN + LCS == 0` and
//! `DCS` makes `TFI + CMD + sum(DATA) + DCS == 0` (mod 256). Frames from
//! the host carry `TFI = D4`, responses carry `TFI = D5` and the request
//! command code plus one. Every accepted command is first acknowledged with
//! the fixed ACK frame.
//!
//! Only the commands needed to detect a tag and read its identifier are
//! modelled here; this module performs no I/O.

use crate::error::{ProtocolError, Result};

/// Start of every frame
pub const PREAMBLE: [u8; 3] = [0x00, 0x00, 0xFF];

/// Acknowledge frame, also sent by the host to abort a pending command
pub const ACK_FRAME: [u8; 6] = [0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00];

/// Negative acknowledge, asks the controller to resend its last response
pub const NACK_FRAME: [u8; 6] = [0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00];

/// Frame identifier for host-to-controller frames
pub const TFI_HOST: u8 = 0xD4;

/// Frame identifier for controller-to-host frames
pub const TFI_CONTROLLER: u8 = 0xD5;

/// Largest `DATA` section of a normal information frame (LEN is one byte)
pub const MAX_DATA_LEN: usize = 255 - 2;

/// Baud rate / modulation byte for 106 kbps type A targets
pub const BRTY_106_TYPE_A: u8 = 0x00;

/// Commands issued by the contactless adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    GetFirmwareVersion = 0x02,
    RfConfiguration = 0x32,
    InListPassiveTarget = 0x4A,
    InRelease = 0x52,
}

impl Command {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Command code the controller answers with
    pub fn response_code(self) -> u8 {
        self.code() + 1
    }
}

/// A decoded controller frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Ack,
    Nack,
    /// Syntax error frame (`00 00 FF 01 FF 7F 81 00`)
    Error,
    Response { code: u8, data: Vec<u8> },
}

/// Encode a host command into a normal information frame
pub fn encode_command(command: Command, data: &[u8]) -> Result<Vec<u8>> {
    if data.len() > MAX_DATA_LEN {
        return Err(ProtocolError::FrameTooLarge {
            size: data.len(),
            max: MAX_DATA_LEN,
        });
    }

    let len = (data.len() + 2) as u8;
    let mut frame = Vec::with_capacity(data.len() + 9);
    frame.extend_from_slice(&PREAMBLE);
    frame.push(len);
    frame.push(checksum(&[len]));
    frame.push(TFI_HOST);
    frame.push(command.code());
    frame.extend_from_slice(data);

    let mut body = Vec::with_capacity(data.len() + 2);
    body.push(TFI_HOST);
    body.push(command.code());
    body.extend_from_slice(data);
    frame.push(checksum(&body));
    frame.push(0x00);

    Ok(frame)
}

/// Decode one frame read from the controller
///
/// Leading zero padding before the start code is tolerated.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame> {
    // Start code is 00 FF, preceded by at least one zero byte
    let start = bytes
        .iter()
        .position(|&b| b != 0x00)
        .ok_or(ProtocolError::InvalidPreamble)?;
    if start == 0 || bytes[start] != 0xFF {
        return Err(ProtocolError::InvalidPreamble);
    }

    let header = &bytes[start + 1..];
    if header.len() < 2 {
        return Err(ProtocolError::IncompleteFrame {
            expected: start + 3,
            actual: bytes.len(),
        });
    }

    let (len, lcs) = (header[0], header[1]);
    match (len, lcs) {
        (0x00, 0xFF) => return Ok(Frame::Ack),
        (0xFF, 0x00) => return Ok(Frame::Nack),
        _ => {}
    }

    if len.wrapping_add(lcs) != 0 {
        return Err(ProtocolError::LengthChecksum { len, lcs });
    }

    let needed = 2 + len as usize + 1;
    if header.len() < needed {
        return Err(ProtocolError::IncompleteFrame {
            expected: start + 1 + needed,
            actual: bytes.len(),
        });
    }

    let body = &header[2..2 + len as usize];
    let dcs = header[2 + len as usize];

    if len == 1 && body[0] == 0x7F {
        return Ok(Frame::Error);
    }

    let expected = checksum(body);
    if expected != dcs {
        return Err(ProtocolError::DataChecksum {
            expected,
            actual: dcs,
        });
    }

    if body.len() < 2 || body[0] != TFI_CONTROLLER {
        return Err(ProtocolError::UnexpectedResponse {
            tfi: body.first().copied().unwrap_or(0),
            code: body.get(1).copied().unwrap_or(0),
        });
    }

    Ok(Frame::Response {
        code: body[1],
        data: body[2..].to_vec(),
    })
}

/// Unwrap the payload of a response to `command`
pub fn expect_response(frame: Frame, command: Command) -> Result<Vec<u8>> {
    match frame {
        Frame::Response { code, data } if code == command.response_code() => Ok(data),
        Frame::Response { code, .. } => Err(ProtocolError::UnexpectedResponse {
            tfi: TFI_CONTROLLER,
            code,
        }),
        Frame::Error => Err(ProtocolError::ErrorFrame),
        Frame::Ack | Frame::Nack => Err(ProtocolError::UnexpectedResponse {
            tfi: 0x00,
            code: 0x00,
        }),
    }
}

/// Check the status byte leading a response (`InRelease`, data exchange)
pub fn check_status(data: &[u8]) -> Result<()> {
    let status = data.first().copied().ok_or(ProtocolError::IncompleteFrame {
        expected: 1,
        actual: 0,
    })?;
    // Upper two bits are the NAD/MI flags, not an error
    match status & 0x3F {
        0 => Ok(()),
        code => Err(ProtocolError::Status(code)),
    }
}

/// Controller firmware identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub ic: u8,
    pub version: u8,
    pub revision: u8,
    pub support: u8,
}

impl FirmwareVersion {
    pub fn parse(data: &[u8]) -> Result<Self> {
        match data {
            [ic, version, revision, support, ..] => Ok(Self {
                ic: *ic,
                version: *version,
                revision: *revision,
                support: *support,
            }),
            _ => Err(ProtocolError::IncompleteFrame {
                expected: 4,
                actual: data.len(),
            }),
        }
    }
}

/// `RFConfiguration` item 0x05 (MaxRetries): ATR retries, PSL retries and
/// a bounded number of passive activation retries so polling returns
pub fn max_retries_config(passive_activation: u8) -> [u8; 4] {
    [0x05, 0xFF, 0x01, passive_activation]
}

/// `InListPassiveTarget` request for a single 106 kbps type A target
pub fn list_passive_target_request() -> [u8; 2] {
    [0x01, BRTY_106_TYPE_A]
}

/// `InRelease` request for one target; target 0 releases all of them
pub fn release_request(target: u8) -> [u8; 1] {
    [target]
}

/// A type A target activated by `InListPassiveTarget`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassiveTarget {
    /// Logical target number assigned by the controller
    pub target: u8,
    pub sens_res: [u8; 2],
    pub sel_res: u8,
    /// NFCID1, the tag's unique identifier
    pub nfcid: Vec<u8>,
}

impl PassiveTarget {
    /// Parse an `InListPassiveTarget` response; `None` when no tag answered
    pub fn parse(data: &[u8]) -> Result<Option<Self>> {
        let count = data.first().copied().ok_or(ProtocolError::IncompleteFrame {
            expected: 1,
            actual: 0,
        })?;
        if count == 0 {
            return Ok(None);
        }

        let fixed = &data[1..];
        if fixed.len() < 5 {
            return Err(ProtocolError::IncompleteFrame {
                expected: 6,
                actual: data.len(),
            });
        }

        let id_len = fixed[4] as usize;
        let nfcid = fixed
            .get(5..5 + id_len)
            .ok_or(ProtocolError::IncompleteFrame {
                expected: 6 + id_len,
                actual: data.len(),
            })?
            .to_vec();

        Ok(Some(Self {
            target: fixed[0],
            sens_res: [fixed[1], fixed[2]],
            sel_res: fixed[3],
            nfcid,
        }))
    }
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b))
        .wrapping_neg()
}

//! `DeviceCommunicationControl` and `ReinitializeDevice`, both carrying an
//! optional access-control password the device checks before acting.

use crate::errors::{ProtocolError, Result};
use crate::tag::{decode_tag, encode_context_tag, TagClass};

/// Maximum password length ASHRAE 135 convention allows for these two services.
pub const MAX_PASSWORD_LENGTH: usize = 20;

/// `DeviceCommunicationControl.enable-disable` parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableDisable {
    /// Resume normal communication.
    Enable,
    /// Suspend communication indefinitely (or until `timeout_minutes` elapses).
    Disable,
    /// Suspend communication, but still accept `DeviceCommunicationControl` itself.
    DisableInitiation,
}

impl EnableDisable {
    fn to_u32(self) -> u32 {
        match self {
            Self::Enable => 0,
            Self::Disable => 1,
            Self::DisableInitiation => 2,
        }
    }

    fn from_u32(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Enable),
            1 => Ok(Self::Disable),
            2 => Ok(Self::DisableInitiation),
            other => {
                Err(ProtocolError::ValueOutOfRange { field: "enable_disable", value: i64::from(other) })
            },
        }
    }
}

/// `DeviceCommunicationControl` request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCommunicationControlRequest {
    /// Minutes until communication automatically re-enables; `None` means indefinite.
    pub timeout_minutes: Option<u32>,
    /// Requested communication state.
    pub enable_disable: EnableDisable,
    /// Optional access-control password, at most [`MAX_PASSWORD_LENGTH`] characters.
    pub password: Option<Vec<u8>>,
}

/// Encodes a `DeviceCommunicationControl` request body, returning bytes written.
///
/// Fails without writing anything if the password exceeds
/// [`MAX_PASSWORD_LENGTH`].
pub fn encode_device_communication_control_request(
    buf: &mut Vec<u8>,
    request: &DeviceCommunicationControlRequest,
) -> Result<usize> {
    if let Some(password) = &request.password {
        check_password_length(password)?;
    }

    let start = buf.len();
    if let Some(timeout) = request.timeout_minutes {
        encode_context_unsigned(buf, 0, timeout);
    }
    encode_context_unsigned(buf, 1, request.enable_disable.to_u32());
    if let Some(password) = &request.password {
        encode_context_character_string(buf, 2, password);
    }
    Ok(buf.len() - start)
}

/// Decodes a `DeviceCommunicationControl` request body.
pub fn decode_device_communication_control_request(
    buf: &[u8],
) -> Result<(usize, DeviceCommunicationControlRequest)> {
    let mut offset = 0;

    let (header, tag) = decode_tag(&buf[offset..])?;
    let (timeout_minutes, enable_disable_offset) = if tag.class == TagClass::Context && tag.number == 0 {
        let payload = crate::tag::payload_slice(buf, offset + header, tag.lvt as usize)?;
        let timeout = crate::primitive::decode_unsigned(payload)?;
        (Some(timeout), offset + header + tag.lvt as usize)
    } else {
        (None, offset)
    };
    offset = enable_disable_offset;

    let (header, tag) = decode_tag(&buf[offset..])?;
    let payload = crate::tag::payload_slice(buf, offset + header, tag.lvt as usize)?;
    let enable_disable = EnableDisable::from_u32(crate::primitive::decode_unsigned(payload)?)?;
    offset += header + tag.lvt as usize;

    let password = if offset < buf.len() {
        let (header, tag) = decode_tag(&buf[offset..])?;
        let payload_start = offset + header;
        let payload = crate::tag::payload_slice(buf, payload_start, tag.lvt as usize)?;
        let (_, bytes) = crate::primitive::decode_character_string(payload)?;
        check_password_length(bytes)?;
        offset = payload_start + tag.lvt as usize;
        Some(bytes.to_vec())
    } else {
        None
    };

    Ok((offset, DeviceCommunicationControlRequest { timeout_minutes, enable_disable, password }))
}

/// `ReinitializeDevice.state` parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReinitializedState {
    /// Cold start: full restart.
    ColdStart,
    /// Warm start: restart without resetting persisted configuration.
    WarmStart,
    /// Begin a backup of device configuration.
    StartBackup,
    /// Conclude a backup of device configuration.
    EndBackup,
    /// Begin restoring device configuration.
    StartRestore,
    /// Conclude restoring device configuration.
    EndRestore,
    /// Abort an in-progress restore.
    AbortRestore,
}

impl ReinitializedState {
    fn to_u32(self) -> u32 {
        match self {
            Self::ColdStart => 0,
            Self::WarmStart => 1,
            Self::StartBackup => 2,
            Self::EndBackup => 3,
            Self::StartRestore => 4,
            Self::EndRestore => 5,
            Self::AbortRestore => 6,
        }
    }

    fn from_u32(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::ColdStart),
            1 => Ok(Self::WarmStart),
            2 => Ok(Self::StartBackup),
            3 => Ok(Self::EndBackup),
            4 => Ok(Self::StartRestore),
            5 => Ok(Self::EndRestore),
            6 => Ok(Self::AbortRestore),
            other => Err(ProtocolError::ValueOutOfRange { field: "reinitialized_state", value: i64::from(other) }),
        }
    }
}

/// `ReinitializeDevice` request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReinitializeDeviceRequest {
    /// Requested reinitialization state.
    pub state: ReinitializedState,
    /// Optional access-control password, at most [`MAX_PASSWORD_LENGTH`] characters.
    pub password: Option<Vec<u8>>,
}

/// Encodes a `ReinitializeDevice` request body, returning bytes written.
///
/// Fails without writing anything if the password exceeds
/// [`MAX_PASSWORD_LENGTH`].
pub fn encode_reinitialize_device_request(
    buf: &mut Vec<u8>,
    request: &ReinitializeDeviceRequest,
) -> Result<usize> {
    if let Some(password) = &request.password {
        check_password_length(password)?;
    }

    let start = buf.len();
    encode_context_unsigned(buf, 0, request.state.to_u32());
    if let Some(password) = &request.password {
        encode_context_character_string(buf, 1, password);
    }
    Ok(buf.len() - start)
}

/// Decodes a `ReinitializeDevice` request body.
pub fn decode_reinitialize_device_request(buf: &[u8]) -> Result<(usize, ReinitializeDeviceRequest)> {
    let (header, tag) = decode_tag(buf)?;
    let payload = crate::tag::payload_slice(buf, header, tag.lvt as usize)?;
    let state = ReinitializedState::from_u32(crate::primitive::decode_unsigned(payload)?)?;
    let mut offset = header + tag.lvt as usize;

    let password = if offset < buf.len() {
        let (header, tag) = decode_tag(&buf[offset..])?;
        let payload_start = offset + header;
        let payload = crate::tag::payload_slice(buf, payload_start, tag.lvt as usize)?;
        let (_, bytes) = crate::primitive::decode_character_string(payload)?;
        check_password_length(bytes)?;
        offset = payload_start + tag.lvt as usize;
        Some(bytes.to_vec())
    } else {
        None
    };

    Ok((offset, ReinitializeDeviceRequest { state, password }))
}

fn check_password_length(password: &[u8]) -> Result<()> {
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ProtocolError::ValueOutOfRange { field: "password", value: password.len() as i64 });
    }
    Ok(())
}

fn encode_context_unsigned(buf: &mut Vec<u8>, context_number: u8, value: u32) {
    let raw = crate::primitive::encode_unsigned(value);
    encode_context_tag(buf, context_number, raw.len() as u32);
    buf.extend_from_slice(&raw);
}

fn encode_context_character_string(buf: &mut Vec<u8>, context_number: u8, bytes: &[u8]) {
    let mut payload = Vec::with_capacity(bytes.len() + 1);
    payload.push(crate::primitive::CharacterStringEncoding::Utf8 as u8);
    payload.extend_from_slice(bytes);
    encode_context_tag(buf, context_number, payload.len() as u32);
    buf.extend_from_slice(&payload);
}

use serde::{Deserialize, Serialize};
use strum::EnumCount;
use strum_macros::EnumCount as EnumCountMacro;

use crate::serdes::{deserialize_postcard, take_postcard};

pub const RESPONSE_PAYLOAD_SIZE: usize = 6;

/// Configuration mutation or query, as decoded from either transport.
/// Input numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, EnumCountMacro)]
pub enum CommandRequest {
    EnableOutputParameter { spn: u16, enable: bool, input: u8 },
    SetCalibrationPreset { input: u8, preset: u8 },
    SetRangePreset { input: u8, preset: u8 },
    SetPressureRange { input: u8, max_range: u16 },
    SetNtcParam { input: u8, param: u8, value: f32 },
    SetThermocoupleType(u8),
    Save,
    Reset,
    Query { query_type: u8, page: u8 },
}

impl CommandRequest {
    /// Decodes a postcard encoded request. A leading variant tag past the
    /// last command is `UnknownCommand`; anything else that fails to decode
    /// is `ParseFailed`.
    pub fn from_postcard(bytes: &[u8]) -> Result<Self, CommandError> {
        let (tag, _) = take_postcard::<u32>(bytes).map_err(|_| CommandError::ParseFailed)?;

        if tag as usize >= Self::COUNT {
            return Err(CommandError::UnknownCommand);
        }

        deserialize_postcard(bytes).map_err(|_| CommandError::ParseFailed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    Temperature,
    Pressure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandError {
    UnknownCommand,
    ParseFailed,
    UnknownParameter,
    InvalidChannel(InputKind),
    InvalidNtcParam,
    InvalidThermocoupleType,
    InvalidQueryType,
    SaveFailed,
    InvalidPreset,
}

impl CommandError {
    /// Stable numeric code reported over the wire.
    pub fn code(&self) -> u8 {
        match self {
            CommandError::UnknownCommand => 1,
            CommandError::ParseFailed => 2,
            CommandError::UnknownParameter => 3,
            CommandError::InvalidChannel(InputKind::Temperature) => 4,
            CommandError::InvalidChannel(InputKind::Pressure) => 5,
            CommandError::InvalidNtcParam => 6,
            CommandError::InvalidThermocoupleType => 7,
            CommandError::InvalidQueryType => 8,
            CommandError::SaveFailed => 9,
            CommandError::InvalidPreset => 10,
        }
    }
}

/// Successful command outcome with up to six bytes of payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandResponse {
    data: [u8; RESPONSE_PAYLOAD_SIZE],
    len: u8,
}

impl CommandResponse {
    pub const fn empty() -> Self {
        Self {
            data: [0; RESPONSE_PAYLOAD_SIZE],
            len: 0,
        }
    }

    /// Copies at most six bytes of `payload`.
    pub fn with_payload(payload: &[u8]) -> Self {
        let len = payload.len().min(RESPONSE_PAYLOAD_SIZE);
        let mut data = [0; RESPONSE_PAYLOAD_SIZE];
        data[..len].copy_from_slice(&payload[..len]);

        Self {
            data,
            len: len as u8,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }
}

pub type CommandResult = Result<CommandResponse, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serdes::serialize_postcard;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(CommandError::UnknownCommand.code(), 1);
        assert_eq!(CommandError::ParseFailed.code(), 2);
        assert_eq!(CommandError::UnknownParameter.code(), 3);
        assert_eq!(CommandError::InvalidChannel(InputKind::Temperature).code(), 4);
        assert_eq!(CommandError::InvalidChannel(InputKind::Pressure).code(), 5);
        assert_eq!(CommandError::InvalidNtcParam.code(), 6);
        assert_eq!(CommandError::InvalidThermocoupleType.code(), 7);
        assert_eq!(CommandError::InvalidQueryType.code(), 8);
        assert_eq!(CommandError::SaveFailed.code(), 9);
        assert_eq!(CommandError::InvalidPreset.code(), 10);
    }

    #[test]
    fn payload_is_truncated_to_six_bytes() {
        let response = CommandResponse::with_payload(&[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(response.payload(), &[1, 2, 3, 4, 5, 6]);

        assert!(CommandResponse::empty().payload().is_empty());
    }

    #[test]
    fn unknown_variant_tag_is_unknown_command() {
        assert_eq!(CommandRequest::from_postcard(&[9]), Err(CommandError::UnknownCommand));
        // Tag 200 as a two byte varint
        assert_eq!(
            CommandRequest::from_postcard(&[0xC8, 0x01]),
            Err(CommandError::UnknownCommand)
        );
    }

    #[test]
    fn malformed_request_is_parse_failed() {
        assert_eq!(CommandRequest::from_postcard(&[]), Err(CommandError::ParseFailed));
        assert_eq!(CommandRequest::from_postcard(&[0xFF]), Err(CommandError::ParseFailed));
        // Known tag, fields missing
        assert_eq!(CommandRequest::from_postcard(&[0, 175]), Err(CommandError::ParseFailed));
    }

    #[test]
    fn tagged_request_without_fields_decodes() {
        let mut buffer = [0u8; 8];
        let len = serialize_postcard(&CommandRequest::Save, &mut buffer).unwrap();

        assert_eq!(CommandRequest::from_postcard(&buffer[..len]), Ok(CommandRequest::Save));
    }

    #[test]
    fn request_survives_postcard() {
        let request = CommandRequest::SetNtcParam {
            input: 3,
            param: 1,
            value: 2.5e-4,
        };

        let mut buffer = [0u8; 32];
        let len = serialize_postcard(&request, &mut buffer).unwrap();
        let decoded: CommandRequest = deserialize_postcard(&buffer[..len]).unwrap();

        assert_eq!(decoded, request);
    }
}

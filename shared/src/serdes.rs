use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SerdesError {
    Unknown,
    PacketTooLong,
    PostcardImplementation,
    SerdeError,
    UnexpectedEnd,
    BadVar,
    BadEncoding,
}

pub fn serialize_postcard<T>(value: &T, buffer: &mut [u8]) -> Result<usize, SerdesError>
where
    T: Serialize,
{
    match postcard::to_slice(value, buffer) {
        Ok(buffer) => Ok(buffer.len()),
        Err(err) => Err(postcard_err_to_serdes_err(err)),
    }
}

pub fn deserialize_postcard<'a, T>(buffer: &'a [u8]) -> Result<T, SerdesError>
where
    T: Deserialize<'a>,
{
    match postcard::from_bytes(buffer) {
        Ok(value) => Ok(value),
        Err(err) => Err(postcard_err_to_serdes_err(err)),
    }
}

/// Decodes a value from the front of `buffer`, returning the unread rest.
pub fn take_postcard<'a, T>(buffer: &'a [u8]) -> Result<(T, &'a [u8]), SerdesError>
where
    T: Deserialize<'a>,
{
    postcard::take_from_bytes(buffer).map_err(postcard_err_to_serdes_err)
}

fn postcard_err_to_serdes_err(err: postcard::Error) -> SerdesError {
    match err {
        postcard::Error::WontImplement
        | postcard::Error::NotYetImplemented
        | postcard::Error::SerializeSeqLengthUnknown => SerdesError::PostcardImplementation,
        postcard::Error::SerializeBufferFull => SerdesError::PacketTooLong,
        postcard::Error::SerdeSerCustom | postcard::Error::SerdeDeCustom => SerdesError::SerdeError,
        postcard::Error::DeserializeUnexpectedEnd => SerdesError::UnexpectedEnd,
        postcard::Error::DeserializeBadVarint
        | postcard::Error::DeserializeBadBool
        | postcard::Error::DeserializeBadChar
        | postcard::Error::DeserializeBadUtf8
        | postcard::Error::DeserializeBadOption
        | postcard::Error::DeserializeBadEnum => SerdesError::BadVar,
        postcard::Error::DeserializeBadEncoding => SerdesError::BadEncoding,
        _ => SerdesError::Unknown,
    }
}

use std::{borrow::Cow, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Text encoding of string payloads and of the produced file.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(try_from = "String", into = "String")]
pub enum Charset {
    #[default]
    Utf8,
    Ascii,
    Latin1,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid UTF-8 sequence at byte {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("byte 0x{byte:02x} at {offset} is not {charset}")]
    Unmappable {
        charset: Charset,
        offset: usize,
        byte: u8,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("character {character:?} at {offset} cannot be encoded as {charset}")]
pub struct EncodeError {
    pub charset: Charset,
    pub offset: usize,
    pub character: char,
}

impl Charset {
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Ascii => "US-ASCII",
            Charset::Latin1 => "ISO-8859-1",
        }
    }

    /// Highest code point this charset can represent.
    fn max_char(&self) -> u32 {
        match self {
            Charset::Utf8 => char::MAX as u32,
            Charset::Ascii => 0x7f,
            Charset::Latin1 => 0xff,
        }
    }

    /// Decodes a payload, failing on the first byte that is not valid in this charset.
    ///
    /// ```
    /// use record_sink_rs::item::csv::charset::Charset;
    ///
    /// assert_eq!(Charset::Latin1.decode(b"caf\xe9").unwrap(), "café");
    /// assert!(Charset::Utf8.decode(b"caf\xe9").is_err());
    /// ```
    pub fn decode(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        match self {
            Charset::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| DecodeError::InvalidUtf8 {
                    offset: e.valid_up_to(),
                }),
            Charset::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(offset) => Err(DecodeError::Unmappable {
                    charset: *self,
                    offset,
                    byte: bytes[offset],
                }),
                None => Ok(bytes.iter().map(|&b| b as char).collect()),
            },
            Charset::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }

    /// Encodes text for output. UTF-8 borrows the input unchanged.
    pub fn encode<'a>(&self, text: &'a str) -> Result<Cow<'a, [u8]>, EncodeError> {
        if *self == Charset::Utf8 {
            return Ok(Cow::Borrowed(text.as_bytes()));
        }
        let max = self.max_char();
        if text.is_ascii() {
            return Ok(Cow::Borrowed(text.as_bytes()));
        }
        text.char_indices()
            .map(|(offset, character)| {
                if character as u32 <= max {
                    Ok(character as u8)
                } else {
                    Err(EncodeError {
                        charset: *self,
                        offset,
                        character,
                    })
                }
            })
            .collect::<Result<Vec<u8>, _>>()
            .map(Cow::Owned)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            "us-ascii" | "ascii" => Ok(Charset::Ascii),
            "iso-8859-1" | "latin1" | "latin-1" => Ok(Charset::Latin1),
            other => Err(format!("Unsupported charset: {}", other)),
        }
    }
}

impl TryFrom<String> for Charset {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Charset> for String {
    fn from(value: Charset) -> Self {
        value.name().to_string()
    }
}

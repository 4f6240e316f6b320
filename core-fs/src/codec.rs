//! Content codec.
//!
//! File content crosses the native bridge as base64 text. This module turns
//! that transport form into caller text and back, per declared encoding:
//!
//! | Encoding          | read (base64 → text)            | write (text → base64)          |
//! |-------------------|---------------------------------|--------------------------------|
//! | `utf8` (default)  | decode base64, then UTF-8       | UTF-8 bytes, then base64       |
//! | `ascii`           | decode base64, byte = char code | char code = byte, then base64  |
//! | `base64`/`binary` | passthrough                     | passthrough                    |

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{FsError, Result};

/// Declared encoding of text content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Utf8,
    /// Single-byte charset; every byte maps to the char with the same code.
    Ascii,
    /// Content is already base64 and is passed through unchanged.
    Base64,
}

impl Encoding {
    /// Resolves an optional encoding name, defaulting to `utf8`.
    pub fn parse(name: Option<&str>) -> Result<Self> {
        name.map_or(Ok(Encoding::Utf8), |n| n.parse())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf8",
            Encoding::Ascii => "ascii",
            Encoding::Base64 => "base64",
        }
    }
}

impl FromStr for Encoding {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "utf8" => Ok(Encoding::Utf8),
            "ascii" => Ok(Encoding::Ascii),
            "base64" | "binary" => Ok(Encoding::Base64),
            other => Err(FsError::InvalidArgument(format!(
                "Invalid encoding type \"{}\"",
                other
            ))),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Converts base64 transport content into text.
pub fn decode_text(raw: &str, encoding: Encoding) -> Result<String> {
    match encoding {
        Encoding::Utf8 => {
            let bytes = decode_base64(raw)?;
            String::from_utf8(bytes)
                .map_err(|e| FsError::InvalidArgument(format!("Invalid UTF-8 content: {}", e)))
        }
        Encoding::Ascii => Ok(decode_base64(raw)?.into_iter().map(char::from).collect()),
        Encoding::Base64 => Ok(raw.to_string()),
    }
}

/// Converts text into base64 transport content.
pub fn encode_text(content: &str, encoding: Encoding) -> Result<String> {
    match encoding {
        Encoding::Utf8 => Ok(STANDARD.encode(content.as_bytes())),
        Encoding::Ascii => {
            let bytes = content
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| {
                        FsError::InvalidArgument(format!(
                            "Character {:?} (U+{:04X}) is outside the single-byte range",
                            c,
                            u32::from(c)
                        ))
                    })
                })
                .collect::<Result<Vec<u8>>>()?;
            Ok(STANDARD.encode(bytes))
        }
        Encoding::Base64 => Ok(content.to_string()),
    }
}

/// Some platforms wrap base64 output at 76 columns; line breaks are dropped
/// before decoding.
fn decode_base64(raw: &str) -> Result<Vec<u8>> {
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| FsError::InvalidArgument(format!("Invalid base64 content: {}", e)))
}

//! String encodings for game text slots.

use encoding_rs::SHIFT_JIS;
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{Error, Result};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum TextEncoding {
    #[default]
    Ascii,
    Utf8,
    /// UTF-16, little-endian.
    Utf16,
    ShiftJis,
}

impl TextEncoding {
    /// NUL terminator appended by string writes.
    pub fn terminator(self) -> &'static [u8] {
        match self {
            TextEncoding::Utf16 => &[0, 0],
            _ => &[0],
        }
    }

    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        match self {
            TextEncoding::Ascii => {
                if !text.is_ascii() {
                    return Err(Error::Encoding(format!("{:?} is not ASCII", text)));
                }
                Ok(text.as_bytes().to_vec())
            }
            TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
            TextEncoding::Utf16 => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            TextEncoding::ShiftJis => {
                let (encoded, _, had_errors) = SHIFT_JIS.encode(text);
                if had_errors {
                    return Err(Error::Encoding(format!(
                        "{:?} is not representable in Shift-JIS",
                        text
                    )));
                }
                Ok(encoded.into_owned())
            }
        }
    }

    /// `encode` followed by the terminator.
    pub fn encode_terminated(self, text: &str) -> Result<Vec<u8>> {
        let mut bytes = self.encode(text)?;
        bytes.extend_from_slice(self.terminator());
        Ok(bytes)
    }

    /// Decode strictly, stopping at the first NUL character.
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            TextEncoding::Ascii => {
                let bytes = until_nul(bytes);
                if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
                    return Err(Error::Encoding(format!(
                        "non-ASCII byte {:#04x} at offset {}",
                        bytes[pos], pos
                    )));
                }
                Ok(bytes.iter().map(|&b| b as char).collect())
            }
            TextEncoding::Utf8 => std::str::from_utf8(until_nul(bytes))
                .map(str::to_owned)
                .map_err(|e| Error::Encoding(e.to_string())),
            TextEncoding::Utf16 => decode_utf16(bytes),
            TextEncoding::ShiftJis => SHIFT_JIS
                .decode_without_bom_handling_and_without_replacement(until_nul(bytes))
                .map(|s| s.into_owned())
                .ok_or_else(|| Error::Encoding("invalid Shift-JIS sequence".into())),
        }
    }
}

fn until_nul(bytes: &[u8]) -> &[u8] {
    let end = memchr::memchr(0, bytes).unwrap_or(bytes.len());
    &bytes[..end]
}

fn decode_utf16(bytes: &[u8]) -> Result<String> {
    let chunks = bytes.chunks_exact(2);
    let odd = !chunks.remainder().is_empty();
    let units: Vec<u16> = chunks.map(|c| u16::from_le_bytes([c[0], c[1]])).collect();

    let end = match units.iter().position(|&u| u == 0) {
        Some(end) => end,
        None if odd => {
            return Err(Error::Encoding(format!(
                "UTF-16 buffer has odd length {}",
                bytes.len()
            )));
        }
        None => units.len(),
    };

    String::from_utf16(&units[..end]).map_err(|e| Error::Encoding(e.to_string()))
}

use encoding_rs::{mem, WINDOWS_1252};

use crate::error::{PipelineError, Result};
use crate::model::TextEncoding;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// Byte values with no assigned character in cp1252.
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

/// Decodes raw CSV bytes. Invalid input is an error, never replaced.
pub fn decode(bytes: &[u8], encoding: TextEncoding) -> Result<String> {
    match encoding {
        TextEncoding::Utf8 => {
            let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
            std::str::from_utf8(body)
                .map(str::to_owned)
                .map_err(|err| PipelineError::Decode {
                    encoding: encoding.label(),
                    position: err.valid_up_to(),
                })
        }
        TextEncoding::Cp1252 => {
            if let Some(position) = bytes.iter().position(|b| CP1252_UNDEFINED.contains(b)) {
                return Err(PipelineError::Decode {
                    encoding: encoding.label(),
                    position,
                });
            }
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            Ok(text.into_owned())
        }
        TextEncoding::Latin1 | TextEncoding::Iso8859_1 => Ok(mem::decode_latin1(bytes).into_owned()),
    }
}

pub fn encode(text: &str, encoding: TextEncoding) -> Result<Vec<u8>> {
    match encoding {
        TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
        TextEncoding::Cp1252 => {
            let (bytes, _, had_errors) = WINDOWS_1252.encode(text);
            if had_errors {
                return Err(unencodable(text, encoding, |ch| {
                    let mut buf = [0u8; 4];
                    WINDOWS_1252.encode(ch.encode_utf8(&mut buf)).2
                }));
            }
            Ok(bytes.into_owned())
        }
        TextEncoding::Latin1 | TextEncoding::Iso8859_1 => {
            if !mem::is_str_latin1(text) {
                return Err(unencodable(text, encoding, |ch| u32::from(ch) > 0xFF));
            }
            Ok(mem::encode_latin1_lossy(text).into_owned())
        }
    }
}

fn unencodable(
    text: &str,
    encoding: TextEncoding,
    rejects: impl Fn(char) -> bool,
) -> PipelineError {
    let character = text
        .chars()
        .find(|&ch| rejects(ch))
        .unwrap_or(char::REPLACEMENT_CHARACTER);
    PipelineError::Encode {
        encoding: encoding.label(),
        character,
    }
}

use crate::error::{AppError, ReadFailure};
use log;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Number of leading decoded characters inspected for a null character.
pub const BINARY_SNIFF_CHARS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "windows-1252", alias = "cp1252")]
    Windows1252,
    #[serde(rename = "latin-1", alias = "latin1", alias = "iso-8859-1")]
    Latin1,
}

pub const DEFAULT_ENCODINGS: [TextEncoding; 3] = [
    TextEncoding::Utf8,
    TextEncoding::Windows1252,
    TextEncoding::Latin1,
];

impl TextEncoding {
    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Windows1252 => "windows-1252",
            TextEncoding::Latin1 => "latin-1",
        }
    }

    /// Decodes the whole byte stream, or returns `None` if any byte sequence
    /// is invalid for this encoding.
    fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            TextEncoding::Windows1252 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned()),
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TextEncoding {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "windows-1252" | "cp1252" => Ok(TextEncoding::Windows1252),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            other => Err(AppError::InvalidArgument(format!(
                "Unsupported encoding '{}'. Use utf-8, windows-1252 or latin-1.",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub encoding: TextEncoding,
}

enum DecodeStep {
    TryEncoding(usize),
    Decoded(Decoded),
    AllFailed,
}

/// Decodes `bytes` with the first encoding in `encodings` that accepts the
/// full stream, then rejects the result if it looks binary.
pub fn decode_text(bytes: &[u8], encodings: &[TextEncoding]) -> Result<Decoded, ReadFailure> {
    let mut step = DecodeStep::TryEncoding(0);
    loop {
        step = match step {
            DecodeStep::TryEncoding(i) => match encodings.get(i) {
                Some(&encoding) => match encoding.decode(bytes) {
                    Some(text) => DecodeStep::Decoded(Decoded { text, encoding }),
                    None => {
                        log::trace!("Decoding with {} failed, trying next encoding", encoding);
                        DecodeStep::TryEncoding(i + 1)
                    }
                },
                None => DecodeStep::AllFailed,
            },
            DecodeStep::Decoded(decoded) => {
                if looks_binary(&decoded.text) {
                    return Err(ReadFailure::BinaryContent {
                        encoding: decoded.encoding,
                    });
                }
                return Ok(decoded);
            }
            DecodeStep::AllFailed => {
                return Err(ReadFailure::Undecodable {
                    tried: encodings.to_vec(),
                });
            }
        };
    }
}

fn looks_binary(text: &str) -> bool {
    text.chars().take(BINARY_SNIFF_CHARS).any(|c| c == '\0')
}

pub fn read_text_file(path: &Path, encodings: &[TextEncoding]) -> Result<Decoded, ReadFailure> {
    let bytes = fs::read(path).map_err(ReadFailure::Io)?;
    decode_text(&bytes, encodings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn utf8_is_tried_first() {
        let decoded = decode_text("héllo wörld".as_bytes(), &DEFAULT_ENCODINGS).unwrap();
        assert_eq!(decoded.encoding, TextEncoding::Utf8);
        assert_eq!(decoded.text, "héllo wörld");
    }

    #[test]
    fn falls_back_to_single_byte_encoding() {
        // "café" in windows-1252; 0xE9 alone is invalid UTF-8.
        let bytes = b"caf\xe9 \x80";
        let decoded = decode_text(bytes, &DEFAULT_ENCODINGS).unwrap();
        assert_eq!(decoded.encoding, TextEncoding::Windows1252);
        assert_eq!(decoded.text, "café €");
    }

    #[test]
    fn latin1_accepts_every_byte() {
        let bytes: Vec<u8> = (1u8..=255).collect();
        let decoded = decode_text(&bytes, &[TextEncoding::Latin1]).unwrap();
        assert_eq!(decoded.text.chars().count(), 255);
        assert_eq!(decoded.text.chars().last(), Some('ÿ'));
    }

    #[test]
    fn all_candidates_failing_reports_every_encoding_tried() {
        let result = decode_text(b"\xff\xfe\xfd", &[TextEncoding::Utf8]);
        match result {
            Err(ReadFailure::Undecodable { tried }) => assert_eq!(tried, vec![TextEncoding::Utf8]),
            other => panic!("expected Undecodable, got {:?}", other),
        }
    }

    #[test]
    fn empty_encoding_list_fails() {
        assert!(matches!(
            decode_text(b"abc", &[]),
            Err(ReadFailure::Undecodable { .. })
        ));
    }

    #[test]
    fn null_character_in_leading_chunk_is_binary() {
        let result = decode_text(b"PK\x00\x03 valid ascii otherwise", &DEFAULT_ENCODINGS);
        assert!(matches!(
            result,
            Err(ReadFailure::BinaryContent {
                encoding: TextEncoding::Utf8
            })
        ));
    }

    #[test]
    fn null_character_past_leading_chunk_is_accepted() {
        let mut bytes = vec![b'a'; BINARY_SNIFF_CHARS];
        bytes.push(0);
        let decoded = decode_text(&bytes, &DEFAULT_ENCODINGS).unwrap();
        assert_eq!(decoded.text.len(), BINARY_SNIFF_CHARS + 1);
    }

    #[test]
    fn empty_file_decodes_to_empty_text() {
        let decoded = decode_text(b"", &DEFAULT_ENCODINGS).unwrap();
        assert_eq!(decoded.text, "");
        assert_eq!(decoded.encoding, TextEncoding::Utf8);
    }

    #[test]
    fn encoding_labels_parse() {
        assert_eq!("UTF8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert_eq!(
            "cp1252".parse::<TextEncoding>().unwrap(),
            TextEncoding::Windows1252
        );
        assert_eq!(
            " iso-8859-1 ".parse::<TextEncoding>().unwrap(),
            TextEncoding::Latin1
        );
        assert!("shift-jis".parse::<TextEncoding>().is_err());
    }

    #[test]
    fn read_text_file_maps_missing_file_to_io_failure() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone.txt");
        assert!(matches!(
            read_text_file(&missing, &DEFAULT_ENCODINGS),
            Err(ReadFailure::Io(_))
        ));

        let present = temp_dir.path().join("here.txt");
        fs::write(&present, "content").unwrap();
        assert_eq!(
            read_text_file(&present, &DEFAULT_ENCODINGS).unwrap().text,
            "content"
        );
    }
}

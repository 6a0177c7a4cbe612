//! Text encodings accepted for source and generated files
//!
//! Labels are resolved through `encoding_rs`, with the codec spellings build
//! scripts commonly pass (`cp932`, `utf_8`, `latin-1`, `utf-8-sig`) mapped
//! onto their WHATWG equivalents.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use encoding_rs::Encoding;

const BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EncodingError {
    #[error("unknown encoding: {0}")]
    Unknown(String),

    #[error("encoding '{0}' can only be decoded, not written")]
    DecodeOnly(String),

    #[error("'{encoding}' codec can't decode input")]
    Decode { encoding: TextEncoding },

    #[error("'{encoding}' codec can't encode the generated text")]
    Encode { encoding: TextEncoding },
}

/// A character encoding, optionally with a UTF-8 byte-order mark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding {
    encoding: &'static Encoding,
    bom: bool,
}

impl TextEncoding {
    /// UTF-8 without byte-order mark
    pub fn utf8() -> Self {
        Self {
            encoding: encoding_rs::UTF_8,
            bom: false,
        }
    }

    /// UTF-8 with byte-order mark on write; optional on read
    pub fn utf8_bom() -> Self {
        Self {
            encoding: encoding_rs::UTF_8,
            bom: true,
        }
    }

    /// Resolve a label such as `utf-8`, `shift_jis` or `cp932`.
    pub fn for_label(label: &str) -> Result<Self, EncodingError> {
        let trimmed = label.trim().to_ascii_lowercase();
        let dashed = trimmed.replace('_', "-");

        if matches!(dashed.as_str(), "utf-8-sig" | "utf8-sig") {
            return Ok(Self::utf8_bom());
        }

        let alias = match dashed.as_str() {
            "u8" | "utf" | "cp65001" => Some("utf-8"),
            "cp932" | "ms-kanji" | "mskanji" => Some("shift_jis"),
            "latin-1" | "l1" | "iso8859-1" => Some("iso-8859-1"),
            "cp936" => Some("gbk"),
            "cp949" => Some("euc-kr"),
            "cp950" => Some("big5"),
            _ => None,
        };
        let windows_code_page = dashed
            .strip_prefix("cp")
            .filter(|digits| digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit()))
            .map(|digits| format!("windows-{digits}"));

        let encoding = [Some(trimmed.as_str()), Some(dashed.as_str()), alias]
            .into_iter()
            .flatten()
            .chain(windows_code_page.as_deref())
            .find_map(|candidate| Encoding::for_label(candidate.as_bytes()))
            .ok_or_else(|| EncodingError::Unknown(label.to_string()))?;

        if encoding.output_encoding() != encoding {
            return Err(EncodingError::DecodeOnly(label.to_string()));
        }
        Ok(Self {
            encoding,
            bom: false,
        })
    }

    pub fn label(&self) -> &'static str {
        if self.bom {
            "UTF-8-SIG"
        } else {
            self.encoding.name()
        }
    }

    /// Decode file contents. Malformed input is an error, never replaced.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, EncodingError> {
        let bytes = match (self.bom, bytes.strip_prefix(BOM)) {
            (true, Some(stripped)) => stripped,
            _ => bytes,
        };
        self.encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(Cow::into_owned)
            .ok_or(EncodingError::Decode { encoding: *self })
    }

    /// Encode text for writing. Characters the encoding cannot represent are an error.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, EncodingError> {
        let (encoded, _, had_unmappable) = self.encoding.encode(text);
        if had_unmappable {
            return Err(EncodingError::Encode { encoding: *self });
        }

        let mut bytes = Vec::with_capacity(encoded.len() + BOM.len());
        if self.bom {
            bytes.extend_from_slice(BOM);
        }
        bytes.extend_from_slice(&encoded);
        Ok(bytes)
    }
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::utf8()
    }
}

impl FromStr for TextEncoding {
    type Err = EncodingError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Self::for_label(label)
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(label: &str) -> TextEncoding {
        label.parse().unwrap()
    }

    #[test]
    fn test_labels() {
        for label in ["UTF-8", "utf8", "utf_8", " cp65001 ", "u8"] {
            assert_eq!(parse(label), TextEncoding::utf8(), "label '{label}'");
        }
        assert_eq!(parse("UTF-8-SIG"), TextEncoding::utf8_bom());
        assert_eq!(parse("utf_8_sig"), TextEncoding::utf8_bom());

        for label in ["shift_jis", "cp932", "sjis", "windows-31j"] {
            assert_eq!(parse(label).label(), "Shift_JIS", "label '{label}'");
        }
        assert_eq!(parse("latin1").label(), "windows-1252");
        assert_eq!(parse("cp1252").label(), "windows-1252");
        assert_eq!(parse("euc_jp").label(), "EUC-JP");

        assert!(matches!(
            "klingon".parse::<TextEncoding>(),
            Err(EncodingError::Unknown(label)) if label == "klingon"
        ));
        assert!(matches!(
            "utf-16le".parse::<TextEncoding>(),
            Err(EncodingError::DecodeOnly(_))
        ));
    }

    #[test]
    fn test_bom_handling() {
        let with_bom = TextEncoding::utf8_bom().encode("int x;").unwrap();
        assert_eq!(&with_bom[..3], BOM);
        assert_eq!(TextEncoding::utf8_bom().decode(&with_bom).unwrap(), "int x;");
        assert_eq!(TextEncoding::utf8_bom().decode(b"plain").unwrap(), "plain");
    }

    #[test]
    fn test_shift_jis_round_trip() {
        let sjis = parse("cp932");
        let text = "const char* s = \"日本語\";";
        let bytes = sjis.encode(text).unwrap();
        // 日 is 0x93FA in Shift_JIS.
        assert!(bytes.windows(2).any(|pair| pair == [0x93, 0xFA]));
        assert!(std::str::from_utf8(&bytes).is_err());
        assert_eq!(sjis.decode(&bytes).unwrap(), text);
    }

    #[test]
    fn test_invalid_bytes() {
        let err = TextEncoding::utf8().decode(&[0x66, 0xFF]).unwrap_err();
        assert_eq!(err.to_string(), "'UTF-8' codec can't decode input");
    }

    #[test]
    fn test_unmappable_characters() {
        let err = parse("shift_jis").encode("emoji 😀").unwrap_err();
        assert!(matches!(err, EncodingError::Encode { .. }));
    }
}

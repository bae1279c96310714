use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::errors::*;

/// How raw name/value bytes are rendered as text at the external interfaces.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameEncoding {
    /// Printable ASCII only, every byte in `[0x20, 0x80)`.
    Ascii,
    /// Well-formed UTF-8 without control characters below `0x20`.
    Utf8,
    /// Hex string of arbitrary binary data.
    Hex,
}

pub const DEFAULT_NAME_ENCODING: NameEncoding = NameEncoding::Ascii;
pub const DEFAULT_VALUE_ENCODING: NameEncoding = NameEncoding::Ascii;

impl NameEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            NameEncoding::Ascii => "ascii",
            NameEncoding::Utf8 => "utf8",
            NameEncoding::Hex => "hex",
        }
    }

    pub fn names() -> Vec<&'static str> {
        vec!["ascii", "utf8", "hex"]
    }

    /// Whether `text` is an acceptable string for this encoding.
    pub fn is_valid(self, text: &str) -> bool {
        match self {
            NameEncoding::Ascii => text.bytes().all(|c| (0x20..0x80).contains(&c)),
            NameEncoding::Utf8 => text.chars().all(|c| c >= '\u{20}'),
            NameEncoding::Hex => text.is_empty() || is_hex(text),
        }
    }

    fn verify(self, text: &str) -> Result<()> {
        if self.is_valid(text) {
            Ok(())
        } else {
            bail!(ErrorKind::InvalidNameString(self, text.to_string()))
        }
    }
}

impl fmt::Display for NameEncoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NameEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ascii" => Ok(NameEncoding::Ascii),
            "utf8" => Ok(NameEncoding::Utf8),
            "hex" => Ok(NameEncoding::Hex),
            _ => bail!(ErrorKind::InvalidEncoding(s.to_string())),
        }
    }
}

fn is_hex(text: &str) -> bool {
    text.len() % 2 == 0 && text.bytes().all(|c| c.is_ascii_hexdigit())
}

/// Default encodings for the "name" and "value" fields, fixed at startup.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NameEncodings {
    pub name: NameEncoding,
    pub value: NameEncoding,
}

impl Default for NameEncodings {
    fn default() -> Self {
        NameEncodings {
            name: DEFAULT_NAME_ENCODING,
            value: DEFAULT_VALUE_ENCODING,
        }
    }
}

impl NameEncodings {
    /// Builds the encodings from the raw option strings. Invalid values are
    /// logged and replaced by the compiled-in defaults.
    pub fn from_options(name: Option<&str>, value: Option<&str>) -> Self {
        NameEncodings {
            name: encoding_from_option("name-encoding", name, DEFAULT_NAME_ENCODING),
            value: encoding_from_option("value-encoding", value, DEFAULT_VALUE_ENCODING),
        }
    }
}

fn encoding_from_option(option: &str, value: Option<&str>, default: NameEncoding) -> NameEncoding {
    match value.map(NameEncoding::from_str) {
        None => default,
        Some(Ok(enc)) => enc,
        Some(Err(e)) => {
            warn!(
                "invalid value for --{}: {}, falling back to default {}",
                option, e, default
            );
            default
        }
    }
}

/// Encodes raw name/value bytes as text. Fails if the bytes cannot be
/// represented in `enc`.
pub fn encode_name(data: &[u8], enc: NameEncoding) -> Result<String> {
    let text = match enc {
        NameEncoding::Ascii | NameEncoding::Utf8 => match std::str::from_utf8(data) {
            Ok(text) => text.to_string(),
            Err(_) => bail!(ErrorKind::InvalidNameString(
                enc,
                String::from_utf8_lossy(data).into_owned()
            )),
        },
        NameEncoding::Hex => hex::encode(data),
    };

    enc.verify(&text)?;
    Ok(text)
}

/// Decodes text into raw name/value bytes, after checking it against the
/// validity rule of `enc`.
pub fn decode_name(text: &str, enc: NameEncoding) -> Result<Vec<u8>> {
    enc.verify(text)?;

    match enc {
        NameEncoding::Ascii | NameEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
        NameEncoding::Hex => {
            hex::decode(text).chain_err(|| ErrorKind::InvalidNameString(enc, text.to_string()))
        }
    }
}

/// Printable form for logs and error messages. Quoted ASCII where possible,
/// `0x`-prefixed hex otherwise. Never fails and never returns an empty string.
pub fn encode_name_for_message(data: &[u8]) -> String {
    match encode_name(data, NameEncoding::Ascii) {
        Ok(text) => format!("'{}'", text),
        Err(_) => format!("0x{}", hex::encode(data)),
    }
}

/// Adds `key` (or `key_error` if `data` is not representable) together with
/// `key_encoding` to a JSON object.
pub fn add_encoded_name(obj: &mut Map<String, Value>, key: &str, data: &[u8], enc: NameEncoding) {
    match encode_name(data, enc) {
        Ok(text) => {
            obj.insert(key.to_string(), Value::String(text));
        }
        Err(_) => {
            obj.insert(
                format!("{}_error", key),
                Value::String(format!("invalid data for {}", enc)),
            );
        }
    }
    obj.insert(format!("{}_encoding", key), Value::String(enc.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [NameEncoding; 3] = [NameEncoding::Ascii, NameEncoding::Utf8, NameEncoding::Hex];

    fn is_invalid_name_string<T>(res: Result<T>) -> bool {
        match res {
            Err(e) => matches!(e.kind(), ErrorKind::InvalidNameString(..)),
            Ok(_) => false,
        }
    }

    #[test]
    fn test_encoding_names() {
        for enc in ALL.iter() {
            assert_eq!(enc.as_str().parse::<NameEncoding>().unwrap(), *enc);
        }
        let err = "base64".parse::<NameEncoding>().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidEncoding(_)));
        assert!("ASCII".parse::<NameEncoding>().is_err());
        assert_eq!(
            serde_json::to_string(&NameEncoding::Utf8).unwrap(),
            "\"utf8\""
        );
    }

    #[test]
    fn test_ascii_boundaries() {
        assert!(is_invalid_name_string(encode_name(&[0x19], NameEncoding::Ascii)));
        assert!(is_invalid_name_string(encode_name(&[0x80], NameEncoding::Ascii)));
        assert_eq!(encode_name(&[0x20], NameEncoding::Ascii).unwrap(), " ");
        assert_eq!(encode_name(&[0x7f], NameEncoding::Ascii).unwrap(), "\u{7f}");

        assert!(is_invalid_name_string(decode_name("\u{19}", NameEncoding::Ascii)));
        assert!(is_invalid_name_string(decode_name("\u{80}", NameEncoding::Ascii)));
        assert!(is_invalid_name_string(decode_name("äöü", NameEncoding::Ascii)));
        assert_eq!(decode_name("a b", NameEncoding::Ascii).unwrap(), b"a b");
    }

    #[test]
    fn test_utf8() {
        let text = "d/äöü-\u{1f600}";
        assert_eq!(encode_name(text.as_bytes(), NameEncoding::Utf8).unwrap(), text);
        assert_eq!(decode_name(text, NameEncoding::Utf8).unwrap(), text.as_bytes());

        assert!(is_invalid_name_string(encode_name(b"\xff\xfe", NameEncoding::Utf8)));
        assert!(is_invalid_name_string(encode_name(b"a\nb", NameEncoding::Utf8)));
        assert!(is_invalid_name_string(decode_name("a\tb", NameEncoding::Utf8)));
        assert!(is_invalid_name_string(encode_name(&[0xc3], NameEncoding::Utf8)));
    }

    #[test]
    fn test_hex() {
        assert_eq!(decode_name("", NameEncoding::Hex).unwrap(), Vec::<u8>::new());
        assert_eq!(encode_name(&[], NameEncoding::Hex).unwrap(), "");
        assert_eq!(decode_name("00fF", NameEncoding::Hex).unwrap(), vec![0x00, 0xff]);
        assert_eq!(encode_name(&[0x00, 0xff], NameEncoding::Hex).unwrap(), "00ff");

        assert!(is_invalid_name_string(decode_name("abc", NameEncoding::Hex)));
        assert!(is_invalid_name_string(decode_name("zz", NameEncoding::Hex)));
        assert!(is_invalid_name_string(decode_name("0x00", NameEncoding::Hex)));
    }

    #[test]
    fn test_roundtrip_when_representable() {
        let samples: Vec<Vec<u8>> = vec![
            vec![],
            b"d/example".to_vec(),
            "x/\u{e9}t\u{e9}".as_bytes().to_vec(),
            vec![0x00, 0x19, 0x80, 0xff],
            (0u8..=255).collect(),
        ];
        for enc in ALL.iter() {
            for data in samples.iter() {
                if let Ok(text) = encode_name(data, *enc) {
                    assert_eq!(&decode_name(&text, *enc).unwrap(), data, "{}", enc);
                }
            }
        }
        // hex always succeeds
        for data in samples.iter() {
            assert!(encode_name(data, NameEncoding::Hex).is_ok());
        }
    }

    #[test]
    fn test_concrete_name() {
        assert_eq!(
            encode_name(b"d/example", NameEncoding::Ascii).unwrap(),
            "d/example"
        );
    }

    #[test]
    fn test_encode_for_message() {
        assert_eq!(encode_name_for_message(b"d/example"), "'d/example'");
        assert_eq!(encode_name_for_message(&[0xff, 0x00]), "0xff00");
        assert_eq!(encode_name_for_message(b""), "''");
        assert_eq!(encode_name_for_message(b"\n"), "0x0a");
        for b in 0u8..=255 {
            assert!(!encode_name_for_message(&[b, b.wrapping_add(1)]).is_empty());
        }
    }

    #[test]
    fn test_add_encoded_name() {
        let mut obj = Map::new();
        add_encoded_name(&mut obj, "name", b"d/example", NameEncoding::Ascii);
        assert_eq!(obj["name"], json!("d/example"));
        assert_eq!(obj["name_encoding"], json!("ascii"));
        assert!(!obj.contains_key("name_error"));

        let mut obj = Map::new();
        add_encoded_name(&mut obj, "value", &[0xff], NameEncoding::Utf8);
        assert!(!obj.contains_key("value"));
        assert_eq!(obj["value_error"], json!("invalid data for utf8"));
        assert_eq!(obj["value_encoding"], json!("utf8"));
    }

    #[test]
    fn test_encodings_from_options() {
        assert_eq!(NameEncodings::from_options(None, None), NameEncodings::default());

        let encs = NameEncodings::from_options(Some("hex"), Some("utf8"));
        assert_eq!(encs.name, NameEncoding::Hex);
        assert_eq!(encs.value, NameEncoding::Utf8);

        let encs = NameEncodings::from_options(Some("latin1"), Some("hex"));
        assert_eq!(encs.name, NameEncoding::Ascii);
        assert_eq!(encs.value, NameEncoding::Hex);
    }

    #[test]
    fn test_error_message() {
        let err = decode_name("zz", NameEncoding::Hex).unwrap_err();
        assert_eq!(err.to_string(), "invalid string for encoding hex: zz");
    }
}

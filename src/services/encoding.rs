use std::borrow::Cow;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug)]
pub struct DecodedText<'a> {
    pub text: Cow<'a, str>,
    /// Lowercase encoding name, `utf-8-sig` when a BOM was stripped.
    pub encoding: String,
    pub had_errors: bool,
}

/// Chunks written by the crawler are UTF-8, but files re-saved on Windows
/// sometimes come back as GBK/Big5 or with a BOM.
pub fn decode_chunk(bytes: &[u8]) -> DecodedText<'_> {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        if let Ok(text) = std::str::from_utf8(rest) {
            return DecodedText {
                text: Cow::Borrowed(text),
                encoding: "utf-8-sig".into(),
                had_errors: false,
            };
        }
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return DecodedText {
            text: Cow::Borrowed(text),
            encoding: "utf-8".into(),
            had_errors: false,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding: &'static Encoding = detector.guess(None, true);

    let (text, _, had_errors) = encoding.decode(bytes);

    DecodedText {
        text,
        encoding: encoding.name().to_lowercase(),
        had_errors,
    }
}

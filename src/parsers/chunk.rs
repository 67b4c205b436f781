use serde_json::Value;

use crate::model::record::RawRecord;
use crate::services::encoding;

#[derive(Debug)]
pub struct ParsedChunk {
    pub records: Vec<RawRecord>,
    /// One line per element that failed to deserialize.
    pub rejected: Vec<String>,
    pub encoding: String,
}

/// Parses a chunk file body. Only a wrong top-level shape or unparsable JSON
/// fails the whole chunk; bad elements are reported and skipped.
pub fn parse(bytes: &[u8]) -> Result<ParsedChunk, String> {
    let decoded = encoding::decode_chunk(bytes);

    let value: Value = serde_json::from_str(&decoded.text).map_err(|e| {
        if decoded.had_errors {
            format!("invalid json (decoded as {} with errors): {e}", decoded.encoding)
        } else {
            format!("invalid json: {e}")
        }
    })?;

    let items = match value {
        Value::Array(items) => items,
        other => return Err(format!("expected an array of records, found {}", kind(&other))),
    };

    let mut records = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();

    for (i, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawRecord>(item) {
            Ok(r) => records.push(r),
            Err(e) => rejected.push(format!("record {i}: {e}")),
        }
    }

    Ok(ParsedChunk {
        records,
        rejected,
        encoding: decoded.encoding,
    })
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_elements_are_skipped() {
        let body = br#"[
            {"publishedfileid": "1", "title": "A"},
            {"title": "no id"},
            42,
            {"publishedfileid": 2, "title": "B"}
        ]"#;

        let chunk = parse(body).unwrap();
        let ids: Vec<_> = chunk.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(chunk.rejected.len(), 2);
        assert!(chunk.rejected[0].starts_with("record 1:"));
    }

    #[test]
    fn wrong_shape_fails_chunk() {
        let err = parse(br#"{"response": {}}"#).unwrap_err();
        assert!(err.contains("an object"), "{err}");

        assert!(parse(b"[{\"publishedfileid\": ").is_err());
    }
}

use serde_json::Value;
use thiserror::Error;

use exportview_types::IngestEvent;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("line is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON that is not one of the known records.
    #[error("unexpected record shape: {0}")]
    Shape(String),
}

/// Decode one response line into a record.
///
/// Returns `Ok(None)` for blank lines. Both error kinds are recoverable: the
/// caller logs and moves on to the next line.
pub fn decode_line(line: &str) -> Result<Option<IngestEvent>, DecodeError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(line)?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::Shape("missing \"type\" field".into()))?
        .to_owned();

    let event: IngestEvent = serde_json::from_value(value)
        .map_err(|e| DecodeError::Shape(format!("{} record: {}", kind, e)))?;

    if let IngestEvent::Messages { channel, .. } = &event {
        if channel.is_empty() {
            return Err(DecodeError::Shape("messages record with empty channel".into()));
        }
    }

    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_not_records() {
        assert!(decode_line("").unwrap().is_none());
        assert!(decode_line("  \r").unwrap().is_none());
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let event = decode_line("  {\"type\":\"channels\",\"data\":[]}\r").unwrap();
        assert_eq!(event, Some(IngestEvent::Channels { data: vec![] }));
    }

    #[test]
    fn broken_json_is_a_json_error() {
        assert!(matches!(decode_line("{\"type\":"), Err(DecodeError::Json(_))));
    }

    #[test]
    fn float_numbers_do_not_drop_the_batch() {
        let line = concat!(
            r#"{"type":"messages","channel":"general","data":["#,
            r#"{"ts":"1","text":"plain"},"#,
            r#"{"ts":"2","text":"with file","attachments":[{"id":"f","display":"f.bin","size":1024.0}],"#,
            r#""reactions":[{"value":"eyes","count":2.0}]}]}"#,
        );
        match decode_line(line).unwrap() {
            Some(IngestEvent::Messages { data, .. }) => {
                assert_eq!(data.len(), 2);
                assert_eq!(data[1].attachments[0].size, Some(1024));
                assert_eq!(data[1].reactions[0].count, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn wrong_shapes_are_shape_errors() {
        for line in [
            "[1,2,3]",
            "{\"data\":[]}",
            "{\"type\":\"progress\"}",
            "{\"type\":\"messages\",\"channel\":\"general\",\"data\":{}}",
            "{\"type\":\"messages\",\"channel\":\"\",\"data\":[]}",
        ] {
            assert!(
                matches!(decode_line(line), Err(DecodeError::Shape(_))),
                "expected shape error for {}",
                line
            );
        }
    }
}

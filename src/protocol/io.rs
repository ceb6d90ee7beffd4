//! Protocol I/O for JSONL message parsing and serialization
//!
//! This module provides:
//! - `parse_message_graceful` for classifying JSON messages
//! - `serialize_message` / `write_message` for JSONL output
//! - `JsonlReader` for streaming JSONL reads

use std::io::{BufRead, BufReader, Read, Write};
use tracing::{debug, warn};

use super::message::Message;

/// Maximum length for raw JSON in logs (candidate lists can be huge)
const MAX_RAW_LOG_PREVIEW: usize = 200;

/// Get a truncated preview of raw JSON for logging
pub fn log_preview(raw: &str) -> (&str, usize) {
    let len = raw.len();
    if len <= MAX_RAW_LOG_PREVIEW {
        return (raw, len);
    }
    let mut end = MAX_RAW_LOG_PREVIEW;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    (&raw[..end], len)
}

/// Result type for graceful message parsing
#[derive(Debug)]
pub enum ParseResult {
    /// Successfully parsed a known message type
    Ok(Message),
    /// Message has no "type" field
    MissingType {
        /// Truncated raw JSON for debugging
        raw: String,
    },
    /// Unknown message type value - valid JSON with a "type" field we don't recognize
    UnknownType {
        message_type: String,
        raw: String,
    },
    /// Known message type but invalid payload (wrong field types, missing required fields)
    InvalidPayload {
        message_type: String,
        /// Serde error message describing the problem
        error: String,
        raw: String,
    },
    /// JSON parsing failed entirely (syntax error)
    ParseError(serde_json::Error),
}

/// Parse a message with graceful handling of unknown types
///
/// # Classification Logic
/// - Missing "type" field → `MissingType`
/// - Unknown type value → `UnknownType`
/// - Known type with invalid payload → `InvalidPayload`
/// - Invalid JSON syntax → `ParseError`
///
/// Parses to `serde_json::Value` once, then converts, so unknown types are
/// not parsed twice.
pub fn parse_message_graceful(line: &str) -> ParseResult {
    let (preview, _raw_len) = log_preview(line);

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return ParseResult::ParseError(e),
    };

    let msg_type: String = match value.get("type").and_then(|t| t.as_str()) {
        Some(t) => t.to_string(),
        None => {
            return ParseResult::MissingType {
                raw: preview.to_string(),
            };
        }
    };

    match serde_json::from_value::<Message>(value) {
        Ok(msg) => ParseResult::Ok(msg),
        Err(e) => {
            let error_str = e.to_string();
            if error_str.contains("unknown variant") {
                ParseResult::UnknownType {
                    message_type: msg_type,
                    raw: preview.to_string(),
                }
            } else {
                ParseResult::InvalidPayload {
                    message_type: msg_type,
                    error: error_str,
                    raw: preview.to_string(),
                }
            }
        }
    }
}

/// Serialize a message to JSON (without newline)
pub fn serialize_message(msg: &Message) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

/// Write one message as a JSONL line and flush.
pub fn write_message<W: Write>(writer: &mut W, msg: &Message) -> crate::error::Result<()> {
    let mut line = serialize_message(msg)?;
    line.push('\n');
    writer.write_all(line.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// JSONL reader for streaming message reads
///
/// Uses a reusable line buffer to avoid allocating a new String per line read.
pub struct JsonlReader<R: Read> {
    reader: BufReader<R>,
    line_buffer: String,
}

impl<R: Read> JsonlReader<R> {
    pub fn new(reader: R) -> Self {
        JsonlReader {
            reader: BufReader::new(reader),
            line_buffer: String::with_capacity(1024),
        }
    }

    /// Read and classify the next non-empty line.
    ///
    /// # Returns
    /// * `Ok(Some(ParseResult))` - a line was read, parsed or not
    /// * `Ok(None)` - End of stream
    /// * `Err(e)` - IO error
    pub fn next_parsed(&mut self) -> std::io::Result<Option<ParseResult>> {
        loop {
            self.line_buffer.clear();
            if self.reader.read_line(&mut self.line_buffer)? == 0 {
                debug!("Reached end of JSONL stream");
                return Ok(None);
            }
            let trimmed = self.line_buffer.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(parse_message_graceful(trimmed)));
        }
    }

    /// Read the next message with graceful unknown type handling
    ///
    /// Unknown, untyped, invalid and malformed lines are logged and skipped.
    pub fn next_message_graceful(&mut self) -> std::io::Result<Option<Message>> {
        while let Some(result) = self.next_parsed()? {
            if let Some(msg) = log_unusable(result) {
                return Ok(Some(msg));
            }
        }
        Ok(None)
    }
}

/// Log a parse result that carries no message; pass a good message through.
pub fn log_unusable(result: ParseResult) -> Option<Message> {
    match result {
        ParseResult::Ok(msg) => {
            debug!(message_type = msg.kind(), "Successfully parsed message");
            Some(msg)
        }
        ParseResult::MissingType { raw } => {
            warn!(raw_preview = %raw, "Skipping message with missing 'type' field");
            None
        }
        ParseResult::UnknownType { message_type, raw } => {
            warn!(
                message_type = %message_type,
                raw_preview = %raw,
                "Skipping unknown message type"
            );
            None
        }
        ParseResult::InvalidPayload {
            message_type,
            error,
            raw,
        } => {
            warn!(
                message_type = %message_type,
                error = %error,
                raw_preview = %raw,
                "Skipping message with invalid payload"
            );
            None
        }
        ParseResult::ParseError(e) => {
            warn!(error = %e, "Skipping malformed JSON message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_log_preview_truncation() {
        let short = "hello";
        let (preview, len) = log_preview(short);
        assert_eq!(preview, "hello");
        assert_eq!(len, 5);

        let long = "a".repeat(500);
        let (preview, len) = log_preview(&long);
        assert_eq!(preview.len(), 200);
        assert_eq!(len, 500);
    }

    #[test]
    fn test_log_preview_respects_char_boundaries() {
        let long = "é".repeat(150); // 300 bytes, 2 per char
        let (preview, _) = log_preview(&long);
        assert_eq!(preview.len(), 200);
        let odd = format!("a{}", "é".repeat(150));
        let (preview, _) = log_preview(&odd);
        assert_eq!(preview.len(), 199);
    }

    #[test]
    fn test_parse_message_graceful_known_type() {
        let json = r#"{"type":"show","items":["a"]}"#;
        match parse_message_graceful(json) {
            ParseResult::Ok(Message::Show { items, .. }) => assert_eq!(items, vec!["a"]),
            other => panic!("Expected Show, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_message_graceful_unknown_type() {
        let json = r#"{"type":"futureFeature","data":"test"}"#;
        match parse_message_graceful(json) {
            ParseResult::UnknownType { message_type, raw } => {
                assert_eq!(message_type, "futureFeature");
                assert_eq!(raw, json);
            }
            other => panic!("Expected UnknownType, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_message_graceful_invalid_json() {
        assert!(matches!(
            parse_message_graceful("not valid json at all"),
            ParseResult::ParseError(_)
        ));
    }

    #[test]
    fn test_parse_message_graceful_missing_type_field() {
        match parse_message_graceful(r#"{"items":["a"]}"#) {
            ParseResult::MissingType { raw } => assert!(raw.contains("items")),
            other => panic!("Expected MissingType, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_message_graceful_invalid_payload() {
        match parse_message_graceful(r#"{"type":"show","prompt":">"}"#) {
            ParseResult::InvalidPayload {
                message_type,
                error,
                ..
            } => {
                assert_eq!(message_type, "show");
                assert!(error.contains("items"));
            }
            other => panic!("Expected InvalidPayload, got {:?}", other),
        }
    }

    #[test]
    fn test_write_message_appends_newline() {
        let mut out = Vec::new();
        write_message(&mut out, &Message::cancelled(None)).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"type\":\"cancelled\"}\n");
    }

    #[test]
    fn test_jsonl_reader_skips_empty_lines() {
        let jsonl = "\n{\"type\":\"cancelled\"}\n\n{\"type\":\"itemSelected\",\"items\":[\"x\"]}\n";
        let mut reader = JsonlReader::new(Cursor::new(jsonl));

        assert_eq!(
            reader.next_message_graceful().unwrap(),
            Some(Message::cancelled(None))
        );
        assert_eq!(
            reader.next_message_graceful().unwrap(),
            Some(Message::ItemSelected {
                items: vec!["x".to_string()],
                request_id: None,
            })
        );
        assert!(reader.next_message_graceful().unwrap().is_none());
    }

    #[test]
    fn test_jsonl_reader_graceful_skips_unusable() {
        let jsonl = r#"{"type":"unknownType"}
{"type":"cancelled"}
{"type":"show","items":"oops"}
garbage
{"type":"error","message":"bad"}
"#;
        let mut reader = JsonlReader::new(Cursor::new(jsonl));

        assert_eq!(
            reader.next_message_graceful().unwrap(),
            Some(Message::cancelled(None))
        );
        assert_eq!(
            reader.next_message_graceful().unwrap(),
            Some(Message::error("bad"))
        );
        assert!(reader.next_message_graceful().unwrap().is_none());
    }
}

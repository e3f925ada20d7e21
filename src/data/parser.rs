// Streaming parser for bulk record input: one top-level JSON array of objects.
//
// The parser reads the stream one character at a time through a buffered
// reader and hands every complete object to the caller before reading on.
// It never holds more than the object currently being assembled.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

use crate::data::record::Record;
use crate::error::ApiError;
use crate::processing::traits::{RecordCallback, RecordSource};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("bad input: {0}")]
    BadInput(String),

    /// The stream ended outside of any object. Not malformed at this level;
    /// callers decide what an unterminated array means to them.
    #[error("end of stream")]
    EndOfStream,

    #[error("read error: {0}")]
    Io(#[from] std::io::Error),

    /// The record callback refused a record; parsing stopped there.
    #[error("record rejected: {0}")]
    Callback(ApiError),
}

/// What the parser found after a `[` or `,`.
enum Element {
    Object(String),
    ArrayEnd,
}

/// Single-pass, forward-only parser. Consumed by [`RecordParser::parse`].
pub struct RecordParser<R> {
    reader: BufReader<R>,
    in_array: bool,
}

impl<R> RecordParser<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            in_array: false,
        }
    }

    /// Deliver every object of the array to `on_record`, in array order.
    /// Returns once the closing `]` is read; trailing content is not inspected.
    pub async fn parse<F>(mut self, mut on_record: F) -> Result<(), ParseError>
    where
        F: FnMut(Record) -> Result<(), ApiError> + Send,
    {
        let mut delivered = 0usize;

        loop {
            let c = match self.next_char().await? {
                Some(c) => c,
                None => return Err(ParseError::EndOfStream),
            };

            match c {
                '[' | ',' => {
                    if c == '[' {
                        if self.in_array {
                            return Err(ParseError::BadInput("unexpected '[' inside array".into()));
                        }
                        self.in_array = true;
                    } else if !self.in_array {
                        return Err(ParseError::BadInput("unexpected ',' outside array".into()));
                    }

                    match self.read_element().await? {
                        Element::Object(text) => {
                            if serde_json::from_str::<serde::de::IgnoredAny>(&text).is_err() {
                                return Err(ParseError::BadInput(format!(
                                    "element {} is not valid JSON",
                                    delivered
                                )));
                            }
                            on_record(Record::new(text)).map_err(ParseError::Callback)?;
                            delivered += 1;
                        }
                        Element::ArrayEnd => {
                            tracing::debug!("Record stream parsed: {} records", delivered);
                            return Ok(());
                        }
                    }
                }
                ']' => {
                    if !self.in_array {
                        return Err(ParseError::BadInput("unexpected ']' outside array".into()));
                    }
                    tracing::debug!("Record stream parsed: {} records", delivered);
                    return Ok(());
                }
                c if is_blank(c) => {}
                other => {
                    return Err(ParseError::BadInput(format!("unexpected character '{}'", other)));
                }
            }
        }
    }

    /// Read one array element: everything from the first `{` until the
    /// matching `}`. Braces inside string literals are not counted.
    async fn read_element(&mut self) -> Result<Element, ParseError> {
        let mut text = String::new();
        let mut depth = 0usize;
        let mut seen_open = false;
        let mut in_string = false;
        let mut escaped = false;

        loop {
            let c = match self.next_char().await? {
                Some(c) => c,
                None if depth > 0 => {
                    return Err(ParseError::BadInput("truncated object".into()));
                }
                None => return Err(ParseError::EndOfStream),
            };

            if !seen_open {
                match c {
                    '{' => {}
                    ']' => return Ok(Element::ArrayEnd),
                    c if is_blank(c) => continue,
                    other => {
                        return Err(ParseError::BadInput(format!(
                            "expected an object, found '{}'",
                            other
                        )));
                    }
                }
            }

            text.push(c);

            if in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    in_string = false;
                }
                continue;
            }

            match c {
                '"' => in_string = true,
                '{' => {
                    depth += 1;
                    seen_open = true;
                }
                '}' => depth -= 1,
                _ => {}
            }

            if depth == 0 {
                break;
            }
        }

        Ok(Element::Object(text.trim().to_string()))
    }

    async fn next_char(&mut self) -> Result<Option<char>, ParseError> {
        let first = match self.reader.read_u8().await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(ParseError::Io(e)),
        };

        let width = utf8_width(first)
            .ok_or_else(|| ParseError::BadInput("invalid UTF-8 in record stream".into()))?;

        let mut buf = [first, 0, 0, 0];
        if width > 1 {
            self.reader
                .read_exact(&mut buf[1..width])
                .await
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::UnexpectedEof => {
                        ParseError::BadInput("truncated UTF-8 sequence".into())
                    }
                    _ => ParseError::Io(e),
                })?;
        }

        std::str::from_utf8(&buf[..width])
            .map(|s| s.chars().next())
            .map_err(|_| ParseError::BadInput("invalid UTF-8 in record stream".into()))
    }
}

fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

fn is_blank(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

#[async_trait]
impl<R> RecordSource for RecordParser<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    fn name(&self) -> &'static str {
        "RecordParser"
    }

    async fn provide(self: Box<Self>, on_record: &mut RecordCallback<'_>) -> Result<(), ApiError> {
        self.parse(|record| on_record(record))
            .await
            .map_err(ApiError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    async fn collect(input: &'static str) -> (Vec<Record>, Result<(), ParseError>) {
        let mut records = Vec::new();
        let result = RecordParser::new(input.as_bytes())
            .parse(|record| {
                records.push(record);
                Ok(())
            })
            .await;
        (records, result)
    }

    #[tokio::test]
    async fn test_delivers_objects_in_order() {
        let input = r#"
            [
                {"id": "loki", "password": "loki-pass", "data": "lorem ipsum"},
                {"id": "hulk", "password": "hulk-pass", "data": "lorem ipsum"},
                {"id": "thor", "data": "mjolnir"}
            ]
        "#;
        let (records, result) = collect(input).await;
        assert!(result.is_ok());

        let ids: Vec<String> = records.iter().map(Record::id).collect();
        assert_eq!(ids, vec!["loki", "hulk", "thor"]);

        for record in &records {
            assert!(Record::parse(record.as_str()).is_ok());
        }
    }

    #[tokio::test]
    async fn test_empty_array() {
        let (records, result) = collect("[ ]").await;
        assert!(result.is_ok());
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_truncated_object_is_bad_input() {
        let (_, result) = collect(r#"[{"id":"x""#).await;
        assert!(matches!(result, Err(ParseError::BadInput(_))));
    }

    #[tokio::test]
    async fn test_stray_close_is_bad_input() {
        let (_, result) = collect("]").await;
        assert!(matches!(result, Err(ParseError::BadInput(_))));
    }

    #[tokio::test]
    async fn test_nested_array_start_is_bad_input() {
        let (records, result) = collect(r#"[{"id":"a"}, [{"id":"b"}]]"#).await;
        assert_eq!(records.len(), 1);
        assert!(matches!(result, Err(ParseError::BadInput(_))));
    }

    #[tokio::test]
    async fn test_invalid_object_is_bad_input() {
        let input = r#"
            [
                {"id": "loki",  "data": "lorem ipsum"},
                {"id": "hulk", "data": lorem ipsum"}
            ]
        "#;
        let (records, result) = collect(input).await;
        assert_eq!(records.len(), 1);
        assert!(matches!(result, Err(ParseError::BadInput(_))));
    }

    #[tokio::test]
    async fn test_stream_ending_before_any_object_is_end_of_stream() {
        let (_, result) = collect("   ").await;
        assert!(matches!(result, Err(ParseError::EndOfStream)));

        let (records, result) = collect(r#"[{"id":"a"}"#).await;
        assert_eq!(records.len(), 1);
        assert!(matches!(result, Err(ParseError::EndOfStream)));
    }

    #[tokio::test]
    async fn test_braces_inside_strings_do_not_count() {
        let (records, result) = collect(r#"[{"id":"a","data":"} { \" }"}]"#).await;
        assert!(result.is_ok());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data().as_deref(), Some("} { \" }"));
    }

    #[tokio::test]
    async fn test_nested_objects_and_multibyte_text() {
        let (records, result) = collect(r#"[{"id":"é","meta":{"k":{"v":1}},"data":"日本"}]"#).await;
        assert!(result.is_ok());
        assert_eq!(records[0].id(), "é");
        assert_eq!(records[0].data().as_deref(), Some("日本"));
    }

    #[tokio::test]
    async fn test_callback_error_stops_parsing() {
        let mut calls = 0;
        let result = RecordParser::new(r#"[{"id":"a"},{"id":"b"},{"id":"c"}]"#.as_bytes())
            .parse(|_| {
                calls += 1;
                Err(ApiError::internal("sink closed"))
            })
            .await;

        assert_eq!(calls, 1);
        match result {
            Err(ParseError::Callback(err)) => assert_eq!(err.kind(), ErrorKind::Internal),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

//! `JsonDecoder`: streaming JSON records.
//!
//! Two layouts are accepted, chosen by the first non-whitespace byte after an
//! optional UTF-8 BOM:
//!
//! ```text
//!   [ {..}, {..}, 3, "x" ]     one top-level array, one record per element
//!   {..}\n{..}\n{..}           whitespace-separated values (NDJSON)
//! ```
//!
//! The scanner only tracks nesting depth and string state so it can find
//! element boundaries; each element is then parsed by `serde_json` on its
//! own. Memory is bounded by the largest single element, never the document.

use std::collections::VecDeque;

use extractkit_core::{DecodeError, Record};
use serde_json::Value;

use crate::decoder::{RecordDecoder, UTF8_BOM};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Detect,
    Array,
    Values,
    /// The top-level array has been closed; only whitespace may follow.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    FirstElement,
    Element,
    CommaOrEnd,
}

/// Incremental JSON decoder.
pub struct JsonDecoder {
    layout: Layout,
    expect: Expect,
    /// Bytes of the element currently being scanned.
    buf: Vec<u8>,
    value_start: u64,
    offset: u64,
    in_value: bool,
    /// Current element is a bare number / literal.
    scalar: bool,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl JsonDecoder {
    pub fn new() -> Self {
        Self {
            layout: Layout::Detect,
            expect: Expect::FirstElement,
            buf: Vec::new(),
            value_start: 0,
            offset: 0,
            in_value: false,
            scalar: false,
            depth: 0,
            in_string: false,
            escaped: false,
        }
    }

    /// Handle a byte between elements.
    fn structural(&mut self, b: u8, pos: u64) -> Result<(), DecodeError> {
        if b.is_ascii_whitespace() {
            return Ok(());
        }
        match self.layout {
            Layout::Detect => {
                // A UTF-8 BOM may precede the first value.
                if pos < UTF8_BOM.len() as u64 && b == UTF8_BOM[pos as usize] {
                    return Ok(());
                }
                if b == b'[' {
                    self.layout = Layout::Array;
                    self.expect = Expect::FirstElement;
                    Ok(())
                } else {
                    self.layout = Layout::Values;
                    self.begin(b, pos)
                }
            }
            Layout::Array => match (self.expect, b) {
                (Expect::FirstElement | Expect::CommaOrEnd, b']') => {
                    self.layout = Layout::Closed;
                    Ok(())
                }
                (Expect::CommaOrEnd, b',') => {
                    self.expect = Expect::Element;
                    Ok(())
                }
                (Expect::CommaOrEnd, _) => {
                    Err(invalid(pos, "expected ',' or ']' after array element"))
                }
                _ => self.begin(b, pos),
            },
            Layout::Values => self.begin(b, pos),
            Layout::Closed => Err(invalid(pos, "trailing data after top-level array")),
        }
    }

    fn begin(&mut self, b: u8, pos: u64) -> Result<(), DecodeError> {
        if matches!(b, b',' | b']' | b'}' | b':') {
            return Err(invalid(pos, &format!("unexpected '{}'", b as char)));
        }
        self.buf.clear();
        self.buf.push(b);
        self.value_start = pos;
        self.in_value = true;
        self.in_string = b == b'"';
        self.escaped = false;
        self.depth = usize::from(b == b'{' || b == b'[');
        self.scalar = !self.in_string && self.depth == 0;
        Ok(())
    }

    /// Track nesting inside a string/object/array element. Returns `true`
    /// once `b` closes the element.
    fn scan(&mut self, b: u8) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if b == b'\\' {
                self.escaped = true;
            } else if b == b'"' {
                self.in_string = false;
                return self.depth == 0;
            }
            return false;
        }
        match b {
            b'"' => self.in_string = true,
            b'{' | b'[' => self.depth += 1,
            b'}' | b']' => {
                self.depth = self.depth.saturating_sub(1);
                return self.depth == 0;
            }
            _ => {}
        }
        false
    }

    fn complete(&mut self, out: &mut VecDeque<Record>) -> Result<(), DecodeError> {
        self.in_value = false;
        let value: Value =
            serde_json::from_slice(&self.buf).map_err(|e| DecodeError::InvalidJson {
                offset: self.value_start,
                reason: e.to_string(),
            })?;
        self.buf.clear();
        if self.layout == Layout::Array {
            self.expect = Expect::CommaOrEnd;
        }
        out.push_back(Record::Value(value));
        Ok(())
    }
}

impl Default for JsonDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordDecoder for JsonDecoder {
    fn feed(&mut self, chunk: &[u8], out: &mut VecDeque<Record>) -> Result<(), DecodeError> {
        let mut i = 0;
        while i < chunk.len() {
            let b = chunk[i];
            let pos = self.offset + i as u64;
            if !self.in_value {
                self.structural(b, pos)?;
            } else if self.scalar {
                if ends_scalar(b) {
                    // The terminator belongs to the surrounding structure.
                    self.complete(out)?;
                    continue;
                }
                self.buf.push(b);
            } else {
                self.buf.push(b);
                if self.scan(b) {
                    self.complete(out)?;
                }
            }
            i += 1;
        }
        self.offset += chunk.len() as u64;
        Ok(())
    }

    fn finish(&mut self, out: &mut VecDeque<Record>) -> Result<(), DecodeError> {
        if self.in_value {
            if !self.scalar {
                return Err(DecodeError::UnexpectedEof {
                    offset: self.value_start,
                });
            }
            self.complete(out)?;
        }
        if self.layout == Layout::Array {
            return Err(DecodeError::UnexpectedEof {
                offset: self.offset,
            });
        }
        Ok(())
    }
}

fn ends_scalar(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b',' | b']' | b'}' | b'[' | b'{' | b'"' | b':')
}

fn invalid(offset: u64, reason: &str) -> DecodeError {
    DecodeError::InvalidJson {
        offset,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_chunks(chunks: &[&[u8]]) -> Result<Vec<Value>, DecodeError> {
        let mut decoder = JsonDecoder::new();
        let mut out = VecDeque::new();
        for chunk in chunks {
            decoder.feed(chunk, &mut out)?;
        }
        decoder.finish(&mut out)?;
        Ok(out
            .into_iter()
            .map(|r| r.as_value().cloned().expect("json yields values"))
            .collect())
    }

    fn decode(input: &str) -> Result<Vec<Value>, DecodeError> {
        decode_chunks(&[input.as_bytes()])
    }

    #[test]
    fn top_level_array() {
        let values = decode(r#"[{"id":1},{"id":2}, {"id":3}]"#).unwrap();
        assert_eq!(values, vec![json!({"id":1}), json!({"id":2}), json!({"id":3})]);
    }

    #[test]
    fn mixed_elements() {
        let values =
            decode(r#" [ 1, -2.5e3, "x,]", true, null, [1,[2]], {"a":{"b":[]}} ] "#).unwrap();
        assert_eq!(
            values,
            vec![
                json!(1),
                json!(-2.5e3),
                json!("x,]"),
                json!(true),
                json!(null),
                json!([1, [2]]),
                json!({"a":{"b":[]}}),
            ]
        );
    }

    #[test]
    fn brackets_and_escapes_inside_strings() {
        let values = decode(r#"[{"s":"}]\"{["},{"t":"\\"}]"#).unwrap();
        assert_eq!(values, vec![json!({"s":"}]\"{["}), json!({"t":"\\"})]);
    }

    #[test]
    fn newline_delimited_values() {
        let values = decode("{\"id\":1}\n{\"id\":2}\r\n\n{\"id\":3}").unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[2], json!({"id":3}));
    }

    #[test]
    fn scalar_values_stream() {
        assert_eq!(
            decode("1 2\n\"three\" true").unwrap(),
            vec![json!(1), json!(2), json!("three"), json!(true)]
        );
        assert_eq!(decode("42").unwrap(), vec![json!(42)]);
    }

    #[test]
    fn empty_inputs() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode("  \n ").unwrap().is_empty());
        assert!(decode("[]").unwrap().is_empty());
        assert!(decode(" [ \n ] \n").unwrap().is_empty());
    }

    #[test]
    fn leading_bom_is_skipped() {
        assert_eq!(decode("\u{feff}[1,2]").unwrap(), vec![json!(1), json!(2)]);
        assert_eq!(decode("\u{feff}{\"a\":1}\n").unwrap(), vec![json!({"a": 1})]);
        let split: &[&[u8]] = &[b"\xef", b"\xbb\xbf[", b"3]"];
        assert_eq!(decode_chunks(split).unwrap(), vec![json!(3)]);
        // Only a leading BOM is accepted.
        assert!(decode("[1]\u{feff}").is_err());
    }

    #[test]
    fn malformed_element_reports_its_offset() {
        let err = decode(r#"[{"id":1},{"id":}]"#).unwrap_err();
        match err {
            DecodeError::InvalidJson { offset, .. } => assert_eq!(offset, 10),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            decode("[1, tru]").unwrap_err(),
            DecodeError::InvalidJson { offset: 4, .. }
        ));
    }

    #[test]
    fn structural_errors() {
        assert!(matches!(decode("[1,]").unwrap_err(), DecodeError::InvalidJson { offset: 3, .. }));
        assert!(matches!(decode("[,1]").unwrap_err(), DecodeError::InvalidJson { offset: 1, .. }));
        assert!(matches!(decode("[1 2]").unwrap_err(), DecodeError::InvalidJson { offset: 3, .. }));
        assert!(matches!(decode("[1] 2").unwrap_err(), DecodeError::InvalidJson { offset: 4, .. }));
    }

    #[test]
    fn truncated_input() {
        assert_eq!(decode("[1, 2").unwrap_err(), DecodeError::UnexpectedEof { offset: 5 });
        assert_eq!(
            decode(r#"[{"id":1},{"id""#).unwrap_err(),
            DecodeError::UnexpectedEof { offset: 10 }
        );
        assert_eq!(decode(r#"{"a":"b"#).unwrap_err(), DecodeError::UnexpectedEof { offset: 0 });
    }

    #[test]
    fn split_at_every_byte() {
        let input = r#"[{"name":"héllo \"w\"","n":[1,2,{"x":-0.5}]}, 17 ,"s"]"#.as_bytes();
        let whole = decode_chunks(&[input]).unwrap();
        let bytewise: Vec<&[u8]> = input.chunks(1).collect();
        assert_eq!(decode_chunks(&bytewise).unwrap(), whole);
        assert_eq!(whole.len(), 3);
        assert_eq!(whole[0]["name"], json!("héllo \"w\""));
    }

    #[test]
    fn records_before_error_are_kept() {
        let mut decoder = JsonDecoder::new();
        let mut out = VecDeque::new();
        assert!(decoder.feed(b"[1,2,}", &mut out).is_err());
        assert_eq!(out.len(), 2);
    }
}

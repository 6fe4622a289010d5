//! `CsvDecoder`: header-keyed CSV rows.
//!
//! Tokenizing is done by [`csv_core::Reader`], which is already push-based
//! and keeps its own state between chunks. This module turns its field
//! output into records:
//!
//! - The first non-blank line is the header. Repeated header names get a
//!   `_<n>` suffix so no cell is lost.
//! - Every later line becomes a [`Record::Row`] mapping header name → cell.
//!   Cells past the header are keyed `_<index>`; missing trailing cells are
//!   left out (or rejected in strict mode).
//! - `\n`, `\r\n` and bare `\r` all end a line. Blank lines are skipped.
//! - A UTF-8 BOM in front of the header is dropped.
//!
//! Errors carry the offset of the first byte of the offending record.

use std::collections::{HashSet, VecDeque};

use csv_core::{ReadRecordResult, Reader, ReaderBuilder, Terminator};
use extractkit_core::{CsvOptions, DecodeError, Record, Row};

use crate::decoder::{RecordDecoder, UTF8_BOM};

/// Incremental CSV decoder.
pub struct CsvDecoder {
    reader: Reader,
    strict: bool,
    headers: Option<Vec<String>>,
    /// Field bytes of the record being read.
    output: Vec<u8>,
    /// End position of each field of the record being read, within `output`.
    ends: Vec<usize>,
    out_len: usize,
    ends_len: usize,
    /// Bytes fed so far.
    offset: u64,
    /// Offset of the first byte of the record being read.
    record_start: Option<u64>,
}

impl CsvDecoder {
    /// `options` must already be validated (ASCII dialect characters).
    pub fn new(options: CsvOptions) -> Self {
        let quote = options.quote as u8;
        let escape = options.effective_escape() as u8;
        let reader = ReaderBuilder::new()
            .delimiter(options.delimiter as u8)
            .quote(quote)
            .escape((escape != quote).then_some(escape))
            .double_quote(escape == quote)
            .terminator(Terminator::CRLF)
            .build();

        Self {
            reader,
            strict: options.strict,
            headers: None,
            output: vec![0; 1024],
            ends: vec![0; 32],
            out_len: 0,
            ends_len: 0,
            offset: 0,
            record_start: None,
        }
    }

    /// Header names, once the header row has been read.
    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    /// Push `input` through the reader and return how many records it
    /// completed (the header row included).
    ///
    /// `input` must not be empty: an empty slice tells the reader the stream
    /// has ended.
    fn read(&mut self, mut input: &[u8], out: &mut VecDeque<Record>) -> Result<usize, DecodeError> {
        let mut pos = self.offset;
        let mut completed = 0;
        loop {
            let (result, nin, nout, nend) = self.reader.read_record(
                input,
                &mut self.output[self.out_len..],
                &mut self.ends[self.ends_len..],
            );
            if self.record_start.is_none() {
                if let Some(i) = input[..nin].iter().position(|&b| b != b'\n' && b != b'\r') {
                    self.record_start = Some(pos + i as u64);
                }
            }
            input = &input[nin..];
            pos += nin as u64;
            self.out_len += nout;
            self.ends_len += nend;

            match result {
                ReadRecordResult::InputEmpty | ReadRecordResult::End => return Ok(completed),
                ReadRecordResult::OutputFull => {
                    let len = self.output.len();
                    self.output.resize(len * 2, 0);
                }
                ReadRecordResult::OutputEndsFull => {
                    let len = self.ends.len();
                    self.ends.resize(len * 2, 0);
                }
                ReadRecordResult::Record => {
                    self.end_record(out)?;
                    completed += 1;
                }
            }
            if input.is_empty() {
                return Ok(completed);
            }
        }
    }

    fn end_record(&mut self, out: &mut VecDeque<Record>) -> Result<(), DecodeError> {
        let offset = self.record_start.take().unwrap_or(self.offset);
        let ends_len = std::mem::take(&mut self.ends_len);
        self.out_len = 0;

        let mut cells = Vec::with_capacity(ends_len);
        let mut start = 0;
        for &end in &self.ends[..ends_len] {
            let cell = std::str::from_utf8(&self.output[start..end])
                .map_err(|_| DecodeError::InvalidUtf8 { offset })?;
            cells.push(cell.to_string());
            start = end;
        }

        let Some(headers) = self.headers.as_ref() else {
            if let Some(first) = cells.first_mut() {
                if let Some(stripped) = first.strip_prefix('\u{feff}') {
                    *first = stripped.to_string();
                }
            }
            self.headers = Some(unique_headers(cells));
            return Ok(());
        };

        if self.strict && cells.len() != headers.len() {
            return Err(DecodeError::FieldCount {
                offset,
                expected: headers.len(),
                found: cells.len(),
            });
        }
        let mut row = Row::with_capacity(cells.len());
        for (i, value) in cells.into_iter().enumerate() {
            let key = headers.get(i).cloned().unwrap_or_else(|| format!("_{i}"));
            row.insert(key, value);
        }
        out.push_back(Record::Row(row));
        Ok(())
    }
}

/// Suffix repeated names (`a`, `a_1`, `a_2`) so every column keeps its cells.
fn unique_headers(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(names.len());
    names
        .into_iter()
        .map(|name| {
            let mut candidate = name.clone();
            let mut n = 1;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{name}_{n}");
                n += 1;
            }
            candidate
        })
        .collect()
}

impl RecordDecoder for CsvDecoder {
    fn feed(&mut self, mut chunk: &[u8], out: &mut VecDeque<Record>) -> Result<(), DecodeError> {
        if self.offset == 0 {
            if let Some(rest) = chunk.strip_prefix(UTF8_BOM) {
                self.offset = UTF8_BOM.len() as u64;
                chunk = rest;
            }
        }
        if chunk.is_empty() {
            return Ok(());
        }
        self.read(chunk, out)?;
        self.offset += chunk.len() as u64;
        Ok(())
    }

    fn finish(&mut self, out: &mut VecDeque<Record>) -> Result<(), DecodeError> {
        let Some(start) = self.record_start else {
            return Ok(());
        };
        // A line break closes the last record unless a quoted field is still open.
        if self.read(b"\n", out)? == 0 {
            return Err(DecodeError::UnterminatedQuote { offset: start });
        }
        Ok(())
    }
}

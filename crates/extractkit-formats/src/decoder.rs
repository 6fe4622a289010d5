//! The `RecordDecoder` push-parser trait.

use std::collections::VecDeque;

use extractkit_core::{CsvOptions, DecodeError, Format, Record};

use crate::csv::CsvDecoder;
use crate::json::JsonDecoder;

/// Byte order mark some producers put in front of UTF-8 text.
pub(crate) const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Incremental decoder for one wire format.
///
/// Chunks may split records, tokens, or multi-byte characters at any
/// position. After an error the decoder must not be fed again.
pub trait RecordDecoder: Send {
    /// Consume `chunk`, appending every record completed by it to `out`.
    ///
    /// Records completed before an error in the same chunk are still
    /// appended.
    fn feed(&mut self, chunk: &[u8], out: &mut VecDeque<Record>) -> Result<(), DecodeError>;

    /// Signal end of input and flush the final record, if any.
    fn finish(&mut self, out: &mut VecDeque<Record>) -> Result<(), DecodeError>;
}

/// Build the decoder for `format`. CSV options are ignored for JSON.
pub fn decoder_for(format: Format, csv: &CsvOptions) -> Box<dyn RecordDecoder> {
    match format {
        Format::Csv => Box::new(CsvDecoder::new(*csv)),
        Format::Json => Box::new(JsonDecoder::new()),
    }
}

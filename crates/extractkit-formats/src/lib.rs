//! # extractkit-formats
//!
//! Incremental record decoders for the extract pipeline.
//!
//! Each wire format implements [`RecordDecoder`], a push parser that is fed
//! raw chunks as they arrive and emits every record it has fully seen. The
//! [`decode`] function lifts a decoder over a [`ByteStream`] into a lazy
//! [`RecordStream`] that only pulls another chunk once every buffered record
//! has been consumed.
//!
//! ## Formats
//! - `csv`: header row + delimited rows, configurable quote/escape
//! - `json`: one top-level array (one record per element) or a stream of
//!   whitespace-separated values (NDJSON)
//!
//! [`ByteStream`]: extractkit_core::ByteStream

pub mod csv;
pub mod decoder;
pub mod json;
pub mod stream;

pub use csv::CsvDecoder;
pub use decoder::{decoder_for, RecordDecoder};
pub use json::JsonDecoder;
pub use stream::{decode, decode_with, decode_with_options, RecordStream};

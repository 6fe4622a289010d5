//! Lift a [`RecordDecoder`] over a [`ByteStream`].

use std::collections::VecDeque;
use std::pin::Pin;

use extractkit_core::{ByteStream, CsvOptions, Format, PipelineError, Record};
use futures::stream::{self, Stream, StreamExt};
use tracing::trace;

use crate::decoder::{decoder_for, RecordDecoder};

/// Lazy, fallible sequence of decoded records.
///
/// At most one error is yielded and it is always the final item.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<Record, PipelineError>> + Send>>;

/// Decode `bytes` as `format` with default CSV options.
pub fn decode(format: Format, bytes: ByteStream) -> RecordStream {
    decode_with_options(format, &CsvOptions::default(), bytes)
}

pub fn decode_with_options(format: Format, csv: &CsvOptions, bytes: ByteStream) -> RecordStream {
    decode_with(decoder_for(format, csv), bytes)
}

struct DecodeState {
    /// `None` once the source is exhausted or has been released after an error.
    bytes: Option<ByteStream>,
    decoder: Box<dyn RecordDecoder>,
    pending: VecDeque<Record>,
    error: Option<PipelineError>,
    bytes_read: u64,
}

impl DecodeState {
    fn fail(&mut self, err: PipelineError) {
        self.bytes = None;
        self.error = Some(err);
    }
}

/// Drive `decoder` over `bytes`.
///
/// A new chunk is pulled only when every record decoded so far has been
/// taken. On a transport or decode error the byte stream is dropped at once;
/// records completed before the error are still yielded, then the error.
pub fn decode_with(decoder: Box<dyn RecordDecoder>, bytes: ByteStream) -> RecordStream {
    let state = DecodeState {
        bytes: Some(bytes),
        decoder,
        pending: VecDeque::new(),
        error: None,
        bytes_read: 0,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(record) = st.pending.pop_front() {
                return Some((Ok(record), st));
            }
            if let Some(err) = st.error.take() {
                return Some((Err(err), st));
            }
            let bytes = st.bytes.as_mut()?;
            match bytes.next().await {
                Some(Ok(chunk)) => {
                    st.bytes_read += chunk.len() as u64;
                    if let Err(e) = st.decoder.feed(&chunk, &mut st.pending) {
                        st.fail(e.into());
                    }
                }
                Some(Err(e)) => st.fail(e.into()),
                None => {
                    st.bytes = None;
                    trace!(bytes_read = st.bytes_read, "byte stream exhausted");
                    if let Err(e) = st.decoder.finish(&mut st.pending) {
                        st.fail(e.into());
                    }
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use extractkit_core::{DecodeError, TransportError};
    use futures::TryStreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn chunks(parts: &[&'static str]) -> ByteStream {
        let items: Vec<Result<Bytes, TransportError>> =
            parts.iter().copied().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect();
        stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn decodes_across_chunk_boundaries() {
        let bytes = chunks(&["id,na", "me\n1,a", "lice\n2,", "bob"]);
        let records: Vec<Record> = decode(Format::Csv, bytes).try_collect().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].field("name"), Some("bob"));
    }

    #[tokio::test]
    async fn records_then_single_terminal_error() {
        let bytes = chunks(&["[{\"id\":1},", "{\"id\":2},{\"id\""]);
        let items: Vec<_> = decode(Format::Json, bytes).collect().await;
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok() && items[1].is_ok());
        assert!(matches!(
            items[2],
            Err(PipelineError::Decode(DecodeError::UnexpectedEof { offset: 19 }))
        ));
    }

    #[tokio::test]
    async fn transport_error_mid_stream() {
        let items: Vec<Result<Bytes, TransportError>> = vec![
            Ok(Bytes::from_static(b"{\"a\":1}\n{\"a\":")),
            Err(TransportError::Read {
                bytes_read: 13,
                reason: "connection reset".into(),
            }),
            Ok(Bytes::from_static(b"2}\n")),
        ];
        let results: Vec<_> = decode(Format::Json, stream::iter(items).boxed()).collect().await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(PipelineError::Transport(TransportError::Read { .. }))));
    }

    #[tokio::test]
    async fn pulls_lazily() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let bytes = stream::iter(0..100)
            .map(move |i| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TransportError>(Bytes::from(format!("{i}\n")))
            })
            .boxed();

        let mut records = decode(Format::Json, bytes);
        let first = records.next().await.unwrap().unwrap();
        assert_eq!(first.as_value(), Some(&serde_json::json!(0)));
        // "0\n" completes the first value; nothing further is read.
        assert_eq!(pulled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn custom_csv_dialect() {
        let options = CsvOptions {
            delimiter: '\t',
            ..CsvOptions::default()
        };
        let bytes = chunks(&["a\tb\n1\t2\n"]);
        let records: Vec<Record> = decode_with_options(Format::Csv, &options, bytes)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(records[0].field("b"), Some("2"));
    }
}

//! Download streaming: opening an object for reading and moving its bytes to
//! a consumer without buffering the whole payload.
//!
//! [`DownloadStream`] owns the store's source stream and releases it exactly
//! once: at end of data, on the first error, on [`DownloadStream::close`], or
//! when dropped (client disconnect, task cancellation). A closed stream is
//! never reopened; the caller opens the object again instead.

use crate::{
    protocol::metadata::MetadataMap,
    services::object_store::{ByteStream, ObjectStore, StoreError},
};
use bytes::Bytes;
use futures::{Stream, StreamExt, ready};
use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Store(StoreError),
    #[error("reading object failed: {0}")]
    Source(#[source] io::Error),
    #[error("writing to destination failed: {0}")]
    Sink(#[source] io::Error),
}

impl TransferError {
    fn from_store(key: &str, err: StoreError) -> Self {
        if err.is_not_found() {
            TransferError::NotFound(key.to_string())
        } else {
            TransferError::Store(err)
        }
    }
}

/// An object opened for download.
pub struct OpenedObject {
    pub stream: DownloadStream,
    pub size_bytes: u64,
    pub content_type: Option<String>,
    pub metadata: MetadataMap,
}

/// Stat the object, then open its payload.
pub async fn open_download_stream(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
) -> Result<OpenedObject, TransferError> {
    let stat = store
        .stat_object(bucket, key)
        .await
        .map_err(|err| TransferError::from_store(key, err))?;
    let source = store
        .get_object(bucket, key)
        .await
        .map_err(|err| TransferError::from_store(key, err))?;

    Ok(OpenedObject {
        stream: DownloadStream::new(key, source, stat.size_bytes),
        size_bytes: stat.size_bytes,
        content_type: stat.content_type,
        metadata: stat.metadata,
    })
}

enum State {
    Open(ByteStream),
    Closed,
}

/// Pull-based object payload with a guaranteed single release.
///
/// Yields the source's chunks unchanged and in order. If the source produces
/// more or fewer bytes than `expected_len` the stream yields an error instead
/// of silently truncating, since the length was already promised to the
/// client.
pub struct DownloadStream {
    key: String,
    state: State,
    sent: u64,
    expected_len: u64,
}

impl DownloadStream {
    pub fn new(key: impl Into<String>, source: ByteStream, expected_len: u64) -> Self {
        Self {
            key: key.into(),
            state: State::Open(source),
            sent: 0,
            expected_len,
        }
    }

    pub fn bytes_sent(&self) -> u64 {
        self.sent
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Release the source. Idempotent.
    pub fn close(&mut self) {
        if let State::Open(source) = std::mem::replace(&mut self.state, State::Closed) {
            drop(source);
            debug!(
                key = %self.key,
                sent = self.sent,
                expected = self.expected_len,
                complete = self.sent == self.expected_len,
                "released download stream"
            );
        }
    }

    fn fail(&mut self, err: io::Error) -> Poll<Option<io::Result<Bytes>>> {
        self.close();
        Poll::Ready(Some(Err(err)))
    }
}

impl Stream for DownloadStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let State::Open(source) = &mut this.state else {
            return Poll::Ready(None);
        };

        match ready!(source.poll_next_unpin(cx)) {
            Some(Ok(chunk)) => {
                this.sent += chunk.len() as u64;
                if this.sent > this.expected_len {
                    let msg = format!(
                        "object `{}` produced more than {} bytes",
                        this.key, this.expected_len
                    );
                    return this.fail(io::Error::new(io::ErrorKind::InvalidData, msg));
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(err)) => this.fail(err),
            None if this.sent < this.expected_len => {
                let msg = format!(
                    "object `{}` ended after {} of {} bytes",
                    this.key, this.sent, this.expected_len
                );
                this.fail(io::Error::new(io::ErrorKind::UnexpectedEof, msg))
            }
            None => {
                this.close();
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for DownloadStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// Copy every chunk of `stream` into `sink`, in order, and flush.
///
/// Each chunk is read only after the previous one was fully accepted by the
/// sink, so memory use is bounded by one chunk. The stream is consumed; on
/// any error or cancellation it is released on the way out.
pub async fn relay<W>(mut stream: DownloadStream, sink: &mut W) -> Result<u64, TransferError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(TransferError::Source)?;
        sink.write_all(&chunk).await.map_err(TransferError::Sink)?;
    }
    sink.flush().await.map_err(TransferError::Sink)?;
    Ok(stream.bytes_sent())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_store::MemoryObjectStore;
    use futures::stream;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tokio::io::AsyncReadExt;

    /// Source that counts how many times it is released.
    struct TrackedSource {
        chunks: std::vec::IntoIter<io::Result<Bytes>>,
        releases: Arc<AtomicUsize>,
    }

    impl Stream for TrackedSource {
        type Item = io::Result<Bytes>;

        fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Poll::Ready(self.get_mut().chunks.next())
        }
    }

    impl Drop for TrackedSource {
        fn drop(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn tracked(chunks: Vec<io::Result<Bytes>>) -> (ByteStream, Arc<AtomicUsize>) {
        let releases = Arc::new(AtomicUsize::new(0));
        let source = TrackedSource {
            chunks: chunks.into_iter(),
            releases: releases.clone(),
        };
        (source.boxed(), releases)
    }

    fn chunks(count: usize, size: usize) -> Vec<io::Result<Bytes>> {
        (0..count)
            .map(|i| Ok(Bytes::from(vec![i as u8; size])))
            .collect()
    }

    /// Sink that accepts `limit` bytes and then fails like a dropped client.
    struct FailingSink {
        accepted: usize,
        limit: usize,
    }

    impl AsyncWrite for FailingSink {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            if this.accepted >= this.limit {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "client disconnected",
                )));
            }
            let n = buf.len().min(this.limit - this.accepted);
            this.accepted += n;
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn relay_copies_bytes_in_order_and_releases_once() {
        let (source, releases) = tracked(chunks(4, 10));
        let stream = DownloadStream::new("k", source, 40);
        let mut sink = Vec::new();

        let sent = relay(stream, &mut sink).await.unwrap();

        assert_eq!(sent, 40);
        let expected: Vec<u8> = (0..4u8).flat_map(|i| vec![i; 10]).collect();
        assert_eq!(sink, expected);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stream_releases_at_end_of_data_before_drop() {
        let (source, releases) = tracked(chunks(2, 3));
        let mut stream = DownloadStream::new("k", source, 6);

        while stream.next().await.is_some() {}
        assert!(stream.is_closed());
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        assert!(stream.next().await.is_none());
        drop(stream);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sink_failure_mid_transfer_releases_once() {
        let (source, releases) = tracked(chunks(10, 100));
        let stream = DownloadStream::new("k", source, 1000);
        let mut sink = FailingSink {
            accepted: 0,
            limit: 250,
        };

        let err = relay(stream, &mut sink).await.unwrap_err();

        assert!(matches!(err, TransferError::Sink(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert_eq!(sink.accepted, 250);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reader_disconnect_releases_once() {
        let (source, releases) = tracked(chunks(64, 1024));
        let stream = DownloadStream::new("k", source, 64 * 1024);
        let (mut writer, mut reader) = tokio::io::duplex(512);

        let relay_task = tokio::spawn(async move { relay(stream, &mut writer).await });

        let mut partial = [0u8; 300];
        reader.read_exact(&mut partial).await.unwrap();
        drop(reader);

        let result = relay_task.await.unwrap();
        assert!(matches!(result, Err(TransferError::Sink(_))));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn aborted_relay_releases_once() {
        let (source, releases) = tracked(chunks(64, 1024));
        let stream = DownloadStream::new("k", source, 64 * 1024);
        let (mut writer, reader) = tokio::io::duplex(64);

        // Nobody reads, so the relay parks on sink readiness.
        let relay_task = tokio::spawn(async move { relay(stream, &mut writer).await });
        tokio::task::yield_now().await;
        assert_eq!(releases.load(Ordering::SeqCst), 0);

        relay_task.abort();
        assert!(relay_task.await.unwrap_err().is_cancelled());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        drop(reader);
    }

    #[tokio::test]
    async fn dropping_a_partially_read_stream_releases_once() {
        let (source, releases) = tracked(chunks(5, 8));
        let mut stream = DownloadStream::new("k", source, 40);

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 8);
        assert_eq!(releases.load(Ordering::SeqCst), 0);

        drop(stream);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn source_error_is_surfaced_and_releases() {
        let (source, releases) = tracked(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "store hung up")),
            Ok(Bytes::from_static(b"never")),
        ]);
        let stream = DownloadStream::new("k", source, 8);
        let mut sink = Vec::new();

        let err = relay(stream, &mut sink).await.unwrap_err();
        assert!(matches!(err, TransferError::Source(_)));
        assert_eq!(sink, b"abc");
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn short_source_is_an_error() {
        let (source, releases) = tracked(chunks(1, 5));
        let mut stream = DownloadStream::new("k", source, 10);

        assert!(stream.next().await.unwrap().is_ok());
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(stream.next().await.is_none());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn long_source_is_an_error() {
        let (source, releases) = tracked(chunks(2, 5));
        let mut stream = DownloadStream::new("k", source, 7);

        assert!(stream.next().await.unwrap().is_ok());
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn open_reports_missing_objects() {
        let store = MemoryObjectStore::new();
        store.make_bucket("docs").await.unwrap();

        let err = open_download_stream(&store, "docs", "nope").await.err().unwrap();
        assert!(matches!(err, TransferError::NotFound(ref k) if k == "nope"));

        let err = open_download_stream(&store, "no-bucket", "nope").await.err().unwrap();
        assert!(matches!(err, TransferError::Store(StoreError::BucketNotFound(_))));
    }

    #[tokio::test]
    async fn open_then_relay_from_store() {
        let store = MemoryObjectStore::with_chunk_size(3);
        store.make_bucket("docs").await.unwrap();
        let payload = Bytes::from_static(b"%PDF-1.7 body");
        let body = stream::once(async move { Ok(payload) }).boxed();
        let metadata: MetadataMap = [("x-upload-date", "2025-01-01T00:00:00.000Z")].into_iter().collect();
        store
            .put_object("docs", "k", body, 13, "application/pdf", &metadata)
            .await
            .unwrap();

        let opened = open_download_stream(&store, "docs", "k").await.unwrap();
        assert_eq!(opened.size_bytes, 13);
        assert_eq!(opened.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(opened.metadata, metadata);

        let mut sink = Vec::new();
        assert_eq!(relay(opened.stream, &mut sink).await.unwrap(), 13);
        assert_eq!(sink, b"%PDF-1.7 body");
    }
}

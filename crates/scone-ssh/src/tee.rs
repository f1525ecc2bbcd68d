//! Debug-mode byte tee: mirrors everything that flows through a
//! wrapped reader/writer into a plain file, named per SPEC_FULL.md's
//! `<host>.<user>.{stdin,stdout,stderr}` convention, so a misbehaving
//! sous session can be replayed offline.

use std::fs::File;
use std::io::Write as _;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

pub(crate) struct TeeReader<R> {
    inner: R,
    sink: File,
}

impl<R> TeeReader<R> {
    pub(crate) fn new(inner: R, sink: File) -> Self {
        TeeReader { inner, sink }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for TeeReader<R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            let produced = &buf.filled()[before..];
            if !produced.is_empty() {
                let _ = this.sink.write_all(produced);
            }
        }
        poll
    }
}

pub(crate) struct TeeWriter<W> {
    inner: W,
    sink: File,
}

impl<W> TeeWriter<W> {
    pub(crate) fn new(inner: W, sink: File) -> Self {
        TeeWriter { inner, sink }
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for TeeWriter<W> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = &poll {
            let _ = this.sink.write_all(&buf[..*n]);
        }
        poll
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let _ = this.sink.flush();
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn scratch_file() -> (File, std::path::PathBuf) {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!("scone-ssh-tee-test-{}-{n}", std::process::id()));
        let file = OpenOptions::new().create(true).read(true).write(true).truncate(true).open(&path).unwrap();
        (file, path)
    }

    #[tokio::test]
    async fn tee_reader_mirrors_bytes_into_sink() {
        let (sink, path) = scratch_file();
        let (mut client, server) = tokio::io::duplex(64);
        let mut tee = TeeReader::new(server, sink);

        client.write_all(b"hello").await.unwrap();
        drop(client);

        let mut out = Vec::new();
        tee.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello");

        let recorded = std::fs::read(&path).unwrap();
        assert_eq!(recorded, b"hello");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn tee_writer_mirrors_bytes_into_sink() {
        let (sink, path) = scratch_file();
        let (client, mut server) = tokio::io::duplex(64);
        let mut tee = TeeWriter::new(client, sink);

        tee.write_all(b"world").await.unwrap();
        tee.flush().await.unwrap();

        let mut received = vec![0u8; 5];
        server.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"world");

        let recorded = std::fs::read(&path).unwrap();
        assert_eq!(recorded, b"world");
        let _ = std::fs::remove_file(&path);
    }
}

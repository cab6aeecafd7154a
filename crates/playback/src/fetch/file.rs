//! Local file fetcher: reads a music file into the stream buffer.

use embassy_time::Duration;
use heapless::String;
use platform::{File, Storage};

use super::push_while_active;
use crate::ring_buffer::StreamBuffer;
use crate::session::{CancelToken, Worker};

/// Bytes read from storage per iteration.
pub const CHUNK_BYTES: usize = 512;

/// Longest accepted file path.
pub const MAX_PATH: usize = 256;

const PUSH_BACKOFF: Duration = Duration::from_millis(10);

/// Parameters of one file session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRequest {
    /// Path on the storage volume.
    pub path: String<MAX_PATH>,
}

impl FileRequest {
    /// Request for `path`, or `None` when it does not fit.
    pub fn new(path: &str) -> Option<Self> {
        let mut owned = String::new();
        owned.push_str(path).ok()?;
        Some(Self { path: owned })
    }
}

/// File worker; run it with [`run_worker`](crate::session::run_worker).
pub struct FileFetcher<'a, S: Storage, const N: usize> {
    storage: S,
    buffer: &'a StreamBuffer<N>,
    chunk: [u8; CHUNK_BYTES],
}

impl<'a, S: Storage, const N: usize> FileFetcher<'a, S, N> {
    /// Fetcher reading from `storage` into `buffer`.
    pub fn new(storage: S, buffer: &'a StreamBuffer<N>) -> Self {
        Self {
            storage,
            buffer,
            chunk: [0; CHUNK_BYTES],
        }
    }

    /// The storage backend, for inspection.
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: Storage, const N: usize> Worker for FileFetcher<'_, S, N> {
    type Request = FileRequest;

    async fn run_session(&mut self, request: FileRequest, token: CancelToken<'_>) {
        let buffer = self.buffer;
        let chunk = &mut self.chunk;
        let mut file = match self.storage.open_file(&request.path).await {
            Ok(file) => file,
            Err(_) => {
                warn!("file: cannot open {}", request.path.as_str());
                return;
            }
        };
        info!("file: playing {} ({} bytes)", request.path.as_str(), file.size());

        while token.is_active() {
            let n = match file.read(chunk.as_mut_slice()).await {
                Ok(0) => {
                    debug!("file: end of file");
                    break;
                }
                Ok(n) => n,
                Err(_) => {
                    warn!("file: read error");
                    break;
                }
            };
            let bytes = chunk.get(..n).unwrap_or_default();
            if push_while_active(buffer, bytes, token, PUSH_BACKOFF)
                .await
                .is_err()
            {
                break;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::session::{run_worker, SessionControl};
    use embassy_futures::select::{select, Either};
    use embassy_time::Timer;
    use platform::mocks::MockStorage;

    #[test]
    fn overlong_path_is_rejected() {
        assert!(FileRequest::new(&"a".repeat(MAX_PATH + 1)).is_none());
        assert!(FileRequest::new("/music/a.mp3").is_some());
    }

    #[tokio::test]
    async fn whole_file_lands_in_buffer() {
        let contents: std::vec::Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();
        let storage = MockStorage::new().with_file("/music/a.mp3", contents.clone());
        let buffer: StreamBuffer<4096> = StreamBuffer::new();
        let control = SessionControl::new();
        let mut fetcher = FileFetcher::new(storage, &buffer);
        let body = async {
            control.start(FileRequest::new("/music/a.mp3").unwrap());
            while !control.is_finished() {
                Timer::after(Duration::from_millis(1)).await;
            }
            control.stop().await;
        };
        match select(run_worker(&control, &mut fetcher), body).await {
            Either::First(never) => match never {},
            Either::Second(()) => {}
        }
        let mut out = vec![0u8; 4096];
        let n = buffer.pop(&mut out).await.unwrap();
        assert_eq!(&out[..n], &contents[..]);
    }

    #[tokio::test]
    async fn missing_file_finishes_immediately() {
        let buffer: StreamBuffer<64> = StreamBuffer::new();
        let control = SessionControl::new();
        let mut fetcher = FileFetcher::new(MockStorage::new(), &buffer);
        let body = async {
            control.start(FileRequest::new("/nope.mp3").unwrap());
            while !control.is_finished() {
                Timer::after(Duration::from_millis(1)).await;
            }
            control.stop().await;
        };
        match select(run_worker(&control, &mut fetcher), body).await {
            Either::First(never) => match never {},
            Either::Second(()) => {}
        }
        assert_eq!(fetcher.storage().opened, vec!["/nope.mp3".to_string()]);
        assert!(buffer.is_empty());
    }
}

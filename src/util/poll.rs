use std::{
    future::Future,
    io::{self, Read},
};

use futures::{
    channel::mpsc::{self, Receiver, Sender},
    executor, SinkExt, StreamExt,
};
use tokio::runtime::{Builder, Runtime};

use crate::model::fs::FSError;

const CHUNK_SIZE: usize = 256 * 1024;
const CHANNEL_DEPTH: usize = 4;

/// Drives the async storage SDKs from the synchronous adapter surface.
pub struct Blocking {
    runtime: Runtime,
}

impl Blocking {
    pub fn new() -> Result<Self, FSError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("bucketfs-io")
            .enable_all()
            .build()?;

        Ok(Self { runtime })
    }

    pub fn poll_until_ready<Fut, T>(&self, future: Fut) -> T
    where
        Fut: Future<Output = T>,
    {
        self.runtime.block_on(future)
    }

    pub fn poll_until_ready_error<Fut, T, E>(&self, future: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        self.runtime.block_on(future)
    }

    pub fn spawn<Fut>(&self, future: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(future);
    }

    /// Feeds `reader` into a bounded channel from a blocking worker, so an
    /// async upload can consume it as a stream.
    pub fn read_in_chunks(
        &self,
        mut reader: Box<dyn Read + Send>,
    ) -> Receiver<Result<Vec<u8>, io::Error>> {
        let (mut tx, rx) = mpsc::channel(CHANNEL_DEPTH);

        self.runtime.spawn_blocking(move || loop {
            let mut chunk = vec![0; CHUNK_SIZE];
            let item = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    chunk.truncate(n);
                    Ok(chunk)
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => Err(err),
            };

            let failed = item.is_err();
            if executor::block_on(tx.send(item)).is_err() || failed {
                break;
            }
        });

        rx
    }
}

/// Synchronous reader over chunks produced by an async task.
pub struct ChunkReader {
    receiver: Receiver<Result<Vec<u8>, FSError>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl ChunkReader {
    pub fn channel() -> (Sender<Result<Vec<u8>, FSError>>, Self) {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        (
            tx,
            Self {
                receiver: rx,
                chunk: Vec::new(),
                pos: 0,
            },
        )
    }
}

impl Read for ChunkReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.chunk.len() {
            match executor::block_on(self.receiver.next()) {
                None => return Ok(0),
                Some(Ok(chunk)) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Some(Err(err)) => return Err(io::Error::other(err)),
            }
        }

        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;

        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_until_ready() {
        let blocking = Blocking::new().unwrap();

        let result = blocking.poll_until_ready(async { 40 + 2 });
        assert_eq!(result, 42);

        let result: Result<u8, String> =
            blocking.poll_until_ready_error(async { Err("failed".to_string()) });
        assert_eq!(result, Err("failed".to_string()));
    }

    #[test]
    fn test_poll_until_ready_with_timer() {
        let blocking = Blocking::new().unwrap();

        let result = blocking.poll_until_ready(async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            "slept"
        });
        assert_eq!(result, "slept");
    }

    #[test]
    fn test_chunk_reader_from_spawned_task() {
        let blocking = Blocking::new().unwrap();
        let (mut tx, mut reader) = ChunkReader::channel();

        blocking.spawn(async move {
            for chunk in [b"hello ".to_vec(), Vec::new(), b"world".to_vec()] {
                if tx.send(Ok(chunk)).await.is_err() {
                    return;
                }
            }
        });

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn test_chunk_reader_surfaces_errors() {
        let blocking = Blocking::new().unwrap();
        let (mut tx, mut reader) = ChunkReader::channel();

        blocking.spawn(async move {
            let _ = tx.send(Err(FSError::not_found("gone"))).await;
        });

        let mut out = Vec::new();
        assert!(reader.read_to_end(&mut out).is_err());
    }

    #[test]
    fn test_read_in_chunks() {
        let blocking = Blocking::new().unwrap();
        let data = vec![7u8; CHUNK_SIZE + 10];

        let rx = blocking.read_in_chunks(Box::new(io::Cursor::new(data.clone())));
        let chunks = blocking.poll_until_ready(rx.collect::<Vec<_>>());

        assert_eq!(chunks.len(), 2);
        let joined = chunks
            .into_iter()
            .map(|c| c.unwrap())
            .collect::<Vec<_>>()
            .concat();
        assert_eq!(joined, data);
    }
}

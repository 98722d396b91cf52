use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_std::{
    channel::{self, Sender},
    future,
    task::{self, JoinHandle},
};
use async_trait::async_trait;
use log::{trace, warn};

use crate::{error::Error, reader::LineReader, source::Source, ReadByLine, Result};

/// Asynchronous counterpart of `ReadByLine` for readers shared between tasks.
#[async_trait]
pub trait AsyncReadByLine {
    /// Reads the given line
    async fn line(&self, line: usize) -> Result<Vec<u8>>;

    /// Reads the given line as string
    async fn read_line(&self, line: usize) -> Result<String> {
        Ok(String::from_utf8(self.line(line).await?)?)
    }

    /// Reads the lines of `[from, to)`, see `LineReader::lines`.
    async fn lines(&self, from: isize, to: isize) -> Result<Vec<Vec<u8>>>;

    /// Returns the amount of lines, see `LineReader::line_count`.
    async fn line_count(&self, exact: bool) -> Result<usize>;
}

/// A `LineReader` which can be cloned cheaply and used from multiple tasks or threads. Every
/// operation locks the reader and runs on async-std's blocking thread pool.
#[derive(Debug)]
pub struct SharedReader<S: Source> {
    inner: Arc<Mutex<LineReader<S>>>,
}

impl<S: Source> Clone for SharedReader<S> {
    /// Does not clone the reader but the reference to it
    #[inline]
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Source + Send + 'static> SharedReader<S> {
    #[inline]
    pub fn new(reader: LineReader<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reader)),
        }
    }

    /// Runs `f` with exclusive access to the reader, blocking the current thread.
    pub fn with_reader<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut LineReader<S>) -> Result<T>,
    {
        let mut reader = self.inner.lock().map_err(|_| Error::Poisoned)?;
        f(&mut reader)
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut LineReader<S>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let shared = self.clone();
        task::spawn_blocking(move || shared.with_reader(f)).await
    }

    /// Indexes newly appended data every `period` in the background, so queries for new lines
    /// don't have to scan. Refreshing stops once the returned handle is stopped or dropped.
    pub fn follow(&self, period: Duration) -> FollowHandle {
        let (stop, stopped) = channel::bounded::<()>(1);
        let shared = self.clone();

        let task = task::spawn(async move {
            // Wakes up early once the handle is gone
            while future::timeout(period, stopped.recv()).await.is_err() {
                match shared.run(|reader| reader.count_all()).await {
                    Ok(lines) => trace!("refreshed index, {} lines", lines),
                    Err(err) => warn!("refreshing index failed: {}", err),
                }
            }
        });

        FollowHandle { stop, task }
    }
}

#[async_trait]
impl<S: Source + Send + 'static> AsyncReadByLine for SharedReader<S> {
    async fn line(&self, line: usize) -> Result<Vec<u8>> {
        self.run(move |reader| reader.line(line)).await
    }

    async fn lines(&self, from: isize, to: isize) -> Result<Vec<Vec<u8>>> {
        self.run(move |reader| reader.lines(from, to)).await
    }

    async fn line_count(&self, exact: bool) -> Result<usize> {
        self.run(move |reader| reader.line_count(exact)).await
    }
}

/// Keeps a background refresh running. Dropping the handle stops it as well.
#[derive(Debug)]
pub struct FollowHandle {
    stop: Sender<()>,
    task: JoinHandle<()>,
}

impl FollowHandle {
    /// Stops refreshing and waits for a running refresh to finish.
    pub async fn stop(self) {
        // Closing the channel wakes the task up
        drop(self.stop);
        self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, io::Write};

    use super::*;
    use crate::File;

    #[async_std::test]
    async fn test_shared_reads() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        fs::write(tmp.path(), "a\nbb\nccc").unwrap();

        let shared = SharedReader::new(File::open(tmp.path()).unwrap());
        let other = shared.clone();

        assert_eq!(shared.read_line(1).await.unwrap(), "bb");
        assert_eq!(other.line(2).await.unwrap(), b"ccc");
        assert_eq!(other.line_count(true).await.unwrap(), 3);
        assert_eq!(
            shared.lines(-1, 0).await.unwrap(),
            vec![b"ccc".to_vec(), b"bb".to_vec(), b"a".to_vec()]
        );
        assert!(matches!(
            shared.line(3).await,
            Err(Error::LineNotFound { .. })
        ));
    }

    #[async_std::test]
    async fn test_follow() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let shared = SharedReader::new(File::open(tmp.path()).unwrap());
        let handle = shared.follow(Duration::from_millis(10));

        for i in 0..4 {
            writeln!(tmp, "line {}", i).unwrap();
        }
        tmp.flush().unwrap();

        // Wait for the background refresh to pick the lines up
        let mut known = 0;
        for _ in 0..200 {
            known = shared.line_count(false).await.unwrap();
            if known == 4 {
                break;
            }
            task::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(known, 4);

        handle.stop().await;
        assert_eq!(shared.read_line(3).await.unwrap(), "line 3");
    }

    #[test]
    fn test_with_reader() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        fs::write(tmp.path(), "x\r\ny\r\n").unwrap();

        let shared = SharedReader::new(File::open(tmp.path()).unwrap());
        let count = shared.with_reader(|reader| reader.count_all()).unwrap();
        assert_eq!(count, 2);
    }
}

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use itertools::Either;
use log::{debug, warn};

use crate::{
    cache::RecentLines,
    config::Config,
    error::Error,
    index::Index,
    monitor::{Change, Monitor},
    source::Source,
    Indexable, ReadByLine, Result,
};

/// A wrapper around a `Source` which implements `ReadByLine` and builds the index of its lines
/// lazily, as far as queries require it.
#[derive(Debug)]
pub struct LineReader<S: Source> {
    source: S,
    index: Index,
    monitor: Monitor,
    recent: RecentLines,
    config: Config,
}

impl<S: Source> LineReader<S> {
    /// Creates a new `LineReader` using the default config. Nothing gets read until the first
    /// query.
    #[inline]
    pub fn new(source: S) -> Result<LineReader<S>> {
        Self::with_config(source, Config::default())
    }

    /// Creates a new `LineReader`. Returns an error if `config` is invalid.
    pub fn with_config(source: S, config: Config) -> Result<LineReader<S>> {
        config.validate()?;

        Ok(Self {
            source,
            index: Index::new(config.terminator),
            monitor: Monitor::new(),
            recent: RecentLines::new(config.recent_lines),
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Offset up to which all line starts are known.
    #[inline]
    pub fn watermark(&self) -> u64 {
        self.index.watermark()
    }

    /// Returns the amount of lines. With `exact` the whole file gets indexed, otherwise the amount
    /// of lines known so far is returned without touching the file.
    pub fn line_count(&mut self, exact: bool) -> Result<usize> {
        if exact {
            self.count_all()
        } else {
            Ok(self.known_lines())
        }
    }

    /// Indexes the file up to its end and returns the total amount of lines. Cheap if the file
    /// didn't grow since the last call.
    pub fn count_all(&mut self) -> Result<usize> {
        self.with_retry(|reader| {
            reader.locate(usize::MAX - 1)?;
            Ok(reader.index.len())
        })
    }

    /// Returns the offset at which `line` starts, indexing the file as far as needed.
    pub fn offset_of(&mut self, line: usize) -> Result<u64> {
        self.with_retry(|reader| reader.locate(line))?;
        self.index.get(line)
    }

    /// Reads the lines of the half-open range `[from, to)`.
    ///
    /// Negative bounds are counted from the end: `-1` is the end of the file, `-2` the start of
    /// the last line and so on. If `from` is greater than `to`, the lines of `[to, from)` are
    /// returned in reversed order.
    pub fn lines(&mut self, from: isize, to: isize) -> Result<Vec<Vec<u8>>> {
        let count = if from < 0 || to < 0 {
            self.count_all()?
        } else {
            // Only index as far as the range reaches
            let end = from.max(to) as usize;
            if end > 0 && self.with_retry(|reader| reader.locate(end - 1))?.is_none() {
                return Err(Error::InvalidRange {
                    from,
                    to,
                    lines: self.index.len(),
                });
            }
            end
        };

        let invalid = || Error::InvalidRange {
            from,
            to,
            lines: count,
        };
        let start = resolve_bound(from, count).ok_or_else(invalid)?;
        let end = resolve_bound(to, count).ok_or_else(invalid)?;

        let order = if start <= end {
            Either::Left(start..end)
        } else {
            Either::Right((end..start).rev())
        };

        order.map(|line| self.line(line)).collect()
    }

    /// Releases the underlying source.
    #[inline]
    pub fn close(self) {}

    /// Returns the underlying source, dropping the index.
    #[inline]
    pub fn into_source(self) -> S {
        self.source
    }

    /// Runs `op`. If the file turns out to be truncated or replaced, the index gets reset and
    /// `op` is run exactly once more.
    fn with_retry<T, F>(&mut self, mut op: F) -> Result<T>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        match op(self) {
            Err(Error::Invalidated) => {
                self.invalidate()?;
                op(self).map_err(|err| {
                    if let Error::Invalidated = err {
                        warn!("file changed again while rebuilding its index");
                    }
                    err
                })
            }
            res => res,
        }
    }

    fn invalidate(&mut self) -> Result<()> {
        debug!(
            "dropping index of {} lines, {} bytes scanned",
            self.index.complete_lines(),
            self.index.scanned()
        );

        self.index.reset();
        self.recent.clear();
        self.source.reopen()?;
        self.monitor.mark_reset();
        Ok(())
    }

    /// Checks the file for changes and returns its current length.
    fn sync(&mut self) -> Result<u64> {
        let identity = self.source.identity()?;
        match self.monitor.check(identity, self.index.scanned()) {
            Change::Invalidated => Err(Error::Invalidated),
            Change::Grown { .. } => {
                self.verify_lookback()?;
                Ok(identity.len)
            }
            Change::Unchanged => Ok(identity.len),
        }
    }

    /// Appending never changes existing bytes, so the last scanned byte has to be the same still.
    fn verify_lookback(&mut self) -> Result<()> {
        let scanned = self.index.scanned();
        let expected = match self.index.lookback() {
            Some(b) if scanned > 0 => b,
            _ => return Ok(()),
        };

        let mut byte = [0u8; 1];
        self.source.seek(SeekFrom::Start(scanned - 1))?;
        read_exact(&mut self.source, &mut byte)?;

        if byte[0] != expected {
            return Err(Error::Invalidated);
        }

        Ok(())
    }

    /// Indexes the file until `line` is covered or its end is reached, picking up data appended
    /// while scanning. Returns the span of `line`, or `None` if the file has fewer lines.
    fn locate(&mut self, line: usize) -> Result<Option<(u64, u64)>> {
        let mut len = self.sync()?;

        loop {
            let chunk_size = self.config.chunk_size;
            if self
                .index
                .ensure_indexed_through(line, &mut self.source, len, chunk_size)?
            {
                return Ok(self.index.span(line));
            }

            let current = self.sync()?;
            if current <= len {
                return Ok(None);
            }
            len = current;
        }
    }

    fn read_into(&mut self, line: usize, buf: &mut Vec<u8>) -> Result<usize> {
        let (start, end) = match self.locate(line)? {
            Some(span) => span,
            None => {
                return Err(Error::LineNotFound {
                    line,
                    lines: self.index.len(),
                })
            }
        };

        if let Some(data) = self.recent.get(line) {
            buf.extend_from_slice(data);
            return Ok(data.len());
        }

        let old_len = buf.len();
        buf.resize(old_len + (end - start) as usize, 0);

        let res = self
            .source
            .seek(SeekFrom::Start(start))
            .map_err(Error::from)
            .and_then(|_| read_exact(&mut self.source, &mut buf[old_len..]));
        if let Err(err) = res {
            buf.truncate(old_len);
            return Err(err);
        }

        let content_len = self.index.terminator().content_len(&buf[old_len..]);
        buf.truncate(old_len + content_len);

        if self.index.is_terminated(line) {
            self.recent.push(line, &buf[old_len..]);
        }

        Ok(content_len)
    }
}

impl<S: Source> Indexable for LineReader<S> {
    #[inline]
    fn get_index(&self) -> &Index {
        &self.index
    }
}

impl<S: Source> ReadByLine for LineReader<S> {
    fn read_line_raw(&mut self, line: usize, buf: &mut Vec<u8>) -> Result<usize> {
        self.with_retry(|reader| reader.read_into(line, buf))
    }

    #[inline]
    fn total_lines(&mut self) -> Result<usize> {
        self.count_all()
    }
}

/// Like `Read::read_exact` but reports a source ending early as invalidation.
fn read_exact<S: Source>(source: &mut S, buf: &mut [u8]) -> Result<()> {
    source.read_exact(buf).map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => Error::Invalidated,
        _ => err.into(),
    })
}

/// Resolves a range bound, negative bounds counting from the end.
fn resolve_bound(bound: isize, count: usize) -> Option<usize> {
    if bound < 0 {
        let resolved = count as isize + 1 + bound;
        (resolved >= 0).then(|| resolved as usize)
    } else {
        let bound = bound as usize;
        (bound <= count).then(|| bound)
    }
}

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use log::trace;

use crate::{
    error::Error,
    scanner::{scan_chunk, Terminator},
    Result,
};

/// Contains an in-memory line-index which is extended lazily, one chunk at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// Maps line to seek position in order to seek efficiently. The index within the Vec represents
    /// the line-index in the file. The first entry is always 0 and the last entry is the watermark,
    /// the start of the first line which has not been terminated yet.
    inner: Vec<u64>,
    /// Amount of bytes scanned so far. Never smaller than the watermark.
    scanned: u64,
    /// The last scanned byte
    lookback: Option<u8>,
    /// Whether the scan reached the end of the file as it was known during the last scan
    at_eof: bool,
    terminator: Terminator,
}

impl Default for Index {
    #[inline]
    fn default() -> Self {
        Self::new(Terminator::default())
    }
}

impl Index {
    /// Create a new, empty Index
    pub fn new(terminator: Terminator) -> Index {
        Self {
            inner: vec![0],
            scanned: 0,
            lookback: None,
            at_eof: false,
            terminator,
        }
    }

    #[inline]
    pub fn terminator(&self) -> Terminator {
        self.terminator
    }

    /// Offset right after the last terminated line.
    #[inline]
    pub fn watermark(&self) -> u64 {
        // inner is never empty
        self.inner[self.inner.len() - 1]
    }

    /// Amount of bytes scanned for line terminators.
    #[inline]
    pub fn scanned(&self) -> u64 {
        self.scanned
    }

    /// The last scanned byte.
    #[inline]
    pub fn lookback(&self) -> Option<u8> {
        self.lookback
    }

    /// Returns `true` if the index covers the whole file as it was during the last scan.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.at_eof
    }

    /// Amount of lines ending with a terminator found so far.
    #[inline]
    pub fn complete_lines(&self) -> usize {
        self.inner.len() - 1
    }

    /// Returns the amount of lines known. This is a lower bound until the index is complete, in
    /// which case a last line without terminator is counted too.
    pub fn len(&self) -> usize {
        self.complete_lines() + self.has_tail() as usize
    }

    /// Returns `true` if no line is known.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A trailing line without terminator which ends at the end of file.
    #[inline]
    fn has_tail(&self) -> bool {
        self.at_eof && self.scanned > self.watermark()
    }

    /// Get the start offset of `line`.
    #[inline]
    pub fn get(&self, line: usize) -> Result<u64> {
        if line < self.len() {
            return Ok(self.inner[line]);
        }

        Err(Error::OutOfRange {
            line,
            lines: self.len(),
        })
    }

    /// Returns the byte range `[start, end)` of `line` including its terminator.
    pub fn span(&self, line: usize) -> Option<(u64, u64)> {
        if line < self.complete_lines() {
            return Some((self.inner[line], self.inner[line + 1]));
        }

        if line == self.complete_lines() && self.has_tail() {
            return Some((self.watermark(), self.scanned));
        }

        None
    }

    /// Returns `true` if `line` was terminated, which means its bytes can't change anymore as
    /// long as the file is only appended to.
    #[inline]
    pub fn is_terminated(&self, line: usize) -> bool {
        line < self.complete_lines()
    }

    /// Extends the index by scanning `reader` until `line` is covered or `file_len` is reached.
    /// Returns whether `line` is covered.
    ///
    /// Fails with `Error::Invalidated` if the file turns out to be shorter than what was already
    /// scanned or than `file_len`.
    pub fn ensure_indexed_through<R: Read + Seek>(
        &mut self,
        line: usize,
        reader: &mut R,
        file_len: u64,
        chunk_size: usize,
    ) -> Result<bool> {
        if self.is_terminated(line) {
            return Ok(true);
        }

        if file_len < self.scanned {
            return Err(Error::Invalidated);
        }

        if file_len > self.scanned {
            self.at_eof = false;
        }

        let mut buf = Vec::new();
        while !self.is_terminated(line) && self.scanned < file_len {
            let want = (file_len - self.scanned).min(chunk_size.max(1) as u64) as usize;
            buf.resize(want, 0);

            reader.seek(SeekFrom::Start(self.scanned))?;
            if let Err(err) = reader.read_exact(&mut buf) {
                return Err(match err.kind() {
                    ErrorKind::UnexpectedEof => Error::Invalidated,
                    _ => err.into(),
                });
            }

            self.push_chunk(&buf);
        }

        if self.scanned == file_len {
            self.at_eof = true;
        }

        Ok(self.span(line).is_some())
    }

    /// Scans the whole file up to `file_len`.
    pub fn scan_to_end<R: Read + Seek>(
        &mut self,
        reader: &mut R,
        file_len: u64,
        chunk_size: usize,
    ) -> Result<()> {
        self.ensure_indexed_through(usize::MAX - 1, reader, file_len, chunk_size)?;
        Ok(())
    }

    /// Adds all line starts within `buf`, which has to be the data right after the scanned area.
    fn push_chunk(&mut self, buf: &[u8]) {
        let scan = scan_chunk(self.scanned, buf, self.lookback, self.terminator);

        trace!(
            "scanned {} bytes at {}, found {} line starts",
            buf.len(),
            self.scanned,
            scan.starts.len()
        );

        self.inner.extend(scan.starts);
        self.scanned = scan.scanned_to;
        self.lookback = scan.lookback;
    }

    /// Forget everything, the next scan starts at offset 0 again.
    pub fn reset(&mut self) {
        self.inner.clear();
        self.inner.push(0);
        self.scanned = 0;
        self.lookback = None;
        self.at_eof = false;
    }
}

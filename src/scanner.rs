/// Byte sequences recognized as line terminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Terminator {
    /// Only `\n` ends a line, `\r` is regular line content.
    Lf,
    /// `\n` or `\r\n` end a line. The `\r` is not part of the returned line.
    #[default]
    CrLf,
    /// `\n`, `\r\n` or a lone `\r` end a line.
    Any,
}

impl Terminator {
    /// Returns the length of `line`, a raw line read from the file, without its terminator.
    pub(crate) fn content_len(self, line: &[u8]) -> usize {
        let mut len = line.len();
        let ends_with = |len: usize, b: u8| len > 0 && line[len - 1] == b;

        match self {
            Terminator::Lf => {
                if ends_with(len, b'\n') {
                    len -= 1;
                }
            }
            Terminator::CrLf => {
                if ends_with(len, b'\n') {
                    len -= 1;
                    if ends_with(len, b'\r') {
                        len -= 1;
                    }
                }
            }
            Terminator::Any => {
                if ends_with(len, b'\n') {
                    len -= 1;
                }
                if ends_with(len, b'\r') {
                    len -= 1;
                }
            }
        }

        len
    }
}

/// Iterator over the line start offsets within a single buffer read from a file.
///
/// `base` is the file offset of `buf[0]`. The previous buffers last byte has to be passed as
/// `lookback`, so a `\r\n` split between two buffers is not counted twice. Once exhausted,
/// [`LineStarts::resume`] tells where and with which lookback the next buffer has to be scanned.
#[derive(Debug, Clone)]
pub struct LineStarts<'a> {
    buf: &'a [u8],
    base: u64,
    pos: usize,
    terminator: Terminator,
    pending_cr: bool,
    lookback: Option<u8>,
}

impl<'a> LineStarts<'a> {
    pub fn new(base: u64, buf: &'a [u8], lookback: Option<u8>, terminator: Terminator) -> Self {
        Self {
            buf,
            base,
            pos: 0,
            terminator,
            pending_cr: terminator == Terminator::Any && lookback == Some(b'\r'),
            lookback,
        }
    }

    /// Returns the offset up to which bytes were consumed and the last consumed byte.
    #[inline]
    pub fn resume(&self) -> (u64, Option<u8>) {
        let lookback = match self.pos {
            0 => self.lookback,
            pos => Some(self.buf[pos - 1]),
        };
        (self.base + self.pos as u64, lookback)
    }

    #[inline]
    fn offset(&self) -> u64 {
        self.base + self.pos as u64
    }
}

impl<'a> Iterator for LineStarts<'a> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.pending_cr {
            // A lone \r only ends a line once we know the next byte isn't \n
            let next = *self.buf.get(self.pos)?;
            self.pending_cr = false;
            if next == b'\n' {
                self.pos += 1;
            }
            return Some(self.offset());
        }

        while let Some(&b) = self.buf.get(self.pos) {
            self.pos += 1;
            match b {
                b'\n' => return Some(self.offset()),
                b'\r' if self.terminator == Terminator::Any => {
                    self.pending_cr = true;
                    return self.next();
                }
                _ => (),
            }
        }

        None
    }
}

/// The result of scanning a single buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkScan {
    /// Start offsets of every line beginning within the buffer, in order.
    pub starts: Vec<u64>,
    /// Offset right after the last consumed byte.
    pub scanned_to: u64,
    /// Last consumed byte, to be passed to the next scan.
    pub lookback: Option<u8>,
    /// `true` if the buffer ended in the middle of a line.
    pub incomplete: bool,
}

impl ChunkScan {
    /// Offset right after the last complete line found, if any.
    #[inline]
    pub fn watermark(&self) -> Option<u64> {
        self.starts.last().copied()
    }
}

/// Scans `buf`, which was read from the file at offset `base`, for line starts.
pub fn scan_chunk(
    base: u64,
    buf: &[u8],
    lookback: Option<u8>,
    terminator: Terminator,
) -> ChunkScan {
    let mut iter = LineStarts::new(base, buf, lookback, terminator);
    let starts: Vec<u64> = iter.by_ref().collect();
    let (scanned_to, lookback) = iter.resume();

    let incomplete = match starts.last() {
        Some(last) => *last < scanned_to,
        None => !buf.is_empty(),
    };

    ChunkScan {
        starts,
        scanned_to,
        lookback,
        incomplete,
    }
}

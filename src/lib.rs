//!A library to read arbitrary lines of large, possibly growing files using an index which is
//!built lazily, only as far as the requested lines require it

/// A ring of recently read lines
pub mod cache;
pub mod config;
pub mod error;
/// A line reader bound to a path
pub mod file;
/// Shared, asynchronous access and background refreshing
pub mod follow;
/// The index of files
pub mod index;
/// Detection of appended, truncated and replaced files
pub mod monitor;
/// Reading lines from any `Source`
pub mod reader;
/// Finding line starts within raw bytes
pub mod scanner;
pub mod source;

pub use config::Config;
pub use error::Error;
pub use file::File;
pub use follow::{AsyncReadByLine, SharedReader};
pub use reader::LineReader;
pub use scanner::Terminator;
pub use source::Source;

use std::cmp::Ordering;

use index::Index;
pub type Result<T> = std::result::Result<T, error::Error>;

pub trait Indexable {
    /// Returns a reference to the files index.
    fn get_index(&self) -> &Index;

    /// Returns the amount of lines indexed so far. This is a lower bound of the files lines until
    /// it was scanned to its end.
    #[inline]
    fn known_lines(&self) -> usize {
        self.get_index().len()
    }
}

/// A trait defining behavior for reading certain lines directly from indexed files.
pub trait ReadByLine: Indexable {
    /// Reads the given line without its terminator and appends it to `buf`. Returns the amount of
    /// bytes appended.
    fn read_line_raw(&mut self, line: usize, buf: &mut Vec<u8>) -> Result<usize>;

    /// Returns the exact amount of lines, scanning the rest of the file if necessary.
    fn total_lines(&mut self) -> Result<usize>;

    /// Reads the given line
    fn line(&mut self, line: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_line_raw(line, &mut buf)?;
        Ok(buf)
    }

    /// Reads the given line as string
    fn read_line(&mut self, line: usize) -> Result<String> {
        Ok(String::from_utf8(self.line(line)?)?)
    }

    /// Reads the given line, returning `None` instead of an error if the file has no such line
    fn try_line(&mut self, line: usize) -> Result<Option<Vec<u8>>> {
        match self.line(line) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Do a binary search on `ReadByLine` implementing Types, since it provides everything required
    /// for binary search. Only works with sorted files
    #[inline]
    fn binary_search(&mut self, x: &str) -> Result<usize> {
        self.binary_search_by(|p| p.cmp(x))
    }

    /// Do a binary search by on `ReadByLine` implementing Types, since it provides everything required
    /// for binary search. Only works with sorted files
    fn binary_search_by<F>(&mut self, mut f: F) -> Result<usize>
    where
        F: FnMut(&str) -> std::cmp::Ordering,
    {
        let mut size = self.total_lines()?;
        let mut left = 0;
        let mut right = size;

        while left < right {
            let mid = left + size / 2;

            let cmp = f(&self.read_line(mid)?);

            if cmp == Ordering::Less {
                left = mid + 1;
            } else if cmp == Ordering::Greater {
                right = mid;
            } else {
                return Ok(mid);
            }

            size = right - left;
        }

        Err(error::Error::NotFound)
    }

    /// Do a binary search on `ReadByLine` implementing Types, since it provides everything required
    /// for binary search. Only works with sorted files
    #[inline]
    fn binary_search_raw(&mut self, x: &[u8]) -> Result<usize> {
        self.binary_search_raw_by(|p| p.cmp(x))
    }

    /// Do a binary search by on `ReadByLine` implementing Types, since it provides everything required
    /// for binary search. Only works with sorted files
    fn binary_search_raw_by<F>(&mut self, mut f: F) -> Result<usize>
    where
        F: FnMut(&[u8]) -> std::cmp::Ordering,
    {
        let mut size = self.total_lines()?;
        let mut left = 0;
        let mut right = size;

        let mut buf = Vec::new();

        while left < right {
            let mid = left + size / 2;

            buf.clear();
            self.read_line_raw(mid, &mut buf)?;
            let cmp = f(&buf);

            if cmp == Ordering::Less {
                left = mid + 1;
            } else if cmp == Ordering::Greater {
                right = mid;
            } else {
                return Ok(mid);
            }

            size = right - left;
        }

        Err(error::Error::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use rand::{distributions::Uniform, Rng};

    use super::*;
    use std::{
        fs,
        io::{prelude::*, BufReader, Cursor},
    };

    const INPUT_FILES: &[&str] = &["simple", "crlf", "no_newline", "sorted", "empty"];

    #[test]
    fn test() {
        for input_file in INPUT_FILES {
            let file = format!("./testfiles/{}", input_file);

            for chunk_size in [1, 7, 64, config::DEFAULT_CHUNK_SIZE] {
                let config = Config::default().with_chunk_size(chunk_size);

                // Test File
                let mut indexed_file =
                    File::open_with(&file, config).expect("failed opening file");
                test_reader(&mut indexed_file, &file);

                // Test in-memory data
                let data = fs::read(&file).unwrap();
                let mut indexed_data = LineReader::with_config(Cursor::new(data), config).unwrap();
                test_reader(&mut indexed_data, &file);
            }
        }
    }

    fn original_lines(original_file: &str) -> Vec<String> {
        let original = BufReader::new(fs::File::open(original_file).unwrap());
        original.lines().map(|i| i.unwrap()).collect()
    }

    fn test_reader<L: ReadByLine>(reader: &mut L, original_file: &str) {
        test_random(reader, original_file);
        test_sequencially(reader, original_file);
        test_backwards(reader, original_file);
    }

    fn test_sequencially<L: ReadByLine>(reader: &mut L, original_file: &str) {
        let orig_content = original_lines(original_file);

        for (line, original) in orig_content.iter().enumerate() {
            let read = reader.read_line(line);

            assert!(read.is_ok());
            assert_eq!(*original, read.unwrap());

            let mut buf = Vec::new();
            let res = reader.read_line_raw(line, &mut buf);
            assert!(res.is_ok());
            assert_eq!(*original, String::from_utf8(buf).unwrap());
        }

        assert_eq!(reader.total_lines().unwrap(), orig_content.len());
        assert!(reader.line(orig_content.len()).is_err());
    }

    fn test_backwards<L: ReadByLine>(reader: &mut L, original_file: &str) {
        let orig_content = original_lines(original_file);

        for (line, original) in orig_content.iter().enumerate().rev() {
            assert_eq!(*original, reader.read_line(line).unwrap());
        }
    }

    fn test_random<L: ReadByLine>(reader: &mut L, original_file: &str) {
        let orig_content = original_lines(original_file);
        if orig_content.is_empty() {
            assert!(reader.try_line(0).unwrap().is_none());
            return;
        }

        // Random access before the file was counted
        let lines: Vec<_> = rand::thread_rng()
            .sample_iter(Uniform::new(0, orig_content.len()))
            .take(orig_content.len() * 3)
            .collect();

        for line in lines {
            let original = orig_content.get(line).unwrap();
            let read = reader.read_line(line);

            assert!(read.is_ok());
            assert_eq!(*original, read.unwrap());
        }
    }

    #[test]
    fn test_binary_search() {
        let mut file = File::open("./testfiles/sorted").unwrap();
        let lines = original_lines("./testfiles/sorted");

        for (pos, line) in lines.iter().enumerate() {
            assert_eq!(file.binary_search(line).unwrap(), pos);
            assert_eq!(file.binary_search_raw(line.as_bytes()).unwrap(), pos);
        }

        assert!(matches!(file.binary_search("zzzz"), Err(Error::NotFound)));
        assert!(matches!(file.binary_search_raw(b""), Err(Error::NotFound)));
    }

    #[test]
    fn test_growth() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "one\ntwo\nthr").unwrap();
        tmp.flush().unwrap();

        let mut file = File::open(tmp.path()).unwrap();
        assert_eq!(file.read_line(2).unwrap(), "thr");
        assert_eq!(file.line_count(true).unwrap(), 3);
        let watermark = file.watermark();
        assert_eq!(watermark, 8);

        write!(tmp, "ee\nfour\n").unwrap();
        tmp.flush().unwrap();

        assert_eq!(file.read_line(0).unwrap(), "one");
        assert_eq!(file.watermark(), watermark);
        assert_eq!(file.read_line(2).unwrap(), "three");
        assert_eq!(file.read_line(3).unwrap(), "four");
        assert!(file.watermark() > watermark);
        assert_eq!(file.line_count(true).unwrap(), 4);
        assert!(file.try_line(4).unwrap().is_none());
    }

    #[test]
    fn test_growth_while_counting() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let mut file = File::open(tmp.path()).unwrap();
        assert_eq!(file.line_count(true).unwrap(), 0);

        for i in 0..50 {
            writeln!(tmp, "line {}", i).unwrap();
            tmp.flush().unwrap();
            assert_eq!(file.line_count(true).unwrap(), i + 1);
            assert_eq!(file.read_line(i).unwrap(), format!("line {}", i));
        }

        assert_eq!(file.read_line(7).unwrap(), "line 7");
    }

    #[test]
    fn test_truncation() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        fs::write(tmp.path(), "aaaa\nbbbb\ncccc\n").unwrap();

        let mut file = File::open(tmp.path()).unwrap();
        assert_eq!(file.line_count(true).unwrap(), 3);
        assert_eq!(file.read_line(2).unwrap(), "cccc");

        fs::write(tmp.path(), "x\ny\n").unwrap();
        assert_eq!(file.read_line(0).unwrap(), "x");
        assert_eq!(file.read_line(1).unwrap(), "y");
        assert_eq!(file.line_count(true).unwrap(), 2);
        assert!(matches!(
            file.line(2),
            Err(Error::LineNotFound { line: 2, lines: 2 })
        ));
    }

    #[test]
    fn test_rewritten_longer() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        fs::write(tmp.path(), "a\nb\n").unwrap();

        let mut file = File::open(tmp.path()).unwrap();
        assert_eq!(file.line_count(true).unwrap(), 2);

        // Bigger than before, but not an append
        fs::write(tmp.path(), "cc\ndd\nee\n").unwrap();
        assert_eq!(file.read_line(0).unwrap(), "cc");
        assert_eq!(file.line_count(true).unwrap(), 3);
    }

    #[test]
    fn test_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");
        fs::write(&path, "old\n").unwrap();

        let mut file = File::open(&path).unwrap();
        assert_eq!(file.read_line(0).unwrap(), "old");

        let replacement = dir.path().join("log.new");
        fs::write(&replacement, "new one\nsecond\n").unwrap();
        fs::rename(&replacement, &path).unwrap();

        assert_eq!(file.read_line(1).unwrap(), "second");
        assert_eq!(file.read_line(0).unwrap(), "new one");
        assert_eq!(file.line_count(true).unwrap(), 2);
        file.close();
    }

    #[test]
    fn test_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");
        fs::write(&path, "one\n").unwrap();

        let mut file = File::open(&path).unwrap();
        assert_eq!(file.read_line(0).unwrap(), "one");

        fs::remove_file(&path).unwrap();
        assert!(matches!(file.read_line(0), Err(Error::Io(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            File::open("./testfiles/does_not_exist"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_utf8() {
        let mut reader = LineReader::new(Cursor::new(b"ok\n\xff\xfe\n".to_vec())).unwrap();
        assert_eq!(reader.read_line(0).unwrap(), "ok");
        assert!(matches!(reader.read_line(1), Err(Error::Utf8(_))));
        assert_eq!(reader.line(1).unwrap(), b"\xff\xfe");
    }
}

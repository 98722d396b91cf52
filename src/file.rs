use std::{
    fs,
    io::{self, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use log::debug;

use crate::{config::Config, monitor::FileIdentity, reader::LineReader, source::Source, Result};

/// A line reader bound to a path.
pub type File = LineReader<PathFile>;

/// A wrapper around `std::fs::File` which remembers its path, so a replaced file can be detected
/// and reopened.
#[derive(Debug)]
pub struct PathFile {
    path: PathBuf,
    inner_file: fs::File,
}

impl PathFile {
    /// Open the file at `path` read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<PathFile> {
        let path = path.as_ref().to_path_buf();
        let inner_file = fs::File::open(&path)?;
        Ok(Self { path, inner_file })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for PathFile {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner_file.read(buf)
    }
}

impl Seek for PathFile {
    #[inline]
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner_file.seek(pos)
    }
}

impl Source for PathFile {
    /// Looks at the path rather than the open handle, so renaming another file over it is noticed.
    #[inline]
    fn identity(&mut self) -> io::Result<FileIdentity> {
        Ok(FileIdentity::from_metadata(&fs::metadata(&self.path)?))
    }

    fn reopen(&mut self) -> io::Result<()> {
        debug!("reopening {}", self.path.display());
        self.inner_file = fs::File::open(&self.path)?;
        Ok(())
    }
}

impl LineReader<PathFile> {
    /// Open a file for line access. The index gets built lazily by the queries.
    ///
    /// Returns an error if the file can't be opened.
    #[inline]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<File> {
        Self::open_with(path, Config::default())
    }

    /// Open a file for line access using a custom config.
    pub fn open_with<P: AsRef<Path>>(path: P, config: Config) -> Result<File> {
        LineReader::with_config(PathFile::open(path)?, config)
    }
}

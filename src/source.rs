use std::{
    fs,
    io::{self, Cursor, Read, Seek},
};

use crate::monitor::FileIdentity;

/// A seekable byte source lines can be read from.
pub trait Source: Read + Seek {
    /// Takes a snapshot of the sources current size and identity.
    fn identity(&mut self) -> io::Result<FileIdentity>;

    /// Called after the source was found to be truncated or replaced, before the index gets
    /// rebuilt. Sources bound to a path reopen it here.
    #[inline]
    fn reopen(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Source for fs::File {
    #[inline]
    fn identity(&mut self) -> io::Result<FileIdentity> {
        Ok(FileIdentity::from_metadata(&self.metadata()?))
    }
}

impl<T: AsRef<[u8]>> Source for Cursor<T> {
    #[inline]
    fn identity(&mut self) -> io::Result<FileIdentity> {
        Ok(FileIdentity::from_len(self.get_ref().as_ref().len() as u64))
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    #[inline]
    fn identity(&mut self) -> io::Result<FileIdentity> {
        (**self).identity()
    }

    #[inline]
    fn reopen(&mut self) -> io::Result<()> {
        (**self).reopen()
    }
}

use crate::{error::Error, scanner::Terminator, Result};

/// Default amount of bytes read from the file per scan step.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Tunables of a line reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Bytes read per scan step. Larger chunks mean fewer read calls but may scan further
    /// than the requested line.
    pub chunk_size: usize,
    /// Which byte sequences end a line.
    pub terminator: Terminator,
    /// Amount of recently read lines kept in memory. 0 disables the cache.
    pub recent_lines: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            terminator: Terminator::default(),
            recent_lines: 0,
        }
    }
}

impl Config {
    #[inline]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[inline]
    pub fn with_terminator(mut self, terminator: Terminator) -> Self {
        self.terminator = terminator;
        self
    }

    #[inline]
    pub fn with_recent_lines(mut self, recent_lines: usize) -> Self {
        self.recent_lines = recent_lines;
        self
    }

    /// Returns an error if the config can't be used to scan a file.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

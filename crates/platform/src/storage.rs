//! Storage abstraction for file systems

/// Storage trait for file system access
pub trait Storage {
    /// Error type
    type Error: core::fmt::Debug;
    /// File type
    type File<'a>: File
    where
        Self: 'a;

    /// Open file for reading
    async fn open_file<'a>(&'a mut self, path: &str) -> Result<Self::File<'a>, Self::Error>;
}

/// File trait for reading files
///
/// A file is closed when it is dropped.
pub trait File {
    /// Error type
    type Error: core::fmt::Debug;

    /// Read from current position; `Ok(0)` means end of file.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Get file size
    fn size(&self) -> u64;
}

//! Caller-facing wrappers around remote file handles.
//!
//! A successful open hands back a plain descriptor-backed
//! [`std::fs::File`] from the transport. The wrappers fix the
//! direction of traffic at the type level: a reader cannot be written,
//! a writer cannot be read, matching the mode the file was opened
//! with.

use std::fs::File;
use std::io::{self, Read, Write};

use modlink_proto::{MODE_APPEND, MODE_CREATE, MODE_TRUNCATE, MODE_WRITE_ONLY};

/// How a remote file is opened for writing.
///
/// Both modes create the file if it does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Discard any existing contents and start from an empty file.
    Truncate,
    /// Keep existing contents and position every write at the end.
    Append,
}

impl WriteMode {
    /// Wire open-mode bits for this mode.
    #[must_use]
    pub const fn to_wire(self) -> i32 {
        match self {
            Self::Truncate => MODE_WRITE_ONLY | MODE_CREATE | MODE_TRUNCATE,
            Self::Append => MODE_WRITE_ONLY | MODE_CREATE | MODE_APPEND,
        }
    }
}

/// Read half of a remote file.
#[derive(Debug)]
pub struct RemoteFileReader {
    file: File,
}

impl RemoteFileReader {
    pub(crate) fn new(file: File) -> Self {
        Self { file }
    }

    /// Unwrap into the raw descriptor-backed file.
    #[must_use]
    pub fn into_inner(self) -> File {
        self.file
    }
}

impl Read for RemoteFileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// Write half of a remote file.
#[derive(Debug)]
pub struct RemoteFileWriter {
    file: File,
}

impl RemoteFileWriter {
    pub(crate) fn new(file: File) -> Self {
        Self { file }
    }

    /// Unwrap into the raw descriptor-backed file.
    #[must_use]
    pub fn into_inner(self) -> File {
        self.file
    }
}

impl Write for RemoteFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use modlink_proto::MODE_READ_ONLY;

    use super::*;

    #[test]
    fn test_write_modes_share_write_and_create_bits() {
        for mode in [WriteMode::Truncate, WriteMode::Append] {
            let wire = mode.to_wire();
            assert_ne!(wire & MODE_WRITE_ONLY, 0);
            assert_ne!(wire & MODE_CREATE, 0);
            assert_eq!(wire & MODE_READ_ONLY, 0);
        }
    }

    #[test]
    fn test_write_modes_differ_in_positioning() {
        assert_ne!(
            WriteMode::Truncate.to_wire() & MODE_TRUNCATE,
            0,
            "truncate mode must carry the truncate bit"
        );
        assert_ne!(
            WriteMode::Append.to_wire() & MODE_APPEND,
            0,
            "append mode must carry the append bit"
        );
        assert_eq!(WriteMode::Truncate.to_wire() & MODE_APPEND, 0);
        assert_eq!(WriteMode::Append.to_wire() & MODE_TRUNCATE, 0);
    }
}

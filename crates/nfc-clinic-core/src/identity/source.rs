//! Identity sources and UID decoding.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A failed identity read. Always treated as transient by the poller.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("identity device I/O: {0}")]
    Io(#[from] io::Error),

    #[error("short read: got {got} bytes, need {need}")]
    ShortRead { got: usize, need: usize },
}

/// Something that yields raw tag bytes, blocking until a tag is presented
/// or failing if the reader is absent.
pub trait IdentitySource: Send {
    fn read_tag(&mut self) -> io::Result<Vec<u8>>;
}

/// Raw HID device node (e.g. `/dev/hidraw0`), reopened on every attempt so
/// a reader plugged in later is picked up.
#[derive(Debug, Clone)]
pub struct DeviceSource {
    path: PathBuf,
    read_len: usize,
}

impl DeviceSource {
    pub fn new(path: impl AsRef<Path>, read_len: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            read_len,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentitySource for DeviceSource {
    fn read_tag(&mut self) -> io::Result<Vec<u8>> {
        let mut file = File::open(&self.path)?;
        let mut buf = vec![0u8; self.read_len];
        let n = file.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }
}

/// Encode the first `uid_len` bytes as an uppercase hex UID.
pub fn decode_uid(bytes: &[u8], uid_len: usize) -> Result<String, ReadError> {
    if bytes.len() < uid_len {
        return Err(ReadError::ShortRead {
            got: bytes.len(),
            need: uid_len,
        });
    }
    Ok(hex::encode_upper(&bytes[..uid_len]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_decode_uses_prefix_only() {
        let bytes = [0x0A, 0x1B, 0x2C, 0x3D, 0xFF, 0xEE, 0x00];
        assert_eq!(decode_uid(&bytes, 4).unwrap(), "0A1B2C3D");
    }

    #[test]
    fn test_decode_uppercase_and_padded() {
        assert_eq!(decode_uid(&[0x01, 0xab, 0x00, 0xcd], 4).unwrap(), "01AB00CD");
    }

    #[test]
    fn test_decode_short_read() {
        let err = decode_uid(&[0x01, 0x02], 4).unwrap_err();
        assert!(matches!(err, ReadError::ShortRead { got: 2, need: 4 }));
    }

    #[test]
    fn test_device_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = DeviceSource::new(dir.path().join("hidraw-missing"), 16);
        assert!(source.read_tag().is_err());
    }

    #[test]
    fn test_device_reads_up_to_read_len() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hidraw0");
        let mut file = File::create(&path).unwrap();
        file.write_all(&[0x1A; 32]).unwrap();

        let mut source = DeviceSource::new(&path, 16);
        let bytes = source.read_tag().unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(decode_uid(&bytes, 4).unwrap(), "1A1A1A1A");
    }
}

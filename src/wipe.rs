//! Multi-pass secure file deletion.
//!
//! Single-pass deletion can leave recoverable remnants on naive
//! filesystems; the zero / ones / random sequence is the conventional
//! defense-in-depth wipe before the directory entry is removed.

use crate::error::ContainerError;
use getrandom::fill;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

const WIPE_CHUNK: usize = 4096;

#[derive(Clone, Copy)]
enum WipePattern {
    Zeros,
    Ones,
    Random,
}

/// Overwrites the file at `path` with three full passes (zeros, ones,
/// random) and then unlinks it. Empty files are unlinked directly.
pub fn secure_delete(path: &Path) -> Result<(), ContainerError> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ContainerError::FileNotFound(path.to_path_buf()),
            _ => ContainerError::Io(e),
        })?;

    let len = file.metadata()?.len();

    if len == 0 {
        drop(file);
        fs::remove_file(path)?;
        return Ok(());
    }

    for pattern in [WipePattern::Zeros, WipePattern::Ones, WipePattern::Random] {
        overwrite(&mut file, len, pattern)?;
    }
    drop(file);

    // even if the unlink fails, the contents are gone
    fs::remove_file(path)?;
    Ok(())
}

/// One full-length overwrite pass, flushed to storage before returning.
fn overwrite(file: &mut File, len: u64, pattern: WipePattern) -> Result<(), ContainerError> {
    file.seek(SeekFrom::Start(0))?;

    let mut buf = [0u8; WIPE_CHUNK];
    match pattern {
        WipePattern::Zeros => buf.fill(0x00),
        WipePattern::Ones => buf.fill(0xFF),
        WipePattern::Random => {}
    }

    let mut remaining = len;
    while remaining > 0 {
        let chunk = remaining.min(WIPE_CHUNK as u64) as usize;
        if let WipePattern::Random = pattern {
            fill(&mut buf[..chunk])
                .map_err(|_| io::Error::other("OS random generator unavailable"))?;
        }
        file.write_all(&buf[..chunk])?;
        remaining -= chunk as u64;
    }

    file.flush()?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn wipes_and_removes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doomed.bin");
        fs::write(&path, vec![0xABu8; 10_000]).unwrap();

        secure_delete(&path).unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn removes_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        fs::write(&path, b"").unwrap();

        secure_delete(&path).unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn missing_file_reports_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.bin");

        assert!(matches!(
            secure_delete(&path),
            Err(ContainerError::FileNotFound(_))
        ));
    }

    #[test]
    fn zero_pass_covers_whole_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("target.bin");
        fs::write(&path, vec![0xABu8; 5000]).unwrap();

        let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        overwrite(&mut file, 5000, WipePattern::Zeros).unwrap();
        drop(file);

        let contents = fs::read(&path).unwrap();
        assert_eq!(contents.len(), 5000);
        assert!(contents.iter().all(|&b| b == 0x00));
    }

    #[test]
    fn ones_pass_covers_whole_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("target.bin");
        fs::write(&path, vec![0u8; 5000]).unwrap();

        let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        overwrite(&mut file, 5000, WipePattern::Ones).unwrap();
        drop(file);

        let contents = fs::read(&path).unwrap();
        assert_eq!(contents.len(), 5000);
        assert!(contents.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn random_pass_changes_contents_and_keeps_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("target.bin");
        let original = vec![0u8; 5000];
        fs::write(&path, &original).unwrap();

        let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        overwrite(&mut file, 5000, WipePattern::Random).unwrap();
        drop(file);

        let contents = fs::read(&path).unwrap();
        assert_eq!(contents.len(), 5000);
        assert_ne!(contents, original);
    }
}

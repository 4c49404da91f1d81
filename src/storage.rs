//! Crash-safe output files.
//!
//! Every file-producing operation streams into a randomly named temporary
//! file next to the destination and only renames it into place once the
//! contents are complete and synced. If a crash or error interrupts the
//! write, the destination is left untouched.

use anyhow::{Context, Result};
use getrandom::fill;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A streaming writer whose output only becomes visible at the target path
/// after [`commit`](AtomicFile::commit).
///
/// Dropping an uncommitted `AtomicFile` removes the temporary file.
pub struct AtomicFile {
    target: PathBuf,
    tmp_path: PathBuf,
    writer: Option<BufWriter<File>>,
    committed: bool,
}

impl AtomicFile {
    /// Opens a temporary file next to `target`, creating parent directories
    /// as needed.
    pub fn create(target: &Path) -> Result<Self> {
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = random_tmp_path(target)?;

        // securely create temp file (fail if exists)
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
            .context("failed to create temporary file")?;

        Ok(Self {
            target: target.to_path_buf(),
            tmp_path,
            writer: Some(BufWriter::new(file)),
            committed: false,
        })
    }

    /// Flushes, fsyncs, and atomically renames the temporary file over the
    /// target, then syncs the parent directory so the rename is persisted.
    pub fn commit(mut self) -> Result<()> {
        let Some(mut writer) = self.writer.take() else {
            anyhow::bail!("output file already finalized");
        };
        writer.flush()?;

        let file = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .context("failed to flush output file")?;
        file.sync_all()?;
        drop(file);

        atomic_replace(&self.tmp_path, &self.target)?;
        self.committed = true;

        // directories cannot be opened for syncing on Windows; ReplaceFileW
        // with write-through already persists the rename there
        #[cfg(not(target_os = "windows"))]
        if let Some(parent) = self.target.parent() {
            if !parent.as_os_str().is_empty() {
                let dir = File::open(parent)?;
                dir.sync_all()?;
            }
        }

        Ok(())
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(io::Error::other("output file already finalized")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if !self.committed {
            // release the handle before unlinking, Windows insists
            self.writer.take();
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

/// Generates a unique temporary file path in the same directory.
///
/// Format: `filename.tmp.<randomhex>`, with the random part drawn from the
/// OS generator to avoid collisions.
fn random_tmp_path(target: &Path) -> Result<PathBuf> {
    let mut buf = [0u8; 8]; // 64 bit entropy
    fill(&mut buf)?;

    let rand_string = buf.iter().map(|b| format!("{:02x}", b)).collect::<String>();

    let file_name = target
        .file_name()
        .context("output path has no file name")?
        .to_string_lossy();

    let tmp_name = format!("{}.tmp.{}", file_name, rand_string);

    Ok(target.with_file_name(tmp_name))
}

/// Atomically replaces the target file with the temporary file.
///
/// Uses Windows `ReplaceFileW` with `REPLACEFILE_WRITE_THROUGH` when the
/// target already exists; a plain rename otherwise.
#[cfg(target_os = "windows")]
fn atomic_replace(tmp_path: &Path, target: &Path) -> Result<()> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::{REPLACEFILE_WRITE_THROUGH, ReplaceFileW};

    if !target.exists() {
        fs::rename(tmp_path, target)?;
        return Ok(());
    }

    fn to_wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    let target_w = to_wide(target.as_os_str());
    let tmp_w = to_wide(tmp_path.as_os_str());

    // SAFETY:
    // - Strings are valid UTF-16 and null-terminated
    // - Pointers remain valid during the call
    // - Windows does not retain the pointers after return
    let result = unsafe {
        ReplaceFileW(
            target_w.as_ptr(),
            tmp_w.as_ptr(),
            std::ptr::null(),
            REPLACEFILE_WRITE_THROUGH,
            std::ptr::null(),
            std::ptr::null(),
        )
    };

    if result == 0 {
        let err = std::io::Error::last_os_error();
        return Err(err).context("atomic replace failed");
    }

    Ok(())
}

/// Atomically replaces the target file with the temporary file.
///
/// On Unix, `rename()` is atomic when both paths are on the same filesystem.
#[cfg(not(target_os = "windows"))]
fn atomic_replace(tmp_path: &Path, target: &Path) -> Result<()> {
    fs::rename(tmp_path, target)?;
    Ok(())
}

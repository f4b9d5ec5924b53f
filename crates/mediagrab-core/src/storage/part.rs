//! A `.part` file that is either committed under its final name or removed.

use anyhow::{Context, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;
#[cfg(unix)]
use std::os::unix::fs::FileExt;

use super::temp_path;

/// Open temp file for one save. Consumed by [`commit`](Self::commit) or
/// [`abandon`](Self::abandon).
pub struct PartFile {
    file: File,
    temp: PathBuf,
    target: PathBuf,
}

impl PartFile {
    /// Creates `<final_path>.part`, truncating a leftover from an earlier run.
    pub fn create(final_path: &Path) -> Result<Self> {
        let temp = temp_path(final_path);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp)
            .with_context(|| format!("failed to create temp file: {}", temp.display()))?;
        Ok(Self {
            file,
            temp,
            target: final_path.to_path_buf(),
        })
    }

    /// Reserves `len` bytes up front when the payload size is known.
    pub fn reserve(&self, len: u64) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        #[cfg(target_os = "linux")]
        {
            let r = unsafe { libc::posix_fallocate(self.file.as_raw_fd(), 0, len as libc::off_t) };
            if r == 0 {
                return Ok(());
            }
            tracing::debug!(errno = r, "posix_fallocate failed, using set_len");
        }
        self.file.set_len(len).context("failed to reserve space")
    }

    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.file
            .write_all_at(data, offset)
            .with_context(|| format!("write to {} failed", self.temp.display()))
    }

    #[cfg(not(unix))]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let mut f = &self.file;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)
            .with_context(|| format!("write to {} failed", self.temp.display()))
    }

    /// `io::Write` appending from offset 0, for streamed bodies.
    pub fn writer(&self) -> PartWriter<'_> {
        PartWriter {
            part: self,
            offset: 0,
        }
    }

    /// Syncs and renames onto the final path, replacing any existing file.
    pub fn commit(self) -> Result<PathBuf> {
        self.file.sync_all().context("sync failed")?;
        let PartFile { file, temp, target } = self;
        drop(file);
        std::fs::rename(&temp, &target).with_context(|| {
            format!("failed to rename {} to {}", temp.display(), target.display())
        })?;
        Ok(target)
    }

    /// Removes the temp file after a failed save.
    pub fn abandon(self) {
        let PartFile { file, temp, .. } = self;
        drop(file);
        if let Err(e) = std::fs::remove_file(&temp) {
            tracing::debug!(path = %temp.display(), "could not remove temp file: {}", e);
        }
    }
}

/// Sequential writer over a [`PartFile`].
pub struct PartWriter<'a> {
    part: &'a PartFile,
    offset: u64,
}

impl PartWriter<'_> {
    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.offset
    }
}

impl io::Write for PartWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.part
            .write_at(self.offset, buf)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:#}", e)))?;
        self.offset += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

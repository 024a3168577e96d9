//! File-backed line journal.
//!
//! [`FileJournal`] appends newline-terminated UTF-8 lines to a single file
//! opened in read + append mode. The file is never rewritten. The only
//! truncations ever performed roll back the bytes of an append that failed
//! part way, and on open cut off a trailing partial line left by a crash,
//! so replay never sees a torn line.

use super::error::JournalError;
use super::journal::{Journal, JournalLines};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// An append-only text journal stored in one file.
///
/// # Example
///
/// ```rust,no_run
/// use seqlog_rs::sequencer::{FileJournal, Journal};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut journal = FileJournal::open("/tmp/sequencer/file.txt")?;
/// journal.append_line("2024-03-01T12:30:45Z|1|1|D|order1")?;
/// # Ok(())
/// # }
/// ```
pub struct FileJournal {
    /// Location of the journal file.
    path: PathBuf,
    /// Handle opened for append; also used for rollback truncation.
    file: File,
    /// Bytes known to hold complete lines.
    len: u64,
    /// Whether every append is followed by `sync_data`.
    sync_on_append: bool,
}

impl FileJournal {
    /// Open or create the journal at `path`.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] if the directory or file cannot be created
    /// or opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| JournalError::io_at(e, parent))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| JournalError::io_at(e, &path))?;

        // Existing file: resume after the last complete line. A tail with no
        // newline is what an interrupted append leaves behind; it was never
        // published, so it is cut off before anything is appended after it.
        let on_disk = file
            .metadata()
            .map_err(|e| JournalError::io_at(e, &path))?
            .len();
        let len = committed_len(&file, on_disk).map_err(|e| JournalError::io_at(e, &path))?;
        if len < on_disk {
            warn!(
                path = %path.display(),
                on_disk,
                committed = len,
                "discarding partial line left by an interrupted append"
            );
            file.set_len(len).map_err(|e| JournalError::io_at(e, &path))?;
        }

        debug!(path = %path.display(), len, "opened journal");

        Ok(Self {
            path,
            file,
            len,
            sync_on_append: false,
        })
    }

    /// Call `sync_data` after every append.
    #[must_use]
    pub fn with_sync_on_append(mut self, sync: bool) -> Self {
        self.sync_on_append = sync;
        self
    }

    /// Path of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Undo a partial append by cutting the file back to `self.len`.
    fn rollback(&self) {
        if let Err(e) = self.file.set_len(self.len) {
            warn!(
                path = %self.path.display(),
                len = self.len,
                error = %e,
                "failed to roll back partial journal append"
            );
        }
    }
}

impl Journal for FileJournal {
    fn append_line(&mut self, line: &str) -> Result<(), JournalError> {
        let mut buf = Vec::with_capacity(line.len().saturating_add(1));
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        let written = self.file.write_all(&buf).and_then(|()| {
            if self.sync_on_append {
                self.file.sync_data()
            } else {
                Ok(())
            }
        });

        if let Err(e) = written {
            self.rollback();
            return Err(JournalError::io_at(e, &self.path));
        }

        self.len = self.len.saturating_add(buf.len() as u64);
        Ok(())
    }

    fn read_lines(&self) -> Result<JournalLines<'_>, JournalError> {
        let file = File::open(&self.path).map_err(|e| JournalError::io_at(e, &self.path))?;
        Ok(Box::new(LineIterator {
            reader: BufReader::new(file),
            path: self.path.clone(),
            offset: 0,
            limit: self.len,
            buf: Vec::new(),
        }))
    }

    fn flush(&mut self) -> Result<(), JournalError> {
        self.file
            .sync_data()
            .map_err(|e| JournalError::io_at(e, &self.path))
    }

    fn len(&self) -> u64 {
        self.len
    }
}

impl std::fmt::Debug for FileJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileJournal")
            .field("path", &self.path)
            .field("len", &self.len)
            .field("sync_on_append", &self.sync_on_append)
            .finish()
    }
}

/// Length of the longest prefix of `file` that ends in a newline.
fn committed_len(file: &File, len: u64) -> std::io::Result<u64> {
    const CHUNK: u64 = 4096;

    let mut reader = file;
    let mut buf = [0u8; CHUNK as usize];
    let mut end = len;
    while end > 0 {
        let start = end.saturating_sub(CHUNK);
        let chunk = &mut buf[..(end - start) as usize];
        reader.seek(SeekFrom::Start(start))?;
        reader.read_exact(chunk)?;
        if let Some(pos) = chunk.iter().rposition(|&b| b == b'\n') {
            return Ok(start + pos as u64 + 1);
        }
        end = start;
    }
    Ok(0)
}

// ─── Iteration ──────────────────────────────────────────────────────────────

/// Reads newline-terminated lines up to the committed length.
struct LineIterator {
    reader: BufReader<File>,
    path: PathBuf,
    offset: u64,
    limit: u64,
    buf: Vec<u8>,
}

impl Iterator for LineIterator {
    type Item = Result<String, JournalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.limit {
            return None;
        }

        self.buf.clear();
        let read = match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => return None,
            Ok(n) => n,
            Err(e) => {
                self.offset = self.limit;
                return Some(Err(JournalError::io_at(e, &self.path)));
            }
        };

        let start = self.offset;
        self.offset = self.offset.saturating_add(read as u64);

        // Every committed line ends in a newline inside the committed range.
        if self.buf.pop() != Some(b'\n') || self.offset > self.limit {
            self.offset = self.limit;
            return Some(Err(JournalError::TornLine { offset: start }));
        }

        match String::from_utf8(std::mem::take(&mut self.buf)) {
            Ok(line) => Some(Ok(line)),
            Err(_) => Some(Err(JournalError::InvalidUtf8 { offset: start })),
        }
    }
}

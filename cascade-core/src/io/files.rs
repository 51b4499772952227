//! Output Files
//!
//! Each action owns an [`OutputFiles`] registry holding the streams it opened.
//! The registry is what makes flushing and closing an action's output a
//! bookkeeping operation instead of something every action reimplements.
//!
//! # Single writer
//!
//! In a run with several cooperating processes only rank 0 writes shared
//! output. Opening a file for writing on any other rank still succeeds and
//! returns a usable handle, but the handle writes into a discard sink and the
//! requested path is never touched.
//!
//! [`FileMode::Append`] counts as writing: appends from ranks other than 0
//! are diverted to the sink as well, not only truncating opens.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;

use crate::context::Communicator;
use crate::error::{Error, Result};

/// Handle to a stream owned by one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileHandle(u64);

impl FileHandle {
    /// Get the raw handle value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

/// How an output stream is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Truncate or create.
    Write,
    /// Append to an existing file, creating it if needed.
    Append,
}

impl FileMode {
    /// Whether the mode writes to the target.
    pub fn writes(&self) -> bool {
        matches!(self, FileMode::Write | FileMode::Append)
    }
}

impl FromStr for FileMode {
    type Err = Error;

    /// Accepts C-style mode strings such as `"w"`, `"a"` or `"wb+"`.
    fn from_str(mode: &str) -> Result<Self> {
        if mode.contains('w') {
            Ok(FileMode::Write)
        } else if mode.contains('a') {
            Ok(FileMode::Append)
        } else {
            Err(Error::InvalidMode(mode.to_string()))
        }
    }
}

enum Target {
    File(BufWriter<File>),
    Discard(io::Sink),
}

/// An open output stream.
pub struct OutputFile {
    path: PathBuf,
    target: Target,
}

impl OutputFile {
    /// The path that was requested when opening.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether writes are being discarded on this process.
    pub fn is_discarding(&self) -> bool {
        matches!(self.target, Target::Discard(_))
    }

    fn io_error(&self, source: io::Error) -> Error {
        Error::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Write a whole string, mapping failures to [`Error::Io`].
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        self.write_all(text.as_bytes())
            .map_err(|source| self.io_error(source))
    }
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.target {
            Target::File(writer) => writer.write(buf),
            Target::Discard(sink) => sink.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.target {
            Target::File(writer) => writer.flush(),
            Target::Discard(sink) => sink.flush(),
        }
    }
}

impl fmt::Debug for OutputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputFile")
            .field("path", &self.path)
            .field("discarding", &self.is_discarding())
            .finish()
    }
}

/// The set of streams opened by a single action.
#[derive(Debug, Default)]
pub struct OutputFiles {
    next: u64,
    open: IndexMap<FileHandle, OutputFile>,
}

impl OutputFiles {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` and register the stream.
    ///
    /// Writing modes on a process that is not the designated writer get a
    /// discard sink instead of the file.
    pub fn open(
        &mut self,
        path: impl AsRef<Path>,
        mode: FileMode,
        comm: &Communicator,
    ) -> Result<FileHandle> {
        let path = path.as_ref().to_path_buf();
        let target = if mode.writes() && !comm.is_designated_writer() {
            tracing::debug!(path = %path.display(), rank = comm.rank(), "discarding output on non-writer rank");
            Target::Discard(io::sink())
        } else {
            let mut options = OpenOptions::new();
            match mode {
                FileMode::Write => options.write(true).create(true).truncate(true),
                FileMode::Append => options.append(true).create(true),
            };
            let file = options.open(&path).map_err(|source| Error::Open {
                path: path.clone(),
                source,
            })?;
            Target::File(BufWriter::new(file))
        };

        let handle = FileHandle(self.next);
        self.next += 1;
        self.open.insert(handle, OutputFile { path, target });
        Ok(handle)
    }

    /// Access an open stream.
    pub fn get_mut(&mut self, handle: FileHandle) -> Result<&mut OutputFile> {
        self.open
            .get_mut(&handle)
            .ok_or(Error::UnknownHandle(handle.raw()))
    }

    /// Access an open stream immutably.
    pub fn get(&self, handle: FileHandle) -> Option<&OutputFile> {
        self.open.get(&handle)
    }

    /// Flush, unregister and release a stream.
    pub fn close(&mut self, handle: FileHandle) -> Result<()> {
        let mut file = self
            .open
            .shift_remove(&handle)
            .ok_or(Error::UnknownHandle(handle.raw()))?;
        file.flush().map_err(|source| file.io_error(source))
    }

    /// Flush every open stream without closing any of them.
    pub fn flush_all(&mut self) -> Result<()> {
        for file in self.open.values_mut() {
            file.flush().map_err(|source| file.io_error(source))?;
        }
        Ok(())
    }

    /// Close every stream, reporting the first failure.
    pub fn close_all(&mut self) -> Result<()> {
        let mut first = None;
        for (_, mut file) in self.open.drain(..) {
            if let Err(source) = file.flush() {
                first.get_or_insert(file.io_error(source));
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Number of open streams.
    pub fn len(&self) -> usize {
        self.open.len()
    }

    /// Whether no stream is open.
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

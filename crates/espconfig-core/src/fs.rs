//! Filesystem collaborator abstraction.
//!
//! The store treats flash storage as an opaque map from path to byte
//! stream. Platforms provide an implementation:
//! - Host: `espconfig_hostfs::HostFs` (directory-backed)
//! - Tests and simulations: [`MemoryFs`]
//!
//! All methods are synchronous to match the single-threaded firmware loop.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Cursor, Write};
use std::rc::Rc;

use crate::error::FsError;

/// Abstract flash filesystem.
pub trait Filesystem {
    /// Handle returned by [`open_read`](Self::open_read). Released on drop.
    type Reader: io::Read;

    /// Handle returned by [`open_write`](Self::open_write). Released by
    /// [`close`](Self::close).
    type Writer: io::Write;

    /// Make the filesystem available for file operations.
    fn mount(&mut self) -> Result<(), FsError>;

    /// Check whether a file exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Open an existing file for reading.
    fn open_read(&self, path: &str) -> Result<Self::Reader, FsError>;

    /// Open a file for writing, truncating any existing content.
    fn open_write(&self, path: &str) -> Result<Self::Writer, FsError>;

    /// Flush and release a write handle.
    fn close(&self, writer: Self::Writer) -> Result<(), FsError>;
}

#[derive(Debug, Default)]
struct MemoryFsState {
    files: HashMap<String, Vec<u8>>,
    mounted: bool,
    fail_mount: bool,
    fail_reads: bool,
    fail_writes: bool,
}

/// In-memory filesystem.
///
/// Clones share the same files, the way two stores on one device share one
/// flash partition. Not thread-safe.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    state: Rc<RefCell<MemoryFsState>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `mount` fail.
    pub fn fail_mount(&self) {
        self.state.borrow_mut().fail_mount = true;
    }

    /// Make opening files for reading fail (or succeed again) from now on.
    pub fn fail_reads(&self, fail: bool) {
        self.state.borrow_mut().fail_reads = fail;
    }

    /// Make writes fail (or succeed again) from now on.
    ///
    /// Failing writers error on the first write, leaving an empty file.
    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }

    pub fn is_mounted(&self) -> bool {
        self.state.borrow().mounted
    }

    /// Seed a file directly, bypassing mount state.
    pub fn write_file(&self, path: &str, contents: impl Into<Vec<u8>>) {
        self.state
            .borrow_mut()
            .files
            .insert(path.to_string(), contents.into());
    }

    /// Read a file back as text, bypassing mount state.
    pub fn read_file(&self, path: &str) -> Option<String> {
        self.state
            .borrow()
            .files
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    fn ensure_mounted(&self) -> Result<(), FsError> {
        if self.state.borrow().mounted {
            Ok(())
        } else {
            Err(FsError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "filesystem not mounted",
            )))
        }
    }
}

impl Filesystem for MemoryFs {
    type Reader = Cursor<Vec<u8>>;
    type Writer = MemoryFile;

    fn mount(&mut self) -> Result<(), FsError> {
        let mut state = self.state.borrow_mut();
        if state.fail_mount {
            return Err(FsError::MountFailed("simulated mount failure".to_string()));
        }
        state.mounted = true;
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        let state = self.state.borrow();
        state.mounted && state.files.contains_key(path)
    }

    fn open_read(&self, path: &str) -> Result<Self::Reader, FsError> {
        self.ensure_mounted()?;
        let state = self.state.borrow();
        if state.fail_reads {
            return Err(FsError::Io(io::Error::other("simulated read failure")));
        }
        state
            .files
            .get(path)
            .map(|bytes| Cursor::new(bytes.clone()))
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    fn open_write(&self, path: &str) -> Result<Self::Writer, FsError> {
        self.ensure_mounted()?;
        let fail = {
            let mut state = self.state.borrow_mut();
            state.files.insert(path.to_string(), Vec::new());
            state.fail_writes
        };

        Ok(MemoryFile {
            path: path.to_string(),
            buffer: Vec::new(),
            fail,
            state: Rc::clone(&self.state),
        })
    }

    fn close(&self, mut writer: Self::Writer) -> Result<(), FsError> {
        writer.flush()?;
        Ok(())
    }
}

/// Write handle into a [`MemoryFs`]. Content becomes visible on flush.
#[derive(Debug)]
pub struct MemoryFile {
    path: String,
    buffer: Vec<u8>,
    fail: bool,
    state: Rc<RefCell<MemoryFsState>>,
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail {
            return Err(io::Error::other("simulated write failure"));
        }
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::other("simulated flush failure"));
        }
        self.state
            .borrow_mut()
            .files
            .insert(self.path.clone(), self.buffer.clone());
        Ok(())
    }
}

use std::fs::OpenOptions;

/// How the underlying store file is opened.
///
/// Mirrors the `RandomAccessFile` access modes the on-disk format grew
/// up with: `"r"`, `"rw"`, `"rwd"` and `"rws"`. The sync variants ask
/// the OS to write payload bytes (and, for [`AccessMode::ReadWriteSyncAll`],
/// file metadata) through to the device on every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-only; mutating operations fail with an I/O error.
    ReadOnly,
    /// Read-write.
    ReadWrite,
    /// Read-write with synchronous content writes ("rwd").
    ReadWriteSyncData,
    /// Read-write with synchronous content and metadata writes ("rws").
    ReadWriteSyncAll,
}

impl Default for AccessMode {
    fn default() -> Self {
        AccessMode::ReadWrite
    }
}

impl AccessMode {
    /// Open options for this mode, sync flags included where the
    /// platform supports them.
    pub(crate) fn open_options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(true);
        if self != AccessMode::ReadOnly {
            options.write(true);
        }
        self.apply_sync_flags(&mut options);
        options
    }

    #[cfg(unix)]
    fn apply_sync_flags(self, options: &mut OpenOptions) {
        use std::os::unix::fs::OpenOptionsExt;

        match self {
            AccessMode::ReadWriteSyncData => {
                options.custom_flags(libc::O_DSYNC);
            }
            AccessMode::ReadWriteSyncAll => {
                options.custom_flags(libc::O_SYNC);
            }
            AccessMode::ReadOnly | AccessMode::ReadWrite => {}
        }
    }

    #[cfg(windows)]
    fn apply_sync_flags(self, options: &mut OpenOptions) {
        use std::os::windows::fs::OpenOptionsExt;
        use winapi::um::winbase::FILE_FLAG_WRITE_THROUGH;

        if matches!(
            self,
            AccessMode::ReadWriteSyncData | AccessMode::ReadWriteSyncAll
        ) {
            options.custom_flags(FILE_FLAG_WRITE_THROUGH);
        }
    }

    #[cfg(not(any(unix, windows)))]
    fn apply_sync_flags(self, _options: &mut OpenOptions) {
        // Sync modes degrade to plain read-write on other platforms.
    }
}

/// Configuration for creating or opening a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Access mode for the underlying file (default: read-write).
    pub access: AccessMode,

    /// Index slots preallocated at creation (default: 64).
    pub initial_capacity: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            access: AccessMode::ReadWrite,
            initial_capacity: 64,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the access mode
    pub fn access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }

    /// Set the initial index capacity
    pub fn initial_capacity(mut self, capacity: u32) -> Self {
        self.initial_capacity = capacity;
        self
    }
}

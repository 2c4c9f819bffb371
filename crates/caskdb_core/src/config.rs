//! Engine configuration.

/// Default write buffer capacity: the size of one flush unit.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8192;

/// How the key index is rebuilt when a segment has no usable hint file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryPolicy {
    /// Trust hint files only. A segment whose hint file is missing or partial
    /// contributes no keys.
    #[default]
    HintsOnly,
    /// Fall back to scanning the data segment entry by entry when its hint
    /// file is missing or partial.
    ScanSegments,
}

/// Configuration for opening an engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Capacity of the in-memory write buffer, and so the maximum segment size.
    pub buffer_capacity: usize,

    /// Key index recovery policy.
    pub recovery: RecoveryPolicy,

    /// Whether to create the segment and hint directories if missing.
    pub create_if_missing: bool,

    /// Whether to fsync segment and hint files when they are written.
    pub sync_on_flush: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            recovery: RecoveryPolicy::HintsOnly,
            create_if_missing: true,
            sync_on_flush: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the write buffer capacity.
    #[must_use]
    pub const fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Sets the recovery policy.
    #[must_use]
    pub const fn recovery(mut self, policy: RecoveryPolicy) -> Self {
        self.recovery = policy;
        self
    }

    /// Sets whether to create missing directories.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to fsync on flush.
    #[must_use]
    pub const fn sync_on_flush(mut self, value: bool) -> Self {
        self.sync_on_flush = value;
        self
    }
}

use std::fmt;

/// The three error tiers from the driver's error handling design: most of
/// these are latched on the device (tier 3); `InvalidConfig` and
/// `DeviceUnavailable` are recoverable-per-operation (tier 2); callers that
/// need fatal-tier behavior (device acquisition failure) match on
/// `DeviceUnavailable` at startup and abort the session themselves.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum HalError {
    /// Returned by every operation on a null-object placeholder standing in
    /// for hardware that was not found at device-manager acquisition time.
    #[error("device unavailable")]
    DeviceUnavailable,

    #[error("device not configured")]
    NotConfigured,

    #[error("invalid channel index {0}")]
    InvalidChannel(i32),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The sample interval proved too short for the requested channel count.
    #[error("DAQ_OVERRUN: sample interval too short")]
    Overrun,

    /// The FIFO overflowed before being drained.
    #[error("DAQ_OVERFLOW: device FIFO overflowed")]
    Overflow,

    /// A blocking unload exceeded its computed timeout.
    #[error("DAQ_TIMEOUT: blocking unload timed out")]
    Timeout,

    /// The fast-channel buffer supplied by the caller was undersized.
    #[error("DAQ_LOSTFASTDATA: fast sample buffer undersized")]
    LostFastData,

    /// The event clock's 32-bit counter wrapped.
    #[error("event clock overflow")]
    ClockOverflow,
}

impl HalError {
    /// True for the latched-on-device-state tier (§7 tier 3): the device
    /// must be reconfigured before it can be started again.
    pub fn latches_device(&self) -> bool {
        matches!(
            self,
            HalError::Overrun
                | HalError::Overflow
                | HalError::Timeout
                | HalError::LostFastData
                | HalError::ClockOverflow
        )
    }
}

/// Per-device last-error text, carried so that any failure path can report a
/// human-readable reason (§7). Mirrors the device descriptor's `last_error`
/// field in the data model.
#[derive(Debug, Default)]
pub struct LastError(std::sync::Mutex<Option<String>>);

impl LastError {
    pub fn new() -> Self {
        LastError(std::sync::Mutex::new(None))
    }

    pub fn set(&self, err: &HalError) {
        *self.0.lock().unwrap() = Some(err.to_string());
    }

    pub fn clear(&self) {
        *self.0.lock().unwrap() = None;
    }

    pub fn text(&self) -> Option<String> {
        self.0.lock().unwrap().clone()
    }
}

impl fmt::Display for LastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text() {
            Some(t) => write!(f, "{t}"),
            None => write!(f, "(no error)"),
        }
    }
}

pub type Result<T> = std::result::Result<T, HalError>;

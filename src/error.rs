//! Error kinds shared by the updater, the control interface and the RTC adapter.

/// `EINVAL` from the control-file convention the protocol mirrors.
pub const EINVAL: i32 = 22;
/// `E2BIG`, returned for control writes over the length limit.
pub const E2BIG: i32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// A negative speed reached the updater. Fatal for the updater task.
    #[error("speed should be a non-negative number, found {0}")]
    InvalidSpeed(i64),
    /// Control input did not have the `<cmd> <number>` shape or used an unknown command.
    #[error("invalid control command: {0:?}")]
    InvalidCommand(String),
    /// Argument was not a non-negative base-10 integer in range for its field.
    #[error("invalid number: {0:?}")]
    InvalidNumber(String),
    /// Control input longer than the accepted maximum.
    #[error("control command over {} bytes", crate::control::MAX_COMMAND_LEN)]
    CommandTooLong,
    /// Random bound of zero would make the per-tick draw undefined.
    #[error("random bound must be greater than zero")]
    ZeroRandomBound,
    /// Microsecond writes must stay within `[0, 1_000_000)`.
    #[error("microseconds out of range: {0}")]
    MicrosOutOfRange(i64),
    /// Virtual seconds must have a calendar date.
    #[error("seconds out of calendar range: {0}")]
    SecondsOutOfRange(i64),
    #[error("invalid calendar time: {0}")]
    InvalidCalendarTime(String),
}

impl ClockError {
    /// Negative error code reported to control-channel callers.
    pub fn code(&self) -> i32 {
        match self {
            ClockError::CommandTooLong => -E2BIG,
            _ => -EINVAL,
        }
    }
}

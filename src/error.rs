use core::fmt;

/// Errors returned by LED and animation operations
///
/// Every variant is raised synchronously by the call that broke the
/// contract. Nothing is retried and partial writes are not rolled back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error {
    /// Malformed construction input (negative pin, frame rate below 1 ms)
    InvalidArgument(&'static str),
    /// A sequence length does not match the number of channels
    ArityMismatch { expected: usize, actual: usize },
    /// Digital and PWM values were mixed in a single call
    TypeMismatch { index: usize },
    /// A shared animation was bound without per-channel values
    MissingValues,
    /// PWM value outside of `0..=255`
    OutOfRange { value: f64 },
    /// `start_animation` was called before any animation was bound
    NoAnimationBound,
}

/// Result type used across the crate
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
            Self::ArityMismatch { expected, actual } => write!(
                f,
                "expected {expected} values (one per channel), got {actual}"
            ),
            Self::TypeMismatch { index } => write!(
                f,
                "value at index {index} does not match the type of the first value"
            ),
            Self::MissingValues => {
                f.write_str("a shared animation requires one value per channel")
            }
            Self::OutOfRange { value } => {
                write!(f, "value {value} is outside of the range 0-255")
            }
            Self::NoAnimationBound => f.write_str("no animation has been set"),
        }
    }
}

impl core::error::Error for Error {}

use alloc::borrow::Cow;
use core::fmt;

/// Convenient alias for `Result` with [`Error`] as the default error type.
pub type Result<T, E = Error> = core::result::Result<T, E>;

// -----------------------------------------------------------------------------
// AccessOp

/// The direction of a member access.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccessOp {
    Read,
    Write,
}

impl fmt::Display for AccessOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessOp::Read => f.write_str("read"),
            AccessOp::Write => f.write_str("write"),
        }
    }
}

// -----------------------------------------------------------------------------
// Error

/// Errors produced by the transfer protocol.
///
/// Every fallible protocol operation reports through this type, so codecs,
/// strategies and accessors compose without re-wrapping errors at each layer.
#[derive(Debug)]
pub enum Error {
    /// A value of one type arrived where another type was required.
    TargetMismatch {
        expected: Cow<'static, str>,
        received: Cow<'static, str>,
    },
    /// A member was accessed in a direction it does not support.
    MissingAccessor {
        owner: &'static str,
        member: Cow<'static, str>,
        op: AccessOp,
    },
    /// No checked conversion exists between the two types.
    UnsupportedConversion {
        from: Cow<'static, str>,
        to: Cow<'static, str>,
    },
    /// A path string could not be parsed.
    PathFormat(PathFormatError),
    /// A bounded resource hit its limit.
    ResourceExhausted {
        resource: &'static str,
        limit: usize,
    },
    /// No strategy could be produced for a type.
    StrategyResolution {
        type_name: &'static str,
        reason: Cow<'static, str>,
    },
    /// A reader was asked for more values than its stream holds.
    EndOfStream,
    /// Free-form error raised by codecs or custom strategies.
    Custom(Cow<'static, str>),
}

impl Error {
    /// A [`TargetMismatch`](Error::TargetMismatch) error.
    #[inline]
    pub fn target_mismatch(
        expected: impl Into<Cow<'static, str>>,
        received: impl Into<Cow<'static, str>>,
    ) -> Self {
        Error::TargetMismatch {
            expected: expected.into(),
            received: received.into(),
        }
    }

    /// A [`MissingAccessor`](Error::MissingAccessor) error.
    #[inline]
    pub fn missing_accessor(
        owner: &'static str,
        member: impl Into<Cow<'static, str>>,
        op: AccessOp,
    ) -> Self {
        Error::MissingAccessor {
            owner,
            member: member.into(),
            op,
        }
    }

    /// An [`UnsupportedConversion`](Error::UnsupportedConversion) error.
    #[inline]
    pub fn unsupported_conversion(
        from: impl Into<Cow<'static, str>>,
        to: impl Into<Cow<'static, str>>,
    ) -> Self {
        Error::UnsupportedConversion {
            from: from.into(),
            to: to.into(),
        }
    }

    /// A [`ResourceExhausted`](Error::ResourceExhausted) error.
    #[inline]
    pub fn resource_exhausted(resource: &'static str, limit: usize) -> Self {
        Error::ResourceExhausted { resource, limit }
    }

    /// A [`StrategyResolution`](Error::StrategyResolution) error.
    #[inline]
    pub fn strategy_resolution(
        type_name: &'static str,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Error::StrategyResolution {
            type_name,
            reason: reason.into(),
        }
    }

    /// A [`Custom`](Error::Custom) error.
    #[inline]
    pub fn custom(message: impl Into<Cow<'static, str>>) -> Self {
        Error::Custom(message.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TargetMismatch { expected, received } => {
                write!(f, "expected a value of type `{expected}`, received `{received}`")
            }
            Error::MissingAccessor { owner, member, op } => {
                write!(f, "member `{owner}::{member}` does not support {op} access")
            }
            Error::UnsupportedConversion { from, to } => {
                write!(f, "cannot convert a value of type `{from}` into `{to}`")
            }
            Error::PathFormat(err) => fmt::Display::fmt(err, f),
            Error::ResourceExhausted { resource, limit } => {
                write!(f, "{resource} exhausted, limit is {limit}")
            }
            Error::StrategyResolution { type_name, reason } => {
                write!(f, "no strategy for type `{type_name}`: {reason}")
            }
            Error::EndOfStream => f.write_str("value stream exhausted"),
            Error::Custom(message) => f.write_str(message),
        }
    }
}

impl core::error::Error for Error {}

impl From<PathFormatError> for Error {
    #[inline]
    fn from(err: PathFormatError) -> Self {
        Error::PathFormat(err)
    }
}

// -----------------------------------------------------------------------------
// PathFormatError

/// A syntax error in a path string, with the byte offset where parsing stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFormatError {
    pub offset: usize,
    pub message: Cow<'static, str>,
}

impl PathFormatError {
    #[inline]
    pub fn new(offset: usize, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

impl fmt::Display for PathFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid path at offset {}: {}", self.offset, self.message)
    }
}

impl core::error::Error for PathFormatError {}

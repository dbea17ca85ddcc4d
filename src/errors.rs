use std::error::Error;
use std::fmt::{Debug, Display};

/// Broad category of a [`SnowflakeError`], used by callers that want to
/// branch on disposition (retry a network error, surface a decode error,
/// propagate a cancellation) without string-matching the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed JSON chunk grammar, or an Arrow schema that doesn't match
    /// the declared row type.
    WireDecode,
    /// Non-2xx HTTP response, connection reset, read timeout.
    Network,
    /// Caller context was canceled or timed out.
    ContextCancel,
    /// A value cannot be represented in the requested native type (e.g.
    /// nanosecond timestamp overflow).
    TypeConversion,
    /// Row-count mismatch, unexpected JSON in Arrow mode, missing chunk.
    ProtocolViolation,
    /// Missing credentials, missing JWT claims, unknown attestation provider.
    Attestation,
    /// Anything not yet categorized. The teacher's original error sites all
    /// fall in here until migrated.
    Other,
}

#[derive(Clone)]
pub struct SnowflakeError {
    trace: String,
    message: String,
    underlying_error: Option<String>,
    kind: ErrorKind,
}

impl SnowflakeError {
    pub(crate) fn new(trace: String, message: String, underlying: Option<String>) -> Self {
        Self {
            trace,
            message,
            underlying_error: underlying,
            kind: ErrorKind::Other,
        }
    }

    pub(crate) fn new_with_kind(
        trace: String,
        message: String,
        underlying: Option<String>,
        kind: ErrorKind,
    ) -> Self {
        Self {
            trace,
            message,
            underlying_error: underlying,
            kind,
        }
    }

    /// Tags this error with a category after construction. Lets call sites
    /// built from the untyped `error!`/`this_errors!` macro arms (kept
    /// unchanged for source compatibility with the teacher's existing call
    /// sites) opt into a specific [`ErrorKind`] fluently.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Error for SnowflakeError {}

impl Display for SnowflakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let error_name = self.underlying_error.as_deref().unwrap_or("SnowflakeError");
        write!(f, "[{}] ({}): {}", error_name, self.trace, self.message)
    }
}

impl Debug for SnowflakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let error_name = self.underlying_error.as_deref().unwrap_or("SnowflakeError");
        write!(
            f,
            "[{}] ({:?}) ({}): {}",
            error_name, self.kind, self.trace, self.message
        )
    }
}

macro_rules! this_errors {
    ($msg:literal, $val:expr) => {
        $val.map_err(|e| $crate::error!($msg, e))?
    };
    ($kind:expr, $msg:literal, $val:expr) => {
        $val.map_err(|e| $crate::error!($msg, e).with_kind($kind))?
    };
}

macro_rules! error {
    ($val:literal) => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let fun_name = &name[..name.len() - 3];
        $crate::errors::SnowflakeError::new(fun_name.into(), $val.into(), None)
    }};
    ($err:expr) => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let err = $err;
        let name = type_name_of(f);
        let error_type_name = type_name_of(&err);
        let fun_name = &name[..name.len() - 3];
        let error_name = error_type_name.split("::").last().map(|x| x.to_string());
        let error_msg = format!("{:?}", err);

        $crate::errors::SnowflakeError::new(fun_name.into(), error_msg, error_name)
    }};
    ($val:literal, $err:expr) => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let err = $err;
        let name = type_name_of(f);
        let error_type_name = type_name_of(&err);
        let fun_name = &name[..name.len() - 3];
        let error_name = error_type_name.split("::").last().map(|x| x.to_string());
        let final_msg = format!("{:?} - {:?}", $val, err);
        $crate::errors::SnowflakeError::new(fun_name.into(), final_msg, error_name)
    }};
}

/// Builds a [`SnowflakeError`] already tagged with an [`ErrorKind`], e.g.
/// `kind_error!(ErrorKind::WireDecode, "malformed chunk grammar")`.
macro_rules! kind_error {
    ($kind:expr, $val:literal) => {
        $crate::error!($val).with_kind($kind)
    };
    ($kind:expr, $val:literal, $err:expr) => {
        $crate::error!($val, $err).with_kind($kind)
    };
}

pub(crate) use error;
pub(crate) use kind_error;
pub(crate) use this_errors;

pub use ErrorKind as SnowflakeErrorKind;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error;

    #[test]
    fn defaults_to_other_kind() {
        let e = error!("boom");
        assert_eq!(e.kind(), ErrorKind::Other);
    }

    #[test]
    fn with_kind_overrides_category() {
        let e = error!("boom").with_kind(ErrorKind::WireDecode);
        assert_eq!(e.kind(), ErrorKind::WireDecode);
        assert_eq!(e.message(), "boom");
    }

    #[test]
    fn debug_includes_kind() {
        let e = error!("boom").with_kind(ErrorKind::Network);
        let rendered = format!("{:?}", e);
        assert!(rendered.contains("Network"));
    }
}

use thiserror::Error;

use unijson_write::WriteError;

use crate::parse::ParseError;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors raised while mapping between JSON and typed values.
///
/// `TypeMismatch` and the unknown-type/instantiation group can be degraded to
/// null by [`NodeOptions`](crate::NodeOptions); all other variants always
/// abort the current top-level call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("cannot instantiate `{type_name}`: {reason}")]
    Instantiation { type_name: &'static str, reason: String },

    #[error("the key `{key}` does not exist in `{type_name}`")]
    UnknownKey { key: String, type_name: &'static str },

    #[error("duplicate dictionary key `{0}`")]
    DuplicateKey(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Write(#[from] WriteError),

    /// Raised by application hooks and opt-out implementations.
    #[error("{0}")]
    Custom(String),
}

impl Error {
    pub fn custom<T: core::fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    pub(crate) fn instantiation(type_name: &'static str, reason: impl Into<String>) -> Self {
        Error::Instantiation { type_name, reason: reason.into() }
    }

    /// Returns `true` for the errors tolerated by
    /// [`NodeOptions::IGNORE_TYPE_MISMATCH`](crate::NodeOptions::IGNORE_TYPE_MISMATCH).
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Error::TypeMismatch(..))
    }

    /// Returns `true` for the errors tolerated by
    /// [`NodeOptions::IGNORE_INSTANTIATION_ERROR`](crate::NodeOptions::IGNORE_INSTANTIATION_ERROR).
    pub fn is_instantiation(&self) -> bool {
        matches!(self, Error::UnknownType(..) | Error::Instantiation { .. })
    }
}

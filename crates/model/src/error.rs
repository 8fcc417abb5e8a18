use std::fmt::{self, Display};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The model provider could not be reached.
    Unreachable,
    /// The requested model is not available on the provider.
    ModelNotFound,
    /// The provider sent something that could not be understood.
    InvalidResponse,
    /// Any other errors.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Unreachable => write!(f, "Provider unreachable"),
            ErrorKind::ModelNotFound => write!(f, "Model not found"),
            ErrorKind::InvalidResponse => write!(f, "Invalid response"),
            ErrorKind::Other => write!(f, "Other error"),
        }
    }
}

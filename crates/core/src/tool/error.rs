use std::borrow::Cow;
use std::fmt::{self, Display};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The tool server URL could not be built.
    InvalidUrl,
    /// The tool server could not be reached.
    Unreachable,
    /// The tool server answered with a non-success status.
    HttpStatus,
    /// The tool server answered with something that isn't the expected JSON.
    InvalidResponse,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidUrl => write!(f, "Invalid URL"),
            ErrorKind::Unreachable => write!(f, "Tool server unreachable"),
            ErrorKind::HttpStatus => write!(f, "Unsuccessful HTTP status"),
            ErrorKind::InvalidResponse => write!(f, "Invalid response"),
        }
    }
}

/// Describes a tool server error.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    reason: Option<String>,
}

impl Error {
    #[inline]
    fn new(kind: ErrorKind) -> Self {
        Self { kind, reason: None }
    }

    /// Creates a new error with the `InvalidUrl` kind.
    #[inline]
    pub fn invalid_url() -> Self {
        Self::new(ErrorKind::InvalidUrl)
    }

    /// Creates a new error with the `Unreachable` kind.
    #[inline]
    pub fn unreachable() -> Self {
        Self::new(ErrorKind::Unreachable)
    }

    /// Creates a new error with the `HttpStatus` kind.
    #[inline]
    pub fn http_status() -> Self {
        Self::new(ErrorKind::HttpStatus)
    }

    /// Creates a new error with the `InvalidResponse` kind.
    #[inline]
    pub fn invalid_response() -> Self {
        Self::new(ErrorKind::InvalidResponse)
    }

    /// Attaches a reason to the error.
    #[inline]
    pub fn with_reason<S: Into<String>>(self, reason: S) -> Self {
        Self {
            kind: self.kind,
            reason: Some(reason.into()),
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the reason for the error.
    #[inline]
    pub fn reason(&self) -> Cow<'_, str> {
        match self.reason.as_deref() {
            Some(reason) => Cow::Borrowed(reason),
            None => Cow::Owned(format!("{}", self.kind)),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason())
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error = if err.is_status() {
            Error::http_status()
        } else if err.is_decode() {
            Error::invalid_response()
        } else {
            Error::unreachable()
        };
        error.with_reason(format!("{err}"))
    }
}

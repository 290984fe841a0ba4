use std::fmt::Display;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Structural error: {0}")]
    Structural(String),

    #[error("Malformed XML document.")]
    Malformed(#[from] quick_xml::Error),

    #[error("Unsupported geometry element {0}.")]
    UnsupportedShape(String),

    #[error("Number of ordinates ({ordinates}) does not match the dimension {dimension}.")]
    DimensionMismatch { ordinates: usize, dimension: usize },

    #[error("Invalid ordinate value '{0}'.")]
    InvalidOrdinate(String),

    #[error("Can't resolve reference system '{0}'.")]
    ReferenceLookup(String),

    #[error("Can't convert '{text}' to {expected} for attribute '{attribute}'.")]
    ScalarConversion {
        attribute: String,
        text: String,
        expected: &'static str,
    },

    #[error("Error while processing the geozero sink.")]
    GeozeroError(#[from] geozero::error::GeozeroError),

    #[error("Serde error.")]
    SerdeError(#[from] serde_json::error::Error),

    #[error("An error happend: {0}")]
    Message(String),
}

/// Coarse classification of [`Error`], letting callers tell a malformed
/// document apart from a schema mismatch without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Structural,
    UnsupportedShape,
    DimensionMismatch,
    ReferenceLookup,
    ScalarConversion,
    Io,
    Output,
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Malformed(quick_xml::Error::Io(_)) => ErrorKind::Io,
            Error::Structural(_) | Error::Malformed(_) => ErrorKind::Structural,
            Error::UnsupportedShape(_) => ErrorKind::UnsupportedShape,
            Error::DimensionMismatch { .. } | Error::InvalidOrdinate(_) => {
                ErrorKind::DimensionMismatch
            }
            Error::ReferenceLookup(_) => ErrorKind::ReferenceLookup,
            Error::ScalarConversion { .. } => ErrorKind::ScalarConversion,
            Error::GeozeroError(_) | Error::SerdeError(_) | Error::Message(_) => ErrorKind::Output,
        }
    }

    pub(crate) fn structural(msg: impl Into<String>) -> Self {
        Error::Structural(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl serde::de::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: Display,
    {
        Error::Message(msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: Display,
    {
        Error::Message(msg.to_string())
    }
}

use thiserror::Error;

/// Errors raised while loading, editing or saving EXIF metadata.
///
/// "No metadata present" is not an error; see [`crate::adapter::DecodeStatus`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The blob is present but cannot be parsed, or a single field of it
    /// could not be decoded (in which case `tag` names it).
    #[error("decode error{}: {reason}", .tag.map(|t| format!(" in {t}")).unwrap_or_default())]
    Decode {
        tag: Option<&'static str>,
        reason: String,
    },
    /// A value supplied for saving does not fit its tag's encoding.
    #[error("cannot encode {field}: {reason}")]
    Encode { field: &'static str, reason: String },
    /// A GPS hemisphere reference outside N/S/E/W.
    #[error("invalid GPS reference `{0}`, expected one of N, S, E, W")]
    InvalidReference(char),
    /// The JPEG container could not be read or rebuilt.
    #[error("jpeg container: {0}")]
    Container(String),
}

impl Error {
    pub(crate) fn decode(reason: impl Into<String>) -> Self {
        Error::Decode {
            tag: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn field_decode(tag: &'static str, reason: impl Into<String>) -> Self {
        Error::Decode {
            tag: Some(tag),
            reason: reason.into(),
        }
    }

    pub(crate) fn encode(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Encode {
            field,
            reason: reason.into(),
        }
    }
}

impl From<exif::Error> for Error {
    fn from(err: exif::Error) -> Self {
        Error::decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

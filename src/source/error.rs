use std::error::Error;
use std::fmt;
use std::io;

/// Error types for source acquisition.
#[derive(Debug)]
pub enum SourceError {
    Network(reqwest::Error),
    IoError(io::Error),
    /// The remote resolver rejected or could not resolve the identifier
    Remote(String),
    /// No transport-native encoding and no acceptable fallback rendition
    NoSuitableFormat(String),
    /// The transcoding stage failed to start or configure itself
    Transcode(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Network(e) => write!(f, "Network error: {}", e),
            SourceError::IoError(e) => write!(f, "I/O error: {}", e),
            SourceError::Remote(msg) => write!(f, "Remote source error: {}", msg),
            SourceError::NoSuitableFormat(id) => {
                write!(f, "No suitable format for '{}'", id)
            }
            SourceError::Transcode(msg) => write!(f, "Transcode error: {}", msg),
        }
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SourceError::Network(e) => Some(e),
            SourceError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err)
    }
}

impl From<io::Error> for SourceError {
    fn from(err: io::Error) -> Self {
        SourceError::IoError(err)
    }
}

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Failure kinds reported by container operations.
///
/// A failed tag verification and a failed password probe are both reported
/// as [`ContainerError::Authentication`]: the two cases are
/// cryptographically indistinguishable.
#[derive(Debug)]
pub enum ContainerError {
    FileNotFound(PathBuf),
    InvalidFormat(&'static str),
    Authentication,
    Corrupted(&'static str),
    Io(io::Error),
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::FileNotFound(path) => write!(f, "file not found: {}", path.display()),
            ContainerError::InvalidFormat(why) => write!(f, "invalid container format: {why}"),
            ContainerError::Authentication => write!(f, "wrong password or corrupted file"),
            ContainerError::Corrupted(why) => write!(f, "corrupted container: {why}"),
            ContainerError::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for ContainerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContainerError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ContainerError {
    fn from(err: io::Error) -> Self {
        ContainerError::Io(err)
    }
}

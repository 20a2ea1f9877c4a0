// error.rs - Session-fatal errors
//
// Everything a client can get wrong is answered on the wire with a `5` line;
// only faults that end the session are represented here.

use std::io;
use std::time::Duration;

use maze_engine::MazeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Stream error: {0}")]
    Stream(std::io::Error),

    #[error("Client disconnected")]
    Disconnected,

    #[error("No input for {timeout:?}")]
    ReadTimeout { timeout: Duration },

    #[error("Line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("Session cancelled by server shutdown")]
    Shutdown,

    #[error("Generation failed: {0}")]
    Generation(#[from] MazeError),

    #[error("Generator task panicked")]
    GeneratorPanicked,

    #[error("Session task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl SessionError {
    /// Expected ways for a session to end that need no operator attention.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            SessionError::Disconnected | SessionError::ReadTimeout { .. } | SessionError::Shutdown
        )
    }
}

/// A peer that went away is a disconnect, whichever side noticed first.
impl From<io::Error> for SessionError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof => SessionError::Disconnected,
            _ => SessionError::Stream(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign_endings() {
        assert!(SessionError::Disconnected.is_benign());
        assert!(SessionError::Shutdown.is_benign());
        assert!(SessionError::ReadTimeout {
            timeout: Duration::from_secs(120)
        }
        .is_benign());
        assert!(!SessionError::GeneratorPanicked.is_benign());
        assert!(!SessionError::LineTooLong { limit: 4096 }.is_benign());
        assert!(!SessionError::from(MazeError::Cancelled).is_benign());
    }

    #[test]
    fn test_vanished_peer_is_a_disconnect() {
        for kind in [io::ErrorKind::BrokenPipe, io::ErrorKind::ConnectionReset] {
            let err = SessionError::from(io::Error::from(kind));
            assert!(matches!(err, SessionError::Disconnected), "{:?}", kind);
            assert!(err.is_benign());
        }
        let other = SessionError::from(io::Error::other("disk on fire"));
        assert!(matches!(other, SessionError::Stream(_)));
        assert!(!other.is_benign());
    }
}

// lib.rs - Labyrinth protocol server
// Session state machine, line protocol, admission control and transports.

pub mod admission;
pub mod config;
pub mod error;
pub mod io;
pub mod lag;
pub mod protocol;
pub mod server;
pub mod session;
pub mod shutdown;

// Re-export commonly used types
pub use admission::{Admission, AdmissionGuard, Rejection};
pub use config::{Args, ServerConfig};
pub use error::{Result, SessionError};
pub use lag::{lag_pipe, OfflineLabyrinth};
pub use session::{Session, SessionSettings, SessionState};

//! CLI command implementations
//!
//! Every command returns a process exit code:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | Partial success (some uploads failed) |
//! | 2 | Configuration error |
//! | 3 | Withings authorization required |
//! | 4 | Connection or login failure |
//! | 5 | Fatal error |
//! | 130 | Interrupted by signal |

pub mod authorize;
pub mod init;
pub mod status;
pub mod sync;
pub mod validate;

use crate::domain::{BridgeError, DestinationError, SourceError};

/// Maps a run-ending error to its exit code
pub fn exit_code_for(error: &BridgeError) -> i32 {
    match error {
        BridgeError::Configuration(_) => 2,
        e if e.requires_authorization() => 3,
        BridgeError::Source(SourceError::StateMismatch { .. })
        | BridgeError::Source(SourceError::AuthExchange { .. }) => 3,
        BridgeError::Source(SourceError::ConnectionFailed(_))
        | BridgeError::Source(SourceError::AuthRefresh { .. })
        | BridgeError::Destination(DestinationError::ConnectionFailed(_))
        | BridgeError::Destination(DestinationError::LoginFailed(_)) => 4,
        _ => 5,
    }
}

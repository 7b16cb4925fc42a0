//! Source provider authentication
//!
//! [`SourceAuthenticator`] turns whatever the token store holds into a
//! fresh token pair, asking a [`CodeProvider`] when a human has to step in.

pub mod authenticator;
pub mod provider;

pub use authenticator::{AuthState, SourceAuthenticator};
pub use provider::{CodeProvider, NoInteraction, StaticCode};

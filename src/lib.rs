// src/lib.rs

pub mod config;
pub mod error;
pub mod identity;
pub mod jwks;
pub mod model;
pub mod validator;

#[cfg(feature = "axum-integration")]
pub mod middleware;

/// The public prelude for the `cognito-guard` crate.
///
/// This module re-exports the most commonly used types for convenience.
pub mod prelude {
    pub use crate::config::{Config, ConfigBuilder};
    pub use crate::error::AuthError;
    pub use crate::identity::{Claims, User};
    pub use crate::validator::Validator;
    pub use jsonwebtoken::Algorithm;

    #[cfg(feature = "axum-integration")]
    pub use crate::middleware::{
        optional_auth, require_auth, AuthState, CurrentClaims, CurrentUser, RequireAdmin,
        RequireManager, RequireTeacher,
    };
}

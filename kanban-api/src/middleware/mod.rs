//! Middleware modules for the kanban API
//!
//! - `principal`: resolves the caller forwarded by the upstream
//!   authenticator into a [`kanban_core::Principal`] request extension.

mod principal;

pub use principal::{
    principal_middleware, AuthPrincipal, PrincipalError, PRINCIPAL_ADMIN_HEADER,
    PRINCIPAL_ID_HEADER,
};

#[cfg(any(test, feature = "dev"))]
pub use principal::dev_principal_middleware;

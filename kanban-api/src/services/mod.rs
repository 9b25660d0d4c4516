//! Service Layer
//!
//! Business logic behind the routes. Every position change runs its
//! read, compute and write steps inside one store transaction.

mod position_service;

pub use position_service::*;

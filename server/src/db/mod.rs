//! # Persistence layer
//!
//! [`interface`] defines the repository traits the HTTP layer depends on; [`clients`] holds the
//! backends implementing them.

pub mod clients;
pub mod interface;

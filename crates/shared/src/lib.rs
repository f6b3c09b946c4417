//! Chatdesk Shared Types and Store
//!
//! This crate contains the durable data model, the store contract, and the
//! store implementations shared across the Chatdesk platform.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use db::*;
pub use error::*;
pub use store::{MemoryStore, NewMessage, PgStore, Store};
pub use types::*;

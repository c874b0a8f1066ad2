//! Postgres-backed implementations of [`postconfirm_core::SenderStore`] and
//! [`postconfirm_core::MessageStash`].

pub mod postgres;
pub mod schema;

pub use postgres::{PgConfig, PgMessageStash, PgSenderStore};
pub use schema::ensure_schema;

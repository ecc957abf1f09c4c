pub mod compat;
pub mod connection;
pub mod detect;
pub mod events;
pub mod field;
pub mod query;
pub mod snapshot;
pub mod transaction;
pub mod validity;

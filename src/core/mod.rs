//! Case data model, snapshot store and shared helpers.

pub mod error;
pub mod hash;
pub mod identity;
pub mod store;
pub mod time;
pub mod types;

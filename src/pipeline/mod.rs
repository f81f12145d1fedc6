//! Derivations over the store: filtering, risk tiers, reference resolution
//! and rendering.

pub mod classifier;
pub mod filter;
pub mod reporter;
pub mod resolver;

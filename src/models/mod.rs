//! Core data models for the bucket reconciler.
//!
//! These types describe one remote bucket as the reconciler sees it: its
//! composite identity, the desired configuration a caller supplies, the
//! normalized state read back from the remote, and the operations that move
//! one towards the other.

pub mod bucket;
pub mod bucket_config;
pub mod identity;
pub mod operation;

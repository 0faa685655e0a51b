//! Content hashing for the vault data store.
//!
//! Provides domain-separated BLAKE3 hashing. Block names, version ids and
//! history storage keys are all derived here, each under its own domain tag.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;

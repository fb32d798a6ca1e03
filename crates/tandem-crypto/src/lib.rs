//! Content hashing for Tandem.
//!
//! Derives [`ContentId`](tandem_types::ContentId)s from block bytes with
//! BLAKE3 and verifies bytes received from peers against the identifier they
//! were requested under. All hashing wraps the `blake3` crate.

pub mod hasher;

pub use hasher::{ContentHasher, HasherError};

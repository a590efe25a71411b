//! Markov-chain name generation library.
//!
//! This crate provides a variable-order character-level Markov chain system:
//! - Count accumulation over a corpus of names, with optional nested back-off
//! - Compilation into normalized, sampling-ready chains
//! - Weighted random generation with a configurable termination policy
//! - Utilities for corpus I/O and chain persistence
//!
//! Only the high-level API is exposed publicly. Per-state representations
//! are kept internal to ensure consistency and prevent misuse.

/// Core Markov chain models and generation logic.
///
/// This module exposes the builder and compiled chain interfaces while
/// keeping the per-state representations private.
pub mod model;

/// I/O utilities (corpus loading, chain files, path helpers).
pub mod io;

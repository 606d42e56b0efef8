//! Use-case orchestration over the store capability.
//!
//! # Responsibility
//! - Keep callers decoupled from which backend is wired in.
//! - Serialize every mutation of the canonical list through one owner.

pub mod sync_engine;

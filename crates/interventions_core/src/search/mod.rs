//! Free-text filtering over the canonical list.
//!
//! # Responsibility
//! - Match records against a case-insensitive substring query.
//! - Keep the searched field projection a configuration choice.

pub mod filter;

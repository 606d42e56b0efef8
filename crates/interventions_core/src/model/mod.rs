//! Domain model for equipment-maintenance interventions.
//!
//! # Responsibility
//! - Define the canonical record persisted by every store backend.
//! - Provide the form-state draft and its pure field update function.
//!
//! # Invariants
//! - Every persisted record is identified by an `InterventionId` that never
//!   changes once assigned.
//! - Records are never mutated in place; they are created or deleted.

pub mod intervention;

//! Tabular export of the canonical list.

pub mod csv;

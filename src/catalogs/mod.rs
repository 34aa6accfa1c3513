//! Readers for raw star catalog files.

pub mod csv_catalog;
pub mod hipparcos;

//! Background jobs
//!
//! - `orphan_sweeper`: reclaims content items (and blobs) no parent references

pub mod orphan_sweeper;

pub use orphan_sweeper::{start_orphan_sweeper, OrphanSweeper, SweepReport};

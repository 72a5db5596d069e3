//! Database seeding functionality
//!
//! Reference rows a fresh installation needs, inserted by the `seed`
//! subcommand.

pub mod reference;

pub use reference::{SeedReport, seed_reference_data};

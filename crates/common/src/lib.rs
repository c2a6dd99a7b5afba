//! Runtime helpers shared by the record service crates.

pub mod utils;

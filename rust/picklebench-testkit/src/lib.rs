//! Fixture values and payloads shared by tests, benches and the benchmark tool.

pub mod data_gen;
pub mod fixtures;

pub use data_gen::{compressible_bytes, random_bytes};
pub use fixtures::{Customer, LineItem, Order, sample_order, test_value};

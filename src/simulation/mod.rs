//! Random order batches for testing and benchmarks.

pub mod order_gen;

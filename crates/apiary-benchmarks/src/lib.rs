//! Apiary benchmarking suite
//!
//! Benchmarks for request-target parsing, URL building, lenient JSON
//! extraction, configuration parsing and the client request pipeline.

pub mod common;

pub use common::*;

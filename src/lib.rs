pub mod api;
pub mod config;
pub mod consts;
pub mod decoder;
pub mod error;
pub mod graph;
pub mod heuristics;
pub mod loader;
pub mod metrics;
pub mod optimizer;
pub mod pool;
pub mod strategy;
pub mod ushape;
// cmd and reports are modules of the binary crate (main.rs).

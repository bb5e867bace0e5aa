// openimg - on-demand image transformation proxy

pub mod cache;
pub mod config;
pub mod coordinator; // Validate -> key -> cache -> single-flight compute
pub mod error;
pub mod fetch;
pub mod image_optimizer;
pub mod logging;
pub mod metrics;
pub mod request_coalescing;
pub mod server;

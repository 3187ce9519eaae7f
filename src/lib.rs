pub mod api;
pub mod config;
pub mod error;
pub mod node;
pub mod scheduler;
pub mod shutdown;

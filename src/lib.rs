pub mod config;
pub mod log;
pub mod package;
pub mod server;

pub mod config;
pub mod log;
pub mod render;
pub mod version;

pub mod app;
pub mod config;
pub mod debounce;
pub mod host;
pub mod loader;
pub mod picker;

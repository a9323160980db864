//! File-backed persistence for task collections.

pub mod config;
pub mod file;

pub use config::StoreConfig;
pub use file::FileStore;

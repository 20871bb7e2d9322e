//! Configuration store abstractions
//!
//! Supports multiple configuration sources:
//! - `MemoryConfigStore`: in-memory, for embedding and tests
//! - `FileConfigStore`: YAML file at the user level

mod traits;
mod memory;
mod file;

pub use traits::{ConfigStore, ConfigError, ConfigResult};
pub use memory::MemoryConfigStore;
pub use file::{FileConfigStore, ConfigFile};

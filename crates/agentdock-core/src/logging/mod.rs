//! Logging abstractions for runtime-agnostic logging
//!
//! Components receive an `Arc<dyn Logger>` and prefix their messages with a
//! component tag such as `[McpManager]`.

mod traits;
mod noop;
mod console;
mod memory;

pub use traits::{Logger, LoggerExt, SharedLogger};
pub use noop::NoOpLogger;
pub use console::ConsoleLogger;
pub use memory::{LogLevel, LogRecord, MemoryLogger};

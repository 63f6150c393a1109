pub mod types;
pub mod settings;
pub mod errors;
pub mod events;
pub mod emit;
pub mod logging;

// Re-export CommandError for convenience
pub use errors::{CommandError, CommandResult};

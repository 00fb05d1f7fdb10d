//! Command handlers for the ragline CLI.

pub mod ask;
pub mod inspect;
pub mod search;
pub mod serve;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use inspect::InspectCommand;
pub use search::SearchCommand;
pub use serve::ServeCommand;

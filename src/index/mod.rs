pub mod build;
pub mod loader;
pub mod stats;
pub mod types;

pub use build::{BuildReport, IndexBuilder, LibraryIndex};
pub use loader::{ItemSource, LoadOutcome, StaticSource};
pub use types::*;

// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod keyboard;
pub mod lesson;
pub mod logging;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod store;

pub use catalog::CurriculumCatalog;
pub use engine::{EngineEvent, TypingEngine};
pub use lesson::{Lesson, Mode};
pub use session::SessionState;
pub use store::{MemoryStore, ProgressStore, SqliteStore};

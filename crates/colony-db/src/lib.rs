//! Persistent storage for colony memory.
//!
//! Colony memory is loaded at tick start and saved at tick end. Three
//! interchangeable backends implement [`ColonyStore`]:
//!
//! ```text
//! Tick
//!     |
//!     +-- load(colony_id) --+-- InMemoryStore  (tests, `memory` backend)
//!     |                     +-- FileStore      (one JSON document per colony)
//!     +-- save(memory) -----+-- DragonflyStore (colony:{id}:* keys)
//! ```
//!
//! # Modules
//!
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) backend
//! - [`file`] -- JSON file backend
//! - [`memory`] -- Process-local backend
//! - [`store`] -- [`ColonyStore`] trait and [`AnyStore`] selection
//! - [`error`] -- Shared error types

pub mod dragonfly;
pub mod error;
pub mod file;
pub mod memory;
pub mod store;

// Re-export primary types for convenience.
pub use dragonfly::DragonflyStore;
pub use error::DbError;
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use store::{AnyStore, ColonyStore};

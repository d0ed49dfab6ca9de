//! Application layer for timegrid.
//!
//! This crate owns the task store, the pointer interaction state machine, the
//! text interchange format, the persistence and color ports, and the
//! configuration shared by front ends.

pub mod config;
pub mod interaction;
pub mod interchange;
pub mod palette;
pub mod persistence;
pub mod service;
pub mod task_store;

// Re-exports for convenience
pub use config::{AppConfig, ColorsConfig, GridConfig, StorageConfig};
pub use interaction::{
    Edge, GesturePhase, GestureState, HoverTarget, InteractionController, Outcome, PassiveCapture,
    PointerCapture, PointerPos, PointerTarget, Preview,
};
pub use interchange::{ExportError, LineError, LineErrorKind, ParseError, ParsedTask};
pub use palette::{CardColors, ColorPort, HashedPalette, InvalidColor, Rgb};
pub use persistence::{MemoryPersistence, TaskPersistence};
pub use service::{ImportError, Planner, RejectedLine};
pub use task_store::{Accepted, BatchRejected, ConflictError, OptionLists, StoreError, TaskStore};

//! # Threadloom Engine
//!
//! The conversation engine: character directory with fuzzy name resolution,
//! attendance tracking over in-thread system annotations, turn strategies
//! that drive the completion provider, and the per-conversation [`Session`]
//! aggregate that binds them to a thread store.
//!
//! Dependency direction: everything here depends inward on
//! `threadloom-core` types and the `threadloom-store` forest; nothing here
//! knows about HTTP or any concrete completion backend.

pub mod attendance;
pub mod directory;
pub mod registry;
pub mod session;
pub mod strategy;

pub use attendance::{AttendancePolicy, AttendanceResolver};
pub use directory::CharacterDirectory;
pub use registry::SessionRegistry;
pub use session::{Scenario, Session};
pub use strategy::{
    PlayStrategy, RandomPicker, ScriptedStrategy, ScriptedTurn, TurnInput, TurnPicker, TurnStrategy,
};

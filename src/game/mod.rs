//! Game simulation modules

pub mod arena;
pub mod combat;
pub mod maze;
pub mod monster;

pub use arena::{Arena, ArenaCommand, ArenaHandle};

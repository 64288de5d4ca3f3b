//! Chart package deduplication library - shared modules for the CLI.

pub mod checker;
pub mod config;
pub mod error;
pub mod events;
pub mod metadata;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod placement;
pub mod progress;
pub mod resolver;
pub mod safety;
pub mod scanner;
pub mod verify;

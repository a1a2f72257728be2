//! Dials - A runtime-adjustable design token registry

pub mod commands;
pub mod config;
pub mod manifest;
pub mod models;
pub mod overlay;
pub mod registry;
pub mod store;
pub mod tui;
pub mod typed;

pub use models::{Dial, DialConfig, DialGroup, DialKind, DialValue};
pub use registry::{DialRegistry, RegistryOptions, Subscription};

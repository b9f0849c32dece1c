//! Anchorage: Persistent Shared Spatial Anchor Lifecycle
//!
//! Manages a single shared spatial anchor through placement, quality-gated
//! hosting, and a later one-shot resolution pass, coordinating asynchronous
//! cloud anchor tasks by polling. Platform concerns (tracking, rendering,
//! input, display) are collaborator traits in [`scene`]; a deterministic
//! simulation of them lives in [`sim`].

pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod history;
pub mod lifecycle;
pub mod logging;
pub mod placement;
pub mod quality;
pub mod registry;
pub mod scene;
pub mod service;
pub mod sim;
pub mod types;

//! Core business logic for feedline.
//!
//! The feed-consistency engine: follow-graph transitions, post lifecycle,
//! block/privacy enforcement, and the per-viewer materialized feed that all
//! of them drive.

pub mod services;

pub use services::*;

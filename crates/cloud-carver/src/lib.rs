// src/lib.rs
//! Interactive point cloud viewer with per-axis box filtering.
//!
//! The same retain rule runs twice: in the point shader, which discards
//! filtered points every frame, and on the host, where it drives export and
//! picking. [`predicate`] holds both sides and the tests tying them together.

pub mod app;
pub mod camera;
pub mod config;
pub mod data;
pub mod export;
pub mod filter;
pub mod interaction;
pub mod loader;
pub mod overlay;
pub mod picking;
pub mod predicate;
pub mod renderer;
pub mod session;
pub mod ui;

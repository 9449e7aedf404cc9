//! # Verdant Parallel
//!
//! Parallel processing strategies for per-pixel raster work.
//!
//! This crate provides:
//! - Tiling of a raster extent into bounded-memory windows
//! - Sequential / Rayon execution selected at runtime
//! - A batch scheduler that keeps a bounded number of tiles in flight

pub mod strategy;
pub mod tiled;

pub use strategy::{num_cpus, Executor, ParallelStrategy, ProcessingMode};
pub use tiled::{Tile, TileIterator, TiledProcessor};

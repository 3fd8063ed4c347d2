//! Cargo allocation & retrieval planning engine.
//!
//! Given a snapshot of storage containers and items, the engine decides
//! where each item should physically go (3D spatial packing under zone and
//! priority constraints), computes the minimum-disturbance sequence of moves
//! to retrieve a specific item, and builds a weight-bounded manifest for
//! returning waste cargo. Planning is pure and synchronous; applying a plan
//! goes through the repository's optimistic commit. A REST API exposes the
//! planning calls over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod geometry;
pub mod model;
pub mod packer;
pub mod planner;
pub mod repository;
pub mod retrieval;
pub mod returns;
pub mod types;

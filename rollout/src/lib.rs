//! Rollout Library
//!
//! Control core for seamless rollout and repair of generation-based cloud
//! fleets: priority ordering of node deploys, rotation of live nodes out of
//! service, convergence of nodes back to operational and the seed
//! verification gate.

pub mod actions;
pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod fleet;
pub mod logs;
pub mod models;
pub mod storage;
pub mod telemetry;
pub mod utils;

//! Data models

pub mod environment;
pub mod generation;
pub mod tracker;

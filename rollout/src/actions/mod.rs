//! Entry point actions

pub mod notify;
pub mod repair;
pub mod up;

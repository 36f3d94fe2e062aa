//! Settings, file layout and environment configuration

pub mod environments;
pub mod layout;
pub mod settings;

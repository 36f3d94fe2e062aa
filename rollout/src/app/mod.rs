//! Run options and action wiring

pub mod options;
pub mod run;

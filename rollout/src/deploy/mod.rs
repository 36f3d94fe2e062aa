//! Rollout core: ordering, seed gate, rotation and convergence

pub mod convergence;
pub mod fsm;
pub mod prompt;
pub mod rotation;
pub mod scheduler;
pub mod seed_gate;

//! Hex Tactics - turn-based hex battle core
//!
//! Owns the battlefield model, the phase/turn machine, ability targeting,
//! damage arithmetic and the morale loop that modulates every unit.

pub mod battle;
pub mod core;

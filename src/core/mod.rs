//! Core types, errors and configuration shared by the battle modules

pub mod config;
pub mod error;
pub mod types;

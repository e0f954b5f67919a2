//! Core state model, events, and configuration

pub mod config;
pub mod events;
pub mod state;

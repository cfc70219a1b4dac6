//! Centralized constants for infra-bot.
//!
//! All project-wide constant values live here.
//! Change a value in one place and it applies everywhere.

pub mod alerts;
pub mod network;
pub mod paths;
pub mod services;
pub mod slack;
pub mod state;

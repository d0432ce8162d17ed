//! Core benchmark settings

pub mod cancel;
pub mod config;

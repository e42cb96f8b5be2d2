//! Command handlers

pub mod config;
pub mod favorites;
pub mod installs;
pub mod logins;
pub mod vars;

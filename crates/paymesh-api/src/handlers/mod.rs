//! Request handlers

pub mod billing;
pub mod cron;
pub mod escrow;
pub mod handshake;
pub mod health;
pub mod webhook;

//! Lightweight screen time tracker. A daemon samples the foreground window, attributes elapsed
//! time to the focused application and keeps per day totals in a local SQLite database. The cli
//! starts and controls the daemon and prints daily, weekly and per app summaries.

pub mod cli;
pub mod daemon;
pub mod stats;
pub mod utils;
pub mod window_api;

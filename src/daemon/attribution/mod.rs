//! Turns foreground window samples into per app, per day durations.
//!
//! [engine::AttributionEngine] owns the tracking loop, [state::AttributionState] is the state
//! machine it drives and [filter::SystemWindowFilter] decides which samples count as "no window".

pub mod engine;
pub mod filter;
pub mod state;

//! Background tasks for the gateway.

pub mod rate_window_sweep;

pub use rate_window_sweep::{start_rate_window_sweeper, sweep_interval};

//! Process-wide configuration, replacing the original's global `verbose`
//! booleans (spec.md §9 "Global verbose flags") with explicit state and
//! `tracing` target filters (`RUST_LOG=jtag_capture_replay::jtag::fsm=trace`
//! for per-bit FSM clocking) instead of bespoke print-guarding flags.

/// Built once at process start from the CLI arguments.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub dap_enabled_at_start: bool,
}

impl Config {
    pub fn new(dap_enabled_at_start: bool) -> Self {
        Self { dap_enabled_at_start }
    }
}

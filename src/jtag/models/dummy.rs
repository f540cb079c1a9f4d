//! A chain position that answers TDO=1 and ignores every callback.
//!
//! Used in tests that only care about FSM transitions, and as a stand-in
//! for any scan-chain position that hasn't been modeled yet.

#[derive(Debug, Default)]
pub struct DummyModel;

impl DummyModel {
    pub fn new() -> Self {
        Self
    }

    pub fn shift_dr(&mut self, _tdi: bool) -> bool {
        true
    }

    pub fn shift_ir(&mut self, _tdi: bool) -> bool {
        true
    }

    pub fn update_dr(&mut self) {}
    pub fn update_ir(&mut self) {}
    pub fn capture_dr(&mut self) {}
    pub fn capture_ir(&mut self) {}
    pub fn reset(&mut self) {}
    pub fn run_idle(&mut self) {}
}

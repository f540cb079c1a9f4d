//! The IEEE 1149.1 TAP controller state machine.

use super::chain::{JtagChain, JtagFault};

/// The 16 TAP controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JtagState {
    Reset,
    RunIdle,
    DrSelect,
    DrCapture,
    DrShift,
    DrExit1,
    DrPause,
    DrExit2,
    DrUpdate,
    IrSelect,
    IrCapture,
    IrShift,
    IrExit1,
    IrPause,
    IrExit2,
    IrUpdate,
}

impl JtagState {
    /// `(state, tms) -> next_state` per IEEE 1149.1.
    fn next(self, tms: bool) -> JtagState {
        use JtagState::*;
        match (self, tms) {
            (Reset, true) => Reset,
            (Reset, false) => RunIdle,
            (RunIdle, false) => RunIdle,
            (RunIdle, true) => DrSelect,

            (DrSelect, false) => DrCapture,
            (DrSelect, true) => IrSelect,
            (DrCapture, false) => DrShift,
            (DrCapture, true) => DrExit1,
            (DrShift, false) => DrShift,
            (DrShift, true) => DrExit1,
            (DrExit1, false) => DrPause,
            (DrExit1, true) => DrUpdate,
            (DrPause, false) => DrPause,
            (DrPause, true) => DrExit2,
            (DrExit2, false) => DrShift,
            (DrExit2, true) => DrUpdate,
            (DrUpdate, false) => RunIdle,
            (DrUpdate, true) => DrSelect,

            (IrSelect, false) => IrCapture,
            (IrSelect, true) => Reset,
            (IrCapture, false) => IrShift,
            (IrCapture, true) => IrExit1,
            (IrShift, false) => IrShift,
            (IrShift, true) => IrExit1,
            (IrExit1, false) => IrPause,
            (IrExit1, true) => IrUpdate,
            (IrPause, false) => IrPause,
            (IrPause, true) => IrExit2,
            (IrExit2, false) => IrShift,
            (IrExit2, true) => IrUpdate,
            (IrUpdate, false) => RunIdle,
            (IrUpdate, true) => DrSelect,
        }
    }
}

/// Drives a [`ChainModel`] bit by bit. `clock` fires the entry-action hook
/// for the *current* state before transitioning, mirroring the original's
/// per-state callbacks (`reset`, `run_idle`, `shift_dr`, ...).
#[derive(Debug)]
pub struct JtagFsm {
    state: JtagState,
    last_tdo: bool,
    pins_locked: bool,
}

impl JtagFsm {
    pub fn new() -> Self {
        Self {
            state: JtagState::Reset,
            last_tdo: true,
            pins_locked: true,
        }
    }

    pub fn state(&self) -> JtagState {
        self.state
    }

    pub fn lock(&mut self) {
        self.pins_locked = true;
    }

    pub fn unlock(&mut self) {
        self.pins_locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.pins_locked
    }

    /// Fire the current state's entry action, transition, and return the
    /// TDO pin state (meaningful only right after a DRSHIFT/IRSHIFT action).
    pub fn clock(
        &mut self,
        chain: &mut JtagChain,
        tdi: bool,
        tms: bool,
    ) -> Result<bool, JtagFault> {
        if self.pins_locked {
            return Err(JtagFault::PinsLocked);
        }

        tracing::trace!(state = ?self.state, tdi, tms, "jtag clock");

        match self.state {
            JtagState::Reset => chain.reset(),
            JtagState::RunIdle => chain.run_idle(),
            JtagState::DrShift => self.last_tdo = chain.shift_dr(tdi),
            JtagState::DrUpdate => chain.update_dr()?,
            JtagState::DrCapture => chain.capture_dr()?,
            JtagState::IrShift => self.last_tdo = chain.shift_ir(tdi),
            JtagState::IrUpdate => chain.update_ir()?,
            JtagState::IrCapture => chain.capture_ir(),
            _ => {}
        }

        self.state = self.state.next(tms);
        Ok(self.last_tdo)
    }
}

impl Default for JtagFsm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jtag::chain::{ChainModel, JtagChain};
    use crate::jtag::models::dummy::DummyModel;

    fn dummy_chain() -> JtagChain {
        JtagChain::new(vec![ChainModel::Dummy(DummyModel::new())])
    }

    #[test]
    fn five_tms_high_from_reset_stays_in_reset() {
        let mut fsm = JtagFsm::new();
        fsm.unlock();
        let mut chain = dummy_chain();
        for _ in 0..5 {
            fsm.clock(&mut chain, false, true).unwrap();
        }
        assert_eq!(fsm.state(), JtagState::Reset);
    }

    #[test]
    fn reaches_irshift_via_0_1_1_0_0() {
        let mut fsm = JtagFsm::new();
        fsm.unlock();
        let mut chain = dummy_chain();
        for tms in [false, true, true, false, false] {
            fsm.clock(&mut chain, false, tms).unwrap();
        }
        assert_eq!(fsm.state(), JtagState::IrShift);
    }

    #[test]
    fn clock_while_locked_is_an_error() {
        let mut fsm = JtagFsm::new();
        let mut chain = dummy_chain();
        assert!(fsm.clock(&mut chain, false, false).is_err());
    }
}

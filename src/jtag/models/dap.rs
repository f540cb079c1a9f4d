//! ARM DAP (Debug Access Port) JTAG TAP model.

use crate::jtag::chain::{DrState, JtagFault};
use crate::jtag::registers::ShiftRegister;

/// A completed DR update: which register role was selected, and the value
/// shifted through it. Collected here and drained by the semantic lifter
/// rather than delivered through a stored callback closure.
#[derive(Debug, Clone, Copy)]
pub struct DrUpdate {
    pub dr_state: DrState,
    pub value: u128,
}

/// Models the ARM DAP JTAG TAP (4-bit IR; DPACC/APACC/ABORT/IDCODE/BYPASS).
///
/// `will_enable`/`enabled` form the two-phase latch described in spec.md
/// §9: a Zynq PS TAP arms `will_enable` by writing JTAG_CTRL, and it only
/// takes effect the next time RESET is entered.
#[derive(Debug)]
pub struct ArmDapModel {
    ir: ShiftRegister,
    dr: ShiftRegister,
    dr_state: DrState,
    will_enable: bool,
    enabled: bool,
    events: Vec<DrUpdate>,
}

impl ArmDapModel {
    pub fn new(initial_will_enable: bool) -> Self {
        Self {
            ir: ShiftRegister::new(4),
            dr: ShiftRegister::new(1),
            dr_state: DrState::Bypass,
            will_enable: initial_will_enable,
            enabled: false,
            events: Vec::new(),
        }
    }

    /// Arm (or disarm) the DAP to enable itself on the next RESET. Called
    /// by the Zynq PS TAP model when JTAG_CTRL bit 1 is written.
    pub fn set_enable(&mut self, enable: bool) {
        self.will_enable = enable;
    }

    /// Drain DR-update events accumulated since the last drain.
    pub fn take_events(&mut self) -> Vec<DrUpdate> {
        std::mem::take(&mut self.events)
    }

    /// The currently-selected DR role (BYPASS unless enabled).
    pub fn dr_state(&self) -> DrState {
        self.dr_state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn shift_dr(&mut self, tdi: bool) -> bool {
        self.dr.shift(tdi)
    }

    pub fn shift_ir(&mut self, tdi: bool) -> bool {
        self.ir.shift(tdi)
    }

    pub fn update_dr(&mut self) -> Result<(), JtagFault> {
        let value = self.dr.read();
        self.events.push(DrUpdate {
            dr_state: self.dr_state,
            value,
        });
        Ok(())
    }

    pub fn capture_ir(&mut self) {
        tracing::debug!("ARM DAP IR = 0x01");
        self.ir.load(0x01);
    }

    pub fn capture_dr(&mut self) -> Result<(), JtagFault> {
        tracing::debug!(dr_state = ?self.dr_state, "ARM DAP DR capture");
        self.dr = match self.dr_state {
            DrState::Bypass => {
                let mut r = ShiftRegister::new(1);
                r.load(0x0);
                r
            }
            DrState::Idcode => {
                let mut r = ShiftRegister::new(32);
                r.load(0x5ba00477);
                r
            }
            DrState::Abort | DrState::Dpacc | DrState::Apacc => ShiftRegister::new(35),
            other => unreachable!("ARM DAP never selects {other:?}"),
        };
        Ok(())
    }

    pub fn update_ir(&mut self) -> Result<(), JtagFault> {
        let ir = self.ir.read() as u32;
        self.dr_state = if self.enabled {
            match ir {
                0b1000 => DrState::Abort,
                0b1010 => DrState::Dpacc,
                0b1011 => DrState::Apacc,
                0b1110 => DrState::Idcode,
                0b1111 => DrState::Bypass,
                other => return Err(JtagFault::UnknownDapIr(other)),
            }
        } else {
            DrState::Bypass
        };
        tracing::debug!(ir, dr_state = ?self.dr_state, "ARM DAP IR update");
        Ok(())
    }

    pub fn reset(&mut self) {
        if self.will_enable {
            self.enabled = true;
            self.dr_state = DrState::Idcode;
        } else {
            self.enabled = false;
            self.dr_state = DrState::Bypass;
        }
    }

    pub fn run_idle(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_dap_stays_in_bypass_on_unknown_ir() {
        let mut dap = ArmDapModel::new(false);
        dap.reset();
        dap.ir.load(0b1010);
        dap.update_ir().unwrap();
        assert_eq!(dap.dr_state, DrState::Bypass);
    }

    #[test]
    fn enabled_dap_selects_dpacc() {
        let mut dap = ArmDapModel::new(true);
        dap.reset();
        dap.ir.load(0b1010);
        dap.update_ir().unwrap();
        assert_eq!(dap.dr_state, DrState::Dpacc);
    }

    #[test]
    fn enabled_dap_rejects_unknown_ir() {
        let mut dap = ArmDapModel::new(true);
        dap.reset();
        dap.ir.load(0b0001);
        assert!(dap.update_ir().is_err());
    }

    #[test]
    fn idcode_captures_expected_constant() {
        let mut dap = ArmDapModel::new(true);
        dap.reset();
        dap.capture_dr().unwrap();
        assert_eq!(dap.dr.read(), 0x5ba00477);
    }
}

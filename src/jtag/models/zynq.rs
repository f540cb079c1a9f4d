//! Xilinx Zynq UltraScale+ MPSoC PS/PL JTAG TAP, composed with the ARM DAP
//! it controls.
//!
//! The PS/PL TAP and the DAP TAP are two distinct links in the real scan
//! chain, but the PS TAP is the only thing that ever needs to reach into
//! the DAP (to arm its enable latch on JTAG_CTRL writes). Rather than give
//! both models a shared mutable handle to the DAP, this module is the
//! DAP's single owner: the chain sees one [`ZynqJtagModel`] entry that
//! internally shifts through the PS/PL TAP first, then the DAP TAP,
//! matching the physical scan order.

use super::dap::{ArmDapModel, DrUpdate as DapDrUpdate};
use crate::jtag::chain::{DrState, JtagFault};
use crate::jtag::registers::{ShiftRegister, SinkRegister};

/// Either of the two DR storage kinds a Zynq PS/PL DR slot can hold.
#[derive(Debug, Clone)]
enum DrStore {
    Shift(ShiftRegister),
    Sink(SinkRegister),
}

/// The value captured off a completed DR update.
#[derive(Debug, Clone)]
pub enum DrValue {
    Value(u128),
    Bitstream(Vec<bool>),
}

impl DrStore {
    fn shift(&mut self, tdi: bool) -> bool {
        match self {
            DrStore::Shift(r) => r.shift(tdi),
            DrStore::Sink(r) => r.shift(tdi),
        }
    }

    fn read(&self) -> DrValue {
        match self {
            DrStore::Shift(r) => DrValue::Value(r.read()),
            DrStore::Sink(r) => DrValue::Bitstream(r.bits().to_vec()),
        }
    }
}

/// A completed Zynq PS/PL DR update, handed to the semantic lifter.
#[derive(Debug, Clone)]
pub struct ZynqDrUpdate {
    pub dr_state: DrState,
    pub captured_ir: Option<u32>,
    pub value: DrValue,
}

/// The PS/PL TAP half: 12-bit IR split into a 6-bit PS half and a 6-bit PL
/// half, selecting one of the `DrState` roles in §4.3.2's decode table.
#[derive(Debug)]
struct ZynqPsPlModel {
    ir: ShiftRegister,
    captured_ir: Option<u32>,
    dr: DrStore,
    dr_state: DrState,
    ir_events: Vec<DrState>,
    dr_events: Vec<ZynqDrUpdate>,
}

impl ZynqPsPlModel {
    fn new() -> Self {
        Self {
            ir: ShiftRegister::new(12),
            captured_ir: None,
            dr: DrStore::Shift(ShiftRegister::new(1)),
            dr_state: DrState::Idcode,
            ir_events: Vec::new(),
            dr_events: Vec::new(),
        }
    }

    fn shift_dr(&mut self, tdi: bool) -> bool {
        self.dr.shift(tdi)
    }

    fn shift_ir(&mut self, tdi: bool) -> bool {
        self.ir.shift(tdi)
    }

    fn capture_ir(&mut self) {
        tracing::debug!("PS TAP IR = 0x051");
        self.ir.load(0x051);
    }

    fn update_ir(&mut self) -> Result<(), JtagFault> {
        let raw_ir = self.ir.read() as u32 & 0xFFF;
        self.captured_ir = Some(raw_ir);
        let ps_ir = (raw_ir >> 6) & 0x3f;
        let pl_ir = raw_ir & 0x3f;
        tracing::debug!(raw_ir, ps_ir, pl_ir, "PS TAP raw IR");

        self.dr_state = match (ps_ir, pl_ir) {
            (0x9, 0x9) => DrState::PsIdcodeDeviceId,
            (0x3f, 0x3f) => DrState::Bypass,
            (0x19, 0x3f) => DrState::IpDisable,
            (0x27, 0x3f) => {
                self.ir_events.push(DrState::UnknownState9ff);
                DrState::UnknownState9ff
            }
            (0x24, pl) => match pl {
                0b000010 => DrState::User1,
                0b000011 => DrState::User2,
                0b000100 => DrState::CfgOut,
                0b000101 => DrState::CfgIn,
                0b001011 => {
                    self.ir_events.push(DrState::Jprogram);
                    DrState::Jprogram
                }
                0b001100 => {
                    self.ir_events.push(DrState::Jstart);
                    DrState::Jstart
                }
                0b010100 => {
                    self.ir_events.push(DrState::IscNoop);
                    DrState::IscNoop
                }
                0b100010 => DrState::User3,
                0b100011 => DrState::User4,
                0b110010 => DrState::FuseDna,
                _ => return Err(JtagFault::UnknownZynqIr { raw: raw_ir, ps_ir, pl_ir }),
            },
            (ps, 0x24) => match ps {
                0x03 => DrState::PmuMdm,
                0x19 => DrState::IpDisable,
                0x1f => DrState::JtagStatus,
                0x20 => DrState::JtagCtrl,
                0x3e => DrState::ErrorStatus,
                _ => return Err(JtagFault::UnknownZynqIr { raw: raw_ir, ps_ir, pl_ir }),
            },
            _ => return Err(JtagFault::UnknownZynqIr { raw: raw_ir, ps_ir, pl_ir }),
        };

        tracing::debug!(raw_ir, dr_state = ?self.dr_state, "PS TAP IR update");
        Ok(())
    }

    fn capture_dr(&mut self) -> Result<(), JtagFault> {
        tracing::debug!(dr_state = ?self.dr_state, "PS TAP DR capture");
        self.dr = match self.dr_state {
            DrState::Bypass => {
                let mut r = ShiftRegister::new(1);
                r.load(0x1);
                DrStore::Shift(r)
            }
            DrState::Idcode => {
                let mut r = ShiftRegister::new(32);
                r.load(0x14710093);
                DrStore::Shift(r)
            }
            DrState::JtagCtrl
            | DrState::JtagStatus
            | DrState::IpDisable
            | DrState::User1
            | DrState::User2
            | DrState::User3
            | DrState::User4
            | DrState::CfgOut
            | DrState::PmuMdm => DrStore::Shift(ShiftRegister::new(32)),
            DrState::PsIdcodeDeviceId => {
                // This register is never actually read back; emit an IR
                // event now since no DRCAPTURE-driven DR event will do it.
                self.ir_events.push(DrState::PsIdcodeDeviceId);
                let mut r = ShiftRegister::new(64);
                r.load((0x14710093u128) << 32);
                DrStore::Shift(r)
            }
            DrState::CfgIn => DrStore::Sink(SinkRegister::new()),
            DrState::ErrorStatus => DrStore::Shift(ShiftRegister::new(121)),
            DrState::FuseDna => DrStore::Shift(ShiftRegister::new(96)),
            other @ (DrState::Jprogram | DrState::Jstart | DrState::IscNoop) => {
                return Err(JtagFault::CaptureWithoutDr(other));
            }
            other => return Err(JtagFault::CaptureWithoutDr(other)),
        };
        Ok(())
    }

    /// `dap` receives the enable latch when JTAG_CTRL bit 1 is written.
    fn update_dr(&mut self, dap: &mut ArmDapModel) -> Result<(), JtagFault> {
        let value = self.dr.read();

        if self.dr_state == DrState::JtagCtrl {
            if let DrValue::Value(v) = value {
                if v & 0x2 != 0 {
                    dap.set_enable(true);
                }
            }
        }

        self.dr_events.push(ZynqDrUpdate {
            dr_state: self.dr_state,
            captured_ir: self.captured_ir,
            value,
        });
        Ok(())
    }

    fn reset(&mut self) {
        self.dr_state = DrState::Idcode;
        self.captured_ir = None;
    }

    fn run_idle(&mut self) {}
}

/// Composite chain entry: the Zynq PS/PL TAP followed by the ARM DAP TAP,
/// matching the physical scan order.
#[derive(Debug)]
pub struct ZynqJtagModel {
    ps: ZynqPsPlModel,
    dap: ArmDapModel,
}

impl ZynqJtagModel {
    pub fn new(initial_dap_will_enable: bool) -> Self {
        Self {
            ps: ZynqPsPlModel::new(),
            dap: ArmDapModel::new(initial_dap_will_enable),
        }
    }

    pub fn take_ps_ir_events(&mut self) -> Vec<DrState> {
        std::mem::take(&mut self.ps.ir_events)
    }

    pub fn take_ps_dr_events(&mut self) -> Vec<ZynqDrUpdate> {
        std::mem::take(&mut self.ps.dr_events)
    }

    pub fn take_dap_events(&mut self) -> Vec<DapDrUpdate> {
        self.dap.take_events()
    }

    pub fn shift_dr(&mut self, tdi: bool) -> bool {
        let ps_tdo = self.ps.shift_dr(tdi);
        self.dap.shift_dr(ps_tdo)
    }

    pub fn shift_ir(&mut self, tdi: bool) -> bool {
        let ps_tdo = self.ps.shift_ir(tdi);
        self.dap.shift_ir(ps_tdo)
    }

    pub fn update_dr(&mut self) -> Result<(), JtagFault> {
        self.ps.update_dr(&mut self.dap)?;
        self.dap.update_dr()?;
        Ok(())
    }

    pub fn update_ir(&mut self) -> Result<(), JtagFault> {
        self.ps.update_ir()?;
        self.dap.update_ir()?;
        Ok(())
    }

    pub fn capture_dr(&mut self) -> Result<(), JtagFault> {
        self.ps.capture_dr()?;
        self.dap.capture_dr()?;
        Ok(())
    }

    pub fn capture_ir(&mut self) {
        self.ps.capture_ir();
        self.dap.capture_ir();
    }

    pub fn reset(&mut self) {
        self.ps.reset();
        self.dap.reset();
    }

    pub fn run_idle(&mut self) {
        self.ps.run_idle();
        self.dap.run_idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jtag_ctrl_bit1_arms_dap_enable_for_next_reset() {
        let mut zynq = ZynqJtagModel::new(false);
        zynq.reset();
        // Select JTAG_CTRL: ps_ir=0x20, pl_ir=0x24 -> raw = (0x20<<6)|0x24
        zynq.ps.ir.load(((0x20u32) << 6 | 0x24) as u128);
        zynq.ps.update_ir().unwrap();
        assert_eq!(zynq.ps.dr_state, DrState::JtagCtrl);
        zynq.ps.capture_dr().unwrap();
        zynq.ps.dr = DrStore::Shift({
            let mut r = ShiftRegister::new(32);
            r.load(0x2);
            r
        });
        zynq.update_dr().unwrap();
        assert!(!zynq.dap.is_enabled());
        zynq.reset();
        assert!(zynq.dap.is_enabled());
        assert_eq!(zynq.dap.dr_state(), DrState::Idcode);
    }

    #[test]
    fn unknown_ir_combination_is_a_fault() {
        let mut zynq = ZynqJtagModel::new(false);
        zynq.ps.ir.load(0x000);
        let err = zynq.ps.update_ir();
        assert!(err.is_err());
    }

    #[test]
    fn idcode_idcode_selects_ps_idcode_device_id_and_emits_ir_event() {
        let mut zynq = ZynqJtagModel::new(false);
        zynq.ps.ir.load(((0x9u32) << 6 | 0x9) as u128);
        zynq.ps.update_ir().unwrap();
        assert_eq!(zynq.ps.dr_state, DrState::PsIdcodeDeviceId);
        zynq.ps.capture_dr().unwrap();
        let events = zynq.take_ps_ir_events();
        assert_eq!(events, vec![DrState::PsIdcodeDeviceId]);
    }

    #[test]
    fn jprogram_capture_is_illegal() {
        let mut zynq = ZynqJtagModel::new(false);
        // ps_ir=0x24, pl_ir=0b001011 -> JPROGRAM
        zynq.ps.ir.load(((0x24u32) << 6 | 0b001011) as u128);
        zynq.ps.update_ir().unwrap();
        assert_eq!(zynq.ps.dr_state, DrState::Jprogram);
        assert!(zynq.ps.capture_dr().is_err());
    }
}

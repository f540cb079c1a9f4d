//! The TAP chain: a pipeline of device models, dispatched through a sum
//! type rather than a trait object (no model needs virtual dispatch; the
//! FSM always knows exactly which chain it's driving).

use super::models::{dap::ArmDapModel, dummy::DummyModel, zynq::ZynqJtagModel};

/// The *role* of the currently-selected DR for a device model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrState {
    Bypass,
    Idcode,
    JtagCtrl,
    JtagStatus,
    Abort,
    Dpacc,
    Apacc,
    PsIdcodeDeviceId,
    PmuMdm,
    ErrorStatus,
    IpDisable,
    UnknownState9ff,
    User1,
    User2,
    User3,
    User4,
    CfgOut,
    CfgIn,
    Jprogram,
    IscNoop,
    FuseDna,
    Jstart,
}

/// Assertion-class failures: malformed capture or a model-coverage gap.
/// Terminal by design (spec.md §7).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JtagFault {
    #[error("JTAG pins are locked")]
    PinsLocked,
    #[error("DRCAPTURE entered with {0:?} selected, which has no capture phase")]
    CaptureWithoutDr(DrState),
    #[error("unknown ARM DAP instruction 0x{0:x} while DAP is enabled")]
    UnknownDapIr(u32),
    #[error("unknown Zynq PS/PL IR combination: raw=0x{raw:03x} ps_ir=0x{ps_ir:02x} pl_ir=0x{pl_ir:02x}")]
    UnknownZynqIr { raw: u32, ps_ir: u32, pl_ir: u32 },
}

impl std::fmt::Display for DrState {
    /// Render the way the original prints these (upper-snake register
    /// names), since the emitter quotes this directly into IR-selection
    /// transcript lines.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DrState::Bypass => "BYPASS",
            DrState::Idcode => "IDCODE",
            DrState::JtagCtrl => "JTAG_CTRL",
            DrState::JtagStatus => "JTAG_STATUS",
            DrState::Abort => "ABORT",
            DrState::Dpacc => "DPACC",
            DrState::Apacc => "APACC",
            DrState::PsIdcodeDeviceId => "PS_IDCODE_DEVICE_ID",
            DrState::PmuMdm => "PMU_MDM",
            DrState::ErrorStatus => "ERROR_STATUS",
            DrState::IpDisable => "IP_DISABLE",
            DrState::UnknownState9ff => "UNKNOWN_STATE_9FF",
            DrState::User1 => "USER1",
            DrState::User2 => "USER2",
            DrState::User3 => "USER3",
            DrState::User4 => "USER4",
            DrState::CfgOut => "CFG_OUT",
            DrState::CfgIn => "CFG_IN",
            DrState::Jprogram => "JPROGRAM",
            DrState::IscNoop => "ISC_NOOP",
            DrState::FuseDna => "FUSE_DNA",
            DrState::Jstart => "JSTART",
        };
        f.write_str(name)
    }
}

/// A chain position. Shift operations propagate TDI through each member in
/// order; capture/update/reset/run_idle broadcast to the whole chain.
pub enum ChainModel {
    Dap(ArmDapModel),
    Zynq(Box<ZynqJtagModel>),
    Dummy(DummyModel),
}

impl ChainModel {
    pub fn shift_dr(&mut self, tdi: bool) -> bool {
        match self {
            ChainModel::Dap(m) => m.shift_dr(tdi),
            ChainModel::Zynq(m) => m.shift_dr(tdi),
            ChainModel::Dummy(m) => m.shift_dr(tdi),
        }
    }

    pub fn shift_ir(&mut self, tdi: bool) -> bool {
        match self {
            ChainModel::Dap(m) => m.shift_ir(tdi),
            ChainModel::Zynq(m) => m.shift_ir(tdi),
            ChainModel::Dummy(m) => m.shift_ir(tdi),
        }
    }

    pub fn update_dr(&mut self) -> Result<(), JtagFault> {
        match self {
            ChainModel::Dap(m) => m.update_dr(),
            ChainModel::Zynq(m) => m.update_dr(),
            ChainModel::Dummy(m) => {
                m.update_dr();
                Ok(())
            }
        }
    }

    pub fn update_ir(&mut self) -> Result<(), JtagFault> {
        match self {
            ChainModel::Dap(m) => m.update_ir(),
            ChainModel::Zynq(m) => m.update_ir(),
            ChainModel::Dummy(m) => {
                m.update_ir();
                Ok(())
            }
        }
    }

    pub fn capture_dr(&mut self) -> Result<(), JtagFault> {
        match self {
            ChainModel::Dap(m) => m.capture_dr(),
            ChainModel::Zynq(m) => m.capture_dr(),
            ChainModel::Dummy(m) => {
                m.capture_dr();
                Ok(())
            }
        }
    }

    pub fn capture_ir(&mut self) {
        match self {
            ChainModel::Dap(m) => m.capture_ir(),
            ChainModel::Zynq(m) => m.capture_ir(),
            ChainModel::Dummy(m) => m.capture_ir(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            ChainModel::Dap(m) => m.reset(),
            ChainModel::Zynq(m) => m.reset(),
            ChainModel::Dummy(m) => m.reset(),
        }
    }

    pub fn run_idle(&mut self) {
        match self {
            ChainModel::Dap(m) => m.run_idle(),
            ChainModel::Zynq(m) => m.run_idle(),
            ChainModel::Dummy(m) => m.run_idle(),
        }
    }
}

/// A pipeline of chain members; TDI/TDO propagate through in order.
pub struct JtagChain {
    models: Vec<ChainModel>,
}

impl JtagChain {
    pub fn new(models: Vec<ChainModel>) -> Self {
        assert!(!models.is_empty());
        Self { models }
    }
}

impl JtagChain {
    pub fn shift_dr(&mut self, mut tdi: bool) -> bool {
        let mut tdo = tdi;
        for model in &mut self.models {
            tdo = model.shift_dr(tdi);
            tdi = tdo;
        }
        tdo
    }

    pub fn shift_ir(&mut self, mut tdi: bool) -> bool {
        let mut tdo = tdi;
        for model in &mut self.models {
            tdo = model.shift_ir(tdi);
            tdi = tdo;
        }
        tdo
    }

    pub fn update_dr(&mut self) -> Result<(), JtagFault> {
        for model in &mut self.models {
            model.update_dr()?;
        }
        Ok(())
    }

    pub fn update_ir(&mut self) -> Result<(), JtagFault> {
        for model in &mut self.models {
            model.update_ir()?;
        }
        Ok(())
    }

    pub fn capture_dr(&mut self) -> Result<(), JtagFault> {
        for model in &mut self.models {
            model.capture_dr()?;
        }
        Ok(())
    }

    pub fn capture_ir(&mut self) {
        for model in &mut self.models {
            model.capture_ir();
        }
    }

    pub fn reset(&mut self) {
        for model in &mut self.models {
            model.reset();
        }
    }

    pub fn run_idle(&mut self) {
        for model in &mut self.models {
            model.run_idle();
        }
    }

    /// Reach into the chain for the Zynq composite, to drain its lifter
    /// event queues after each clock. `None` if this chain has no Zynq
    /// member (e.g. a test chain built from [`ChainModel::Dummy`]).
    pub fn zynq_mut(&mut self) -> Option<&mut ZynqJtagModel> {
        self.models.iter_mut().find_map(|m| match m {
            ChainModel::Zynq(z) => Some(z.as_mut()),
            _ => None,
        })
    }
}

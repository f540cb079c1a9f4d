//! Semantic lifter: turns DAP/Zynq DR updates into ARM debug, MEM-AP and
//! JTAG-AP events (spec §4.4). Grounded in `arm_jtag_models.py`.

pub mod dap_debug;
pub mod jtag_ap;
pub mod mem_ap;

pub use dap_debug::{ArmDebugCommand, ArmDebugModel, ArmDpRegister};
pub use jtag_ap::{ArmJtagApModel, ArmJtagApRegister};
pub use mem_ap::{ArmMemApAutoIncrement, ArmMemApModel, ArmMemApRegister};

/// Unsupported-hardware-feature and malformed-access failures raised while
/// lifting DR updates into debug/AP events. Terminal, matching spec.md §7.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LiftError {
    #[error("DPACC access at A=0x{0:x} must be a read")]
    ExpectedDpRead(u8),
    #[error("DPACC access at A=0x{0:x} must be a write")]
    ExpectedDpWrite(u8),
    #[error("DPACC address A=0x{0:x} is not one of {{0x0, 0x4, 0x8, 0xC}}")]
    UnknownDpaccAddress(u8),
    #[error("APACC access before SELECT has chosen an AP")]
    NoApSelected,
    #[error("MEM-AP register 0x{0:x} is not a known MEM-AP register")]
    UnknownMemApRegister(u8),
    #[error("MEM-AP CSW AddrInc field 0x{0:x} is not a known auto-increment mode")]
    UnknownAutoIncrementMode(u8),
    #[error("MEM-AP MBT register is not implemented")]
    MbtNotImplemented,
    #[error("MEM-AP packed auto-increment is not implemented")]
    PackedAutoIncrementNotImplemented,
    #[error("MEM-AP barrier support is not implemented")]
    BarrierNotImplemented,
    #[error("MEM-AP auto-increment requires CSW to be configured first")]
    AutoIncrementBeforeCsw,
    #[error("MEM-AP register {0:?} is read-only")]
    ReadOnlyMemApRegister(ArmMemApRegister),
    #[error("JTAG-AP register 0x{0:x} is not implemented (only CSW/PSEL/IDR)")]
    JtagApRegisterNotImplemented(u8),
    #[error("JTAG-AP register 0x{0:x} is not a known JTAG-AP register")]
    UnknownJtagApRegister(u8),
}

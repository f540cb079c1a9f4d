//! JTAG-AP model. Only CSW/PSEL/IDR are implemented; every other register
//! (PSTA, BxFIFOn) is an unimplemented-hardware-feature error.

use super::LiftError;

/// Table 7-6 register offsets, JTAG-AP variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmJtagApRegister {
    Csw = 0x0,
    Psel = 0x04,
    Psta = 0x08,
    BxFifo1 = 0x10,
    BxFifo2 = 0x14,
    BxFifo3 = 0x18,
    BxFifo4 = 0x1C,
    Idr = 0xFC,
}

impl TryFrom<u8> for ArmJtagApRegister {
    type Error = LiftError;

    fn try_from(reg: u8) -> Result<Self, LiftError> {
        use ArmJtagApRegister::*;
        Ok(match reg {
            0x0 => Csw,
            0x04 => Psel,
            0x08 => Psta,
            0x10 => BxFifo1,
            0x14 => BxFifo2,
            0x18 => BxFifo3,
            0x1C => BxFifo4,
            0xFC => Idr,
            other => return Err(LiftError::UnknownJtagApRegister(other)),
        })
    }
}

#[derive(Debug, Default)]
pub struct ArmJtagApModel;

impl ArmJtagApModel {
    pub fn new() -> Self {
        Self
    }

    pub fn read_register(&self, reg: u8) -> Result<String, LiftError> {
        use ArmJtagApRegister::*;
        match ArmJtagApRegister::try_from(reg)? {
            Csw => Ok("Read JTAG-AP CSW".into()),
            Idr => Ok("Read JTAG-AP IDR".into()),
            other => Err(LiftError::JtagApRegisterNotImplemented(other as u8)),
        }
    }

    pub fn write_register(&self, reg: u8, value: u32) -> Result<String, LiftError> {
        use ArmJtagApRegister::*;
        match ArmJtagApRegister::try_from(reg)? {
            Csw => Ok(format!("Write JTAG-AP CSW = 0x{value:08x}")),
            Psel => Ok(format!("Write JTAG-AP PSEL = 0x{value:08x}")),
            other => Err(LiftError::JtagApRegisterNotImplemented(other as u8)),
        }
    }
}

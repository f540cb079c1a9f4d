//! MEM-AP (Memory Access Port) model: translates DAP register accesses
//! into memory-bus transactions via TAR/DRW. Table 7-6, ARM IHI0031C.

use super::LiftError;

/// Table 7-6 register offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmMemApRegister {
    Csw = 0x0,
    Tar = 0x4,
    TarHigh = 0x8,
    Drw = 0xC,
    Bd0 = 0x10,
    Bd1 = 0x14,
    Bd2 = 0x18,
    Bd3 = 0x1C,
    Mbt = 0x20,
    Base = 0xF0,
    Cfg = 0xF4,
    BaseHigh = 0xF8,
    Idr = 0xFC,
}

impl TryFrom<u8> for ArmMemApRegister {
    type Error = LiftError;

    fn try_from(reg: u8) -> Result<Self, LiftError> {
        use ArmMemApRegister::*;
        Ok(match reg {
            0x0 => Csw,
            0x4 => Tar,
            0x8 => TarHigh,
            0xC => Drw,
            0x10 => Bd0,
            0x14 => Bd1,
            0x18 => Bd2,
            0x1C => Bd3,
            0x20 => Mbt,
            0xF0 => Base,
            0xF4 => Cfg,
            0xF8 => BaseHigh,
            0xFC => Idr,
            other => return Err(LiftError::UnknownMemApRegister(other)),
        })
    }
}

/// Table 7-1 AddrInc field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmMemApAutoIncrement {
    Off,
    Single,
    Packed,
}

impl TryFrom<u8> for ArmMemApAutoIncrement {
    type Error = LiftError;

    fn try_from(bits: u8) -> Result<Self, LiftError> {
        match bits & 0x3 {
            0b00 => Ok(ArmMemApAutoIncrement::Off),
            0b01 => Ok(ArmMemApAutoIncrement::Single),
            0b10 => Ok(ArmMemApAutoIncrement::Packed),
            other => Err(LiftError::UnknownAutoIncrementMode(other)),
        }
    }
}

/// Per-AP MEM-AP state: TAR halves, transfer width, auto-increment mode.
#[derive(Debug, Default)]
pub struct ArmMemApModel {
    tar_low: Option<u32>,
    tar_high: u32,
    width: Option<u8>,
    auto_increment: Option<ArmMemApAutoIncrement>,
}

impl ArmMemApModel {
    pub fn new() -> Self {
        Self { tar_high: 0, ..Default::default() }
    }

    fn tar(&self) -> u64 {
        ((self.tar_high as u64) << 32) | self.tar_low.unwrap_or(0) as u64
    }

    fn auto_increment_tar(&mut self) -> Result<String, LiftError> {
        let width = self.width.ok_or(LiftError::AutoIncrementBeforeCsw)?;
        match self.auto_increment {
            None | Some(ArmMemApAutoIncrement::Off) => Ok(String::new()),
            Some(ArmMemApAutoIncrement::Single) => {
                let tar = self.tar() + width as u64;
                self.tar_low = Some((tar & 0xFFFF_FFFF) as u32);
                self.tar_high = ((tar >> 32) & 0xFFFF_FFFF) as u32;
                Ok(format!(", address auto-incremented by {}-bits", width as u32 * 8))
            }
            Some(ArmMemApAutoIncrement::Packed) => Err(LiftError::PackedAutoIncrementNotImplemented),
        }
    }

    fn format_address(&self, address: u64) -> String {
        if self.tar_high == 0 {
            format!("0x{:08x}", address)
        } else {
            format!("0x{:016x}", address)
        }
    }

    fn banked_address(&self, offset: u32) -> Result<u64, LiftError> {
        if self.width != Some(4) {
            return Err(LiftError::AutoIncrementBeforeCsw);
        }
        Ok((self.tar() & !0xF) | offset as u64)
    }

    /// Read a MEM-AP register; returns a human-readable transcript line, or
    /// `None` for setup-only registers with no visible transaction.
    pub fn read_register(&mut self, reg: u8) -> Result<Option<String>, LiftError> {
        use ArmMemApRegister::*;
        match ArmMemApRegister::try_from(reg)? {
            Csw => Ok(None),
            Tar => Ok(None),
            TarHigh => Ok(None),
            Drw => {
                let width = self.width.ok_or(LiftError::AutoIncrementBeforeCsw)?;
                let addr = self.format_address(self.tar());
                let mut msg = format!("Reading {}-bits from {}", width as u32 * 8, addr);
                msg.push_str(&self.auto_increment_tar()?);
                Ok(Some(msg))
            }
            Bd0 => self.read_banked(0x0).map(Some),
            Bd1 => self.read_banked(0x4).map(Some),
            Bd2 => self.read_banked(0x8).map(Some),
            Bd3 => self.read_banked(0xC).map(Some),
            Mbt => Err(LiftError::MbtNotImplemented),
            Base => Ok(Some("Read MEM-AP BASE".into())),
            Cfg => Ok(Some("Read MEM-AP CFG".into())),
            BaseHigh => Ok(Some("Read MEM-AP BASE_HIGH".into())),
            Idr => Ok(Some("Read MEM-AP IDR".into())),
        }
    }

    /// Write a MEM-AP register; returns a transcript line for transactions
    /// that produce one (DRW/BDx), `None` for setup-only writes (CSW/TAR).
    pub fn write_register(&mut self, reg: u8, value: u32) -> Result<Option<String>, LiftError> {
        use ArmMemApRegister::*;
        match ArmMemApRegister::try_from(reg)? {
            Csw => {
                self.width = Some(match value & 0x7 {
                    0b000 => 1,
                    0b001 => 2,
                    0b010 => 4,
                    0b011 => 8,
                    0b100 => 16,
                    0b101 => 32,
                    other => return Err(LiftError::UnknownMemApRegister(other as u8)),
                });
                self.auto_increment = Some(ArmMemApAutoIncrement::try_from(((value >> 4) & 0x3) as u8)?);
                if (value >> 8) & 0xF != 0 {
                    return Err(LiftError::BarrierNotImplemented);
                }
                Ok(None)
            }
            Tar => {
                self.tar_low = Some(value);
                Ok(None)
            }
            TarHigh => {
                self.tar_high = value;
                Ok(None)
            }
            Drw => {
                let width = self.width.ok_or(LiftError::AutoIncrementBeforeCsw)?;
                let addr = self.format_address(self.tar());
                let mut msg = format!("Writing {}-bits from {} to 0x{:08x}", width as u32 * 8, addr, value);
                msg.push_str(&self.auto_increment_tar()?);
                Ok(Some(msg))
            }
            Bd0 => self.write_banked(0x0, value).map(Some),
            Bd1 => self.write_banked(0x4, value).map(Some),
            Bd2 => self.write_banked(0x8, value).map(Some),
            Bd3 => self.write_banked(0xC, value).map(Some),
            Mbt => Err(LiftError::MbtNotImplemented),
            Base => Err(LiftError::ReadOnlyMemApRegister(Base)),
            Cfg => Err(LiftError::ReadOnlyMemApRegister(Cfg)),
            BaseHigh => Err(LiftError::ReadOnlyMemApRegister(BaseHigh)),
            Idr => Err(LiftError::ReadOnlyMemApRegister(Idr)),
        }
    }

    fn read_banked(&self, offset: u32) -> Result<String, LiftError> {
        let address = self.banked_address(offset)?;
        Ok(format!("Reading 32-bits from {}", self.format_address(address)))
    }

    fn write_banked(&self, offset: u32, value: u32) -> Result<String, LiftError> {
        let address = self.banked_address(offset)?;
        Ok(format!(
            "Writing 32-bits from {} to 0x{:08x}",
            self.format_address(address),
            value
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csw_write_configures_width_and_auto_increment() {
        let mut ap = ArmMemApModel::new();
        ap.write_register(0x0, 0x12).unwrap();
        assert_eq!(ap.width, Some(4));
        assert_eq!(ap.auto_increment, Some(ArmMemApAutoIncrement::Single));
    }

    #[test]
    fn drw_read_after_csw_and_tar_advances_address() {
        let mut ap = ArmMemApModel::new();
        ap.write_register(0x0, 0x12).unwrap();
        ap.write_register(0x4, 0x1000_0000).unwrap();

        let msg1 = ap.read_register(0xC).unwrap().unwrap();
        assert!(msg1.contains("0x10000000"));
        assert_eq!(ap.tar_low, Some(0x1000_0004));

        let msg2 = ap.read_register(0xC).unwrap().unwrap();
        assert!(msg2.contains("0x10000004"));
    }

    #[test]
    fn barrier_mode_is_not_implemented() {
        let mut ap = ArmMemApModel::new();
        let err = ap.write_register(0x0, 0x12 | (1 << 8)).unwrap_err();
        assert_eq!(err, LiftError::BarrierNotImplemented);
    }

    #[test]
    fn base_write_is_rejected_as_read_only() {
        let mut ap = ArmMemApModel::new();
        let err = ap.write_register(0xF0, 0).unwrap_err();
        assert_eq!(err, LiftError::ReadOnlyMemApRegister(ArmMemApRegister::Base));
    }

    #[test]
    fn packed_auto_increment_is_not_implemented() {
        let mut ap = ArmMemApModel::new();
        ap.write_register(0x0, 0x2 | (0b10 << 4)).unwrap();
        ap.write_register(0x4, 0).unwrap();
        let err = ap.read_register(0xC).unwrap_err();
        assert_eq!(err, LiftError::PackedAutoIncrementNotImplemented);
    }
}

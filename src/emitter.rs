//! OpenOCD-style transcript emitter (spec.md §4.5).
//!
//! Grouped the way `DapOutputGroupers` does in the original: AP register
//! accesses buffer their TCL lines until a register produces a visible
//! result (a memory read/write), then flush as one block headed by a
//! comment naming the AP.

use crate::arm::{
    ArmDebugCommand, ArmJtagApModel, ArmMemApModel, LiftError,
};
use crate::jtag::DrState;
use crate::jtag::models::zynq::DrValue;
use std::io::{self, Write};

const AP_NAMES: [&str; 3] = ["MEM-AP AXI", "MEM-AP Debug", "JTAG-AP"];

enum ApSlot {
    Mem(ArmMemApModel),
    Jtag(ArmJtagApModel),
}

impl ApSlot {
    fn read_register(&mut self, reg: u8) -> Result<Option<String>, LiftError> {
        match self {
            ApSlot::Mem(m) => m.read_register(reg),
            ApSlot::Jtag(j) => j.read_register(reg).map(Some),
        }
    }

    fn write_register(&mut self, reg: u8, value: u32) -> Result<Option<String>, LiftError> {
        match self {
            ApSlot::Mem(m) => m.write_register(reg, value),
            ApSlot::Jtag(j) => j.write_register(reg, value).map(Some),
        }
    }
}

fn dp_register_name(reg: u8) -> String {
    crate::arm::ArmDpRegister::name(reg)
        .map(str::to_string)
        .unwrap_or_else(|| format!("DPREG_0x{reg:02x}"))
}

/// Writes an OpenOCD-style `.cfg`/TCL transcript to `out`, one DP/AP/MEM-AP
/// transaction group per block, plus comments for selected TAP instructions
/// that have no register-level transcript of their own.
pub struct Emitter<W: Write> {
    out: W,
    lines: Vec<String>,
    aps: [ApSlot; 3],
}

impl<W: Write> Emitter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            lines: Vec::new(),
            aps: [ApSlot::Mem(ArmMemApModel::new()), ApSlot::Mem(ArmMemApModel::new()), ApSlot::Jtag(ArmJtagApModel::new())],
        }
    }

    /// Unwrap the emitter, returning its underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn ap_name(ap_num: u8) -> &'static str {
        AP_NAMES.get(ap_num as usize).copied().unwrap_or("UNKNOWN-AP")
    }

    fn flush_group(&mut self, ap_num: u8, result: &str) -> io::Result<()> {
        writeln!(self.out, "# {}: {result}", Self::ap_name(ap_num))?;
        for line in self.lines.drain(..) {
            writeln!(self.out, "{line}")?;
        }
        writeln!(self.out)
    }

    /// Lift one ARM debug-port event into transcript lines.
    pub fn handle_debug_command(&mut self, command: ArmDebugCommand) -> io::Result<()> {
        match command {
            ArmDebugCommand::Abort { value } => {
                writeln!(self.out, "irscan $_CHIPNAME.tap [dap_ir ABORT]")?;
                writeln!(self.out, "drscan $_CHIPNAME.tap 35 0x{value:09x}")?;
                writeln!(self.out)?;
            }
            ArmDebugCommand::ReadApRegister { ap_num, reg } => {
                let result = self.aps[ap_num as usize]
                    .read_register(reg)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
                self.lines
                    .push(format!("set ap_reg_value [$_CHIPNAME.dap apreg {ap_num} 0x{reg:02x}]"));
                if let Some(result) = result {
                    self.flush_group(ap_num, &result)?;
                }
            }
            ArmDebugCommand::WriteApRegister { ap_num, reg, value } => {
                let result = self.aps[ap_num as usize]
                    .write_register(reg, value)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
                self.lines
                    .push(format!("$_CHIPNAME.dap apreg {ap_num} 0x{reg:02x} 0x{value:08x}"));
                if let Some(result) = result {
                    self.flush_group(ap_num, &result)?;
                }
            }
            ArmDebugCommand::ReadDpRegister { reg } => {
                writeln!(self.out, "# Reading {}", dp_register_name(reg))?;
                writeln!(self.out, "set dp_reg_value [$_CHIPNAME.dap dpreg 0x{reg:02x}]")?;
                writeln!(self.out)?;
            }
            ArmDebugCommand::WriteDpRegister { reg, value } => {
                writeln!(self.out, "# Writing {} = 0x{value:08x}", dp_register_name(reg))?;
                writeln!(self.out, "$_CHIPNAME.dap dpreg 0x{reg:02x} 0x{value:08x}")?;
                writeln!(self.out)?;
            }
        }
        Ok(())
    }

    /// A Zynq PS/PL IR selection with no DRCAPTURE of its own (JPROGRAM,
    /// JSTART, ISC_NOOP, PS_IDCODE_DEVICE_ID, UNKNOWN_STATE_9FF): name it.
    pub fn handle_ps_ir_event(&mut self, state: DrState) -> io::Result<()> {
        writeln!(self.out, "# IR selected: {state}")?;
        writeln!(self.out)
    }

    /// A completed Zynq PS/PL DR update. Only CFG_IN has a dedicated
    /// rendering (the bitstream payload); everything else is ordering-only.
    pub fn handle_ps_dr_event(&mut self, dr_state: DrState, value: &DrValue) -> io::Result<()> {
        if dr_state == DrState::CfgIn {
            if let DrValue::Bitstream(bits) = value {
                writeln!(self.out, "# CFG_IN: {} bits captured", bits.len())?;
                writeln!(self.out, "pld load 0 xxx.bit")?;
                writeln!(self.out)?;
            }
        } else {
            tracing::debug!(dr_state = ?dr_state, "PS/PL DR update (no dedicated transcript rendering)");
        }
        Ok(())
    }
}

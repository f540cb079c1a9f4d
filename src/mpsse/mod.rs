//! MPSSE command decoder.
//!
//! Turns a paired (TX, RX) [`FramedBuffer`] pair into an ordered list of
//! [`FtdiCommand`]s. The TX stream is the only thing dispatched on; the RX
//! stream is consumed in lock-step wherever a command has a reply.

mod decode;

pub use decode::{decode_commands, DecodeError};

use serde::Serialize;

/// What kind of FTDI/MPSSE command a byte decoded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FtdiCommandKind {
    Unknown,
    ClockTdi,
    ClockTdo,
    ClockTms,
    SetGpioLow,
    GetGpioLow,
    SetGpioHigh,
    GetGpioHigh,
    DisableLoopback,
    SetDivisor,
    Flush,
    DisableDivBy5,
    DisableRclk,
    ClockNoData,
}

/// Flags decoded from the low/high bits of an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FtdiFlag {
    NegEdgeOut,
    Bitwise,
    NegEdgeIn,
    LsbFirst,
    TdiHigh,
}

/// A single decoded MPSSE command and (if applicable) its captured reply.
#[derive(Debug, Clone, Serialize)]
pub struct FtdiCommand {
    pub kind: FtdiCommandKind,
    pub opcode: u8,
    pub flags: Vec<FtdiFlag>,
    /// Length in bits (bitwise ops) or bytes (byte ops), already +1 decoded.
    pub length: Option<usize>,
    pub command_frame: Option<u32>,
    pub reply_frame: Option<u32>,
    pub data: Option<Vec<u8>>,
    pub reply: Option<Vec<u8>>,
}

impl FtdiCommand {
    pub fn has_flag(&self, flag: FtdiFlag) -> bool {
        self.flags.contains(&flag)
    }
}

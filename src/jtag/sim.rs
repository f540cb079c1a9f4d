//! Drives the FSM from a decoded [`FtdiCommand`] stream (§4.2a).
//!
//! This is the bridge between the byte-level MPSSE decoder and the
//! bit-level TAP simulator: for each command, replay its data bits as
//! `clock()` calls and pack any captured TDO bits back into bytes so they
//! can be diffed against the real captured RX reply.

use crate::jtag::chain::{JtagChain, JtagFault};
use crate::jtag::fsm::{JtagFsm, JtagState};
use crate::mpsse::{FtdiCommand, FtdiCommandKind, FtdiFlag};
use thiserror::Error;

const TCK: u8 = 0;
const TDI_PIN: u8 = 1;
const TDO_PIN: u8 = 2;
const TMS_PIN: u8 = 3;

/// Raised by the simulator driver itself, as opposed to the FSM/chain it
/// drives (see [`JtagFault`]) or the decoder (see
/// [`crate::mpsse::DecodeError`]).
#[derive(Debug, Error)]
pub enum SimError {
    #[error("command is missing a required flag")]
    MissingFlag,
    #[error("SET_GPIO_LOW with direction=0 requires the FSM to be in RUN_IDLE or RESET, found {0:?}")]
    LockRequiresIdleOrReset(JtagState),
    #[error("SET_GPIO_LOW assertion failed: {0}")]
    BadGpioAssertion(String),
    #[error(transparent)]
    Fault(#[from] JtagFault),
}

fn require(cmd: &FtdiCommand, flag: FtdiFlag) -> Result<(), SimError> {
    if cmd.has_flag(flag) {
        Ok(())
    } else {
        Err(SimError::MissingFlag)
    }
}

/// Pack bits LSB-first into bytes, padding the final partial byte with
/// zero bits (mirrors the original's `bits_to_bytes`).
fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &b)| if b { acc | (1 << i) } else { acc })
        })
        .collect()
}

/// Replay one decoded command against the FSM, returning the simulated
/// reply bytes (empty unless the command captures TDO).
pub fn run_ftdi_command(
    cmd: &FtdiCommand,
    fsm: &mut JtagFsm,
    chain: &mut JtagChain,
) -> Result<Vec<u8>, SimError> {
    let mut output: Vec<bool> = Vec::new();
    let reading = cmd.opcode & 0x20 != 0;

    match cmd.kind {
        FtdiCommandKind::ClockTms => {
            require(cmd, FtdiFlag::LsbFirst)?;
            require(cmd, FtdiFlag::NegEdgeOut)?;
            require(cmd, FtdiFlag::Bitwise)?;
            if reading {
                require(cmd, FtdiFlag::NegEdgeIn)?;
            }
            let length = cmd.length.unwrap_or(0);
            let data = cmd.data.as_ref().map(|d| d[0]).unwrap_or(0);
            let tdi = data & 0x80 != 0;
            for bit in 0..length {
                let tms = data & (1 << bit) != 0;
                let tdo = fsm.clock(chain, tdi, tms)?;
                if reading {
                    output.push(tdo);
                }
            }
        }
        FtdiCommandKind::ClockTdi => {
            require(cmd, FtdiFlag::LsbFirst)?;
            require(cmd, FtdiFlag::NegEdgeOut)?;
            if reading {
                require(cmd, FtdiFlag::NegEdgeIn)?;
            }
            let tms = false;
            if cmd.has_flag(FtdiFlag::Bitwise) {
                let length = cmd.length.unwrap_or(0);
                let byte = cmd.data.as_ref().map(|d| d[0]).unwrap_or(0);
                for bit in 0..length {
                    let tdi = byte & (1 << bit) != 0;
                    let tdo = fsm.clock(chain, tdi, tms)?;
                    if reading {
                        output.push(tdo);
                    }
                }
            } else {
                for &byte in cmd.data.as_deref().unwrap_or(&[]) {
                    for bit in 0..8 {
                        let tdi = byte & (1 << bit) != 0;
                        let tdo = fsm.clock(chain, tdi, tms)?;
                        if reading {
                            output.push(tdo);
                        }
                    }
                }
            }
        }
        FtdiCommandKind::ClockTdo => {
            require(cmd, FtdiFlag::LsbFirst)?;
            require(cmd, FtdiFlag::NegEdgeIn)?;
            let tdi = true;
            let tms = false;
            if cmd.has_flag(FtdiFlag::Bitwise) {
                let length = cmd.length.unwrap_or(0);
                for _ in 0..length {
                    output.push(fsm.clock(chain, tdi, tms)?);
                }
            } else {
                let length = cmd.length.unwrap_or(0);
                for _ in 0..length {
                    for _ in 0..8 {
                        output.push(fsm.clock(chain, tdi, tms)?);
                    }
                }
            }
        }
        FtdiCommandKind::SetGpioLow => {
            let data = cmd.data.as_ref().expect("SET_GPIO_LOW always carries data");
            let (value, direction) = (data[0], data[1]);

            if direction == 0 {
                if !matches!(fsm.state(), JtagState::RunIdle | JtagState::Reset) {
                    return Err(SimError::LockRequiresIdleOrReset(fsm.state()));
                }
                fsm.lock();
                return Ok(Vec::new());
            }

            let bit = |byte: u8, pin: u8| byte & (1 << pin) != 0;
            if !bit(direction, TCK) || !bit(direction, TDI_PIN) || !bit(direction, TMS_PIN) {
                return Err(SimError::BadGpioAssertion(
                    "TCK/TDI/TMS must be configured as outputs".into(),
                ));
            }
            if bit(direction, TDO_PIN) {
                return Err(SimError::BadGpioAssertion("TDO must be an input".into()));
            }
            if bit(value, TCK) || bit(value, TDI_PIN) {
                return Err(SimError::BadGpioAssertion("TCK/TDI must idle low".into()));
            }
            if !bit(value, TMS_PIN) {
                return Err(SimError::BadGpioAssertion("TMS must idle high".into()));
            }
            fsm.unlock();
        }
        FtdiCommandKind::ClockNoData
        | FtdiCommandKind::Flush
        | FtdiCommandKind::SetDivisor
        | FtdiCommandKind::DisableDivBy5
        | FtdiCommandKind::DisableRclk
        | FtdiCommandKind::DisableLoopback
        | FtdiCommandKind::GetGpioLow
        | FtdiCommandKind::GetGpioHigh
        | FtdiCommandKind::SetGpioHigh
        | FtdiCommandKind::Unknown => {}
    }

    Ok(bits_to_bytes(&output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jtag::chain::ChainModel;
    use crate::jtag::models::dummy::DummyModel;

    fn dummy_chain() -> JtagChain {
        JtagChain::new(vec![ChainModel::Dummy(DummyModel::new())])
    }

    fn unlock(fsm: &mut JtagFsm, chain: &mut JtagChain) {
        let cmd = FtdiCommand {
            kind: FtdiCommandKind::SetGpioLow,
            opcode: 0x80,
            flags: vec![],
            length: None,
            command_frame: None,
            reply_frame: None,
            data: Some(vec![0x08, 0x0b]),
            reply: None,
        };
        run_ftdi_command(&cmd, fsm, chain).unwrap();
    }

    #[test]
    fn set_gpio_low_unlocks_then_locks() {
        let mut fsm = JtagFsm::new();
        let mut chain = dummy_chain();
        assert!(fsm.is_locked());
        unlock(&mut fsm, &mut chain);
        assert!(!fsm.is_locked());

        let lock_cmd = FtdiCommand {
            kind: FtdiCommandKind::SetGpioLow,
            opcode: 0x80,
            flags: vec![],
            length: None,
            command_frame: None,
            reply_frame: None,
            data: Some(vec![0x00, 0x00]),
            reply: None,
        };
        run_ftdi_command(&lock_cmd, &mut fsm, &mut chain).unwrap();
        assert!(fsm.is_locked());
    }

    #[test]
    fn clock_tms_bitwise_drives_fsm_five_bits() {
        let mut fsm = JtagFsm::new();
        let mut chain = dummy_chain();
        unlock(&mut fsm, &mut chain);

        let cmd = FtdiCommand {
            kind: FtdiCommandKind::ClockTms,
            opcode: 0x4b,
            flags: vec![FtdiFlag::LsbFirst, FtdiFlag::NegEdgeOut, FtdiFlag::Bitwise],
            length: Some(5),
            command_frame: None,
            reply_frame: None,
            data: Some(vec![0x1f]),
            reply: None,
        };
        run_ftdi_command(&cmd, &mut fsm, &mut chain).unwrap();
        assert_eq!(fsm.state(), JtagState::Reset);
    }

    #[test]
    fn bits_to_bytes_pads_final_partial_byte() {
        let bits = vec![true; 9];
        assert_eq!(bits_to_bytes(&bits), vec![0xff, 0x01]);
    }
}

use super::{FtdiCommand, FtdiCommandKind, FtdiFlag};
use crate::buffer::FramedBuffer;

/// Raised when the TX/RX byte streams can't be decoded into a consistent
/// command stream. Carries enough context to locate the offending byte in
/// the original capture.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct DecodeError {
    pub message: String,
    pub last_byte: Option<u8>,
    pub commands: Vec<FtdiCommand>,
}

impl DecodeError {
    fn new(message: impl Into<String>, last_byte: u8, commands: Vec<FtdiCommand>) -> Self {
        Self {
            message: message.into(),
            last_byte: Some(last_byte),
            commands,
        }
    }
}

const CLOCK_TDI: u8 = 0x10;
const CLOCK_TDO: u8 = 0x20;
const CLOCK_TMS: u8 = 0x40;
const CLOCK_NO_DATA: u8 = 0x8f;
const SET_GPIO_LOW: u8 = 0x80;
const GET_GPIO_LOW: u8 = 0x81;
const SET_GPIO_HIGH: u8 = 0x82;
const GET_GPIO_HIGH: u8 = 0x83;
const DISABLE_LOOPBACK: u8 = 0x85;
const SET_DIVISOR: u8 = 0x86;
const FLUSH: u8 = 0x87;
const DISABLE_DIV_BY_5: u8 = 0x8a;
const DISABLE_RCLK: u8 = 0x97;

const NEG_EDGE_OUT: u8 = 0x1;
const BITWISE: u8 = 0x2;
const NEG_EDGE_IN: u8 = 0x4;
const LSB_FIRST: u8 = 0x8;

fn write_flags(byte: u8) -> Vec<FtdiFlag> {
    let mut flags = Vec::new();
    if byte & NEG_EDGE_OUT != 0 {
        flags.push(FtdiFlag::NegEdgeOut);
    }
    if byte & BITWISE != 0 {
        flags.push(FtdiFlag::Bitwise);
    }
    if byte & NEG_EDGE_IN != 0 {
        flags.push(FtdiFlag::NegEdgeIn);
    }
    if byte & LSB_FIRST != 0 {
        flags.push(FtdiFlag::LsbFirst);
    }
    flags
}

/// Pop the TDI/TMS payload (and reply, if the read bit is set) for a
/// CLOCK_TDI/CLOCK_TMS opcode.
fn read_data(
    byte: u8,
    tx: &mut FramedBuffer,
    rx: &mut FramedBuffer,
    commands_so_far: impl FnOnce() -> Vec<FtdiCommand>,
) -> Result<(usize, Vec<u8>, Option<Vec<u8>>), DecodeError> {
    if byte & BITWISE != 0 {
        let number_of_bits = tx.popleft().unwrap() as usize + 1;
        if number_of_bits > 7 {
            return Err(DecodeError::new(
                format!(
                    "Bitwise clocking should only clock 7 or less bits, found {number_of_bits}"
                ),
                byte,
                commands_so_far(),
            ));
        }
        let data = vec![tx.popleft().unwrap()];
        let reply = if byte & CLOCK_TDO != 0 {
            Some(vec![rx.popleft().unwrap()])
        } else {
            None
        };
        Ok((number_of_bits, data, reply))
    } else {
        let low = tx.popleft().unwrap() as usize;
        let high = tx.popleft().unwrap() as usize;
        let number_of_bytes = (low | (high << 8)) + 1;
        let data = (0..number_of_bytes).map(|_| tx.popleft().unwrap()).collect();
        let reply = if byte & CLOCK_TDO != 0 {
            Some((0..number_of_bytes).map(|_| rx.popleft().unwrap()).collect())
        } else {
            None
        };
        Ok((number_of_bytes, data, reply))
    }
}

/// Decode the full TX/RX stream into a command list, failing at the first
/// byte that can't be interpreted or leaves the streams mis-aligned.
pub fn decode_commands(
    tx: &mut FramedBuffer,
    rx: &mut FramedBuffer,
) -> Result<Vec<FtdiCommand>, DecodeError> {
    let mut commands: Vec<FtdiCommand> = Vec::new();

    macro_rules! push {
        ($kind:expr, $opcode:expr, $flags:expr, $length:expr, $data:expr, $reply:expr) => {{
            let reply: Option<Vec<u8>> = $reply;
            let reply_frame = if reply.is_some() { rx.current_frame() } else { None };
            commands.push(FtdiCommand {
                kind: $kind,
                opcode: $opcode,
                flags: $flags,
                length: $length,
                command_frame: tx.current_frame(),
                reply_frame,
                data: $data,
                reply,
            });
        }};
    }

    while !tx.is_empty() {
        let byte = tx.popleft().unwrap();

        if byte == 0xaa || byte == 0xab {
            let reply = vec![rx.popleft().unwrap(), rx.popleft().unwrap()];
            push!(FtdiCommandKind::Unknown, byte, vec![], None, None, Some(reply));
        } else if byte == DISABLE_RCLK {
            push!(FtdiCommandKind::DisableRclk, byte, vec![], None, None, None);
        } else if byte & CLOCK_TMS != 0 {
            if byte & CLOCK_TDI != 0 {
                return Err(DecodeError::new(
                    "When clocking TMS, cannot clock TDI?",
                    byte,
                    commands,
                ));
            }
            let flags = write_flags(byte);
            let (length, data, reply) = read_data(byte, tx, rx, || commands.clone())?;
            push!(
                FtdiCommandKind::ClockTms,
                byte,
                flags,
                Some(length),
                Some(data),
                reply
            );
        } else if byte & CLOCK_TDI != 0 {
            if byte & CLOCK_TMS != 0 {
                return Err(DecodeError::new(
                    "When clocking TDI, cannot clock TMS?",
                    byte,
                    commands,
                ));
            }
            let flags = write_flags(byte);
            let (length, data, reply) = read_data(byte, tx, rx, || commands.clone())?;
            push!(
                FtdiCommandKind::ClockTdi,
                byte,
                flags,
                Some(length),
                Some(data),
                reply
            );
        } else if byte & CLOCK_TDO != 0 {
            debug_assert_eq!(byte & CLOCK_TMS, 0);
            debug_assert_eq!(byte & CLOCK_TDI, 0);

            let flags = write_flags(byte);
            let (length, reply) = if byte & BITWISE != 0 {
                let length = tx.popleft().unwrap() as usize + 1;
                if length > 7 {
                    return Err(DecodeError::new(
                        format!(
                            "Bitwise clocking should only clock 7 or less bits, found {length}"
                        ),
                        byte,
                        commands,
                    ));
                }
                (length, vec![rx.popleft().unwrap()])
            } else {
                let low = tx.popleft().unwrap() as usize;
                let high = tx.popleft().unwrap() as usize;
                let length = (low | (high << 8)) + 1;
                let reply = (0..length).map(|_| rx.popleft().unwrap()).collect();
                (length, reply)
            };
            push!(
                FtdiCommandKind::ClockTdo,
                byte,
                flags,
                Some(length),
                None,
                Some(reply)
            );
        } else if byte == CLOCK_NO_DATA {
            let low = tx.popleft().unwrap() as usize;
            let high = tx.popleft().unwrap() as usize;
            let length = (low | (high << 8)) + 1;
            push!(
                FtdiCommandKind::ClockNoData,
                byte,
                vec![],
                Some(length),
                None,
                None
            );
        } else if byte == SET_GPIO_LOW {
            let data = vec![tx.popleft().unwrap(), tx.popleft().unwrap()];
            push!(FtdiCommandKind::SetGpioLow, byte, vec![], None, Some(data), None);
        } else if byte == GET_GPIO_LOW {
            let reply = vec![rx.popleft().unwrap()];
            push!(FtdiCommandKind::GetGpioLow, byte, vec![], None, None, Some(reply));
        } else if byte == SET_GPIO_HIGH {
            let data = vec![tx.popleft().unwrap(), tx.popleft().unwrap()];
            push!(FtdiCommandKind::SetGpioHigh, byte, vec![], None, Some(data), None);
        } else if byte == GET_GPIO_HIGH {
            let reply = vec![rx.popleft().unwrap()];
            push!(FtdiCommandKind::GetGpioHigh, byte, vec![], None, None, Some(reply));
        } else if byte == DISABLE_LOOPBACK {
            push!(FtdiCommandKind::DisableLoopback, byte, vec![], None, None, None);
        } else if byte == SET_DIVISOR {
            let low = tx.popleft().unwrap() as u16;
            let high = tx.popleft().unwrap() as u16;
            let data = low | (high << 8);
            push!(
                FtdiCommandKind::SetDivisor,
                byte,
                vec![],
                None,
                Some(vec![(data & 0xff) as u8, (data >> 8) as u8]),
                None
            );
        } else if byte == FLUSH {
            if !rx.at_boundary() {
                return Err(DecodeError::new(
                    "Should have a RX boundary in reply data?",
                    byte,
                    commands,
                ));
            }
            push!(FtdiCommandKind::Flush, byte, vec![], None, None, None);
        } else if byte == DISABLE_DIV_BY_5 {
            push!(FtdiCommandKind::DisableDivBy5, byte, vec![], None, None, None);
        } else {
            return Err(DecodeError::new(
                format!("Unknown byte {byte:#04x}"),
                byte,
                commands,
            ));
        }
    }

    if !rx.is_empty() {
        return Err(DecodeError {
            message: format!("Leftover RX data, leftover = {}.", rx.remaining()),
            last_byte: None,
            commands,
        });
    }

    Ok(commands)
}

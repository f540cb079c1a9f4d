//! End-to-end tests driving the full chain/lifter/emitter pipeline through
//! the public JTAG-clocking API, the way `main.rs`'s replay loop does.

use jtag_capture_replay::arm::{ArmDebugCommand, ArmDebugModel};
use jtag_capture_replay::capture::read_capture;
use jtag_capture_replay::emitter::Emitter;
use jtag_capture_replay::jtag::chain::{ChainModel, JtagChain};
use jtag_capture_replay::jtag::fsm::JtagFsm;
use jtag_capture_replay::jtag::models::zynq::ZynqJtagModel;
use jtag_capture_replay::mpsse::{decode_commands, FtdiCommandKind};
use pretty_assertions::assert_eq;

fn bits_lsb_first(value: u64, width: usize) -> Vec<bool> {
    (0..width).map(|i| (value >> i) & 1 != 0).collect()
}

/// Clock the FSM through `tdi`/`tms` pairs in lockstep, one pin pair per bit.
fn clock(fsm: &mut JtagFsm, chain: &mut JtagChain, tdi: &[bool], tms: &[bool]) {
    assert_eq!(tdi.len(), tms.len());
    for (&t, &m) in tdi.iter().zip(tms.iter()) {
        fsm.clock(chain, t, m).unwrap();
    }
}

/// Drive a PS/PL + DAP composite TAP chain from a freshly unlocked FSM
/// through a DAP-enable sequence and a DPACC DPIDR read, asserting the
/// resulting transcript names the register it read.
#[test]
fn dap_enable_then_dpacc_dpidr_read_reaches_the_transcript() {
    let mut fsm = JtagFsm::new();
    fsm.unlock();
    let mut chain = JtagChain::new(vec![ChainModel::Zynq(Box::new(ZynqJtagModel::new(false)))]);

    // Reset -> RunIdle -> DrSelect -> IrSelect -> IrCapture -> IrShift.
    clock(&mut fsm, &mut chain, &[false; 5], &[false, true, true, false, false]);

    // Select PS JTAG_CTRL (ps_ir=0x20, pl_ir=0x24), DAP IR is irrelevant
    // while the DAP is still disabled.
    let jtag_ctrl_raw = (0x20u32 << 6) | 0x24;
    let mut ir_bits = bits_lsb_first(0, 4);
    ir_bits.extend(bits_lsb_first(jtag_ctrl_raw as u64, 12));
    let mut tms = vec![false; 15];
    tms.push(true);
    clock(&mut fsm, &mut chain, &ir_bits, &tms);
    clock(&mut fsm, &mut chain, &[false, false], &[true, false]); // IrExit1 -> IrUpdate -> RunIdle

    // Write JTAG_CTRL = 0x2 (enable bit) through the 33-bit DR (32 PS + 1 DAP bypass).
    clock(&mut fsm, &mut chain, &[false, false, false], &[true, false, false]); // -> DrShift
    let mut dr_bits = bits_lsb_first(0, 1);
    dr_bits.extend(bits_lsb_first(0x2, 32));
    let mut tms = vec![false; 32];
    tms.push(true);
    clock(&mut fsm, &mut chain, &dr_bits, &tms);
    clock(&mut fsm, &mut chain, &[false, false], &[true, false]); // DrExit1 -> DrUpdate -> RunIdle

    // Walk back around to RESET to latch the enable, then fire its action.
    clock(&mut fsm, &mut chain, &[false, false, false, false], &[true, true, true, false]);

    let zynq = chain.zynq_mut().unwrap();
    assert!(zynq.take_dap_events().is_empty());

    // Select DAP IR = DPACC (0b1010); keep the PS side in BYPASS.
    clock(&mut fsm, &mut chain, &[false; 4], &[true, true, false, false]);
    let mut ir_bits = bits_lsb_first(0b1010, 4);
    ir_bits.extend(bits_lsb_first(0xFFF, 12));
    let mut tms = vec![false; 15];
    tms.push(true);
    clock(&mut fsm, &mut chain, &ir_bits, &tms);
    clock(&mut fsm, &mut chain, &[false, false], &[true, false]);

    // DPACC SELECT write: apsel=0, apbanksel=0xC, dpbanksel=0x0.
    let select_value = dpacc_select_value(0, 0xC, 0x0);
    shift_dpacc(&mut fsm, &mut chain, select_value);

    let mut dap_debug = ArmDebugModel::new();
    let zynq = chain.zynq_mut().unwrap();
    for update in zynq.take_dap_events() {
        dap_debug.dr_access(update.dr_state, update.value).unwrap();
    }
    assert!(dap_debug.take_events().is_empty());

    // DPACC read of DPIDR (A=0x0, RnW=1).
    let read_dpidr = dpacc_read_value(0x0);
    shift_dpacc(&mut fsm, &mut chain, read_dpidr);

    let zynq = chain.zynq_mut().unwrap();
    for update in zynq.take_dap_events() {
        dap_debug.dr_access(update.dr_state, update.value).unwrap();
    }
    let events = dap_debug.take_events();
    assert_eq!(events, vec![ArmDebugCommand::ReadDpRegister { reg: 0x0 }]);

    let mut emitter = Emitter::new(Vec::new());
    for event in events {
        emitter.handle_debug_command(event).unwrap();
    }
    let transcript = String::from_utf8(emitter.into_inner()).unwrap();
    assert!(transcript.contains("# Reading DPIDR"));
    assert!(transcript.contains("dap dpreg 0x00"));
}

fn dpacc_select_value(apsel: u8, apbanksel: u8, dpbanksel: u8) -> u128 {
    let datain = ((apsel as u32) << 24) | ((apbanksel as u32) << 4) | (dpbanksel as u32);
    let a_field = (0x8u128 >> 2) & 0x3;
    ((datain as u128) << 3) | (a_field << 1)
}

fn dpacc_read_value(a: u8) -> u128 {
    let a_field = (a as u128 >> 2) & 0x3;
    (a_field << 1) | 0x1
}

/// Shift one 35-bit DPACC value through the DR (PS stays BYPASS, width 1).
fn shift_dpacc(fsm: &mut JtagFsm, chain: &mut JtagChain, value: u128) {
    clock(fsm, chain, &[false, false, false], &[true, false, false]); // -> DrShift
    let mut dr_bits = bits_lsb_first(value as u64, 35);
    dr_bits.push(false); // 1-bit PS bypass filler shifted in last
    let mut tms = vec![false; 35];
    tms.push(true);
    clock(fsm, chain, &dr_bits, &tms);
    clock(fsm, chain, &[false, false], &[true, false]); // DrExit1 -> DrUpdate -> RunIdle
}

#[test]
fn capture_json_decodes_and_unlocks_the_simulator() {
    let json = r#"[
        {"_source":{"layers":{
            "frame":{"frame.protocols":"usb:ftdift"},
            "ftdift":{"ftdift.if_a_tx_payload":"80:08:0b"}
        }}}
    ]"#;
    let (mut tx, mut rx) = read_capture(json).unwrap();
    let commands = decode_commands(&mut tx, &mut rx).unwrap();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].kind, FtdiCommandKind::SetGpioLow);

    let mut fsm = JtagFsm::new();
    let mut chain = JtagChain::new(vec![ChainModel::Zynq(Box::new(ZynqJtagModel::new(false)))]);
    assert!(fsm.is_locked());
    for cmd in &commands {
        jtag_capture_replay::jtag::sim::run_ftdi_command(cmd, &mut fsm, &mut chain).unwrap();
    }
    assert!(!fsm.is_locked());
}

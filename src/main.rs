//! CLI entry point: replays a captured JTAG session and writes an
//! OpenOCD-style transcript. Grounded in `usb_jtag_decoder.py`'s `main()`,
//! restructured around typed errors and `tracing` instead of bare prints.

use anyhow::Context;
use clap::Parser;
use jtag_capture_replay::arm::ArmDebugModel;
use jtag_capture_replay::buffer::FramedBuffer;
use jtag_capture_replay::capture::read_capture;
use jtag_capture_replay::config::Config;
use jtag_capture_replay::emitter::Emitter;
use jtag_capture_replay::jtag::chain::{ChainModel, JtagChain};
use jtag_capture_replay::jtag::fsm::JtagFsm;
use jtag_capture_replay::jtag::models::zynq::ZynqJtagModel;
use jtag_capture_replay::mpsse::{decode_commands, DecodeError, FtdiCommand, FtdiCommandKind};
use jtag_capture_replay::Error as CrateError;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Replay a captured USB<->FTDI MPSSE session into an OpenOCD-style
/// transcript of the JTAG/ARM debug traffic it carried.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Input JSON packet capture (Wireshark-style export).
    #[arg(long = "json-pcap")]
    json_pcap: PathBuf,

    /// Output OpenOCD-style transcript.
    #[arg(long = "openocd-script")]
    openocd_script: PathBuf,

    /// Optional: dump the decoded FTDI command list as JSON.
    #[arg(long = "ftdi-commands")]
    ftdi_commands: Option<PathBuf>,

    /// Whether the ARM DAP should arm itself to enable on the first RESET.
    #[arg(long = "dap-enabled-at-start")]
    dap_enabled_at_start: bool,

    /// Redirect log output to a file instead of stderr.
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

fn init_logging(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(file).init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
    Ok(())
}

/// Replay the commands back to the second-most-recent `FLUSH` (inclusive),
/// dumping TX cursor context around the offending byte. Mirrors
/// `usb_jtag_decoder.py`'s failure path.
fn log_decode_failure(err: &DecodeError, tx: &FramedBuffer, rx: &FramedBuffer) {
    tracing::error!(
        last_byte = ?err.last_byte,
        tx_frame = ?tx.current_frame(),
        rx_frame = ?rx.current_frame(),
        "decode failed: {}",
        err.message
    );

    for (offset, byte) in tx.get_context(50) {
        tracing::error!(offset, byte = format!("0x{byte:02x}"), "context");
    }

    let mut flush_count = 0;
    let mut replay_from = 0;
    for (idx, cmd) in err.commands.iter().enumerate().rev() {
        if cmd.kind == FtdiCommandKind::Flush {
            flush_count += 1;
            if flush_count == 2 {
                replay_from = idx;
                break;
            }
        }
    }

    tracing::error!("last {} commands (back to the second-most-recent FLUSH):", err.commands.len() - replay_from);
    for cmd in &err.commands[replay_from..] {
        tracing::error!(?cmd, "replay");
    }
}

/// Replay the decoded command stream through the FSM/chain, draining each
/// command's lifted Zynq/DAP events into the emitter. The only place in the
/// binary that produces and propagates [`CrateError`] end to end, so its
/// `#[from]` impls (one per engine) are what actually turns each layer's
/// typed error into the aggregate before `run` hands it to `anyhow`.
fn simulate<W: Write>(
    commands: &[FtdiCommand],
    config: &Config,
    emitter: &mut Emitter<W>,
) -> Result<(), CrateError> {
    let mut fsm = JtagFsm::new();
    let zynq = ZynqJtagModel::new(config.dap_enabled_at_start);
    let mut chain = JtagChain::new(vec![ChainModel::Zynq(Box::new(zynq))]);
    let mut dap_debug = ArmDebugModel::new();

    tracing::info!(count = commands.len(), "running JTAG simulation");
    for (idx, cmd) in commands.iter().enumerate() {
        tracing::debug!(idx, kind = ?cmd.kind, opcode = format!("0x{:02x}", cmd.opcode), "replaying command");

        let sim_reply = jtag_capture_replay::jtag::sim::run_ftdi_command(cmd, &mut fsm, &mut chain)?;

        if let Some(real_reply) = &cmd.reply {
            if real_reply != &sim_reply {
                tracing::warn!(idx, real = ?real_reply, sim = ?sim_reply, "simulated reply mismatch");
            }
        }

        let Some(zynq) = chain.zynq_mut() else { continue };

        for state in zynq.take_ps_ir_events() {
            emitter.handle_ps_ir_event(state)?;
        }
        for update in zynq.take_ps_dr_events() {
            emitter.handle_ps_dr_event(update.dr_state, &update.value)?;
        }
        for update in zynq.take_dap_events() {
            dap_debug.dr_access(update.dr_state, update.value).map_err(|err| {
                tracing::error!(idx, %err, "lifting DR update failed");
                CrateError::from(err)
            })?;
            for command in dap_debug.take_events() {
                emitter.handle_debug_command(command)?;
            }
        }
    }

    Ok(())
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    tracing::info!(path = %cli.json_pcap.display(), "loading capture");
    let json = fs::read_to_string(&cli.json_pcap)
        .with_context(|| format!("reading capture {}", cli.json_pcap.display()))?;
    let (mut tx, mut rx) = read_capture(&json)
        .map_err(CrateError::from)
        .context("parsing capture JSON")?;

    tracing::info!("decoding MPSSE commands");
    let commands = match decode_commands(&mut tx, &mut rx) {
        Ok(commands) => commands,
        Err(err) => {
            log_decode_failure(&err, &tx, &rx);
            return Err(CrateError::from(err)).context("decoding MPSSE commands");
        }
    };

    if let Some(path) = &cli.ftdi_commands {
        tracing::info!(path = %path.display(), "writing decoded FTDI commands");
        let file = fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(file, &commands).context("serializing FTDI commands")?;
    }

    let config = Config::new(cli.dap_enabled_at_start);
    let out = BufWriter::new(
        fs::File::create(&cli.openocd_script)
            .with_context(|| format!("creating {}", cli.openocd_script.display()))?,
    );
    let mut emitter = Emitter::new(out);

    simulate(&commands, &config, &mut emitter).context("replaying JTAG simulation")?;

    tracing::info!(path = %cli.openocd_script.display(), "wrote transcript");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    run()
}

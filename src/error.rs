//! Crate-level error, aggregating each engine's typed error via `#[from]`,
//! mirroring `probe_rs::Error`.

use crate::arm::LiftError;
use crate::capture::CaptureError;
use crate::jtag::JtagFault;
use crate::jtag::sim::SimError;
use crate::mpsse::DecodeError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reading capture: {0}")]
    Capture(#[from] CaptureError),
    #[error("decoding MPSSE commands: {0}")]
    Decode(#[from] DecodeError),
    #[error("driving the JTAG simulator: {0}")]
    Sim(#[from] SimError),
    #[error("JTAG chain fault: {0}")]
    Jtag(#[from] JtagFault),
    #[error("lifting DR update into a debug event: {0}")]
    Lift(#[from] LiftError),
    #[error("writing transcript: {0}")]
    Io(#[from] std::io::Error),
}

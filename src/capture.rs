//! Packet-capture JSON reader (spec.md §6).
//!
//! Reads a Wireshark-style JSON export, keeping only `usb:ftdift` frames,
//! and splits their TX/RX payloads into the framed byte buffers the
//! decoder consumes. Grounded in `pcap_reader.py`.

use crate::buffer::FramedBuffer;
use serde::Deserialize;
use thiserror::Error;

/// The reader splits RX payloads into chunks of at most this many bytes,
/// discarding two modem-status bytes after each full chunk.
pub const FTDI_MAX_PACKET_SIZE: usize = 512;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to parse capture JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload byte {byte:?} at record {frame} is not valid hex")]
    BadHexByte { frame: usize, byte: String },
}

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(rename = "_source")]
    source: Option<Source>,
}

#[derive(Debug, Deserialize)]
struct Source {
    layers: Option<Layers>,
}

#[derive(Debug, Deserialize)]
struct Layers {
    frame: Option<FrameLayer>,
    ftdift: Option<FtdiftLayer>,
}

#[derive(Debug, Deserialize)]
struct FrameLayer {
    #[serde(rename = "frame.protocols")]
    protocols: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FtdiftLayer {
    #[serde(rename = "ftdift.if_a_tx_payload")]
    tx_payload: Option<String>,
    #[serde(rename = "ftdift.if_a_rx_payload")]
    rx_payload: Option<String>,
}

fn parse_hex_colon(payload: &str, frame: usize) -> Result<Vec<u8>, CaptureError> {
    payload
        .split(':')
        .map(|byte| {
            u8::from_str_radix(byte, 16).map_err(|_| CaptureError::BadHexByte {
                frame,
                byte: byte.to_string(),
            })
        })
        .collect()
}

/// Split a reconstructed RX payload into its real reply bytes, stripping
/// the two modem-status bytes the bridge inserts after every full
/// `FTDI_MAX_PACKET_SIZE`-byte chunk (spec.md §6 "RX coalescing quirk").
fn strip_modem_status(in_data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(in_data.len());
    let mut idx = 0;
    while in_data.len() - idx >= FTDI_MAX_PACKET_SIZE {
        out.extend_from_slice(&in_data[idx..idx + FTDI_MAX_PACKET_SIZE]);
        idx += FTDI_MAX_PACKET_SIZE;
        idx += 2;
    }
    if idx < in_data.len() {
        out.extend_from_slice(&in_data[idx..]);
    }
    out
}

/// Read a capture JSON document, returning the reconstructed (TX, RX)
/// framed buffers.
pub fn read_capture(json: &str) -> Result<(FramedBuffer, FramedBuffer), CaptureError> {
    let records: Vec<Record> = serde_json::from_str(json)?;
    let mut tx = FramedBuffer::new();
    let mut rx = FramedBuffer::new();

    for (idx, record) in records.into_iter().enumerate() {
        let frame = (idx + 1) as u32;
        let Some(layers) = record.source.and_then(|s| s.layers) else {
            continue;
        };
        let protocol = layers.frame.and_then(|f| f.protocols);
        if protocol.as_deref() != Some("usb:ftdift") {
            continue;
        }
        let Some(ftdift) = layers.ftdift else { continue };

        if let Some(tx_payload) = ftdift.tx_payload {
            let bytes = parse_hex_colon(&tx_payload, idx)?;
            if !bytes.is_empty() {
                tx.extend(bytes, frame);
            }
        }

        if let Some(rx_payload) = ftdift.rx_payload {
            let bytes = parse_hex_colon(&rx_payload, idx)?;
            if !bytes.is_empty() {
                let stripped = strip_modem_status(&bytes);
                rx.extend(stripped, frame);
            }
        }
    }

    Ok((tx, rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_matching_protocol_is_skipped() {
        let json = r#"[{"_source":{"layers":{"frame":{"frame.protocols":"usb:other"}}}}]"#;
        let (tx, rx) = read_capture(json).unwrap();
        assert!(tx.is_empty());
        assert!(rx.is_empty());
    }

    #[test]
    fn tx_and_rx_payloads_are_decoded_from_hex_colon() {
        let json = r#"[{"_source":{"layers":{
            "frame":{"frame.protocols":"usb:ftdift"},
            "ftdift":{"ftdift.if_a_tx_payload":"80:08:0b","ftdift.if_a_rx_payload":"aa:bb"}
        }}}]"#;
        let (mut tx, mut rx) = read_capture(json).unwrap();
        assert_eq!(tx.popleft(), Some(0x80));
        assert_eq!(tx.popleft(), Some(0x08));
        assert_eq!(tx.popleft(), Some(0x0b));
        assert_eq!(rx.popleft(), Some(0xaa));
        assert_eq!(rx.popleft(), Some(0xbb));
    }

    #[test]
    fn rx_payload_of_exactly_512_bytes_strips_nothing() {
        let bytes: Vec<u8> = (0..FTDI_MAX_PACKET_SIZE).map(|i| (i % 256) as u8).collect();
        let stripped = strip_modem_status(&bytes);
        assert_eq!(stripped, bytes);
    }

    #[test]
    fn rx_payload_of_513_bytes_strips_two_after_first_chunk() {
        let mut in_data = vec![0xAAu8; FTDI_MAX_PACKET_SIZE];
        in_data.push(0x00); // modem status byte 1
        in_data.push(0x00); // modem status byte 2
        in_data.push(0xCC); // last real byte, remainder < 512
        let stripped = strip_modem_status(&in_data);
        assert_eq!(stripped.len(), FTDI_MAX_PACKET_SIZE + 1);
        assert_eq!(stripped[FTDI_MAX_PACKET_SIZE], 0xCC);
    }
}

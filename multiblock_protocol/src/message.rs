// Messages from the authoritative simulation to its observers.
//
// Cell deltas travel as opaque byte payloads; only `multiblock_sim::sync`
// knows their layout. This keeps the protocol crate independent of the sim
// crate, so a relay can forward deltas without understanding them.
//
// Messages are JSON-encoded and then framed (see `framing.rs`).
// `send_message` / `recv_message` combine both steps.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use crate::framing::{read_frame, write_frame};

/// One update for an observer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObserverMessage {
    /// A cell's sync delta, produced on the given tick.
    CellDelta {
        tick: u64,
        cell: [i32; 3],
        payload: Vec<u8>,
    },
    /// The cell no longer exists on the authoritative side.
    CellRemoved { tick: u64, cell: [i32; 3] },
}

impl ObserverMessage {
    pub fn tick(&self) -> u64 {
        match self {
            Self::CellDelta { tick, .. } | Self::CellRemoved { tick, .. } => *tick,
        }
    }

    pub fn cell(&self) -> [i32; 3] {
        match self {
            Self::CellDelta { cell, .. } | Self::CellRemoved { cell, .. } => *cell,
        }
    }
}

/// Serialize and frame one message.
pub fn send_message<W: Write>(writer: &mut W, msg: &ObserverMessage) -> io::Result<()> {
    let json = serde_json::to_vec(msg).map_err(io::Error::other)?;
    write_frame(writer, &json)
}

/// Read and deserialize one message. `Ok(None)` at a clean end of stream.
pub fn recv_message<R: Read>(reader: &mut R) -> io::Result<Option<ObserverMessage>> {
    let Some(frame) = read_frame(reader)? else {
        return Ok(None);
    };
    serde_json::from_slice(&frame)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn messages_cross_a_stream() {
        let sent = vec![
            ObserverMessage::CellDelta {
                tick: 7,
                cell: [1, 2, 3],
                payload: vec![1, 1, 0],
            },
            ObserverMessage::CellRemoved {
                tick: 8,
                cell: [-4, 0, 9],
            },
        ];
        let mut wire = Vec::new();
        for msg in &sent {
            send_message(&mut wire, msg).unwrap();
        }

        let mut cursor = Cursor::new(wire);
        let mut received = Vec::new();
        while let Some(msg) = recv_message(&mut cursor).unwrap() {
            received.push(msg);
        }
        assert_eq!(received, sent);
    }

    #[test]
    fn garbage_frame_is_invalid_data() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"not json").unwrap();
        let err = recv_message(&mut Cursor::new(wire)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn accessors_cover_both_variants() {
        let removed = ObserverMessage::CellRemoved {
            tick: 3,
            cell: [0, 1, 2],
        };
        assert_eq!(removed.tick(), 3);
        assert_eq!(removed.cell(), [0, 1, 2]);
    }
}

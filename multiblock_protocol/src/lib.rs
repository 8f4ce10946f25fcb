// multiblock_protocol — wire format shared by the authoritative simulation
// and its observers.
//
// Module overview:
// - `codec.rs`:   Binary primitives (bool, big-endian i32, VarInt, string)
//                 used to build and parse per-cell sync deltas.
// - `framing.rs`: Length-delimited frames over any `Read`/`Write` stream.
// - `message.rs`: `ObserverMessage`, the envelope that carries a cell delta
//                 (or a cell removal) to observers, JSON inside a frame.
//
// This crate does not depend on the sim crate. Delta payloads are opaque
// bytes here; `multiblock_sim::sync` defines their field layout on top of
// `codec.rs`.

pub mod codec;
pub mod framing;
pub mod message;

pub use codec::{DecodeError, EncodeError, MAX_STRING_BYTES, WireReader, WireWriter};
pub use framing::{MAX_FRAME_SIZE, read_frame, write_frame};
pub use message::{ObserverMessage, recv_message, send_message};

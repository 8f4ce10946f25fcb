// Length-delimited framing for observer messages.
//
// Each frame is a 4-byte big-endian length followed by that many payload
// bytes. The framing layer is payload-agnostic: `message.rs` puts JSON in
// the frames, but nothing here looks inside them.
//
// `MAX_FRAME_SIZE` caps what a reader will allocate for a single frame. A
// sync frame carries one cell delta (a few dozen bytes), so 1 MiB leaves
// room for bulk snapshots without trusting arbitrary length prefixes.
//
// A reader distinguishes a stream that ends cleanly between frames
// (`Ok(None)`) from one that ends inside a frame (`UnexpectedEof`).

use std::io::{self, Read, Write};

/// Largest accepted frame payload, in bytes.
pub const MAX_FRAME_SIZE: u32 = 1024 * 1024;

/// Write one frame: length prefix, then payload.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = payload.len();
    if len > MAX_FRAME_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame too large: {len} bytes (max {MAX_FRAME_SIZE})"),
        ));
    }
    #[expect(clippy::cast_possible_truncation)]
    let len_bytes = (len as u32).to_be_bytes();
    writer.write_all(&len_bytes)?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Read one frame. Returns `Ok(None)` if the stream is exhausted exactly at
/// a frame boundary.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        match reader.read(&mut len_buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside a frame length prefix",
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} bytes (max {MAX_FRAME_SIZE})"),
        ));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

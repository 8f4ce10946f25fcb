// Per-cell sync delta: the authoritative side's compact description of a
// cell's structure, as sent to observers.
//
// Layout (primitives from `multiblock_protocol::codec`):
//
//   bool   is_rendering
//   bool   has_structure
//   if has_structure && is_rendering:
//       bool   description_changed
//       if description_changed:
//           i32 height, i32 width, i32 length
//           i32 anchor x, y, z, i32 anchor dimension
//           bool has_identity
//           if has_identity: string identity
//
// Only the renderer ever sends a description, and only when it changed since
// the last encode. `encode_delta` consumes the cell's pending flag;
// `snapshot_delta` forces a description for a newly attached observer
// without consuming it.
//
// Decoding parses the whole delta into a `Delta` value and checks for
// trailing bytes before anything is applied to the replica, so a malformed
// delta leaves the replica exactly as it was.

use crate::cell::Cell;
use crate::error::SyncError;
use crate::identity::IdentityKey;
use crate::kind::ClusterKind;
use crate::replica::ReplicaCell;
use crate::types::{DimCoord, DimensionId, VolumeBounds, VoxelCoord};
use multiblock_protocol::{EncodeError, WireReader, WireWriter};

/// What the renderer says about its structure's shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructureDescription {
    pub bounds: VolumeBounds,
    pub render_anchor: DimCoord,
    pub identity: Option<IdentityKey>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShapeUpdate {
    /// The cell is not a renderer with a structure; nothing follows the flags.
    NotApplicable,
    Unchanged,
    Changed(StructureDescription),
}

/// A decoded (or about to be encoded) delta.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delta {
    pub is_rendering: bool,
    pub has_structure: bool,
    pub shape: ShapeUpdate,
}

impl Delta {
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut w = WireWriter::new();
        w.write_bool(self.is_rendering);
        w.write_bool(self.has_structure);
        if self.has_structure && self.is_rendering {
            match &self.shape {
                ShapeUpdate::Changed(desc) => {
                    w.write_bool(true);
                    w.write_i32(desc.bounds.height);
                    w.write_i32(desc.bounds.width);
                    w.write_i32(desc.bounds.length);
                    let anchor = desc.render_anchor;
                    w.write_i32(anchor.coord.x);
                    w.write_i32(anchor.coord.y);
                    w.write_i32(anchor.coord.z);
                    w.write_i32(anchor.dimension.0);
                    match &desc.identity {
                        Some(key) => {
                            w.write_bool(true);
                            w.write_string(key.as_str())?;
                        }
                        None => w.write_bool(false),
                    }
                }
                ShapeUpdate::Unchanged | ShapeUpdate::NotApplicable => w.write_bool(false),
            }
        }
        Ok(w.into_bytes())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SyncError> {
        let mut r = WireReader::new(bytes);
        let is_rendering = r.read_bool("is_rendering")?;
        let has_structure = r.read_bool("has_structure")?;
        let mut shape = ShapeUpdate::NotApplicable;
        if has_structure && is_rendering {
            shape = if r.read_bool("description_changed")? {
                let height = r.read_i32("height")?;
                let width = r.read_i32("width")?;
                let length = r.read_i32("length")?;
                let x = r.read_i32("anchor_x")?;
                let y = r.read_i32("anchor_y")?;
                let z = r.read_i32("anchor_z")?;
                let dimension = r.read_i32("anchor_dimension")?;
                let identity = if r.read_bool("has_identity")? {
                    let key = r.read_string("identity")?;
                    Some(IdentityKey::new(key).ok_or(SyncError::EmptyIdentity)?)
                } else {
                    None
                };
                ShapeUpdate::Changed(StructureDescription {
                    bounds: VolumeBounds::new(height, width, length),
                    render_anchor: DimCoord::new(
                        VoxelCoord::new(x, y, z),
                        DimensionId(dimension),
                    ),
                    identity,
                })
            } else {
                ShapeUpdate::Unchanged
            };
        }
        r.finish()?;
        Ok(Self {
            is_rendering,
            has_structure,
            shape,
        })
    }
}

fn describe<K: ClusterKind>(cell: &Cell<K>, force: bool) -> Delta {
    let has_structure = cell.structure.is_some();
    let shape = match &cell.structure {
        Some(handle) if cell.is_rendering => {
            if cell.send_structure || force {
                let s = handle.borrow();
                ShapeUpdate::Changed(StructureDescription {
                    bounds: s.shape.bounds,
                    render_anchor: s.shape.render_anchor,
                    identity: s.identity.clone(),
                })
            } else {
                ShapeUpdate::Unchanged
            }
        }
        _ => ShapeUpdate::NotApplicable,
    };
    Delta {
        is_rendering: cell.is_rendering,
        has_structure,
        shape,
    }
}

/// Encode the cell's delta and clear its pending description flag.
pub fn encode_delta<K: ClusterKind>(cell: &mut Cell<K>) -> Result<Vec<u8>, EncodeError> {
    let delta = describe(cell, false);
    let bytes = delta.encode()?;
    if matches!(delta.shape, ShapeUpdate::Changed(_)) {
        cell.send_structure = false;
    }
    Ok(bytes)
}

/// Encode the cell's full state for a new observer. Renderers always include
/// the description; the pending flag is left alone.
pub fn snapshot_delta<K: ClusterKind>(cell: &Cell<K>) -> Result<Vec<u8>, EncodeError> {
    describe(cell, true).encode()
}

/// Parse `bytes` and apply them to `replica`. On error the replica is
/// untouched.
pub fn decode_delta(bytes: &[u8], replica: &mut ReplicaCell) -> Result<(), SyncError> {
    let delta = Delta::decode(bytes)?;
    replica.apply(delta);
    Ok(())
}

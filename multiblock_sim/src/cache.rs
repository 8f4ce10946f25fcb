// Per-cell durable snapshot of a structure.
//
// Every cell owns one `Cache`. While the cell is part of a keyed structure,
// the cache is refreshed from it every tick (`sync`) and filed in the
// registry under the structure's identity key. When the structure breaks,
// the cache stays with the cell, so a structure re-formed from the same
// cells can pick its identity and data back up.
//
// Persisted form is a JSON object shared with whatever else the cell stores:
//
//   { "cachedID": "<key>", "cachedFootprint": {...}, <snapshot fields> }
//
// A cache without an identity key writes nothing, and loading an object
// without "cachedID" yields the empty cache.

use crate::error::PersistError;
use crate::identity::IdentityKey;
use crate::kind::IdentityKeyed;
use crate::structure::Structure;
use crate::types::Footprint;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const ID_FIELD: &str = "cachedID";
const FOOTPRINT_FIELD: &str = "cachedFootprint";

/// Snapshot of a structure's persisted state, keyed by its identity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cache<S> {
    pub identity: Option<IdentityKey>,
    /// The box the snapshot was last taken from.
    pub footprint: Option<Footprint>,
    pub snapshot: S,
}

impl<S> Cache<S>
where
    S: Clone + Default + PartialEq + Serialize + DeserializeOwned,
{
    /// Copy identity, footprint and snapshot out of a live structure. A
    /// structure without a key resets the cache.
    pub fn sync<K>(&mut self, kind: &K, structure: &Structure<K>)
    where
        K: IdentityKeyed<Snapshot = S>,
    {
        match &structure.identity {
            Some(key) => {
                self.identity = Some(key.clone());
                self.footprint = Some(structure.shape.footprint());
                self.snapshot = kind.snapshot(&structure.data);
            }
            None => *self = Self::default(),
        }
    }

    pub fn is_keyed(&self) -> bool {
        self.identity.is_some()
    }

    /// Write this cache into `storage`. Existing unrelated fields are kept.
    pub fn save(&self, storage: &mut Map<String, Value>) -> Result<(), PersistError> {
        let Some(identity) = &self.identity else {
            return Ok(());
        };
        storage.insert(ID_FIELD.to_owned(), Value::String(identity.as_str().to_owned()));
        if let Some(footprint) = &self.footprint {
            storage.insert(FOOTPRINT_FIELD.to_owned(), serde_json::to_value(footprint)?);
        }
        match serde_json::to_value(&self.snapshot)? {
            Value::Object(fields) => storage.extend(fields),
            _ => return Err(PersistError::SnapshotNotObject),
        }
        Ok(())
    }

    /// Read a cache back out of `storage`.
    pub fn load(storage: &Map<String, Value>) -> Result<Self, PersistError> {
        let identity = match storage.get(ID_FIELD) {
            None => return Ok(Self::default()),
            Some(Value::String(s)) => {
                IdentityKey::new(s.as_str()).ok_or(PersistError::InvalidIdentity(ID_FIELD))?
            }
            Some(_) => return Err(PersistError::InvalidField { field: ID_FIELD }),
        };
        let footprint = storage
            .get(FOOTPRINT_FIELD)
            .map(|v| serde_json::from_value::<Footprint>(v.clone()))
            .transpose()?;

        let rest: Map<String, Value> = storage
            .iter()
            .filter(|(k, _)| k.as_str() != ID_FIELD && k.as_str() != FOOTPRINT_FIELD)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let snapshot = serde_json::from_value(Value::Object(rest))?;

        Ok(Self {
            identity: Some(identity),
            footprint,
            snapshot,
        })
    }
}

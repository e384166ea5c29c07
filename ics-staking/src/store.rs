//! Byte-keyed storage contract and the key layout used on top of it.
//!
//! Every record lives under a one-byte namespace followed by
//! length-prefixed components, so that a prefix scan for one zone (or one
//! delegator) never picks up a neighbour whose identifier merely starts with
//! the same bytes.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::error::{Result, StakingError};

pub const KEY_PREFIX_ZONE: u8 = 0x01;
pub const KEY_PREFIX_INTENT: u8 = 0x02;
pub const KEY_PREFIX_SNAPSHOT_INTENT: u8 = 0x03;
pub const KEY_PREFIX_DELEGATION: u8 = 0x04;

/// Ordered byte-key store.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<()>;

    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// Every entry whose key starts with `prefix`, in ascending key order.
    fn prefix_iter(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// In-memory [`KvStore`] backed by a `BTreeMap`.
#[derive(Clone, Debug, Default)]
pub struct MemStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.entries.insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn prefix_iter(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

/// Builds `namespace || len(part) || part || ...`. Each length is a
/// big-endian `u16`; a component longer than that is a [`StakingError::Store`].
pub fn compose_key(namespace: u8, parts: &[&str]) -> Result<Vec<u8>> {
    let mut key = vec![namespace];
    for part in parts {
        push_component(&mut key, part)?;
    }
    Ok(key)
}

fn push_component(key: &mut Vec<u8>, part: &str) -> Result<()> {
    let bytes = part.as_bytes();
    let len = u16::try_from(bytes.len()).map_err(|_| {
        StakingError::Store(format!("key component of {} bytes is too long", bytes.len()))
    })?;
    key.extend_from_slice(&len.to_be_bytes());
    key.extend_from_slice(bytes);
    Ok(())
}

pub fn zone_key(chain_id: &str) -> Result<Vec<u8>> {
    compose_key(KEY_PREFIX_ZONE, &[chain_id])
}

pub fn intent_prefix(chain_id: &str, snapshot: bool) -> Result<Vec<u8>> {
    let namespace = if snapshot {
        KEY_PREFIX_SNAPSHOT_INTENT
    } else {
        KEY_PREFIX_INTENT
    };
    compose_key(namespace, &[chain_id])
}

pub fn intent_key(chain_id: &str, delegator: &str, snapshot: bool) -> Result<Vec<u8>> {
    let mut key = intent_prefix(chain_id, snapshot)?;
    push_component(&mut key, delegator)?;
    Ok(key)
}

/// Prefix for every delegation of a zone.
pub fn delegations_prefix(chain_id: &str) -> Result<Vec<u8>> {
    compose_key(KEY_PREFIX_DELEGATION, &[chain_id])
}

/// Prefix for one delegator's delegations with all validators.
pub fn delegator_delegations_prefix(chain_id: &str, delegator: &str) -> Result<Vec<u8>> {
    compose_key(KEY_PREFIX_DELEGATION, &[chain_id, delegator])
}

pub fn delegation_key(chain_id: &str, delegator: &str, validator: &str) -> Result<Vec<u8>> {
    compose_key(KEY_PREFIX_DELEGATION, &[chain_id, delegator, validator])
}

pub fn encode<T: BorshSerialize>(record: &T) -> Result<Vec<u8>> {
    borsh::to_vec(record).map_err(|e| StakingError::Codec(e.to_string()))
}

pub fn decode<T: BorshDeserialize>(bytes: &[u8]) -> Result<T> {
    T::try_from_slice(bytes).map_err(|e| StakingError::Codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_iter_is_scoped() {
        let mut store = MemStore::new();
        store.set(&intent_key("hub-4", "alice", false).unwrap(), vec![1]).unwrap();
        store.set(&intent_key("hub-40", "bob", false).unwrap(), vec![2]).unwrap();
        store.set(&intent_key("hub-4", "carol", true).unwrap(), vec![3]).unwrap();

        let live = store.prefix_iter(&intent_prefix("hub-4", false).unwrap()).unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].1, vec![1]);

        let snapshot = store.prefix_iter(&intent_prefix("hub-4", true).unwrap()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].1, vec![3]);
    }

    #[test]
    fn test_delegator_prefix_does_not_leak() {
        let mut store = MemStore::new();
        store.set(&delegation_key("hub-4", "del", "val1").unwrap(), vec![1]).unwrap();
        store.set(&delegation_key("hub-4", "delx", "val1").unwrap(), vec![2]).unwrap();

        let scoped = store
            .prefix_iter(&delegator_delegations_prefix("hub-4", "del").unwrap())
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(store.prefix_iter(&delegations_prefix("hub-4").unwrap()).unwrap().len(), 2);
    }

    #[test]
    fn test_delete_and_codec_errors() {
        let mut store = MemStore::new();
        let key = zone_key("hub-4").unwrap();
        store.set(&key, encode(&42u32).unwrap()).unwrap();
        assert_eq!(decode::<u32>(&store.get(&key).unwrap().unwrap()).unwrap(), 42);

        store.delete(&key).unwrap();
        assert!(store.get(&key).unwrap().is_none());
        assert!(store.is_empty());

        assert!(matches!(decode::<u64>(&[1, 2]), Err(StakingError::Codec(_))));
    }

    #[test]
    fn test_oversized_key_component_is_rejected() {
        let longest = "a".repeat(u16::MAX as usize);
        let key = zone_key(&longest).unwrap();
        assert_eq!(&key[1..3], &[0xff, 0xff]);

        let too_long = "a".repeat(u16::MAX as usize + 1);
        assert!(matches!(zone_key(&too_long), Err(StakingError::Store(_))));
        assert!(matches!(
            delegation_key("hub-4", &too_long, "val1"),
            Err(StakingError::Store(_))
        ));
    }
}

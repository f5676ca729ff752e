use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{de::DeserializeOwned, Serialize};

use crate::config::Config;

/// Byte-level document store. Documents are JSON values addressed by key.
///
/// Implementations exist for the Spin key-value store (component build),
/// Redis (native build) and an in-process map (native default and tests).
/// No operation is transactional across keys; `set_if_absent` and `push`
/// are atomic on a single key for the memory and Redis backends.
pub trait Store {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;
    /// Writes `value` only when `key` is unset. Returns whether it was written.
    fn set_if_absent(&self, key: &str, value: &[u8]) -> anyhow::Result<bool>;
    /// Appends `item` to the list stored at `key`.
    fn push(&self, key: &str, item: &str) -> anyhow::Result<()>;
    /// Items of the list at `key`, oldest first.
    fn members(&self, key: &str) -> anyhow::Result<Vec<String>>;
}

pub trait StoreExt {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>>;
    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()>;
}

impl<S: Store + ?Sized> StoreExt for S {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        self.set(key, &serde_json::to_vec(value)?)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> anyhow::Result<RwLockReadGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries
            .read()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }

    fn write(&self) -> anyhow::Result<RwLockWriteGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.write()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.write()?.remove(key);
        Ok(())
    }

    fn set_if_absent(&self, key: &str, value: &[u8]) -> anyhow::Result<bool> {
        let mut entries = self.write()?;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_vec());
        Ok(true)
    }

    fn push(&self, key: &str, item: &str) -> anyhow::Result<()> {
        let mut entries = self.write()?;
        let mut list: Vec<String> = match entries.get(key) {
            Some(bytes) => serde_json::from_slice(bytes)?,
            None => Vec::new(),
        };
        list.push(item.to_string());
        entries.insert(key.to_string(), serde_json::to_vec(&list)?);
        Ok(())
    }

    fn members(&self, key: &str) -> anyhow::Result<Vec<String>> {
        match self.read()?.get(key) {
            Some(bytes) => Ok(serde_json::from_slice(bytes)?),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use spin::SpinStore;

#[cfg(target_arch = "wasm32")]
mod spin {
    use super::{Store, StoreExt};

    /// The Spin key-value interface has no conditional write, so
    /// `set_if_absent` and `push` are read-then-write here.
    pub struct SpinStore(spin_sdk::key_value::Store);

    impl SpinStore {
        /// Opens the store named by a `spin://<label>` url, or the default store.
        pub fn open(database_url: Option<&str>) -> anyhow::Result<Self> {
            let store = match database_url.and_then(|url| url.strip_prefix("spin://")) {
                Some(label) if !label.is_empty() => spin_sdk::key_value::Store::open(label)?,
                _ => spin_sdk::key_value::Store::open_default()?,
            };
            Ok(Self(store))
        }
    }

    impl Store for SpinStore {
        fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
            Ok(self.0.get(key)?)
        }

        fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
            Ok(self.0.set(key, value)?)
        }

        fn delete(&self, key: &str) -> anyhow::Result<()> {
            Ok(self.0.delete(key)?)
        }

        fn set_if_absent(&self, key: &str, value: &[u8]) -> anyhow::Result<bool> {
            if self.0.exists(key)? {
                return Ok(false);
            }
            self.0.set(key, value)?;
            Ok(true)
        }

        fn push(&self, key: &str, item: &str) -> anyhow::Result<()> {
            let mut list: Vec<String> = self.get_json(key)?.unwrap_or_default();
            list.push(item.to_string());
            self.set_json(key, &list)
        }

        fn members(&self, key: &str) -> anyhow::Result<Vec<String>> {
            Ok(self.get_json(key)?.unwrap_or_default())
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use self::redis_store::RedisStore;

#[cfg(not(target_arch = "wasm32"))]
mod redis_store {
    use redis::Commands;

    use super::Store;

    /// Opens a fresh connection per operation, so a dropped socket only
    /// fails the call that hit it.
    pub struct RedisStore {
        client: redis::Client,
    }

    impl RedisStore {
        pub fn connect(url: &str) -> anyhow::Result<Self> {
            let client = redis::Client::open(url)?;
            // Fail at startup when the server is unreachable
            let _ = client.get_connection()?;
            Ok(Self { client })
        }

        fn conn(&self) -> anyhow::Result<redis::Connection> {
            Ok(self.client.get_connection()?)
        }
    }

    impl Store for RedisStore {
        fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
            let value: Option<Vec<u8>> = self.conn()?.get(key)?;
            Ok(value)
        }

        fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
            let _: () = self.conn()?.set(key, value)?;
            Ok(())
        }

        fn delete(&self, key: &str) -> anyhow::Result<()> {
            let _: () = self.conn()?.del(key)?;
            Ok(())
        }

        fn set_if_absent(&self, key: &str, value: &[u8]) -> anyhow::Result<bool> {
            let written: bool = self.conn()?.set_nx(key, value)?;
            Ok(written)
        }

        fn push(&self, key: &str, item: &str) -> anyhow::Result<()> {
            let _: () = self.conn()?.rpush(key, item)?;
            Ok(())
        }

        fn members(&self, key: &str) -> anyhow::Result<Vec<String>> {
            let items: Vec<String> = self.conn()?.lrange(key, 0, -1)?;
            Ok(items)
        }
    }
}

/// Builds the native store named by `ROOST_DATABASE_URL`.
#[cfg(not(target_arch = "wasm32"))]
pub fn open_store(config: &Config) -> anyhow::Result<Box<dyn Store + Send + Sync>> {
    match config.database_url.as_deref() {
        None | Some("memory://") => {
            tracing::warn!("Using in-memory store, data is lost on restart");
            Ok(Box::new(MemoryStore::new()))
        }
        Some(url) if url.starts_with("redis://") || url.starts_with("rediss://") => {
            tracing::info!("Connecting to redis store");
            Ok(Box::new(RedisStore::connect(url)?))
        }
        Some(url) => anyhow::bail!("Unsupported database url: {}", url),
    }
}

#[cfg(target_arch = "wasm32")]
pub fn open_store(config: &Config) -> anyhow::Result<Box<dyn Store>> {
    Ok(Box::new(SpinStore::open(config.database_url.as_deref())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_json_roundtrip_and_delete() {
        let store = MemoryStore::new();
        assert!(store.get_json::<Vec<String>>("missing").unwrap().is_none());

        store.set_json("doc", &vec!["a".to_string()]).unwrap();
        let doc: Vec<String> = store.get_json("doc").unwrap().unwrap();
        assert_eq!(doc, vec!["a".to_string()]);

        store.delete("doc").unwrap();
        assert!(store.get("doc").unwrap().is_none());
    }

    #[test]
    fn test_set_if_absent_keeps_first_writer() {
        let store = MemoryStore::new();
        assert!(store.set_if_absent("k", b"first").unwrap());
        assert!(!store.set_if_absent("k", b"second").unwrap());
        assert_eq!(store.get("k").unwrap().unwrap(), b"first".to_vec());
    }

    #[test]
    fn test_concurrent_set_if_absent_has_one_winner() {
        let store = MemoryStore::new();
        let winners = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let store = &store;
                    s.spawn(move || store.set_if_absent("k", format!("{}", i).as_bytes()).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).filter(|won| *won).count()
        });
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_concurrent_push_keeps_every_item() {
        let store = MemoryStore::new();
        std::thread::scope(|s| {
            for i in 0..16 {
                let store = &store;
                s.spawn(move || store.push("list", &i.to_string()).unwrap());
            }
        });

        let mut items = store.members("list").unwrap();
        items.sort_by_key(|i| i.parse::<u32>().unwrap());
        assert_eq!(items, (0..16).map(|i| i.to_string()).collect::<Vec<_>>());
        assert!(store.members("empty").unwrap().is_empty());
    }

    #[test]
    fn test_open_store_rejects_unknown_scheme() {
        let mut config = Config::new("secret");
        config.database_url = Some("mongodb://localhost".to_string());
        assert!(open_store(&config).is_err());

        config.database_url = Some("memory://".to_string());
        assert!(open_store(&config).is_ok());
    }
}

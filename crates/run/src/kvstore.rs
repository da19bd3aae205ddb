//! KvStore - hash storage for staged playbook data

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tcex_shared::{Result, TcexError};

/// Hash operations the playbook context needs
pub trait KvStore {
    /// Set `field` in hash `key`, returning true when the field is new
    fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool>;

    fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;

    fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>>;
}

/// In-process store used by tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: Mutex<HashMap<String, BTreeMap<String, String>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, BTreeMap<String, String>>>> {
        self.data
            .lock()
            .map_err(|_| TcexError::KvStore("memory store lock poisoned".to_string()))
    }
}

impl KvStore for MemoryKvStore {
    fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        let mut data = self.lock()?;
        let hash = data.entry(key.to_string()).or_default();
        Ok(hash.insert(field.to_string(), value.to_string()).is_none())
    }

    fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let data = self.lock()?;
        Ok(data.get(key).and_then(|h| h.get(field)).cloned())
    }

    fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>> {
        let data = self.lock()?;
        Ok(data.get(key).cloned().unwrap_or_default())
    }
}

/// Redis backed store
pub struct RedisKvStore {
    url: String,
    connection: Mutex<redis::Connection>,
}

impl RedisKvStore {
    /// Connect to `redis://{host}:{port}/{db}`
    pub fn connect(host: &str, port: u16, db: u32) -> Result<Self> {
        let url = format!("redis://{}:{}/{}", host, port, db);
        let client = redis::Client::open(url.as_str())
            .map_err(|e| TcexError::KvStore(format!("Invalid Redis URL {}: {}", url, e)))?;
        let connection = client
            .get_connection()
            .map_err(|e| TcexError::KvStore(format!("Failed to connect to {}: {}", url, e)))?;

        tracing::debug!(action = "kvstore-connect", url = %url, "connected to Redis");
        Ok(Self {
            url,
            connection: Mutex::new(connection),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn query<T: redis::FromRedisValue>(&self, cmd: &redis::Cmd) -> Result<T> {
        let mut connection = self
            .connection
            .lock()
            .map_err(|_| TcexError::KvStore("Redis connection lock poisoned".to_string()))?;
        cmd.query(&mut *connection)
            .map_err(|e| TcexError::KvStore(e.to_string()))
    }
}

impl KvStore for RedisKvStore {
    fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        let added: i64 = self.query(redis::cmd("HSET").arg(key).arg(field).arg(value))?;
        Ok(added > 0)
    }

    fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.query(redis::cmd("HGET").arg(key).arg(field))
    }

    fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>> {
        self.query(redis::cmd("HGETALL").arg(key))
    }
}

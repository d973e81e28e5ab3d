//! Redis implementation of the ephemeral store contract.

use std::time::Duration;

use ephemeral_lock_core::error::{LockError, LockResult};
use ephemeral_lock_core::store::EphemeralStore;
use fred::prelude::*;
use fred::types::CustomCommand;
use tracing::trace;

/// Prefix put in front of every key unless configured otherwise.
pub const DEFAULT_KEY_PREFIX: &str = "ephemeral-lock";

/// Lua script deleting a key only while it holds the expected value.
const RELEASE_SCRIPT_LUA: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('del', KEYS[1])
    end
    return 0
"#;

/// Builder for [`RedisStore`].
pub struct RedisStoreBuilder {
    url: Option<String>,
    client: Option<RedisClient>,
    key_prefix: String,
    max_key_length: Option<usize>,
}

impl RedisStoreBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            url: None,
            client: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            max_key_length: None,
        }
    }

    /// Sets the Redis server URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Uses an existing, already connected Redis client.
    pub fn client(mut self, client: RedisClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the prefix prepended to every key.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Caps the length of lock names before they are hashed.
    pub fn max_key_length(mut self, max: usize) -> Self {
        self.max_key_length = Some(max);
        self
    }

    /// Builds the store, connecting to the server if a URL was given.
    pub async fn build(self) -> LockResult<RedisStore> {
        let client = match (self.client, self.url) {
            (Some(client), _) => client,
            (None, Some(url)) => {
                let config = RedisConfig::from_url(&url).map_err(|e| {
                    LockError::Connection(Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("invalid Redis URL: {e}"),
                    )))
                })?;

                let client = RedisClient::new(config, None, None, None);
                client.connect();
                client.wait_for_connect().await.map_err(|e| {
                    LockError::Connection(Box::new(std::io::Error::other(format!(
                        "failed to connect to Redis: {e}"
                    ))))
                })?;
                client
            }
            (None, None) => {
                return Err(LockError::InvalidName(
                    "no Redis client or URL provided".to_string(),
                ));
            }
        };

        Ok(RedisStore {
            client,
            key_prefix: self.key_prefix,
            max_key_length: self.max_key_length,
        })
    }
}

impl Default for RedisStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Ephemeral store backed by a Redis server.
///
/// Keys are laid out as `{prefix}:{namespace}:{key}`.
pub struct RedisStore {
    client: RedisClient,
    key_prefix: String,
    max_key_length: Option<usize>,
}

impl RedisStore {
    /// Returns a new builder for configuring the store.
    pub fn builder() -> RedisStoreBuilder {
        RedisStoreBuilder::new()
    }

    /// Connects to the Redis server at `url` with default settings.
    pub async fn new(url: impl Into<String>) -> LockResult<Self> {
        Self::builder().url(url).build().await
    }

    /// The underlying client.
    pub fn client(&self) -> &RedisClient {
        &self.client
    }

    fn redis_key(&self, key: &str, namespace: &str) -> String {
        redis_key(&self.key_prefix, namespace, key)
    }
}

fn redis_key(prefix: &str, namespace: &str, key: &str) -> String {
    if prefix.is_empty() {
        format!("{namespace}:{key}")
    } else {
        format!("{prefix}:{namespace}:{key}")
    }
}

/// Longest TTL sent to Redis (about 100 years). Redis rejects `PX` values
/// that overflow once added to the server clock.
const MAX_TTL_MILLIS: i64 = 100 * 365 * 24 * 60 * 60 * 1000;

/// TTL in whole milliseconds, between one (Redis rejects `PX 0`) and
/// [`MAX_TTL_MILLIS`].
fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis())
        .unwrap_or(MAX_TTL_MILLIS)
        .clamp(1, MAX_TTL_MILLIS)
}

fn map_redis_error(e: RedisError, operation: &str) -> LockError {
    let message = format!("Redis {operation} failed: {e}");
    match e.kind() {
        RedisErrorKind::IO | RedisErrorKind::Timeout | RedisErrorKind::Canceled => {
            LockError::Connection(Box::new(std::io::Error::other(message)))
        }
        _ => LockError::Backend(Box::new(std::io::Error::other(message))),
    }
}

impl EphemeralStore for RedisStore {
    async fn create_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        namespace: &str,
    ) -> LockResult<bool> {
        let redis_key = self.redis_key(key, namespace);

        // SET NX returns the OK reply if the key was set, nil if it already exists
        let result: Option<String> = self
            .client
            .set(
                redis_key.as_str(),
                value,
                Some(Expiration::PX(ttl_millis(ttl))),
                Some(SetOptions::NX),
                false,
            )
            .await
            .map_err(|e| map_redis_error(e, "SET NX"))?;

        trace!(key = %redis_key, created = result.is_some(), "SET NX");
        Ok(result.is_some())
    }

    async fn delete(&self, key: &str, namespace: &str) -> LockResult<()> {
        let redis_key = self.redis_key(key, namespace);
        let _: i64 = self
            .client
            .del(redis_key.as_str())
            .await
            .map_err(|e| map_redis_error(e, "DEL"))?;
        Ok(())
    }

    async fn delete_if_matches(&self, key: &str, value: &str, namespace: &str) -> LockResult<bool> {
        let args: Vec<RedisValue> = vec![
            RELEASE_SCRIPT_LUA.into(),
            1_i64.into(), // numkeys
            self.redis_key(key, namespace).into(),
            value.into(),
        ];

        let cmd = CustomCommand::new_static("EVAL", None, false);
        let deleted: i64 = self
            .client
            .custom(cmd, args)
            .await
            .map_err(|e| map_redis_error(e, "EVAL (release)"))?;

        Ok(deleted == 1)
    }

    fn max_key_length(&self) -> Option<usize> {
        self.max_key_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(redis_key("ephemeral-lock", "mutex", "order:42"), "ephemeral-lock:mutex:order:42");
        assert_eq!(redis_key("", "mutex", "order:42"), "mutex:order:42");
    }

    #[test]
    fn test_ttl_millis() {
        assert_eq!(ttl_millis(Duration::from_secs(600)), 600_000);
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::MAX), MAX_TTL_MILLIS);
        assert_eq!(ttl_millis(Duration::from_secs(u64::MAX / 1000)), MAX_TTL_MILLIS);
    }

    #[test]
    fn test_io_errors_map_to_connection() {
        let io = RedisError::new(RedisErrorKind::IO, "broken pipe");
        assert!(matches!(map_redis_error(io, "SET NX"), LockError::Connection(_)));

        let parse = RedisError::new(RedisErrorKind::Parse, "bad reply");
        assert!(matches!(map_redis_error(parse, "SET NX"), LockError::Backend(_)));
    }

    #[tokio::test]
    async fn test_build_without_client_or_url_fails() {
        let result = RedisStore::builder().build().await;
        assert!(matches!(result, Err(LockError::InvalidName(_))));
    }
}

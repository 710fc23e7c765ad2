//! Redis-backed durable queue.
//!
//! Layout under the configured key prefix:
//! - `{prefix}:{queue}:ready` — list of pending message ids
//! - `{prefix}:{queue}:msg:{id}` — serialized message record
//! - `{prefix}:{queue}:leases` — zset of leased ids scored by expiry (ms)
//! - `{prefix}:{queue}:lease:{id}` — active lease token
//!
//! Invariant: an id is on exactly one of `ready` and `leases` at all
//! times. The pop-and-lease, reclaim, and acknowledge transitions each run
//! as a single Lua script, so a process crash mid-transition cannot strand
//! an id off both structures. Receive reclaims expired leases before
//! popping, so a crashed consumer's messages become visible again without
//! any out-of-band process.

use crate::queue::error::{QueueError, QueueResult};
use crate::queue::message::{LeaseToken, Message, ReceivedMessage};
use crate::queue::traits::MessageQueue;
use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, ErrorKind, RedisError, Script};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// How many expired leases to reclaim per receive call
const RECLAIM_BATCH: isize = 16;

lazy_static! {
    /// Pop one ready id and register its lease in the same step.
    /// KEYS: ready list, lease zset. ARGV: token, expiry ms, token key prefix.
    static ref POP_AND_LEASE: Script = Script::new(
        r#"
        local id = redis.call('RPOP', KEYS[1])
        if not id then
            return false
        end
        redis.call('SET', ARGV[3] .. id, ARGV[1])
        redis.call('ZADD', KEYS[2], ARGV[2], id)
        return id
        "#,
    );

    /// Move expired leases back to the ready list in the same step.
    /// KEYS: lease zset, ready list. ARGV: now ms, batch limit, token key prefix.
    static ref RECLAIM_EXPIRED: Script = Script::new(
        r#"
        local expired = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, ARGV[2])
        for _, id in ipairs(expired) do
            redis.call('ZREM', KEYS[1], id)
            redis.call('DEL', ARGV[3] .. id)
            redis.call('LPUSH', KEYS[2], id)
        end
        return #expired
        "#,
    );

    /// Token-checked acknowledge: record, token, and lease entry go
    /// together, and only while the caller still holds the active lease.
    /// KEYS: token key, message key, lease zset. ARGV: token, id.
    static ref ACK_WITH_TOKEN: Script = Script::new(
        r#"
        local stored = redis.call('GET', KEYS[1])
        if stored == ARGV[1] then
            redis.call('DEL', KEYS[1], KEYS[2])
            redis.call('ZREM', KEYS[3], ARGV[2])
            return 1
        end
        return 0
        "#,
    );
}

#[derive(Debug, Serialize, Deserialize)]
struct MessageRecord {
    message: Message,
    delivery_count: u32,
}

/// Redis-backed queue
#[derive(Clone)]
pub struct RedisQueue {
    _client: Arc<Client>,
    connection: ConnectionManager,
    name: String,
    key_prefix: String,
    visibility_timeout: Duration,
}

impl RedisQueue {
    /// Connect to Redis and verify the connection with a PING
    pub async fn new(
        redis_url: &str,
        name: impl Into<String>,
        key_prefix: impl Into<String>,
        visibility_timeout: Duration,
    ) -> QueueResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| QueueError::BackendUnavailable(format!("invalid redis url: {}", e)))?;

        let connection = ConnectionManager::new(client.clone())
            .await
            .map_err(map_redis_err)?;

        let mut test_conn = connection.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut test_conn)
            .await
            .map_err(map_redis_err)?;

        let name = name.into();
        let key_prefix = key_prefix.into();
        tracing::info!(queue = %name, prefix = %key_prefix, "Connected to Redis queue backend");

        Ok(Self {
            _client: Arc::new(client),
            connection,
            name,
            key_prefix,
            visibility_timeout,
        })
    }

    fn ready_key(&self) -> String {
        format!("{}:{}:ready", self.key_prefix, self.name)
    }

    fn message_key(&self, id: &Uuid) -> String {
        format!("{}:{}:msg:{}", self.key_prefix, self.name, id)
    }

    fn leases_key(&self) -> String {
        format!("{}:{}:leases", self.key_prefix, self.name)
    }

    fn lease_token_key(&self, id: &Uuid) -> String {
        format!("{}{}", self.lease_key_prefix(), id)
    }

    fn lease_key_prefix(&self) -> String {
        format!("{}:{}:lease:", self.key_prefix, self.name)
    }

    /// Requeue ids whose lease expiry score has passed
    async fn reclaim_expired(&self, conn: &mut ConnectionManager) -> QueueResult<()> {
        let now_ms = Utc::now().timestamp_millis();
        let reclaimed: i64 = RECLAIM_EXPIRED
            .key(self.leases_key())
            .key(self.ready_key())
            .arg(now_ms)
            .arg(RECLAIM_BATCH)
            .arg(self.lease_key_prefix())
            .invoke_async(conn)
            .await
            .map_err(map_redis_err)?;

        if reclaimed > 0 {
            tracing::debug!(count = reclaimed, queue = %self.name, "Expired leases requeued");
        }

        Ok(())
    }
}

#[async_trait]
impl MessageQueue for RedisQueue {
    async fn enqueue(&self, body: &str) -> QueueResult<Message> {
        let message = Message::new(body);
        let record = MessageRecord {
            message: message.clone(),
            delivery_count: 0,
        };
        let json = serde_json::to_string(&record)?;

        let mut conn = self.connection.clone();
        let _: () = redis::pipe()
            .atomic()
            .set(self.message_key(&message.id), json)
            .ignore()
            .lpush(self.ready_key(), message.id.to_string())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;

        Ok(message)
    }

    async fn receive(&self) -> QueueResult<Option<ReceivedMessage>> {
        let mut conn = self.connection.clone();
        self.reclaim_expired(&mut conn).await?;

        loop {
            let lease = LeaseToken::generate();
            let expires_ms =
                Utc::now().timestamp_millis() + self.visibility_timeout.as_millis() as i64;

            let popped: Option<String> = POP_AND_LEASE
                .key(self.ready_key())
                .key(self.leases_key())
                .arg(lease.as_str())
                .arg(expires_ms)
                .arg(self.lease_key_prefix())
                .invoke_async(&mut conn)
                .await
                .map_err(map_redis_err)?;
            let Some(id_str) = popped else {
                return Ok(None);
            };

            let id = Uuid::parse_str(&id_str).map_err(|e| {
                QueueError::Serialization(format!("bad message id '{}': {}", id_str, e))
            })?;

            let json: Option<String> = conn
                .get(self.message_key(&id))
                .await
                .map_err(map_redis_err)?;
            let Some(json) = json else {
                // Orphaned id (record deleted out of band); drop its lease
                // and keep popping, the next ready message may be intact
                tracing::warn!(message_id = %id, queue = %self.name, "Dropping orphaned queue entry");
                let _: () = conn
                    .del(self.lease_token_key(&id))
                    .await
                    .map_err(map_redis_err)?;
                let _: () = conn
                    .zrem(self.leases_key(), &id_str)
                    .await
                    .map_err(map_redis_err)?;
                continue;
            };

            let mut record: MessageRecord = serde_json::from_str(&json)?;
            record.delivery_count += 1;
            let _: () = conn
                .set(self.message_key(&id), serde_json::to_string(&record)?)
                .await
                .map_err(map_redis_err)?;

            return Ok(Some(ReceivedMessage {
                message: record.message,
                lease,
                delivery_count: record.delivery_count,
            }));
        }
    }

    async fn delete(&self, id: Uuid, lease: &LeaseToken) -> QueueResult<()> {
        let mut conn = self.connection.clone();

        let acked: i64 = ACK_WITH_TOKEN
            .key(self.lease_token_key(&id))
            .key(self.message_key(&id))
            .key(self.leases_key())
            .arg(lease.as_str())
            .arg(id.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_err)?;

        if acked == 1 {
            Ok(())
        } else {
            Err(QueueError::LeaseExpired(id))
        }
    }

    async fn approximate_len(&self) -> QueueResult<u64> {
        let mut conn = self.connection.clone();
        let ready: u64 = conn.llen(self.ready_key()).await.map_err(map_redis_err)?;
        let leased: u64 = conn.zcard(self.leases_key()).await.map_err(map_redis_err)?;
        Ok(ready + leased)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Map redis errors onto the queue taxonomy. A server that answers but is
/// still loading its dataset is "not provisioned yet"; anything at the
/// transport level is a plain availability failure.
fn map_redis_err(err: RedisError) -> QueueError {
    if err.kind() == ErrorKind::BusyLoadingError {
        QueueError::NotProvisioned(err.to_string())
    } else {
        QueueError::BackendUnavailable(err.to_string())
    }
}

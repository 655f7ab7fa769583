use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

/// Seconds a presence key survives without a heartbeat.
pub const ONLINE_TTL_SECS: u64 = 120;

fn online_key(user_id: Uuid) -> String {
    format!("online:{user_id}")
}

/// Online-presence tracking backed by Redis.
///
/// A connected socket marks its user online with a TTL and refreshes it on
/// heartbeat; readers treat key existence as the whole truth. Keys expire on
/// their own, so a crashed service never leaves users pinned online.
#[derive(Clone)]
pub struct PresenceStore {
    conn: ConnectionManager,
}

impl PresenceStore {
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let conn = redis::Client::open(url)?.get_connection_manager().await?;
        tracing::info!(url = %url, "presence store connected");
        Ok(Self { conn })
    }

    /// Mark a user online. Also refreshes the TTL, so heartbeats reuse it.
    pub async fn mark_online(&self, user_id: Uuid) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.set_ex(online_key(user_id), 1u8, ONLINE_TTL_SECS).await
    }

    pub async fn mark_offline(&self, user_id: Uuid) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.del(online_key(user_id)).await
    }

    /// Presence flags for a batch of users in one pipeline round-trip,
    /// returned in input order.
    pub async fn online_flags(&self, user_ids: &[Uuid]) -> Result<Vec<bool>, redis::RedisError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        for id in user_ids {
            pipe.exists(online_key(*id));
        }
        pipe.query_async(&mut conn).await
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tracing::warn;

use postconfirm_core::{
    regex_cache, Action, Address, Layer, MessageStash, PatternRule, RefSet, SenderStore,
    StashEntry, StoreError,
};

fn transient(e: sqlx::Error) -> StoreError {
    StoreError::Transient(e.to_string())
}

/// Connection settings for the Postgres-backed store, mirroring the
/// `db.{name,user,password,host,port}` configuration keys.
#[derive(Clone, Debug)]
pub struct PgConfig {
    pub name: String,
    pub user: String,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    pub pool_max_connections: u32,
}

impl Default for PgConfig {
    fn default() -> Self {
        Self {
            name: "postconfirm".to_string(),
            user: "postconfirm".to_string(),
            password: None,
            host: "localhost".to_string(),
            port: 5432,
            pool_max_connections: 10,
        }
    }
}

impl PgConfig {
    fn connection_url(&self) -> String {
        let password = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{user}:{password}@{host}:{port}/{name}",
            user = self.user,
            password = password,
            host = self.host,
            port = self.port,
            name = self.name,
        )
    }

    pub async fn connect(&self) -> Result<PgPool, StoreError> {
        PgPoolOptions::new()
            .max_connections(self.pool_max_connections)
            .connect(&self.connection_url())
            .await
            .map_err(transient)
    }
}

/// `C3` backed by the `senders`/`senders_static` tables described in the
/// store schema. Optional `confirm_ttl` demotes stale `confirm` rows to
/// `expired` at read time, per the TTL design note.
pub struct PgSenderStore {
    pool: PgPool,
    confirm_ttl: Option<chrono::Duration>,
}

impl PgSenderStore {
    pub fn new(pool: PgPool, confirm_ttl_seconds: Option<i64>) -> Self {
        Self {
            pool,
            confirm_ttl: confirm_ttl_seconds.map(chrono::Duration::seconds),
        }
    }

    async fn row_for(
        &self,
        table: &str,
        sender: &Address,
    ) -> Result<Option<(String, Option<String>, Option<DateTime<Utc>>)>, StoreError> {
        let query = format!(
            "SELECT action, ref, created_at FROM {table} WHERE sender = $1 AND type = 'E'"
        );
        let row = sqlx::query(&query)
            .bind(sender.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(transient)?;

        Ok(row.map(|r| {
            let created_at: Option<DateTime<Utc>> = r.try_get("created_at").ok();
            (r.get::<String, _>("action"), r.get::<Option<String>, _>("ref"), created_at)
        }))
    }
}

#[async_trait]
impl SenderStore for PgSenderStore {
    async fn get_action(&self, sender: &Address) -> Result<(Action, RefSet), StoreError> {
        let dynamic = self.row_for("senders", sender).await?;
        let static_row = self.row_for("senders_static", sender).await?;

        let mut action = None;
        let mut refs = RefSet::new();

        if let Some((raw_action, raw_refs, created_at)) = dynamic {
            let parsed = Action::parse(&raw_action).unwrap_or(Action::Unknown);
            let age = created_at.map(|c| Utc::now() - c);
            action = Some(parsed.materialize(age, self.confirm_ttl));
            refs = RefSet::decode(raw_refs.as_deref());
        }

        if let Some((raw_action, raw_refs, _created_at)) = static_row {
            if action.is_none() {
                action = Some(Action::parse(&raw_action).unwrap_or(Action::Unknown));
            }
            refs = refs.union(&RefSet::decode(raw_refs.as_deref()));
        }

        if let Some(action) = action {
            return Ok((action, refs));
        }

        // Neither table has an exact row: fall back to the pattern table.
        for rule in self.iter_patterns().await? {
            match regex_cache::compiled(&rule.pattern) {
                Ok(re) if re.is_match(sender.as_str()) => {
                    return Ok((rule.action, RefSet::new()));
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!(pattern = %rule.pattern, error = %e, "skipping invalid pattern rule");
                    continue;
                }
            }
        }

        Ok((Action::Unknown, RefSet::new()))
    }

    async fn set_action(
        &self,
        sender: &Address,
        action: Action,
        refs: RefSet,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO senders (sender, type, action, ref, source, created_at)
             VALUES ($1, 'E', $2, $3, 'postconfirm', now())
             ON CONFLICT (sender, type) DO UPDATE SET
                action = excluded.action, ref = excluded.ref, created_at = excluded.created_at",
        )
        .bind(sender.as_str())
        .bind(action.as_str())
        .bind(refs.encode())
        .execute(&self.pool)
        .await
        .map_err(transient)?;

        Ok(())
    }

    async fn iter_patterns(&self) -> Result<Vec<PatternRule>, StoreError> {
        let rows = sqlx::query(
            "SELECT sender, action FROM senders WHERE type = 'P'
             UNION
             SELECT sender, action FROM senders_static WHERE type = 'P'
             ORDER BY sender ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(transient)?;

        Ok(rows
            .into_iter()
            .map(|r| PatternRule {
                pattern: r.get("sender"),
                action: Action::parse(r.get("action")).unwrap_or(Action::Unknown),
            })
            .collect())
    }
}

/// `C4` backed by the `stash`/`stash_static` tables.
pub struct PgMessageStash {
    pool: PgPool,
}

impl PgMessageStash {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn peek_in(
        &self,
        table: &str,
        sender: &Address,
    ) -> Result<Option<StashEntry>, StoreError> {
        let query = format!(
            "SELECT id, recipients, message, created_at FROM {table}
             WHERE sender = $1 ORDER BY created_at ASC, id ASC LIMIT 1"
        );
        let row = sqlx::query(&query)
            .bind(sender.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(transient)?;

        Ok(row.map(|r| {
            let recipients_json: String = r.get("recipients");
            let recipients: Vec<Address> = serde_json::from_str::<Vec<String>>(&recipients_json)
                .unwrap_or_default()
                .into_iter()
                .map(Address::from)
                .collect();
            StashEntry {
                id: r.get("id"),
                sender: sender.clone(),
                recipients,
                message: r.get::<String, _>("message").into_bytes(),
                created_at: r.get("created_at"),
            }
        }))
    }
}

#[async_trait]
impl MessageStash for PgMessageStash {
    async fn stash(
        &self,
        sender: &Address,
        recipients: &[Address],
        message: &[u8],
    ) -> Result<i64, StoreError> {
        let recipients_json = serde_json::to_string(
            &recipients.iter().map(|a| a.as_raw()).collect::<Vec<_>>(),
        )
        .expect("serializing &str recipients cannot fail");
        let message_text = String::from_utf8_lossy(message).into_owned();

        let row = sqlx::query(
            "INSERT INTO stash (sender, recipients, message) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(sender.as_str())
        .bind(recipients_json)
        .bind(message_text)
        .fetch_one(&self.pool)
        .await
        .map_err(transient)?;

        Ok(row.get("id"))
    }

    async fn peek_next(&self, sender: &Address) -> Result<Option<(StashEntry, Layer)>, StoreError> {
        if let Some(entry) = self.peek_in("stash", sender).await? {
            return Ok(Some((entry, Layer::Dynamic)));
        }
        if let Some(entry) = self.peek_in("stash_static", sender).await? {
            return Ok(Some((entry, Layer::Static)));
        }
        Ok(None)
    }

    async fn ack(&self, id: i64, layer: Layer) -> Result<(), StoreError> {
        let table = match layer {
            Layer::Dynamic => "stash",
            Layer::Static => "stash_static",
        };
        let query = format!("DELETE FROM {table} WHERE id = $1");
        sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(transient)?;
        Ok(())
    }
}

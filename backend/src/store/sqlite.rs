use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use mindful_common::{ContentType, SubscriptionPlan};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::broadcast;

use super::{StoreError, StoreEvent};
use crate::models::{current_period, Artifact, NewArtifact, UserAccount};

const EVENT_CAPACITY: usize = 256;

/// Columns added to `accounts` after the first release, with the defaults
/// applied to documents that predate them.
const ACCOUNT_MIGRATIONS: &[(&str, &str)] = &[
    ("subscription_plan", "TEXT NOT NULL DEFAULT 'free'"),
    ("tokens_used_this_month", "INTEGER NOT NULL DEFAULT 0"),
    ("usage_period", "TEXT"),
];

/// SQLite-backed account and artifact store with change notifications.
pub struct AccountStore {
    conn: Mutex<Connection>,
    events: broadcast::Sender<StoreEvent>,
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str, id: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            tracing::warn!("Unparseable timestamp '{}' stored for {}: {}", raw, id, e);
            Utc::now()
        })
}

fn parse_content_type(label: &str, id: &str) -> ContentType {
    ContentType::from_label(label).unwrap_or_else(|| {
        tracing::warn!(
            "Unknown content type '{}' stored for artifact {}, using {}",
            label,
            id,
            ContentType::default().label()
        );
        ContentType::default()
    })
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<UserAccount> {
    let id: String = row.get(0)?;
    let plan_key: String = row.get(3)?;
    let subscription_plan = SubscriptionPlan::from_key(&plan_key).unwrap_or_else(|| {
        tracing::warn!("Unknown plan '{}' stored for {}, treating as free", plan_key, id);
        SubscriptionPlan::Free
    });
    let created_at: String = row.get(2)?;
    let created_at = parse_timestamp(&created_at, &id);

    Ok(UserAccount {
        id,
        email: row.get(1)?,
        created_at,
        subscription_plan,
        tokens_used_this_month: row.get::<_, i64>(4)?.max(0) as u32,
        usage_period: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
    })
}

fn artifact_from_row(row: &Row<'_>) -> rusqlite::Result<Artifact> {
    let id: String = row.get(0)?;
    let content_type: String = row.get(4)?;
    let created_at: String = row.get(6)?;

    Ok(Artifact {
        content_type: parse_content_type(&content_type, &id),
        created_at: parse_timestamp(&created_at, &id),
        id,
        user_id: row.get(1)?,
        content: row.get(2)?,
        prompt: row.get(3)?,
        persona: row.get(5)?,
    })
}

const SELECT_ACCOUNT: &str = "SELECT id, email, created_at, subscription_plan, tokens_used_this_month, usage_period
     FROM accounts WHERE id = ?1";

impl AccountStore {
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::IoError(e.to_string()))?;
        }

        let conn = Connection::open(path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                email TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS artifacts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                content TEXT NOT NULL,
                prompt TEXT NOT NULL,
                content_type TEXT NOT NULL,
                persona TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES accounts(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_artifacts_user_created ON artifacts(user_id, created_at)",
            [],
        )?;

        Self::migrate(&conn)?;

        tracing::info!("Account store initialized with database: {}", path);

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            conn: Mutex::new(conn),
            events,
        })
    }

    /// Add columns missing from older databases and default their values.
    fn migrate(conn: &Connection) -> Result<(), StoreError> {
        let existing: Vec<String> = {
            let mut stmt = conn.prepare("PRAGMA table_info(accounts)")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
            rows.collect::<Result<_, _>>()?
        };

        for (column, definition) in ACCOUNT_MIGRATIONS {
            if !existing.iter().any(|c| c == column) {
                conn.execute(
                    &format!("ALTER TABLE accounts ADD COLUMN {} {}", column, definition),
                    [],
                )?;
                tracing::info!("Migrated accounts table: added column {}", column);
            }
        }

        let defaulted = conn.execute(
            "UPDATE accounts SET usage_period = ?1 WHERE usage_period IS NULL",
            params![current_period()],
        )?;
        if defaulted > 0 {
            tracing::info!("Defaulted usage period on {} legacy accounts", defaulted);
        }

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn publish(&self, event: StoreEvent) {
        // No receivers is fine: nobody is listening right now.
        let _ = self.events.send(event);
    }

    /// Subscribe to changes of any document in the store.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn get_account(&self, user_id: &str) -> Result<Option<UserAccount>, StoreError> {
        let conn = self.lock()?;
        let account = conn
            .query_row(SELECT_ACCOUNT, params![user_id], account_from_row)
            .optional()?;
        Ok(account)
    }

    /// Find or create an account. A new account starts on the free plan with
    /// an empty counter.
    pub fn get_or_create_account(
        &self,
        user_id: &str,
        email: Option<&str>,
    ) -> Result<UserAccount, StoreError> {
        let conn = self.lock()?;

        let existing = conn
            .query_row(SELECT_ACCOUNT, params![user_id], account_from_row)
            .optional()?;

        if let Some(mut account) = existing {
            if email.is_some() && account.email.as_deref() != email {
                conn.execute(
                    "UPDATE accounts SET email = ?1 WHERE id = ?2",
                    params![email, user_id],
                )?;
                account.email = email.map(String::from);
            }
            return Ok(account);
        }

        let account = UserAccount {
            id: user_id.to_string(),
            email: email.map(String::from),
            created_at: Utc::now(),
            subscription_plan: SubscriptionPlan::Free,
            tokens_used_this_month: 0,
            usage_period: current_period(),
        };

        conn.execute(
            "INSERT INTO accounts (id, email, created_at, subscription_plan, tokens_used_this_month, usage_period)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                account.id,
                account.email,
                timestamp(&account.created_at),
                account.subscription_plan.as_key(),
                account.usage_period,
            ],
        )?;
        drop(conn);

        tracing::info!(
            "Created account: {} ({})",
            user_id,
            email.unwrap_or("no email")
        );
        self.publish(StoreEvent::AccountChanged {
            account: account.clone(),
        });

        Ok(account)
    }

    pub fn set_plan(
        &self,
        user_id: &str,
        plan: SubscriptionPlan,
    ) -> Result<UserAccount, StoreError> {
        let conn = self.lock()?;

        let changed = conn.execute(
            "UPDATE accounts SET subscription_plan = ?1 WHERE id = ?2",
            params![plan.as_key(), user_id],
        )?;
        if changed == 0 {
            return Err(StoreError::AccountNotFound(user_id.to_string()));
        }

        let account = conn.query_row(SELECT_ACCOUNT, params![user_id], account_from_row)?;
        drop(conn);

        tracing::info!("Account {} moved to plan {}", user_id, plan);
        self.publish(StoreEvent::AccountChanged {
            account: account.clone(),
        });

        Ok(account)
    }

    /// Record one generation against `period`, refusing when the counter has
    /// already reached `allotment`.
    ///
    /// The limit check and the increment are a single conditional UPDATE, so
    /// concurrent sessions can neither lose an increment nor overshoot the
    /// limit. A counter from an earlier period restarts at 1.
    ///
    /// Returns `Ok(None)` when the allotment is exhausted.
    pub fn record_generation(
        &self,
        user_id: &str,
        allotment: u32,
        period: &str,
    ) -> Result<Option<UserAccount>, StoreError> {
        let conn = self.lock()?;

        let changed = conn.execute(
            "UPDATE accounts
             SET tokens_used_this_month = CASE
                     WHEN usage_period = ?2 THEN tokens_used_this_month + 1
                     ELSE 1
                 END,
                 usage_period = ?2
             WHERE id = ?1
               AND ?3 > 0
               AND (usage_period IS NOT ?2 OR tokens_used_this_month < ?3)",
            params![user_id, period, allotment],
        )?;

        let account = conn
            .query_row(SELECT_ACCOUNT, params![user_id], account_from_row)
            .optional()?
            .ok_or_else(|| StoreError::AccountNotFound(user_id.to_string()))?;
        drop(conn);

        if changed == 0 {
            return Ok(None);
        }

        tracing::debug!(
            "Recorded generation for {}: {}/{}",
            user_id,
            account.tokens_used_this_month,
            allotment
        );
        self.publish(StoreEvent::AccountChanged {
            account: account.clone(),
        });

        Ok(Some(account))
    }

    pub fn save_artifact(&self, user_id: &str, new: NewArtifact) -> Result<Artifact, StoreError> {
        let artifact = Artifact::new(user_id, new);

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO artifacts (id, user_id, content, prompt, content_type, persona, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                artifact.id,
                artifact.user_id,
                artifact.content,
                artifact.prompt,
                artifact.content_type.label(),
                artifact.persona,
                timestamp(&artifact.created_at),
            ],
        )?;
        drop(conn);

        tracing::debug!("Saved artifact {} for {}", artifact.id, user_id);
        self.publish(StoreEvent::ArtifactSaved {
            artifact: artifact.clone(),
        });

        Ok(artifact)
    }

    /// Saved artifacts for a user, newest first.
    pub fn list_artifacts(&self, user_id: &str) -> Result<Vec<Artifact>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, content, prompt, content_type, persona, created_at
             FROM artifacts WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let artifacts = stmt
            .query_map(params![user_id], artifact_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(artifacts)
    }

    /// Delete an artifact owned by `user_id`. Returns false when no such
    /// artifact exists for that user.
    pub fn delete_artifact(&self, user_id: &str, artifact_id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM artifacts WHERE id = ?1 AND user_id = ?2",
            params![artifact_id, user_id],
        )?;
        drop(conn);

        if deleted == 0 {
            return Ok(false);
        }

        tracing::debug!("Deleted artifact {} for {}", artifact_id, user_id);
        self.publish(StoreEvent::ArtifactDeleted {
            user_id: user_id.to_string(),
            artifact_id: artifact_id.to_string(),
        });

        Ok(true)
    }
}

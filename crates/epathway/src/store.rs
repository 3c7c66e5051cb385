use std::path::Path;

use rusqlite::{Connection, params, params_from_iter};

use crate::types::{DevelopmentApplication, UpsertOutcome};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Persistence keyed by council reference.
pub trait Store {
    fn upsert(&mut self, record: &DevelopmentApplication) -> Result<UpsertOutcome, StoreError>;

    fn exists(&self, council_reference: &str) -> Result<bool, StoreError>;
}

/// What happens when a council reference is already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpsertPolicy {
    /// Keep the stored row untouched.
    #[default]
    Skip,
    /// Overwrite the stored row with the fresh record.
    Replace,
}

/// Optional columns present in the backing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCapabilities {
    pub comment_url: bool,
    pub on_notice: bool,
}

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS data (
    council_reference TEXT PRIMARY KEY,
    address TEXT,
    description TEXT,
    info_url TEXT,
    comment_url TEXT,
    date_scraped TEXT,
    date_received TEXT,
    on_notice_from TEXT,
    on_notice_to TEXT
)";

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    policy: UpsertPolicy,
    capabilities: StoreCapabilities,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>, policy: UpsertPolicy) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?, policy)
    }

    pub fn open_in_memory(policy: UpsertPolicy) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?, policy)
    }

    /// Creates the `data` table when absent and reads which optional columns
    /// an existing table carries.
    pub fn from_connection(conn: Connection, policy: UpsertPolicy) -> Result<Self, StoreError> {
        conn.execute_batch(CREATE_TABLE)?;

        let mut stmt = conn.prepare("PRAGMA table_info(data)")?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        stmt.finalize()?;

        let has = |name: &str| columns.iter().any(|c| c == name);
        let capabilities = StoreCapabilities {
            comment_url: has("comment_url"),
            on_notice: has("on_notice_from") && has("on_notice_to"),
        };
        log::debug!("Store capabilities: {:?}", capabilities);

        Ok(Self {
            conn,
            policy,
            capabilities,
        })
    }

    pub fn capabilities(&self) -> StoreCapabilities {
        self.capabilities
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM data", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn insert_sql(&self) -> String {
        let verb = match self.policy {
            UpsertPolicy::Skip => "INSERT OR IGNORE",
            UpsertPolicy::Replace => "INSERT OR REPLACE",
        };

        let mut columns = vec![
            "council_reference",
            "address",
            "description",
            "info_url",
            "date_scraped",
            "date_received",
        ];
        if self.capabilities.comment_url {
            columns.push("comment_url");
        }
        if self.capabilities.on_notice {
            columns.extend(["on_notice_from", "on_notice_to"]);
        }

        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{verb} INTO data ({}) VALUES ({placeholders})",
            columns.join(", ")
        )
    }

    fn values(&self, record: &DevelopmentApplication) -> Vec<Option<String>> {
        let mut values = vec![
            Some(record.council_reference.clone()),
            Some(record.address.clone()),
            Some(record.description.clone()),
            Some(record.information_url.clone()),
            Some(record.scrape_date_text()),
            Some(record.received_date_text()),
        ];
        if self.capabilities.comment_url {
            values.push(record.comment_url.clone());
        }
        if self.capabilities.on_notice {
            let iso = |d: chrono::NaiveDate| d.format("%Y-%m-%d").to_string();
            values.push(record.on_notice_from.map(iso));
            values.push(record.on_notice_to.map(iso));
        }
        values
    }
}

impl Store for SqliteStore {
    fn upsert(&mut self, record: &DevelopmentApplication) -> Result<UpsertOutcome, StoreError> {
        let existed = self.policy == UpsertPolicy::Replace
            && self.exists(&record.council_reference)?;

        let mut stmt = self.conn.prepare(&self.insert_sql())?;
        let changed = stmt.execute(params_from_iter(self.values(record)))?;
        stmt.finalize()?;

        Ok(match (self.policy, changed, existed) {
            (UpsertPolicy::Skip, 0, _) => UpsertOutcome::Skipped,
            (UpsertPolicy::Replace, _, true) => UpsertOutcome::Replaced,
            _ => UpsertOutcome::Inserted,
        })
    }

    fn exists(&self, council_reference: &str) -> Result<bool, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM data WHERE council_reference = ?1")?;
        let found = stmt.exists(params![council_reference])?;
        stmt.finalize()?;
        Ok(found)
    }
}

/// Keeps records in memory, in first-seen order, with the same upsert rules.
#[derive(Debug, Default)]
pub struct MemoryStore {
    policy: UpsertPolicy,
    records: Vec<DevelopmentApplication>,
}

impl MemoryStore {
    pub fn new(policy: UpsertPolicy) -> Self {
        Self {
            policy,
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[DevelopmentApplication] {
        &self.records
    }

    pub fn into_records(self) -> Vec<DevelopmentApplication> {
        self.records
    }
}

impl Store for MemoryStore {
    fn upsert(&mut self, record: &DevelopmentApplication) -> Result<UpsertOutcome, StoreError> {
        let existing = self
            .records
            .iter_mut()
            .find(|r| r.council_reference == record.council_reference);

        Ok(match (existing, self.policy) {
            (None, _) => {
                self.records.push(record.clone());
                UpsertOutcome::Inserted
            }
            (Some(_), UpsertPolicy::Skip) => UpsertOutcome::Skipped,
            (Some(stored), UpsertPolicy::Replace) => {
                *stored = record.clone();
                UpsertOutcome::Replaced
            }
        })
    }

    fn exists(&self, council_reference: &str) -> Result<bool, StoreError> {
        Ok(self
            .records
            .iter()
            .any(|r| r.council_reference == council_reference))
    }
}

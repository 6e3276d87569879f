use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Outcome of the last successful remote write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub revision: Option<String>,
    pub last_sync_time: DateTime<Utc>,
}

pub trait SyncStateRepository: Send + Sync {
    fn load(&self) -> Result<Option<SyncState>, InfraError>;
    fn save(&self, revision: Option<&str>, last_sync_time: DateTime<Utc>) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteSyncStateRepository {
    db_path: PathBuf,
}

impl SqliteSyncStateRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl SyncStateRepository for SqliteSyncStateRepository {
    fn load(&self) -> Result<Option<SyncState>, InfraError> {
        let connection = self.connect()?;
        let row: Option<(Option<String>, String)> = connection
            .query_row(
                "SELECT revision, last_sync_time FROM sync_state WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((revision, last_sync_time_raw)) = row else {
            return Ok(None);
        };

        let last_sync_time = DateTime::parse_from_rfc3339(&last_sync_time_raw)
            .map_err(|error| {
                InfraError::Parse(format!(
                    "invalid sync_state.last_sync_time '{last_sync_time_raw}': {error}"
                ))
            })?
            .with_timezone(&Utc);

        Ok(Some(SyncState {
            revision,
            last_sync_time,
        }))
    }

    fn save(&self, revision: Option<&str>, last_sync_time: DateTime<Utc>) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO sync_state (id, revision, last_sync_time)
             VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
               revision = excluded.revision,
               last_sync_time = excluded.last_sync_time",
            params![revision, last_sync_time.to_rfc3339()],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySyncStateRepository {
    state: Mutex<Option<SyncState>>,
}

impl SyncStateRepository for InMemorySyncStateRepository {
    fn load(&self) -> Result<Option<SyncState>, InfraError> {
        let state = self
            .state
            .lock()
            .map_err(|error| InfraError::InvalidState(format!("sync state lock poisoned: {error}")))?;
        Ok(state.clone())
    }

    fn save(&self, revision: Option<&str>, last_sync_time: DateTime<Utc>) -> Result<(), InfraError> {
        let mut state = self
            .state
            .lock()
            .map_err(|error| InfraError::InvalidState(format!("sync state lock poisoned: {error}")))?;
        *state = Some(SyncState {
            revision: revision.map(ToOwned::to_owned),
            last_sync_time,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::initialize_database;
    use std::fs;

    #[test]
    fn sqlite_repository_upserts_single_row() {
        let dir = std::env::temp_dir().join(format!("pomotato-sync-state-tests-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create temp dir");
        let db_path = dir.join("state.sqlite");
        initialize_database(&db_path).expect("initialize database");
        let repository = SqliteSyncStateRepository::new(&db_path);

        assert_eq!(repository.load().expect("load empty"), None);

        let first = DateTime::parse_from_rfc3339("2026-02-16T09:00:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc);
        repository.save(Some("sha-1"), first).expect("save first");
        let second = first + chrono::Duration::minutes(5);
        repository.save(Some("sha-2"), second).expect("save second");

        let loaded = repository.load().expect("load").expect("state present");
        assert_eq!(loaded.revision.as_deref(), Some("sha-2"));
        assert_eq!(loaded.last_sync_time, second);

        let _ = fs::remove_dir_all(&dir);
    }
}

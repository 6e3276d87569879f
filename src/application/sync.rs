use crate::domain::merge::reconcile;
use crate::domain::models::{PartialSnapshot, Snapshot, SyncConfig};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::local_repository::LocalRepository;
use crate::infrastructure::remote_file_client::{
    PutFileRequest, RemoteFileClient, RemoteFileLocation,
};
use crate::infrastructure::sync_state_repository::{SyncState, SyncStateRepository};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub tasks: usize,
    pub records: usize,
    pub revision: Option<String>,
    /// The remote file did not exist before this run.
    pub created: bool,
}

/// Resets the in-flight flag when the sync future completes or is dropped.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, InfraError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| InfraError::SyncInProgress)?;
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct SyncService<C, S>
where
    C: RemoteFileClient + ?Sized,
    S: SyncStateRepository,
{
    remote_client: Arc<C>,
    sync_state_repository: Arc<S>,
    local: LocalRepository,
    in_flight: AtomicBool,
    now_provider: NowProvider,
}

impl<C, S> SyncService<C, S>
where
    C: RemoteFileClient + ?Sized,
    S: SyncStateRepository,
{
    pub fn new(remote_client: Arc<C>, sync_state_repository: Arc<S>, local: LocalRepository) -> Self {
        Self {
            remote_client,
            sync_state_repository,
            local,
            in_flight: AtomicBool::new(false),
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn last_sync(&self) -> Result<Option<SyncState>, InfraError> {
        self.sync_state_repository.load()
    }

    /// Fetch, merge, store locally, then write back.
    ///
    /// The merged data is saved locally before the remote write, so a failed
    /// write still leaves the merge in place.
    pub async fn sync(&self, config: &SyncConfig) -> Result<SyncReport, InfraError> {
        let location = Self::validated_location(config)?;
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let remote_file = self.remote_client.get_file(&config.token, &location).await?;
        let (remote_snapshot, revision) = match remote_file {
            Some(file) => {
                let parsed = PartialSnapshot::parse(&file.content).map_err(InfraError::Parse)?;
                (Some(parsed), Some(file.revision))
            }
            None => (None, None),
        };
        let created = revision.is_none();

        let local_tasks = self.local.load_tasks()?;
        let local_records = self.local.load_records()?;
        let merged = reconcile(&local_tasks, &local_records, remote_snapshot.as_ref());
        self.local.save_tasks(&merged.tasks)?;
        self.local.save_records(&merged.records)?;
        tracing::info!(
            tasks = merged.tasks.len(),
            records = merged.records.len(),
            "merged remote snapshot into local store"
        );

        let snapshot = Snapshot {
            tasks: merged.tasks,
            records: merged.records,
            settings: self.local.load_settings()?.redacted(),
            exported_at: Some((self.now_provider)()),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        };
        let new_revision = self.write_snapshot(config, &location, &snapshot, revision).await?;

        Ok(SyncReport {
            tasks: snapshot.tasks.len(),
            records: snapshot.records.len(),
            revision: new_revision,
            created,
        })
    }

    /// Replace the remote file with the local snapshot.
    pub async fn upload(&self, config: &SyncConfig) -> Result<SyncReport, InfraError> {
        let location = Self::validated_location(config)?;
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let revision = self
            .remote_client
            .get_file(&config.token, &location)
            .await?
            .map(|file| file.revision);
        let created = revision.is_none();

        let snapshot = self.local.export_snapshot((self.now_provider)())?;
        let new_revision = self.write_snapshot(config, &location, &snapshot, revision).await?;

        Ok(SyncReport {
            tasks: snapshot.tasks.len(),
            records: snapshot.records.len(),
            revision: new_revision,
            created,
        })
    }

    /// Replace local collections with the ones present in the remote file.
    pub async fn download(&self, config: &SyncConfig) -> Result<SyncReport, InfraError> {
        let location = Self::validated_location(config)?;
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let file = self
            .remote_client
            .get_file(&config.token, &location)
            .await?
            .ok_or_else(|| InfraError::RemoteNotFound("no remote data to download".to_string()))?;
        let snapshot = PartialSnapshot::parse(&file.content).map_err(InfraError::Parse)?;
        self.local.import_snapshot(&snapshot)?;

        Ok(SyncReport {
            tasks: snapshot.tasks.as_ref().map_or(0, Vec::len),
            records: snapshot.records.as_ref().map_or(0, Vec::len),
            revision: Some(file.revision),
            created: false,
        })
    }

    fn validated_location(config: &SyncConfig) -> Result<RemoteFileLocation, InfraError> {
        let missing = config.missing_fields();
        if !missing.is_empty() {
            return Err(InfraError::SyncConfiguration(format!(
                "missing {}",
                missing.join(", ")
            )));
        }
        Ok(RemoteFileLocation::from_config(config))
    }

    async fn write_snapshot(
        &self,
        config: &SyncConfig,
        location: &RemoteFileLocation,
        snapshot: &Snapshot,
        revision: Option<String>,
    ) -> Result<Option<String>, InfraError> {
        let now = (self.now_provider)();
        let request = PutFileRequest {
            message: format!("Update pomodoro data - {}", now.to_rfc3339()),
            content: serde_json::to_string_pretty(snapshot)?,
            branch: location.branch.clone(),
            revision,
        };

        let response = self
            .remote_client
            .put_file(&config.token, location, request)
            .await?;
        if let Err(error) = self
            .sync_state_repository
            .save(response.revision.as_deref(), now)
        {
            tracing::warn!(error = %error, "remote snapshot written but sync state not recorded");
        }
        tracing::info!(
            path = %location.path,
            revision = response.revision.as_deref().unwrap_or("-"),
            "wrote remote snapshot"
        );
        Ok(response.revision)
    }
}

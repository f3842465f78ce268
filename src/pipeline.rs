use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use mongodb::bson::{Document, doc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};

use crate::atlas::{
    ArchiveCriteria, ArchiveRequest, ArchiveStatus, AtlasClient, AutoScaling, ClusterRequest,
    PartitionField, ProviderSettings,
};
use crate::config::ColdlineConfig;
use crate::error::{ColdlineError, ErrorClass, classify_db_error};
use crate::poll::{Probe, poll_until};
use crate::report::{RunReport, RunReportBuilder, archive_uri};
use crate::ui::StageProgress;
use crate::{dataset, normalize};

/// The five stages of a full run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ProvisionCluster,
    LoadDataset,
    NormalizeDates,
    ProvisionArchive,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::ProvisionCluster => write!(f, "PROVISION_CLUSTER"),
            Stage::LoadDataset => write!(f, "LOAD_DATASET"),
            Stage::NormalizeDates => write!(f, "NORMALIZE_DATES"),
            Stage::ProvisionArchive => write!(f, "PROVISION_ARCHIVE"),
            Stage::Report => write!(f, "REPORT"),
        }
    }
}

/// Generate a cluster name in the `edu-<millisecond timestamp>` convention.
pub fn generate_cluster_name() -> String {
    format!("edu-{}", Utc::now().timestamp_millis())
}

/// Build the create-cluster payload from the configured capacity/region.
pub(crate) fn cluster_request(config: &ColdlineConfig, name: &str) -> ClusterRequest {
    ClusterRequest {
        auto_scaling: AutoScaling {
            disk_gb_enabled: true,
        },
        backup_enabled: false,
        name: name.to_string(),
        provider_settings: ProviderSettings {
            provider_name: config.provider.clone(),
            instance_size_name: config.instance_size.clone(),
            region_name: config.region.clone(),
        },
    }
}

/// Build the online-archive payload: partitioned by student surname and
/// assignment, expiring completed documents by age.
pub(crate) fn archive_request(config: &ColdlineConfig) -> ArchiveRequest {
    ArchiveRequest {
        db_name: config.db_name.clone(),
        coll_name: config.collection.clone(),
        partition_fields: vec![
            PartitionField {
                field_name: "student_name.last".to_string(),
                order: 0,
            },
            PartitionField {
                field_name: "assignment_name".to_string(),
                order: 1,
            },
        ],
        criteria: ArchiveCriteria::date("date_completed", config.expire_after_days),
    }
}

/// Open a driver connection and ping it. A short server-selection timeout
/// keeps each probe bounded while the cluster is still provisioning.
async fn try_connect(uri: &str) -> Result<Client, mongodb::error::Error> {
    let mut options = ClientOptions::parse(uri).await?;
    options.server_selection_timeout = Some(Duration::from_secs(10));
    let client = Client::with_options(options)?;
    client.database("admin").run_command(doc! { "ping": 1 }).await?;
    Ok(client)
}

/// One probe of cluster readiness: readiness is connection success.
async fn cluster_probe(uri: &str) -> Probe<Client> {
    match try_connect(uri).await {
        Ok(client) => Probe::Ready(client),
        Err(err) => match classify_db_error(&err) {
            ErrorClass::Fatal => Probe::Failed(err.to_string()),
            ErrorClass::Retryable => Probe::Pending("waiting on cluster to load...".to_string()),
        },
    }
}

/// One probe of archive progress: the terminal condition is the presence
/// of a completed archive run in the status payload.
pub(crate) async fn archive_probe(
    atlas: &AtlasClient,
    group_id: &str,
    cluster_name: &str,
    archive_id: &str,
) -> Probe<ArchiveStatus> {
    match atlas.get_online_archive(group_id, cluster_name, archive_id).await {
        Ok(status) if status.has_completed_run() => Probe::Ready(status),
        Ok(status) => Probe::Pending(status.state),
        Err(err) => match err.class() {
            ErrorClass::Fatal => Probe::Failed(err.to_string()),
            ErrorClass::Retryable => Probe::Pending(format!("missed ({err})")),
        },
    }
}

/// Drives the five stages of a run in order. All credentials and tunables
/// come from the [`ColdlineConfig`] it holds; nothing is ambient.
pub struct Pipeline {
    atlas: AtlasClient,
    config: ColdlineConfig,
    verbose: bool,
}

impl Pipeline {
    pub fn new(config: ColdlineConfig, verbose: bool) -> Self {
        let atlas = AtlasClient::new(
            config.atlas_public_key.clone(),
            config.atlas_private_key.clone(),
        );
        Self {
            atlas,
            config,
            verbose,
        }
    }

    /// Create a pipeline with a pre-built Atlas client (useful for testing).
    pub fn with_atlas(atlas: AtlasClient, config: ColdlineConfig, verbose: bool) -> Self {
        Self {
            atlas,
            config,
            verbose,
        }
    }

    fn collection_of(&self, client: &Client) -> Collection<Document> {
        client
            .database(&self.config.db_name)
            .collection::<Document>(&self.config.collection)
    }

    /// Run the full pipeline and return the final accounting.
    pub async fn run(&self, data_path: &Path) -> Result<RunReport> {
        let cluster_name = generate_cluster_name();
        let mut record = RunReportBuilder::new(&cluster_name);
        let policy = self.config.poll_policy();

        // PROVISION_CLUSTER: submit, then poll until a connection succeeds.
        let stage_started = Utc::now();
        let progress = StageProgress::start(&Stage::ProvisionCluster.to_string(), &cluster_name)
            .verbose(self.verbose);
        self.atlas
            .create_cluster(&self.config.group_id, &cluster_request(&self.config, &cluster_name))
            .await?;
        let uri = self.config.cluster_uri(&cluster_name);
        let polled = match poll_until(
            &policy,
            |_attempt| {
                let uri = uri.clone();
                async move { cluster_probe(&uri).await }
            },
            |attempt, status| progress.waiting(attempt, status),
        )
        .await
        {
            Ok(polled) => polled,
            Err(err) => {
                progress.failed(&format!("cluster never became ready: {err}"));
                return Err(ColdlineError::Poll(err).into());
            }
        };
        let client = polled.value;
        record.cluster_polls(polled.attempts);
        record.stage_done(&Stage::ProvisionCluster.to_string(), stage_started);
        progress.done(&format!(
            "Cluster {cluster_name} ready ({} attempts, {}s)",
            polled.attempts,
            polled.elapsed.as_secs()
        ));

        // LOAD_DATASET: drop and bulk-insert the converted records.
        let stage_started = Utc::now();
        let progress = StageProgress::start(
            &Stage::LoadDataset.to_string(),
            &data_path.display().to_string(),
        )
        .verbose(self.verbose);
        let collection = self.collection_of(&client);
        let docs = dataset::load_grades(data_path)?;
        let loaded = dataset::replace_collection(&collection, docs).await?;
        record.docs_loaded(loaded);
        record.stage_done(&Stage::LoadDataset.to_string(), stage_started);
        progress.done(&format!("Inserted {loaded} documents"));

        // NORMALIZE_DATES: shift everything so max(date_completed) == yesterday.
        let stage_started = Utc::now();
        let progress =
            StageProgress::start(&Stage::NormalizeDates.to_string(), "shifting dates")
                .verbose(self.verbose);
        let modified = normalize::normalize_dates(&collection).await?;
        normalize::ensure_completed_index(&collection).await?;
        record.stage_done(&Stage::NormalizeDates.to_string(), stage_started);
        progress.done(&format!("Shifted dates on {modified} documents"));

        // PROVISION_ARCHIVE: submit, then poll until the first run completes.
        let stage_started = Utc::now();
        let count_before = collection.count_documents(doc! {}).await?;
        record.count_before_archive(count_before);
        let created = self
            .atlas
            .create_online_archive(&self.config.group_id, &cluster_name, &archive_request(&self.config))
            .await?;
        record.archive_id(&created.id);
        let progress = StageProgress::start(
            &Stage::ProvisionArchive.to_string(),
            &format!("archive {}", created.id),
        )
        .verbose(self.verbose);
        let archive_id = created.id.clone();
        let polled = match poll_until(
            &policy,
            |_attempt| {
                let atlas = self.atlas.clone();
                let group_id = self.config.group_id.clone();
                let cluster_name = cluster_name.clone();
                let archive_id = archive_id.clone();
                let collection = collection.clone();
                async move {
                    match archive_probe(&atlas, &group_id, &cluster_name, &archive_id).await {
                        Probe::Pending(state) => {
                            let count = match collection.count_documents(doc! {}).await {
                                Ok(count) => count.to_string(),
                                Err(_) => "?".to_string(),
                            };
                            Probe::Pending(format!("{state} / {count} in collection"))
                        }
                        other => other,
                    }
                }
            },
            |attempt, status| progress.waiting(attempt, status),
        )
        .await
        {
            Ok(polled) => polled,
            Err(err) => {
                progress.failed(&format!("archive run never completed: {err}"));
                return Err(ColdlineError::Poll(err).into());
            }
        };
        record.archive_polls(polled.attempts);
        record.stage_done(&Stage::ProvisionArchive.to_string(), stage_started);
        progress.done(&format!(
            "Archive {} completed its first run ({} attempts, {}s)",
            archive_id,
            polled.attempts,
            polled.elapsed.as_secs()
        ));

        // REPORT: count both sides of the archive boundary.
        let stage_started = Utc::now();
        let progress =
            StageProgress::start(&Stage::Report.to_string(), "counting documents")
                .verbose(self.verbose);
        let count_live = collection.count_documents(doc! {}).await?;
        let count_archived = self.count_archived(&cluster_name).await?;
        record.stage_done(&Stage::Report.to_string(), stage_started);
        progress.done(&format!(
            "Before: {count_before} / After: {count_live} / Archived: {count_archived}"
        ));

        Ok(record.finish(count_live, count_archived))
    }

    /// Load and normalize the dataset into an existing cluster.
    pub async fn load_existing(&self, cluster_name: &str, data_path: &Path) -> Result<()> {
        let uri = self.config.cluster_uri(cluster_name);
        let client = try_connect(&uri)
            .await
            .with_context(|| format!("failed to connect to cluster {cluster_name}"))?;
        let collection = self.collection_of(&client);

        let docs = dataset::load_grades(data_path)?;
        let loaded = dataset::replace_collection(&collection, docs).await?;
        let modified = normalize::normalize_dates(&collection).await?;
        normalize::ensure_completed_index(&collection).await?;

        println!("Inserted {loaded} documents, shifted dates on {modified}");
        Ok(())
    }

    /// Count live and archived documents of an existing cluster.
    pub async fn report_existing(&self, cluster_name: &str) -> Result<()> {
        let uri = self.config.cluster_uri(cluster_name);
        let client = try_connect(&uri)
            .await
            .with_context(|| format!("failed to connect to cluster {cluster_name}"))?;
        let count_live = self.collection_of(&client).count_documents(doc! {}).await?;
        let count_archived = self.count_archived(cluster_name).await?;

        println!("Live: {count_live}");
        println!("Archived: {count_archived}");
        Ok(())
    }

    /// Count documents through the archive-backed federated endpoint.
    async fn count_archived(&self, cluster_name: &str) -> Result<u64> {
        let metadata = self
            .atlas
            .get_cluster(&self.config.group_id, cluster_name)
            .await?;
        let online_archive = metadata
            .connection_strings
            .and_then(|strings| strings.online_archive)
            .context("cluster metadata has no online archive connection string")?;
        let uri = archive_uri(&online_archive, &self.config.driver_credentials);

        let archive_client = Client::with_uri_str(&uri).await?;
        let count = archive_client
            .database(&self.config.db_name)
            .collection::<Document>(&self.config.collection)
            .count_documents(doc! {})
            .await?;
        Ok(count)
    }
}

//! Backup run executor - drives one invocation end to end.
//!
//! A run validates its input, checks the declared Hadoop release against the
//! live NameNode, then takes each artifact through fetch, digest and archive
//! before starting on the next one. Downloads are strictly sequential so a
//! busy NameNode never sees more than one transfer from us. The first failure
//! aborts everything still queued.

pub mod artifact;
pub mod request;

use crate::archive;
use crate::config::Config;
use crate::fs::{backup_dir, edits};
use crate::namenode::protocol::{reconcile, HttpProtocolDetector, ProtocolDetector};
use crate::namenode::{NameNodeTarget, ProtocolGeneration, TxRange};
use crate::transfer::{build_client, Fetcher};
use crate::utils::{BackupError, Result};
use crate::verify;
use artifact::{ArtifactJob, BackupArtifact, RunReport};
use request::{Action, BackupRequest};
use std::fmt;
use tracing::{debug, error, info};

/// Where a run currently is. `Aborted` can follow any other stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ValidatingInput,
    ResolvingTarget,
    DetectingProtocol,
    FetchingFsimage,
    DiscoveringEditSegments,
    FetchingEdits,
    Archiving,
    Done,
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ValidatingInput => "validating input",
            Stage::ResolvingTarget => "resolving target",
            Stage::DetectingProtocol => "detecting protocol",
            Stage::FetchingFsimage => "fetching fsimage",
            Stage::DiscoveringEditSegments => "discovering edit segments",
            Stage::FetchingEdits => "fetching edits",
            Stage::Archiving => "archiving",
            Stage::Done => "done",
            Stage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Single-shot backup orchestrator
pub struct BackupRunner<D = HttpProtocolDetector> {
    config: Config,
    detector: D,
    fetcher: Fetcher,
    stage: Stage,
}

impl BackupRunner<HttpProtocolDetector> {
    /// Runner talking HTTP to the NameNode for both the probe and the downloads
    pub fn from_config(config: Config) -> Result<Self> {
        let client = build_client(&config)?;
        let detector = HttpProtocolDetector::new(
            client.clone(),
            config.namenode.status_page.clone(),
            config.probe_timeout(),
        );
        let fetcher = Fetcher::new(client, config.namenode.chunk_size);
        Ok(Self::new(config, detector, fetcher))
    }
}

impl<D: ProtocolDetector> BackupRunner<D> {
    pub fn new(config: Config, detector: D, fetcher: Fetcher) -> Self {
        Self {
            config,
            detector,
            fetcher,
            stage: Stage::ValidatingInput,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Execute one backup run. Any error leaves the runner in `Stage::Aborted`.
    pub async fn run(&mut self, request: &BackupRequest) -> Result<RunReport> {
        match self.execute(request).await {
            Ok(report) => {
                self.enter(Stage::Done);
                info!(
                    "Backup complete: {} artifact(s), {} bytes",
                    report.artifacts.len(),
                    report.total_bytes()
                );
                Ok(report)
            }
            Err(e) => {
                error!("Run aborted while {}: {}", self.stage, e);
                self.enter(Stage::Aborted);
                Err(e)
            }
        }
    }

    async fn execute(&mut self, request: &BackupRequest) -> Result<RunReport> {
        self.enter(Stage::ValidatingInput);
        let plan = request.validate()?;
        backup_dir::ensure_writable(&self.config.backup.dir)?;

        self.enter(Stage::ResolvingTarget);
        let target = plan.target;
        info!(
            "NameNode {} (declared {})",
            target.base_url(),
            target.generation()
        );

        self.enter(Stage::DetectingProtocol);
        let detection = self.detector.detect(&target).await;
        if !reconcile(target.generation().release(), &detection) {
            return Err(BackupError::ProtocolMismatch {
                declared: target.generation().release(),
                detected: detection,
            });
        }
        info!("Server reports {}", detection);

        let mut report = RunReport::default();
        for action in plan.actions {
            match action {
                Action::Fsimage => {
                    self.enter(Stage::FetchingFsimage);
                    let artifact = self.backup_one(&target, ArtifactJob::fsimage(&target)).await?;
                    report.artifacts.push(artifact);
                }
                Action::Edits(range) => {
                    let jobs = self.edits_jobs(&target, range)?;
                    for job in jobs {
                        self.enter(Stage::FetchingEdits);
                        let artifact = self.backup_one(&target, job).await?;
                        report.artifacts.push(artifact);
                    }
                }
            }
        }

        Ok(report)
    }

    /// Resolve the edits downloads for this run.
    ///
    /// Explicit ranges win. Without one, Gen1 asks for the current edits file
    /// and Gen2 looks at which segments were finalized recently on disk.
    fn edits_jobs(
        &mut self,
        target: &NameNodeTarget,
        range: Option<TxRange>,
    ) -> Result<Vec<ArtifactJob>> {
        match (range, target.generation()) {
            (Some(range), _) => Ok(vec![ArtifactJob::edits(target, Some(range))]),
            (None, ProtocolGeneration::Gen1) => Ok(vec![ArtifactJob::edits(target, None)]),
            (None, ProtocolGeneration::Gen2) => {
                self.enter(Stage::DiscoveringEditSegments);
                let dir = &self.config.edits.dir;
                let lookback_secs = self.config.edits.lookback_secs;

                let mut segments = edits::scan(dir, lookback_secs)?;
                if segments.is_empty() {
                    return Err(BackupError::NoEditSegments {
                        dir: dir.clone(),
                        lookback_secs,
                    });
                }
                segments.sort_by_key(|s| s.range.start);
                info!(
                    "Found {} edit segment(s) in {} modified in the last {}s",
                    segments.len(),
                    dir.display(),
                    lookback_secs
                );

                Ok(segments
                    .into_iter()
                    .map(|s| ArtifactJob::edits(target, Some(s.range)))
                    .collect())
            }
        }
    }

    /// Fetch, digest and archive one artifact.
    async fn backup_one(
        &mut self,
        target: &NameNodeTarget,
        job: ArtifactJob,
    ) -> Result<BackupArtifact> {
        let local_path = self
            .config
            .backup
            .dir
            .join(job.file_name(target.host(), &backup_dir::timestamp()));

        info!("Attempting to retrieve {} file from {}", job.kind, job.url);
        info!("Backup file will be written to {}", local_path.display());

        let bytes = self.fetcher.fetch(&job.url, &local_path).await.map_err(|e| {
            error!("Could not retrieve the {} file: {}", job.kind, e);
            e
        })?;
        info!("Downloaded {} bytes of {}", bytes, job.kind);

        let hash_path = local_path.clone();
        let content_hash = blocking(move || verify::hash_and_persist(&hash_path)).await?;
        let sidecar = verify::sidecar_path(&local_path);
        info!("Hash ({}) of file written to {}", content_hash, sidecar.display());

        self.enter(Stage::Archiving);
        let remove_originals = self.config.backup.remove_originals;
        let (archive_src, archive_sidecar) = (local_path.clone(), sidecar);
        let archive_path = blocking(move || {
            let out = archive::archive(&archive_src, &archive_sidecar)?;
            if remove_originals {
                archive::remove_originals(&archive_src, &archive_sidecar)?;
            }
            Ok(out)
        })
        .await
        .map_err(|e| match e {
            BackupError::Io(io) => BackupError::Archive(io.to_string()),
            other => other,
        })?;

        Ok(BackupArtifact {
            kind: job.kind,
            range: job.range,
            local_path,
            content_hash,
            source_url: job.url,
            archive_path,
            bytes,
        })
    }

    fn enter(&mut self, stage: Stage) {
        debug!("Stage: {} -> {}", self.stage, stage);
        self.stage = stage;
    }
}

/// Run blocking file work off the async executor.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BackupError::Io(std::io::Error::other(e)))?
        .map_err(BackupError::Io)
}

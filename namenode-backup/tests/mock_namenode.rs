//! End-to-end runs against an in-process mock NameNode.

use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use flate2::read::GzDecoder;
use futures_util::stream;
use namenode_backup::namenode::protocol::Detection;
use namenode_backup::utils::{FetchError, ScanError};
use namenode_backup::{ArtifactKind, BackupError, BackupRequest, BackupRunner, Config};
use sha1::{Digest, Sha1};
use std::fs;
use std::io::Read;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const HADOOP1_VERSION: &str = "1.0.4, r1393290";
const HADOOP2_VERSION: &str = "2.0.0-cdh4.3.0, r48a9315b342ca16de92fcc5be95ae3650629155a";

/// fsimage body sent as `chunks` pieces with a pause before each one after the first
#[derive(Debug, Clone, Copy)]
struct Drip {
    chunks: usize,
    chunk_len: usize,
    interval: Duration,
}

struct MockNameNode {
    version: &'static str,
    status_code: StatusCode,
    fsimage: Vec<u8>,
    drip: Option<Drip>,
    /// Query fragment answered with HTTP 500
    fail_on: Option<&'static str>,
    requests: Mutex<Vec<String>>,
}

impl MockNameNode {
    fn new(version: &'static str) -> Self {
        Self {
            version,
            status_code: StatusCode::OK,
            fsimage: Vec::new(),
            drip: None,
            fail_on: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn image_requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn status_page(State(nn): State<Arc<MockNameNode>>) -> impl IntoResponse {
    let page = format!(
        "<html><body><table><tr><td id=\"col1\">Version:</td><td>{}</td></tr></table></body></html>",
        nn.version
    );
    (nn.status_code, Html(page))
}

fn drip_body(drip: Drip) -> Body {
    let chunks = stream::unfold(0usize, move |sent| async move {
        if sent == drip.chunks {
            return None;
        }
        if sent > 0 {
            tokio::time::sleep(drip.interval).await;
        }
        let chunk = Bytes::from(vec![b'x'; drip.chunk_len]);
        Some((Ok::<_, std::io::Error>(chunk), sent + 1))
    });
    Body::from_stream(chunks)
}

async fn getimage(State(nn): State<Arc<MockNameNode>>, RawQuery(query): RawQuery) -> Response {
    let query = query.unwrap_or_default();
    nn.requests.lock().unwrap().push(query.clone());

    if let Some(fragment) = nn.fail_on {
        if query.contains(fragment) {
            return (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response();
        }
    }

    if query.starts_with("getimage=1") {
        match nn.drip {
            Some(drip) => Response::new(drip_body(drip)),
            None => nn.fsimage.clone().into_response(),
        }
    } else {
        format!("edits payload for {query}").into_response()
    }
}

async fn spawn(nn: Arc<MockNameNode>) -> SocketAddr {
    let app = Router::new()
        .route("/dfshealth.jsp", get(status_page))
        .route("/getimage", get(getimage))
        .with_state(nn);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config(backup_dir: &Path, edits_dir: &Path) -> Config {
    let mut config = Config::default();
    config.backup.dir = backup_dir.to_path_buf();
    config.edits.dir = edits_dir.to_path_buf();
    config.namenode.read_timeout_secs = 10;
    config.namenode.probe_timeout_secs = 10;
    config
}

fn backup_runner(backup_dir: &Path, edits_dir: &Path) -> BackupRunner {
    BackupRunner::from_config(config(backup_dir, edits_dir)).unwrap()
}

fn request(addr: SocketAddr, release: &str) -> BackupRequest {
    BackupRequest {
        ip: Some("127.0.0.1".to_string()),
        port: i64::from(addr.port()),
        release: release.to_string(),
        ..Default::default()
    }
}

fn touch_segment(dir: &Path, name: &str, age: Duration) {
    let path = dir.join(name);
    fs::write(&path, b"local segment").unwrap();
    fs::File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(SystemTime::now() - age)
        .unwrap();
}

fn archive_entries(archive: &Path) -> Vec<(String, Vec<u8>)> {
    let mut tar = tar::Archive::new(GzDecoder::new(fs::File::open(archive).unwrap()));
    tar.entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().to_string();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            (name, data)
        })
        .collect()
}

fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().to_string()
}

#[tokio::test]
async fn test_fsimage_backup_end_to_end() {
    let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let nn = Arc::new(MockNameNode {
        fsimage: payload.clone(),
        ..MockNameNode::new(HADOOP2_VERSION)
    });
    let addr = spawn(nn.clone()).await;

    let backup_dir = TempDir::new().unwrap();
    let mut runner = backup_runner(backup_dir.path(), backup_dir.path());
    let report = runner
        .run(&BackupRequest {
            get_image: true,
            ..request(addr, "2")
        })
        .await
        .unwrap();

    assert_eq!(nn.image_requests(), vec!["getimage=1&txid=latest".to_string()]);
    assert_eq!(report.artifacts.len(), 1);

    let artifact = &report.artifacts[0];
    assert_eq!(artifact.kind, ArtifactKind::Fsimage);
    assert_eq!(artifact.bytes, payload.len() as u64);
    assert!(file_name(&artifact.local_path).starts_with("fsimage-127.0.0.1-"));
    assert_eq!(
        artifact.source_url,
        format!("http://127.0.0.1:{}/getimage?getimage=1&txid=latest", addr.port())
    );

    let on_disk = fs::read(&artifact.local_path).unwrap();
    assert_eq!(on_disk.len(), payload.len());

    let expected = hex::encode(Sha1::digest(&payload));
    assert_eq!(artifact.content_hash, expected);
    let sidecar = fs::read_to_string(format!("{}.sha1", artifact.local_path.display())).unwrap();
    assert_eq!(sidecar, expected);

    let base = file_name(&artifact.local_path);
    let entries = archive_entries(&artifact.archive_path);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], (base.clone(), payload));
    assert_eq!(entries[1], (format!("{base}.sha1"), expected.into_bytes()));
}

#[tokio::test]
async fn test_remote_rejection_aborts_without_backup_file() {
    let nn = Arc::new(MockNameNode {
        fail_on: Some("getimage=1"),
        ..MockNameNode::new(HADOOP2_VERSION)
    });
    let addr = spawn(nn).await;

    let backup_dir = TempDir::new().unwrap();
    let mut runner = backup_runner(backup_dir.path(), backup_dir.path());
    let err = runner
        .run(&BackupRequest {
            get_image: true,
            get_edits: true,
            start_tx_id: Some(1),
            end_tx_id: Some(5),
            ..request(addr, "2")
        })
        .await
        .unwrap_err();

    match err {
        BackupError::Fetch(FetchError::RemoteRejected {
            status,
            body_excerpt,
        }) => {
            assert_eq!(status, 500);
            assert_eq!(body_excerpt, "internal error");
        }
        other => panic!("expected RemoteRejected, got {other:?}"),
    }
    assert!(dir_names(backup_dir.path()).is_empty());
}

#[tokio::test]
async fn test_gen2_edits_from_recent_segments() {
    let nn = Arc::new(MockNameNode::new(HADOOP2_VERSION));
    let addr = spawn(nn.clone()).await;

    let backup_dir = TempDir::new().unwrap();
    let edits_dir = TempDir::new().unwrap();
    touch_segment(edits_dir.path(), "edits_10-20", Duration::ZERO);
    touch_segment(edits_dir.path(), "edits_21-29", Duration::from_secs(60));
    touch_segment(edits_dir.path(), "edits_30-40", Duration::from_secs(2 * 86_400));
    touch_segment(edits_dir.path(), "edits_inprogress_41", Duration::ZERO);

    let mut runner = backup_runner(backup_dir.path(), edits_dir.path());
    let report = runner
        .run(&BackupRequest {
            get_edits: true,
            ..request(addr, "2")
        })
        .await
        .unwrap();

    assert_eq!(
        nn.image_requests(),
        vec![
            "getedit=1&startTxId=10&endTxId=20".to_string(),
            "getedit=1&startTxId=21&endTxId=29".to_string(),
        ]
    );
    assert_eq!(report.artifacts.len(), 2);
    assert!(file_name(&report.artifacts[0].local_path).starts_with("edits-10-20-127.0.0.1-"));
    assert!(file_name(&report.artifacts[1].local_path).starts_with("edits-21-29-127.0.0.1-"));
    assert_eq!(
        fs::read_to_string(&report.artifacts[1].local_path).unwrap(),
        "edits payload for getedit=1&startTxId=21&endTxId=29"
    );
    assert!(report.archives().all(|p| p.exists()));
}

#[tokio::test]
async fn test_segment_failure_stops_remaining_segments() {
    let nn = Arc::new(MockNameNode {
        fail_on: Some("startTxId=21"),
        ..MockNameNode::new(HADOOP2_VERSION)
    });
    let addr = spawn(nn.clone()).await;

    let backup_dir = TempDir::new().unwrap();
    let edits_dir = TempDir::new().unwrap();
    touch_segment(edits_dir.path(), "edits_10-20", Duration::ZERO);
    touch_segment(edits_dir.path(), "edits_21-29", Duration::ZERO);
    touch_segment(edits_dir.path(), "edits_30-35", Duration::ZERO);

    let mut runner = backup_runner(backup_dir.path(), edits_dir.path());
    let err = runner
        .run(&BackupRequest {
            get_edits: true,
            ..request(addr, "2")
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BackupError::Fetch(FetchError::RemoteRejected { status: 500, .. })
    ));
    let requests = nn.image_requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests.iter().any(|q| q.contains("startTxId=30")));

    // first segment completed fully; nothing of the failed one is left behind
    let names = dir_names(backup_dir.path());
    assert_eq!(names.len(), 3);
    assert!(names.iter().all(|n| n.starts_with("edits-10-20-")));
}

#[tokio::test]
async fn test_gen1_edits_uses_latest_endpoint() {
    let nn = Arc::new(MockNameNode::new(HADOOP1_VERSION));
    let addr = spawn(nn.clone()).await;

    let backup_dir = TempDir::new().unwrap();
    let mut runner = backup_runner(backup_dir.path(), backup_dir.path());
    let report = runner
        .run(&BackupRequest {
            get_image: true,
            get_edits: true,
            ..request(addr, "1")
        })
        .await
        .unwrap();

    assert_eq!(
        nn.image_requests(),
        vec!["getimage=1".to_string(), "getedit=1".to_string()]
    );
    assert_eq!(report.artifacts[1].kind, ArtifactKind::Edits);
    assert!(file_name(&report.artifacts[1].local_path).starts_with("edits-127.0.0.1-"));
}

#[tokio::test]
async fn test_gen1_explicit_range_stays_out_of_url() {
    let nn = Arc::new(MockNameNode::new(HADOOP1_VERSION));
    let addr = spawn(nn.clone()).await;

    let backup_dir = TempDir::new().unwrap();
    let mut runner = backup_runner(backup_dir.path(), backup_dir.path());
    let report = runner
        .run(&BackupRequest {
            get_edits: true,
            start_tx_id: Some(1),
            end_tx_id: Some(50),
            ..request(addr, "1.0")
        })
        .await
        .unwrap();

    assert_eq!(nn.image_requests(), vec!["getedit=1".to_string()]);
    assert!(file_name(&report.artifacts[0].local_path).starts_with("edits-1-50-127.0.0.1-"));
}

#[tokio::test]
async fn test_gen2_without_recent_segments_is_usage_error() {
    let nn = Arc::new(MockNameNode::new(HADOOP2_VERSION));
    let addr = spawn(nn.clone()).await;

    let backup_dir = TempDir::new().unwrap();
    let edits_dir = TempDir::new().unwrap();
    touch_segment(edits_dir.path(), "edits_30-40", Duration::from_secs(3 * 86_400));

    let mut runner = backup_runner(backup_dir.path(), edits_dir.path());
    let err = runner
        .run(&BackupRequest {
            get_edits: true,
            ..request(addr, "2")
        })
        .await
        .unwrap_err();

    assert!(matches!(err, BackupError::NoEditSegments { .. }));
    assert!(err.is_usage_error());
    assert!(nn.image_requests().is_empty());
}

#[tokio::test]
async fn test_negative_lookback_is_rejected() {
    let nn = Arc::new(MockNameNode::new(HADOOP2_VERSION));
    let addr = spawn(nn).await;

    let backup_dir = TempDir::new().unwrap();
    let mut config = config(backup_dir.path(), backup_dir.path());
    config.edits.lookback_secs = -1;

    let mut runner = BackupRunner::from_config(config).unwrap();
    let err = runner
        .run(&BackupRequest {
            get_edits: true,
            ..request(addr, "2")
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BackupError::Scan(ScanError::InvalidLookbackWindow(-1))
    ));
}

#[tokio::test]
async fn test_release_mismatch_blocks_transfer() {
    let nn = Arc::new(MockNameNode::new(HADOOP1_VERSION));
    let addr = spawn(nn.clone()).await;

    let backup_dir = TempDir::new().unwrap();
    let mut runner = backup_runner(backup_dir.path(), backup_dir.path());
    let err = runner
        .run(&BackupRequest {
            get_image: true,
            ..request(addr, "2")
        })
        .await
        .unwrap_err();

    match &err {
        BackupError::ProtocolMismatch { declared, detected } => {
            assert_eq!(*declared, 2);
            assert_eq!(detected.to_string(), "Apache Hadoop 1.0 (version 1.0.4)");
        }
        other => panic!("expected ProtocolMismatch, got {other:?}"),
    }
    assert!(nn.image_requests().is_empty());
    assert!(dir_names(backup_dir.path()).is_empty());
}

#[tokio::test]
async fn test_remove_originals_leaves_only_archive() {
    let nn = Arc::new(MockNameNode {
        fsimage: b"tiny image".to_vec(),
        ..MockNameNode::new(HADOOP2_VERSION)
    });
    let addr = spawn(nn).await;

    let backup_dir = TempDir::new().unwrap();
    let mut config = config(backup_dir.path(), backup_dir.path());
    config.backup.remove_originals = true;

    let mut runner = BackupRunner::from_config(config).unwrap();
    let report = runner
        .run(&BackupRequest {
            get_image: true,
            ..request(addr, "2")
        })
        .await
        .unwrap();

    let names = dir_names(backup_dir.path());
    assert_eq!(names.len(), 1);
    assert!(names[0].ends_with(".tar.gz"));
    assert_eq!(archive_entries(&report.artifacts[0].archive_path).len(), 2);
}

#[tokio::test]
async fn test_slow_download_survives_while_bytes_keep_arriving() {
    let drip = Drip {
        chunks: 8,
        chunk_len: 1024,
        interval: Duration::from_millis(300),
    };
    let nn = Arc::new(MockNameNode {
        drip: Some(drip),
        ..MockNameNode::new(HADOOP2_VERSION)
    });
    let addr = spawn(nn).await;

    // whole transfer takes ~2.1s, never idle for more than 0.3s
    let backup_dir = TempDir::new().unwrap();
    let mut config = config(backup_dir.path(), backup_dir.path());
    config.namenode.read_timeout_secs = 1;

    let mut runner = BackupRunner::from_config(config).unwrap();
    let report = runner
        .run(&BackupRequest {
            get_image: true,
            ..request(addr, "2")
        })
        .await
        .unwrap();

    assert_eq!(report.artifacts[0].bytes, 8 * 1024);
    assert_eq!(fs::read(&report.artifacts[0].local_path).unwrap().len(), 8 * 1024);
}

#[tokio::test]
async fn test_stalled_download_times_out() {
    let drip = Drip {
        chunks: 2,
        chunk_len: 1024,
        interval: Duration::from_secs(5),
    };
    let nn = Arc::new(MockNameNode {
        drip: Some(drip),
        ..MockNameNode::new(HADOOP2_VERSION)
    });
    let addr = spawn(nn).await;

    let backup_dir = TempDir::new().unwrap();
    let mut config = config(backup_dir.path(), backup_dir.path());
    config.namenode.read_timeout_secs = 1;

    let mut runner = BackupRunner::from_config(config).unwrap();
    let err = runner
        .run(&BackupRequest {
            get_image: true,
            ..request(addr, "2")
        })
        .await
        .unwrap_err();

    assert!(matches!(err, BackupError::Fetch(FetchError::Transport { .. })));
    assert!(dir_names(backup_dir.path()).is_empty());
}

#[tokio::test]
async fn test_failing_status_page_is_unknown_release() {
    for status_code in [StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR] {
        let nn = Arc::new(MockNameNode {
            status_code,
            ..MockNameNode::new(HADOOP2_VERSION)
        });
        let addr = spawn(nn.clone()).await;

        let backup_dir = TempDir::new().unwrap();
        let mut runner = backup_runner(backup_dir.path(), backup_dir.path());
        let err = runner
            .run(&BackupRequest {
                get_image: true,
                ..request(addr, "2")
            })
            .await
            .unwrap_err();

        assert!(
            matches!(
                err,
                BackupError::ProtocolMismatch {
                    declared: 2,
                    detected: Detection::Unknown,
                }
            ),
            "status page {status_code} gave {err:?}"
        );
        assert!(nn.image_requests().is_empty());
        assert!(dir_names(backup_dir.path()).is_empty());
    }
}

#[tokio::test]
async fn test_unreachable_status_page_is_unknown_release() {
    // grab a free port and release it so nothing is listening there
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backup_dir = TempDir::new().unwrap();
    let mut runner = backup_runner(backup_dir.path(), backup_dir.path());
    let err = runner
        .run(&BackupRequest {
            get_image: true,
            ..request(addr, "2")
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BackupError::ProtocolMismatch {
            detected: Detection::Unknown,
            ..
        }
    ));
    assert!(dir_names(backup_dir.path()).is_empty());
}

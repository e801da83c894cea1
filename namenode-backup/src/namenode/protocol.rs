//! Hadoop release detection from the NameNode web UI.
//!
//! The status page advertises the running version in a table row
//! (`Version:</td><td>2.0.0-cdh4.3.0, r48a9315...`). The leading major number
//! decides the protocol generation; anything else is `Unknown`, which never
//! reconciles with a declared release.

use super::{NameNodeTarget, ProtocolGeneration};
use regex::Regex;
use std::fmt;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of probing a NameNode for its release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    Known {
        generation: ProtocolGeneration,
        version: String,
    },
    Unknown,
}

impl Detection {
    pub fn generation(&self) -> Option<ProtocolGeneration> {
        match self {
            Detection::Known { generation, .. } => Some(*generation),
            Detection::Unknown => None,
        }
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Detection::Known {
                generation,
                version,
            } => write!(f, "{generation} (version {version})"),
            Detection::Unknown => write!(f, "an unrecognised release"),
        }
    }
}

/// Source of the live release of a NameNode.
pub trait ProtocolDetector {
    fn detect(&self, target: &NameNodeTarget) -> impl Future<Output = Detection> + Send;
}

/// Scrapes the NameNode status page over HTTP.
pub struct HttpProtocolDetector {
    client: reqwest::Client,
    status_page: String,
    timeout: Duration,
}

impl HttpProtocolDetector {
    /// `timeout` bounds the whole probe, body included.
    pub fn new(
        client: reqwest::Client,
        status_page: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            status_page: status_page.into(),
            timeout,
        }
    }

    fn status_url(&self, target: &NameNodeTarget) -> String {
        format!(
            "{}/{}",
            target.base_url(),
            self.status_page.trim_start_matches('/')
        )
    }
}

impl ProtocolDetector for HttpProtocolDetector {
    async fn detect(&self, target: &NameNodeTarget) -> Detection {
        let url = self.status_url(target);
        debug!("Probing NameNode release at {}", url);

        let response = match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                warn!("Status page {} answered HTTP {}", url, resp.status());
                return Detection::Unknown;
            }
            Err(e) => {
                warn!("Failed to fetch status page {}: {}", url, e);
                return Detection::Unknown;
            }
        };

        match response.text().await {
            Ok(page) => {
                let detection = parse_status_page(&page);
                if detection == Detection::Unknown {
                    warn!("No recognisable version marker on {}", url);
                }
                detection
            }
            Err(e) => {
                warn!("Failed to read status page {}: {}", url, e);
                Detection::Unknown
            }
        }
    }
}

fn version_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?i)Version:\s*</td>\s*<td[^>]*>\s*([^,<]+?)\s*[,<]").expect("static regex")
    })
}

fn major_minor() -> &'static Regex {
    static MAJOR: OnceLock<Regex> = OnceLock::new();
    MAJOR.get_or_init(|| Regex::new(r"^(\d+)\.\d").expect("static regex"))
}

/// Extract the advertised version from a status page body.
pub fn parse_status_page(page: &str) -> Detection {
    let Some(version) = version_marker()
        .captures(page)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
    else {
        return Detection::Unknown;
    };

    match classify_version(&version) {
        Some(generation) => Detection::Known {
            generation,
            version,
        },
        None => Detection::Unknown,
    }
}

/// "1.x" is Gen1, "2.x" is Gen2; other majors are not supported.
pub fn classify_version(version: &str) -> Option<ProtocolGeneration> {
    let major = major_minor()
        .captures(version.trim())?
        .get(1)?
        .as_str()
        .parse::<u8>()
        .ok()?;
    ProtocolGeneration::from_release(major)
}

/// Whether the release declared by the operator matches what the server runs.
pub fn reconcile(declared_release: u8, detected: &Detection) -> bool {
    match (ProtocolGeneration::from_release(declared_release), detected.generation()) {
        (Some(declared), Some(actual)) => declared == actual,
        _ => false,
    }
}

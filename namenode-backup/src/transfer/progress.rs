//! Byte-level progress reporting for checkpoint downloads.

use std::time::{Duration, Instant};

/// Progress of one download. The total is only known when the servlet sends
/// a `Content-Length`.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    total_bytes: Option<u64>,
    transferred_bytes: u64,
    started: Instant,
}

impl DownloadProgress {
    pub fn new(total_bytes: Option<u64>) -> Self {
        Self {
            total_bytes,
            transferred_bytes: 0,
            started: Instant::now(),
        }
    }

    pub fn update(&mut self, transferred_bytes: u64) {
        self.transferred_bytes = transferred_bytes;
    }

    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    pub fn percent_complete(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) | None => None,
            Some(total) => Some((self.transferred_bytes as f64 / total as f64) * 100.0),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Average speed in bytes per second
    pub fn average_speed(&self) -> u64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            (self.transferred_bytes as f64 / secs) as u64
        } else {
            0
        }
    }

    /// One log line, e.g. `1.50 MB of 3.00 MB downloaded (50.0%, 2.00 MB/s)`
    pub fn describe(&self) -> String {
        let speed = format_speed(self.average_speed());
        match (self.total_bytes, self.percent_complete()) {
            (Some(total), Some(pct)) => format!(
                "{} of {} downloaded ({:.1}%, {})",
                format_bytes(self.transferred_bytes),
                format_bytes(total),
                pct,
                speed
            ),
            _ => format!("{} downloaded ({})", format_bytes(self.transferred_bytes), speed),
        }
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

pub fn format_speed(bytes_per_second: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_second))
}

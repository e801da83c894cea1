//! Syntactic checks for NameNode addresses supplied on the command line.

use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::OnceLock;

const MAX_HOSTNAME_LEN: usize = 255;

fn label_pattern() -> &'static Regex {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    LABEL.get_or_init(|| Regex::new(r"(?i)^[a-z0-9-]{1,63}$").expect("static regex"))
}

/// True iff `candidate` is a dotted-decimal IPv4 address.
pub fn is_valid_ip_address(candidate: &str) -> bool {
    candidate.parse::<Ipv4Addr>().is_ok()
}

/// RFC 1123 hostname check: at most 255 characters, one optional trailing
/// dot, labels of 1-63 alphanumerics or hyphens that neither start nor end
/// with a hyphen.
pub fn is_valid_hostname(candidate: &str) -> bool {
    if candidate.len() > MAX_HOSTNAME_LEN {
        return false;
    }
    let hostname = candidate.strip_suffix('.').unwrap_or(candidate);

    hostname.split('.').all(|label| {
        label_pattern().is_match(label) && !label.starts_with('-') && !label.ends_with('-')
    })
}

/// Web UI ports are restricted to the unprivileged range, exclusive of 65535.
pub fn is_valid_port(candidate: i64) -> bool {
    candidate > 1023 && candidate < 65535
}

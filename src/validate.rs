//! Value parsers for command line input.
//!
//! Each parser accepts a raw string and hands it back unchanged (or parsed
//! into a number), never normalizing it. They double as `clap` value
//! parsers.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;

static HOST_ADDR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(([a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])\.)*([a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])$",
    )
    .expect("host address pattern")
});

static USER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z_]([a-z0-9_-]{0,31}|[a-z0-9_-]{0,30}\$)$").expect("user name pattern")
});

static MAC_ADDR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$").expect("mac address pattern")
});

/// DNS hostname grammar: dot separated labels of 1-63 alphanumerics or
/// hyphens, no label starting or ending with a hyphen. Dotted IPv4 fits.
pub fn host_addr(value: &str) -> Result<String, Error> {
    if HOST_ADDR.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(Error::invalid("host address", value))
    }
}

/// POSIX user name, optionally ending in `$`.
pub fn user_name(value: &str) -> Result<String, Error> {
    if USER_NAME.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(Error::invalid("user name", value))
    }
}

pub fn mac_addr(value: &str) -> Result<String, Error> {
    if MAC_ADDR.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(Error::invalid("MAC address", value))
    }
}

/// Port in `1..=65535`.
pub fn port(value: &str) -> Result<u16, Error> {
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(Error::invalid("port", value)),
    }
}

/// Whole seconds, zero allowed.
pub fn seconds(value: &str) -> Result<u64, Error> {
    value
        .parse::<u64>()
        .map_err(|_| Error::invalid("number of seconds", value))
}

//! Destination keys, URIs and collision suffixing.

use chrono::{DateTime, Utc};

pub const OBJECT_URI_SCHEME: &str = "s3";

/// `prefix + file_name`, with a non-empty prefix forced to end in `/`.
pub fn destination_key(prefix: &str, file_name: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        format!("{prefix}{file_name}")
    } else {
        format!("{prefix}/{file_name}")
    }
}

pub fn destination_uri(bucket: &str, key: &str) -> String {
    format!("{OBJECT_URI_SCHEME}://{bucket}/{key}")
}

/// Inserts `__YYYYMMDD-HHMMSS` before the extension of the key's last segment.
///
/// Leading dots of the last segment are not treated as an extension separator,
/// so `in/.hidden` becomes `in/.hidden__<ts>`.
pub fn suffix_key(key: &str, now: DateTime<Utc>) -> String {
    let stamp = now.format("%Y%m%d-%H%M%S");
    let segment_start = key.rfind('/').map(|i| i + 1).unwrap_or(0);
    let segment = &key[segment_start..];
    let leading_dots = segment.len() - segment.trim_start_matches('.').len();

    match segment[leading_dots..].rfind('.') {
        Some(pos) => {
            let split = segment_start + leading_dots + pos;
            format!("{}__{}{}", &key[..split], stamp, &key[split..])
        }
        None => format!("{key}__{stamp}"),
    }
}

/// Remote path a transferred file is moved to when archiving.
pub fn archive_path(archive_dir: &str, file_name: &str) -> String {
    format!("{}/{}", archive_dir.trim_end_matches('/'), file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap()
    }

    #[test]
    fn key_normalizes_prefix() {
        assert_eq!(destination_key("in/", "a.csv"), "in/a.csv");
        assert_eq!(destination_key("in", "a.csv"), "in/a.csv");
        assert_eq!(destination_key("", "a.csv"), "a.csv");
    }

    #[test]
    fn uri_uses_object_scheme() {
        assert_eq!(
            destination_uri("b", "in/orders_2024.csv"),
            "s3://b/in/orders_2024.csv"
        );
    }

    #[test]
    fn suffix_goes_before_extension() {
        assert_eq!(
            suffix_key("in/orders.csv", at()),
            "in/orders__20240309-070501.csv"
        );
        assert_eq!(
            suffix_key("in/archive.tar.gz", at()),
            "in/archive.tar__20240309-070501.gz"
        );
    }

    #[test]
    fn suffix_without_extension_is_appended() {
        assert_eq!(suffix_key("in.d/README", at()), "in.d/README__20240309-070501");
        assert_eq!(suffix_key("in/.hidden", at()), "in/.hidden__20240309-070501");
    }

    #[test]
    fn archive_path_joins_once() {
        assert_eq!(archive_path("/archive/", "a.csv"), "/archive/a.csv");
        assert_eq!(archive_path("/", "a.csv"), "/a.csv");
    }
}

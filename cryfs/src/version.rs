//! Version constants and the dotted-version ordering used for the
//! filesystem format gating.

/// Format version of the filesystem layout (and of the config record).
/// Bumped when the on-disk format changes incompatibly.
pub const FILESYSTEM_FORMAT_VERSION: &str = "0.10";

/// Version string of this build, recorded in the config on create/open.
pub fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Numeric comparison of dotted version strings: `"0.9.2" < "0.10"`.
/// Components that fail to parse are treated as zero, missing components as
/// zero, so `"0.10" == "0.10.0"`.
pub fn is_older_than(lhs: &str, rhs: &str) -> bool {
    let lhs = parse(lhs);
    let rhs = parse(rhs);
    let len = lhs.len().max(rhs.len());
    for index in 0..len {
        let left = lhs.get(index).copied().unwrap_or(0);
        let right = rhs.get(index).copied().unwrap_or(0);
        if left != right {
            return left < right;
        }
    }
    false
}

fn parse(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|component| {
            component
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
                .parse()
                .unwrap_or(0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(is_older_than("0.9", "0.10"));
        assert!(is_older_than("0.9.2", "0.10"));
        assert!(is_older_than("0.10", "0.11"));
        assert!(is_older_than("0.10", "1.0"));
        assert!(!is_older_than("0.10", "0.10"));
        assert!(!is_older_than("0.10", "0.9"));
        assert!(!is_older_than("1.0", "0.10"));
    }

    #[test]
    fn missing_components_are_zero() {
        assert!(!is_older_than("0.10", "0.10.0"));
        assert!(!is_older_than("0.10.0", "0.10"));
        assert!(is_older_than("0.10", "0.10.1"));
    }

    #[test]
    fn prerelease_suffixes_compare_by_numeric_prefix() {
        assert!(is_older_than("0.9", "0.10-rc1"));
        assert!(!is_older_than("0.10-rc1", "0.10"));
    }

    #[test]
    fn format_version_is_not_newer_than_crate_version_scheme() {
        // Sanity: the constant parses as a dotted version.
        assert!(!is_older_than(FILESYSTEM_FORMAT_VERSION, "0.0"));
    }
}

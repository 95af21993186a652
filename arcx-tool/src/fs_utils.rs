use anyhow::{Context, Result, bail};

/// Checks `total` against a human readable limit such as `512Mi` or `2GB`.
///
/// Returns the parsed limit in bytes; `None` or `0` means unlimited.
pub fn check_size_limit(total: u64, max_size: Option<&str>) -> Result<Option<u64>> {
    let Some(limit_str) = max_size.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let limit = parse_size(limit_str)?;
    if limit > 0 && total > limit {
        bail!(SizeLimitExceeded {
            total,
            limit,
            limit_str: limit_str.to_string(),
        });
    }
    Ok((limit > 0).then_some(limit))
}

/// Raised when the inputs are larger than the configured maximum.
#[derive(Debug)]
pub struct SizeLimitExceeded {
    pub total: u64,
    pub limit: u64,
    pub limit_str: String,
}

impl std::fmt::Display for SizeLimitExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "total size {} bytes exceeds limit {} ({} bytes)",
            self.total, self.limit_str, self.limit
        )
    }
}

impl std::error::Error for SizeLimitExceeded {}

/// Unit suffixes understood by [`parse_size`], matched case-insensitively.
const SIZE_UNITS: [(&str, u64); 8] = [
    ("ki", 1 << 10),
    ("mi", 1 << 20),
    ("gi", 1 << 30),
    ("ti", 1 << 40),
    ("kb", 1_000),
    ("mb", 1_000_000),
    ("gb", 1_000_000_000),
    ("tb", 1_000_000_000_000),
];

/// Parses sizes like `512Mi`, `2.5GB` or a plain byte count.
pub fn parse_size(s: &str) -> Result<u64> {
    let lowered = s.trim().to_ascii_lowercase();
    let (number, multiplier) = SIZE_UNITS
        .iter()
        .find_map(|&(suffix, multiplier)| lowered.strip_suffix(suffix).map(|n| (n, multiplier)))
        .unwrap_or((lowered.as_str(), 1));

    let number: f64 = number
        .trim()
        .parse()
        .with_context(|| format!("Invalid size format: {s}"))?;
    if !number.is_finite() || number < 0.0 {
        bail!("Size must be a non-negative number: {s}");
    }

    Ok((number * multiplier as f64) as u64)
}

/// Formats a byte count with binary units, dropping a `.0` fraction.
pub fn encode_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    let exponent = bytes.checked_ilog2().map_or(0, |log| (log / 10) as usize).min(UNITS.len() - 1);
    let size = bytes as f64 / (1u64 << (10 * exponent)) as f64;

    if size.fract() == 0.0 {
        format!("{size:.0} {}", UNITS[exponent])
    } else {
        format!("{size:.1} {}", UNITS[exponent])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("10Mi").unwrap(), 10 * 1024 * 1024);
        assert_eq!(parse_size(" 2.5GB ").unwrap(), 2_500_000_000);
        assert_eq!(parse_size("500kb").unwrap(), 500_000);
        assert!(parse_size("lots").is_err());
        assert!(parse_size("-1Mi").is_err());
        assert!(parse_size("inf").is_err());
        assert_eq!(parse_size("1ti").unwrap(), 1 << 40);
    }

    #[test]
    fn encoded_sizes() {
        assert_eq!(encode_size(0), "0 B");
        assert_eq!(encode_size(512), "512 B");
        assert_eq!(encode_size(1024 * 1024), "1 MiB");
        assert_eq!(encode_size(1536), "1.5 KiB");
        assert_eq!(encode_size(3 * (1 << 30)), "3 GiB");
    }

    #[test]
    fn limits() {
        assert_eq!(check_size_limit(10, None).unwrap(), None);
        assert_eq!(check_size_limit(10, Some("0")).unwrap(), None);
        assert_eq!(check_size_limit(10, Some("1Ki")).unwrap(), Some(1024));

        let err = check_size_limit(2048, Some("1Ki")).unwrap_err();
        let exceeded = err.downcast_ref::<SizeLimitExceeded>().unwrap();
        assert_eq!(exceeded.limit, 1024);
    }
}

use anyhow::{Context, Result};
use arcx_lib::ArchiveFormat;
use chrono::{Datelike, Local, Timelike, Utc};
use rand::Rng;
use std::env;
use std::path::{MAIN_SEPARATOR, Path};

const DEFAULT_TEMPLATE: &str = "archive_%datetime%_%rand%";

/// Expands placeholders in the output name and fixes its extension.
///
/// An output that names a directory (an existing one, or anything ending in a
/// path separator) gets a generated `archive_<datetime>_<rand>` file inside it.
pub fn create_file_name(input: &str, format: ArchiveFormat) -> Result<String> {
    let input_path = Path::new(input);

    let is_dir = input.ends_with('/') || input.ends_with(MAIN_SEPARATOR) || input_path.is_dir();

    let (dir, template) = if is_dir {
        (input_path, DEFAULT_TEMPLATE.to_string())
    } else {
        let template = input_path
            .file_name()
            .context("Invalid file name in output path")?
            .to_string_lossy()
            .to_string();
        (input_path.parent().unwrap_or_else(|| Path::new("")), template)
    };

    let name = format.normalize_name(&expand_placeholders(&template));
    let full = dir.join(name);
    full.to_str()
        .map(str::to_string)
        .with_context(|| format!("Output path {full:?} is not valid UTF-8"))
}

/// Replaces `%placeholder%` tokens, case-insensitively.
pub fn expand_placeholders(template: &str) -> String {
    let now_utc = Utc::now();
    let now_local = Local::now();

    let pwd = env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "unknown".into());

    // Longer tokens first so %longrand% is not eaten by %rand%.
    let replacements = vec![
        ("%datetime%", now_utc.format("%Y-%m-%d_%H-%M-%S").to_string()),
        ("%longrand%", random_string(12)),
        ("%rand%", random_string(5)),
        ("%pwd%", pwd),
        ("%date%", now_utc.format("%Y-%m-%d").to_string()),
        ("%time%", now_utc.format("%H-%M-%S").to_string()),
        ("%hh%", format!("{:02}", now_utc.hour())),
        ("%mm%", format!("{:02}", now_utc.minute())),
        ("%ss%", format!("{:02}", now_utc.second())),
        ("%dd%", format!("{:02}", now_utc.day())),
        ("%ww%", now_utc.format("%a").to_string()),
        ("%yyyy%", format!("{:04}", now_utc.year())),
        ("%yy%", format!("{:02}", now_utc.year() % 100)),
        ("%ms%", format!("{:03}", now_utc.timestamp_subsec_millis())),
        ("%unix%", format!("{}", now_utc.timestamp())),
        ("%ltime%", now_local.format("%Y-%m-%d_%H-%M-%S").to_string()),
        ("%lh%", format!("{:02}", now_local.hour())),
        ("%ld%", format!("{:02}", now_local.day())),
    ];

    let mut name = template.to_string();
    for (pattern, value) in replacements {
        name = replace_case_insensitive(&name, pattern, &value);
    }
    name
}

/// Generates a random lowercase alphanumeric string.
fn random_string(len: usize) -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..CHARS.len());
            CHARS[idx] as char
        })
        .collect()
}

/// Replaces every ASCII case-insensitive match of `pattern`.
///
/// Only ASCII is folded, so byte offsets in the lowered copy line up with `s`.
fn replace_case_insensitive(s: &str, pattern: &str, replacement: &str) -> String {
    let lowered = s.to_ascii_lowercase();
    let needle = pattern.to_ascii_lowercase();

    let mut result = String::with_capacity(s.len());
    let mut last = 0;
    for (start, _) in lowered.match_indices(&needle) {
        result.push_str(&s[last..start]);
        result.push_str(replacement);
        last = start + needle.len();
    }
    result.push_str(&s[last..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_any_case() {
        assert_eq!(replace_case_insensitive("a%X%b%x%", "%x%", "-"), "a-b-");
        assert_eq!(replace_case_insensitive("plain", "%x%", "-"), "plain");
    }

    #[test]
    fn non_ascii_template_is_left_intact() {
        assert_eq!(replace_case_insensitive("ÄÖ_%x%", "%x%", "1"), "ÄÖ_1");
    }

    #[test]
    fn expands_known_placeholders() {
        let name = expand_placeholders("site_%YYYY%_%rand%_%longrand%");
        let parts: Vec<&str> = name.split('_').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[1].len(), 4);
        assert_eq!(parts[2].len(), 5);
        assert_eq!(parts[3].len(), 12);
        assert!(!name.contains('%'));
    }

    #[test]
    fn file_output_gets_extension() {
        assert_eq!(
            create_file_name("out/site.zip", ArchiveFormat::TarGz).unwrap(),
            "out/site.tar.gz"
        );
        assert_eq!(create_file_name("out", ArchiveFormat::Zip).unwrap(), "out.zip");
    }

    #[test]
    fn directory_output_gets_generated_name() {
        let tmp = tempfile::tempdir().unwrap();
        let name = create_file_name(tmp.path().to_str().unwrap(), ArchiveFormat::Zip).unwrap();
        let generated = Path::new(&name);
        assert_eq!(generated.parent().unwrap(), tmp.path());
        let file_name = generated.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with("archive_"));
        assert!(file_name.ends_with(".zip"));
    }
}

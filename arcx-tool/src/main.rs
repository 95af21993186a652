use anyhow::Context;
use arcx_lib::{ArchiveFormat, Config};
use clap::Parser;
use std::{collections::HashMap, env, fs, path::PathBuf};

mod fs_utils;
mod naming;
mod process;

use fs_utils::{SizeLimitExceeded, check_size_limit, encode_size};
use process::{plan_entries, write_archive};

#[derive(Parser, Debug)]
#[command(author, version, about = "Pack files and folders into zip or tar.gz archives", long_about = None)]
pub struct Cli {
    /// Output archive (file name or directory, placeholders like %datetime% allowed)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format [zip|tar]
    #[arg(short, long)]
    pub format: Option<String>,

    /// Dry run (just list entries and parameters)
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    pub dry: bool,

    /// Max total input size, e.g. 512Mi or 2GB (0 = unlimited)
    #[arg(short, long)]
    pub max_size: Option<String>,

    /// Nest directory entries under the directory's own name
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub include_root: bool,

    /// Generate YAML config to stdout
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub generate_yaml_config: bool,

    /// Files or directories to archive
    #[arg()]
    pub paths: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Step 1: Read environment
    let env_config = read_env();

    // Step 2: Read config file (if exists)
    let mut file_config = Config::default();
    if let Some(path) = cli.config.clone().or(env_config.config.clone()) {
        file_config = read_config_file(&path)?;
    }

    // Step 3: Merge configs: env < file < CLI
    let mut merged = merge_configs(env_config, file_config, cli_to_config(&cli));

    // Apply defaults for optional parameters
    if merged.format.is_none() {
        merged.format = Some(ArchiveFormat::default().to_string());
    }
    if merged.include_root.is_none() {
        merged.include_root = Some(false);
    }

    // Generate YAML config if requested
    if cli.generate_yaml_config {
        let yaml = serde_yaml::to_string(&merged)?;
        println!("{yaml}");
        return Ok(());
    }

    // Validate required fields (after merging all sources)
    if merged.output.as_deref().unwrap_or("").is_empty() {
        log::error!("output path (--output or config:output or ARCX_OUTPUT) is required");
        std::process::exit(2);
    }

    if merged.paths.as_ref().map(|p| p.is_empty()).unwrap_or(true) {
        log::error!(
            "at least one path must be provided (CLI argument, config:paths, or ARCX_PATHS)"
        );
        std::process::exit(3);
    }

    let format: ArchiveFormat = merged.format.as_deref().unwrap_or("zip").parse()?;
    let include_root = merged.include_root.unwrap_or(false);
    let paths: Vec<PathBuf> = merged
        .paths
        .iter()
        .flatten()
        .map(PathBuf::from)
        .collect();
    let output = naming::create_file_name(merged.output.as_deref().unwrap_or_default(), format)?;

    let plan = plan_entries(&paths, include_root)?;
    let total: u64 = plan.iter().map(|e| e.size).sum();

    if let Err(err) = check_size_limit(total, merged.max_size.as_deref()) {
        if err.downcast_ref::<SizeLimitExceeded>().is_some() {
            log::error!("{err}");
            std::process::exit(42);
        }
        return Err(err);
    }

    // Dry run: just list parameters and entries
    if merged.dry.unwrap_or(false) {
        println!("--- DRY RUN ---");
        println!("{}", serde_yaml::to_string(&merged)?);
        println!("Output: {output}");
        println!("Total files: {}", plan.len());
        println!("Total size: {}", encode_size(total));
        for entry in &plan {
            println!("  {} -> {}", entry.source.display(), entry.entry_name);
        }
        return Ok(());
    }

    let written = write_archive(format, &output, &paths, include_root)?;
    log::info!(
        "wrote {} ({} files, {} in)",
        written.display(),
        plan.len(),
        encode_size(total)
    );
    Ok(())
}

/// Reads environment variables prefixed with ARCX_
fn read_env() -> Config {
    let mut cfg = Config::default();
    let vars: HashMap<String, String> = env::vars().collect();

    macro_rules! get_env {
        ($key:expr) => {
            vars.get(&format!("ARCX_{}", $key)).cloned()
        };
    }

    fn truthy(v: String) -> bool {
        v == "true" || v == "1" || v.eq_ignore_ascii_case("yes")
    }

    cfg.output = get_env!("OUTPUT");
    cfg.config = get_env!("CONFIG");
    cfg.format = get_env!("FORMAT");
    cfg.max_size = get_env!("MAX_SIZE");
    cfg.dry = get_env!("DRY").map(truthy);
    cfg.include_root = get_env!("INCLUDE_ROOT").map(truthy);
    cfg.paths = get_env!("PATHS").map(|v| {
        v.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    });
    cfg
}

/// Reads YAML or JSON config from file
fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let content = fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
    let lower = path.to_lowercase();
    let cfg = if lower.ends_with(".json") {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    Ok(cfg)
}

/// Converts CLI struct into Config. Flags that were not given stay `None` so
/// they do not override the environment or the config file.
fn cli_to_config(cli: &Cli) -> Config {
    Config {
        output: cli.output.clone(),
        config: cli.config.clone(),
        format: cli.format.clone(),
        dry: cli.dry.then_some(true),
        max_size: cli.max_size.clone(),
        include_root: cli.include_root.then_some(true),
        paths: if cli.paths.is_empty() {
            None
        } else {
            Some(cli.paths.clone())
        },
    }
}

/// Merge configs by priority: env < file < cli
fn merge_configs(env: Config, file: Config, cli: Config) -> Config {
    fn pick<T: Clone>(env: Option<T>, file: Option<T>, cli: Option<T>) -> Option<T> {
        cli.or(file).or(env)
    }

    Config {
        output: pick(env.output, file.output, cli.output),
        config: pick(env.config, file.config, cli.config),
        format: pick(env.format, file.format, cli.format),
        dry: pick(env.dry, file.dry, cli.dry),
        max_size: pick(env.max_size, file.max_size, cli.max_size),
        include_root: pick(env.include_root, file.include_root, cli.include_root),
        paths: pick(env.paths, file.paths, cli.paths),
    }
}

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::document::{load_document, save_document};
use crate::multilib::multilibify;
use crate::uncleanup::{UncleanupRules, uncleanup};
use crate::variant::VariantTable;

#[derive(Parser)]
#[command(name = "flatpak-multilib")]
#[command(about = "Make flatpak-builder modules multilib")]
#[command(version)]
pub struct Cli {
    /// Undo cleanup rules that would remove headers, pkg-config and cmake files
    #[arg(short, long)]
    pub uncleanup: bool,

    /// Extra prefix regex of cleanup rules to undo (with --uncleanup)
    #[arg(long = "keep", value_name = "REGEX")]
    pub keep_patterns: Vec<String>,

    /// JSON/YAML file declaring the variants to expand into
    #[arg(long, value_name = "FILE")]
    pub variants: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Manifest to read (.json, .yml, .yaml, optionally with .in)
    pub source_manifest: PathBuf,

    /// Manifest to write (.json, .yml, .yaml)
    pub target_manifest: PathBuf,
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(&cli)
}

pub fn run(cli: &Cli) -> Result<()> {
    let table = match &cli.variants {
        Some(path) => VariantTable::load(path)
            .with_context(|| format!("Failed to load variant table from {}", path.display()))?,
        None => VariantTable::new(),
    };

    // Compile patterns before doing any work so a bad --keep fails fast
    let rules = if cli.uncleanup {
        let rules = UncleanupRules::with_patterns(cli.keep_patterns.as_slice())
            .context("Failed to compile cleanup patterns")?;
        Some(rules)
    } else {
        None
    };

    let manifest = load_document(&cli.source_manifest)
        .with_context(|| format!("Failed to load manifest {}", cli.source_manifest.display()))?;

    let (mut manifest, stats) = multilibify(manifest, &cli.source_manifest, &table)
        .with_context(|| format!("Failed to expand manifest {}", cli.source_manifest.display()))?;

    if let Some(rules) = &rules {
        let removed = uncleanup(&mut manifest, rules);
        tracing::info!("Removed {} cleanup rules", removed);
    }

    save_document(&manifest, &cli.target_manifest)
        .with_context(|| format!("Failed to write manifest {}", cli.target_manifest.display()))?;

    println!(
        "Generated multilib manifest: {} ({} modules)",
        cli.target_manifest.display(),
        stats.modules_emitted
    );

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "flatpak-multilib",
            "-u",
            "--keep",
            "/share/gir-1.0",
            "-vv",
            "in.yaml.in",
            "out.json",
        ])
        .unwrap();

        assert!(cli.uncleanup);
        assert_eq!(cli.keep_patterns, ["/share/gir-1.0"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.source_manifest, PathBuf::from("in.yaml.in"));
        assert_eq!(cli.target_manifest, PathBuf::from("out.json"));
        assert!(cli.variants.is_none());
    }

    #[test]
    fn test_requires_both_manifests() {
        assert!(Cli::try_parse_from(["flatpak-multilib", "in.json"]).is_err());
    }
}

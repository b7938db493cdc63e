//! shapecheck CLI
//!
//! Inspects declaration files and checks JSON instances against them.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use shapecheck::{CustomTypes, DeclarationParser, Marker, ReturnMode, Schema, ShapeConfig};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "shapecheck")]
#[command(about = "Check JSON instances against declaration files")]
struct Cli {
    /// Config file (defaults to shapecheck.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Extra type name, as NAME=Class (repeatable)
    #[arg(long = "custom", value_name = "NAME=CLASS")]
    custom: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the parsed field descriptors of a declaration
    Inspect {
        /// Declaration path (extension optional)
        declaration: String,
    },

    /// Check JSON instances against a declaration
    Check {
        /// Declaration path (extension optional)
        declaration: String,

        /// JSON files, or directories searched for *.json
        #[arg(required = true)]
        instances: Vec<PathBuf>,

        /// Output shape: boolean, value or all
        #[arg(short, long)]
        mode: Option<String>,

        /// Stop at the first invalid instance
        #[arg(long)]
        fail_fast: bool,
    },

    /// Print the effective configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = ShapeConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    let mut custom = config.custom_types();
    add_custom_flags(&mut custom, &cli.custom)?;
    let parser = DeclarationParser::new().with_custom_types(custom);
    let source = config.source();

    match cli.command {
        Commands::Inspect { declaration } => {
            let parsed = parser
                .parse_source(&source, &declaration)
                .with_context(|| format!("parsing {}", declaration))?;
            println!("{}", serde_json::to_string_pretty(&parsed.to_json())?);
            Ok(true)
        }

        Commands::Check {
            declaration,
            instances,
            mode,
            fail_fast,
        } => {
            let mut schema = parser
                .load_schema(&source, &declaration)
                .with_context(|| format!("loading {}", declaration))?;
            match mode {
                Some(mode) => schema.set_return_mode_str(&mode),
                None => schema.set_return_mode(config.validation.return_mode),
            };

            let files = collect_instances(&instances)?;
            if files.is_empty() {
                bail!("no JSON instances found");
            }

            let fail_fast = fail_fast || config.validation.fail_fast;
            let mut all_valid = true;
            for file in files {
                let valid = check_file(&schema, &file)?;
                all_valid &= valid;
                if !valid && fail_fast {
                    break;
                }
            }
            Ok(all_valid)
        }

        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(true)
        }
    }
}

fn add_custom_flags(custom: &mut CustomTypes, flags: &[String]) -> anyhow::Result<()> {
    for flag in flags {
        let (name, class) = flag
            .split_once('=')
            .with_context(|| format!("custom type `{}` must look like NAME=CLASS", flag))?;
        custom.insert(name.trim(), Marker::new(class.trim()));
    }
    Ok(())
}

fn collect_instances(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| p.is_file() && p.extension().map(|ext| ext == "json").unwrap_or(false))
                .collect();
            found.sort();
            files.extend(found);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            bail!("{} does not exist", path.display());
        }
    }
    Ok(files)
}

/// Check one file and print its result. Returns whether it is valid; in
/// value mode a file is valid when it could be checked at all.
fn check_file(schema: &Schema, path: &Path) -> anyhow::Result<bool> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let instance: serde_json::Value =
        serde_json::from_str(&content).with_context(|| format!("parsing JSON in {}", path.display()))?;

    match schema.check_json(&instance) {
        Ok(result) => {
            let valid = result.is_valid().unwrap_or(true);
            let marker = if valid { "✅" } else { "❌" };
            match schema.return_mode() {
                ReturnMode::Boolean => println!("{} {}", marker, path.display()),
                _ => println!("{} {} {}", marker, path.display(), result.to_json()),
            }
            Ok(valid)
        }
        Err(e) => {
            println!("❌ {} [{}] {}", path.display(), e.kind(), e);
            Ok(false)
        }
    }
}

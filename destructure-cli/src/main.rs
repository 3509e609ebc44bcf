//! Destructure CLI - converts a function's positional parameters into one destructured object

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Nothing is written unless the whole plan commits

use anyhow::Context;
use clap::{Parser, Subcommand};
use destructure_core::config;
use destructure_core::language::offset_at;
use destructure_core::review::ReviewRequest;
use destructure_core::{
    commit, convert, render_json, render_text, AcceptAll, ConvertOptions, ConvertRequest,
    Decision, DecisionProvider, FsEditSink, FsFileProvider, MemoryEditSink, Outcome, RejectAll,
};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Once;

#[derive(Parser)]
#[command(name = "destructure")]
#[command(
    about = "Convert a function's positional parameters into a destructured object and rewrite every call site"
)]
#[command(version = env!("DESTRUCTURE_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert the function at a position
    Convert {
        /// Position inside the target function: FILE, FILE:LINE or FILE:LINE:COL
        target: String,

        /// Byte offset inside FILE (instead of LINE:COL)
        #[arg(long)]
        offset: Option<usize>,

        /// Project root (default: nearest directory with .git, else the current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the plan without writing any file
        #[arg(long)]
        dry_run: bool,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Accept every REVIEW call without asking
        #[arg(long, conflicts_with = "reject_review")]
        yes: bool,

        /// Reject every REVIEW call without asking
        #[arg(long)]
        reject_review: bool,

        /// Annotate the object as `any` instead of keeping parameter types (overrides config file)
        #[arg(long)]
        no_preserve_types: bool,

        /// Bind the object to this name and destructure it in the body (overrides config file)
        #[arg(long)]
        object_variable: Option<String>,
    },
    /// Validate a configuration file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without converting anything
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

static TRACING_INIT: Once = Once::new();

/// Log to stderr when `RUST_LOG` is set
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(filter)
                .init();
        }
    });
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            target,
            offset,
            root,
            config: config_path,
            dry_run,
            format,
            yes,
            reject_review,
            no_preserve_types,
            object_variable,
        } => {
            let (file, line_col) = parse_target(&target);
            let file = if file.is_relative() {
                std::env::current_dir()?.join(&file)
            } else {
                file
            };
            if !file.is_file() {
                anyhow::bail!("File does not exist: {}", file.display());
            }

            let project_root = match root {
                Some(root) => root,
                None => find_repo_root(&file).or_else(|_| std::env::current_dir())?,
            };
            let project_root = project_root
                .canonicalize()
                .with_context(|| format!("failed to resolve {}", project_root.display()))?;
            let file = file
                .canonicalize()
                .with_context(|| format!("failed to resolve {}", file.display()))?;

            let resolved_config = config::load_and_resolve(&project_root, config_path.as_deref())
                .context("failed to load configuration")?;
            if let Some(config_path) = &resolved_config.config_path {
                eprintln!("Using config: {}", config_path.display());
            }

            // CLI flags override config file values
            let mut options = ConvertOptions::from_config(&resolved_config);
            if no_preserve_types {
                options.preserve_types = false;
            }
            if let Some(name) = object_variable {
                if !config::is_identifier(&name) {
                    anyhow::bail!("--object-variable must be an identifier, got '{}'", name);
                }
                options.object_variable = Some(name);
            }

            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let offset = match (offset, line_col) {
                (Some(offset), _) => offset,
                (None, Some((line, column))) => offset_at(&text, line, column)
                    .with_context(|| format!("{} has no line {}", file.display(), line))?,
                (None, None) => anyhow::bail!(
                    "a position is required: use FILE:LINE[:COL] or --offset"
                ),
            };

            let provider = FsFileProvider::new(&project_root, resolved_config);
            let request = ConvertRequest {
                file: provider.relative(&file),
                offset,
            };

            let mut decisions: Box<dyn DecisionProvider> = if yes {
                Box::new(AcceptAll)
            } else if reject_review {
                Box::new(RejectAll)
            } else {
                Box::new(TerminalDecisions)
            };

            let outcome = convert(&provider, decisions.as_mut(), &request, &options);
            let outcome = match (outcome, dry_run) {
                (Outcome::Plan(plan), false) => {
                    let mut sink = FsEditSink::new(&project_root);
                    match commit(&plan, &mut sink) {
                        Ok(()) => Outcome::Plan(plan),
                        Err(reason) => Outcome::Abort(reason),
                    }
                }
                (Outcome::Plan(plan), true) => {
                    // Prove the edit set applies cleanly without touching disk
                    let mut sink = MemoryEditSink::from_patches(&plan.edits);
                    match commit(&plan, &mut sink) {
                        Ok(()) => Outcome::Plan(plan),
                        Err(reason) => Outcome::Abort(reason),
                    }
                }
                (other, _) => other,
            };

            match format {
                OutputFormat::Text => print!("{}", render_text(&outcome)),
                OutputFormat::Json => println!("{}", render_json(&outcome)),
            }
            if dry_run && outcome.plan().is_some() {
                eprintln!("Dry run: no files were modified");
            }
            if outcome.abort().is_some() {
                std::process::exit(1);
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref());

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;

                println!("Configuration:");
                if let Some(ref p) = resolved.config_path {
                    println!("  Source: {}", p.display());
                } else {
                    println!("  Source: defaults (no config file found)");
                }
                println!();
                println!("Rewrite:");
                println!("  preserve_types: {}", resolved.preserve_types);
                println!(
                    "  object_variable_name: {}",
                    resolved
                        .object_variable_name
                        .as_deref()
                        .unwrap_or("none (inline destructuring)")
                );
                println!();
                println!("Filters:");
                println!(
                    "  include: {}",
                    if resolved.include.is_some() {
                        "custom patterns"
                    } else {
                        "all supported files"
                    }
                );
                println!("  exclude: {} pattern(s)", resolved.exclude.len());
            }
        },
    }

    Ok(())
}

/// Split `FILE[:LINE[:COL]]`
///
/// Trailing segments count only when they are numbers, so paths containing
/// colons still work.
fn parse_target(target: &str) -> (PathBuf, Option<(u32, u32)>) {
    let mut parts = target.rsplitn(3, ':');
    let last = parts.next().unwrap_or_default();
    let middle = parts.next();
    let first = parts.next();

    match (first, middle, last.parse::<u32>()) {
        (Some(file), Some(line), Ok(column)) => {
            if let Ok(line) = line.parse::<u32>() {
                return (PathBuf::from(file), Some((line, column)));
            }
            (
                PathBuf::from(format!("{}:{}", file, line)),
                Some((column, 1)),
            )
        }
        (None, Some(file), Ok(line)) => (PathBuf::from(file), Some((line, 1))),
        _ => (PathBuf::from(target), None),
    }
}

/// Asks each REVIEW question on the terminal
struct TerminalDecisions;

impl DecisionProvider for TerminalDecisions {
    fn review_candidate(&mut self, request: &ReviewRequest<'_>) -> Decision {
        let candidate = request.candidate;
        let reason = candidate.reason.map(|r| r.code()).unwrap_or("review");
        let mut stderr = std::io::stderr();
        let _ = writeln!(
            stderr,
            "\n[{}/{}] {} ({})\n  - {}\n  + {}",
            request.index,
            request.total,
            candidate.position,
            reason,
            request.original,
            request.replacement
        );

        let stdin = std::io::stdin();
        loop {
            let _ = write!(stderr, "Rewrite this call? [y]es / [n]o / [a]bort: ");
            let _ = stderr.flush();
            let mut answer = String::new();
            match stdin.lock().read_line(&mut answer) {
                Ok(0) | Err(_) => return Decision::AbortAll,
                Ok(_) => {}
            }
            match answer.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Decision::Accept,
                "n" | "no" => return Decision::Reject,
                "a" | "abort" => return Decision::AbortAll,
                _ => continue,
            }
        }
    }
}

/// Find the repository root by walking up from `start_path`
fn find_repo_root(start_path: &Path) -> anyhow::Result<PathBuf> {
    let mut current = if start_path.is_file() {
        start_path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("invalid file path"))?
            .to_path_buf()
    } else {
        start_path.to_path_buf()
    };

    loop {
        if current.join(".git").exists() {
            return Ok(current);
        }

        match current.parent() {
            Some(parent) => {
                current = parent.to_path_buf();
            }
            None => {
                anyhow::bail!("not in a git repository (no .git directory found)");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_forms() {
        assert_eq!(
            parse_target("src/api.ts:12:5"),
            (PathBuf::from("src/api.ts"), Some((12, 5)))
        );
        assert_eq!(
            parse_target("src/api.ts:12"),
            (PathBuf::from("src/api.ts"), Some((12, 1)))
        );
        assert_eq!(parse_target("src/api.ts"), (PathBuf::from("src/api.ts"), None));
    }
}

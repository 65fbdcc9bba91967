//! Gatehouse CLI - operator tooling for the tool-execution gateway.
//!
//! ## Commands
//!
//! - `vet`: run the gateway's sanitizers against a command, path, URL, or
//!   candidate secret file without executing anything
//! - `resources`: validate and list the protected-resource catalogue
//! - `audit`: read back the JSONL audit log
//! - `tiers`: print the action-tier ladder
//!
//! Exit status mirrors the verdict for `vet`: 0 safe, 1 rejected.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use gatehouse_core::{
    check_command, check_path, check_url, init_tracing, is_secret_file, ActionTier,
    JsonlAuditSink, ProtectedResourceSet, Verdict, VERSION,
};

#[derive(Parser)]
#[command(name = "gatehouse")]
#[command(author = "Gatehouse Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator tooling for the gatehouse tool-execution gateway", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a sanitizer against one input without executing anything
    #[command(subcommand)]
    Vet(VetCommands),

    /// Validate and list the protected-resource catalogue
    Resources {
        /// Resource config (TOML); merged over the built-in catalogue
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Read back the JSONL audit log
    Audit {
        /// Path to the audit log file
        #[arg(long)]
        log: PathBuf,

        /// Show only the last N records
        #[arg(long, default_value_t = 20)]
        last: usize,

        /// Verify record digests and report tampering
        #[arg(long)]
        verify: bool,
    },

    /// Print the action-tier ladder
    Tiers,
}

#[derive(Subcommand)]
enum VetCommands {
    /// Vet a shell command against the allow/deny lists
    Command {
        /// The command line to check
        cmd: String,

        /// Evaluate with an operator override active
        #[arg(long)]
        with_override: bool,
    },

    /// Vet a filesystem path
    Path {
        /// The path to check
        path: String,

        /// Confine the path to this root
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Vet a URL for outbound fetching
    Url {
        /// The URL to check
        url: String,
    },

    /// Check whether a path names secret material
    Secret {
        /// The path to check
        path: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Vet(vet) => run_vet(vet),
        Commands::Resources { config } => run_resources(config),
        Commands::Audit { log, last, verify } => run_audit(log, last, verify),
        Commands::Tiers => {
            print_tiers();
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn report(verdict: &Verdict) -> ExitCode {
    match verdict {
        Verdict::Safe => {
            println!("safe");
            ExitCode::SUCCESS
        }
        Verdict::Rejected { reason } => {
            println!("rejected: {reason}");
            ExitCode::FAILURE
        }
    }
}

fn run_vet(vet: VetCommands) -> Result<ExitCode> {
    let code = match vet {
        VetCommands::Command { cmd, with_override } => report(&check_command(&cmd, with_override)),
        VetCommands::Path { path, root } => {
            let check = check_path(&path, root.as_deref());
            if let Some(resolved) = &check.resolved {
                println!("resolved: {}", resolved.display());
            }
            report(&check.verdict)
        }
        VetCommands::Url { url } => report(&check_url(&url)),
        VetCommands::Secret { path } => {
            if is_secret_file(&path) {
                println!("secret: access would be blocked");
                ExitCode::FAILURE
            } else {
                println!("not a recognised secret file");
                ExitCode::SUCCESS
            }
        }
    };
    Ok(code)
}

fn run_resources(config: Option<PathBuf>) -> Result<ExitCode> {
    let set = match config {
        Some(path) => ProtectedResourceSet::load(&path)
            .with_context(|| format!("loading resource config {}", path.display()))?,
        None => ProtectedResourceSet::standard(),
    };

    println!("{} protected resource(s):", set.len());
    for resource in &set.resources {
        if resource.dependents.is_empty() {
            println!("  {:<8} {}", resource.kind.to_string(), resource.identifier);
        } else {
            println!(
                "  {:<8} {}  (required by: {})",
                resource.kind.to_string(),
                resource.identifier,
                resource.dependents.join(", ")
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_audit(log: PathBuf, last: usize, verify: bool) -> Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    runtime.block_on(async move {
        let sink = JsonlAuditSink::create(&log)
            .await
            .context("opening audit log")?;
        let records = sink.read_all().await.context("reading audit log")?;

        let mut tampered = 0usize;
        let start = records.len().saturating_sub(last);
        for record in &records[start..] {
            let mark = if verify && !record.verify_integrity() {
                tampered += 1;
                " [TAMPERED]"
            } else {
                ""
            };
            println!(
                "{} {} {:<8} {:<20} tier={} {}ms{}{}",
                record.timestamp.to_rfc3339(),
                record.call_id,
                record.outcome.to_string(),
                record.action,
                record.tier,
                record.duration_ms,
                record
                    .reason
                    .as_deref()
                    .map(|r| format!(" reason={r}"))
                    .unwrap_or_default(),
                mark,
            );
        }
        println!("{} record(s) total", records.len());

        if verify && tampered > 0 {
            println!("{tampered} record(s) failed digest verification");
            return Ok(ExitCode::FAILURE);
        }
        Ok(ExitCode::SUCCESS)
    })
}

fn print_tiers() {
    let tiers = [
        (ActionTier::Auto, "executes without confirmation"),
        (ActionTier::Confirm, "requires caller confirmation"),
        (
            ActionTier::DoubleConfirm,
            "requires a second, distinct confirmation round upstream",
        ),
        (
            ActionTier::KeywordElevated,
            "requires the out-of-band keyword approval",
        ),
        (ActionTier::Blocked, "never executes"),
    ];
    println!("gatehouse {VERSION} action tiers, least to most restrictive:");
    for (tier, description) in tiers {
        println!("  {:<16} {}", tier.to_string(), description);
    }
}

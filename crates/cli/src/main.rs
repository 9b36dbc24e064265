//! CLI for inspecting and editing permission grants.
//!
//! Online commands: load grant -> reconcile against registry -> (mutate -> save).
//! `replay` works offline on JSON files.
//!
//! Exit status: 0 on success, 1 when `check` denies, 2 on any error.

use clap::{Args, Parser, Subcommand};
use gatekeep_core::error::GatekeepResult;
use gatekeep_core::{ActionKey, ModuleDescriptor, PermissionGrant, Role};
use gatekeep_engine::{EditSession, JournalSink, MutationRecord, MutationRequest};
use gatekeep_provider::{HttpModuleRegistry, HttpPermissionStore};
use std::process::ExitCode;
use std::time::Duration;

const EXIT_DENIED: u8 = 1;
const EXIT_FAILURE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "gatekeep", version, about = "Module permission grant editor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Endpoints {
    #[arg(long, env = "GATEKEEP_REGISTRY_URL")]
    registry_url: String,

    #[arg(long, env = "GATEKEEP_STORE_URL")]
    store_url: String,

    /// Role whose module registry the grant is reconciled against.
    #[arg(long, default_value = "admin")]
    role: Role,

    #[arg(long, env = "GATEKEEP_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a principal's reconciled grant.
    Show {
        #[command(flatten)]
        endpoints: Endpoints,

        #[arg(short, long)]
        principal: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Set one action on a module or sub-module and save.
    Set {
        #[command(flatten)]
        endpoints: Endpoints,

        #[arg(short, long)]
        principal: String,

        #[arg(short, long)]
        module: String,

        #[arg(short, long)]
        sub: Option<String>,

        /// One of all, create, read, update, delete, print, export, approve.
        #[arg(short, long)]
        action: String,

        #[arg(long, action = clap::ArgAction::Set, required = true)]
        value: bool,

        /// Append the applied mutation to this NDJSON journal.
        #[arg(long)]
        journal: Option<String>,
    },

    /// Check one action. Exits 0 when allowed, 1 when denied, 2 on error.
    Check {
        #[command(flatten)]
        endpoints: Endpoints,

        #[arg(short, long)]
        principal: String,

        #[arg(short, long)]
        module: String,

        #[arg(short, long)]
        sub: Option<String>,

        #[arg(short, long)]
        action: String,
    },

    /// Replay an NDJSON journal onto a grant document, offline.
    Replay {
        /// Grant document (`{principalId, permissions}`).
        #[arg(long)]
        grant: String,

        #[arg(long)]
        journal: String,

        /// Registry snapshot (JSON array) used to seed new rows.
        #[arg(long)]
        registry: Option<String>,
    },
}

async fn open_session(
    endpoints: &Endpoints,
    principal: &str,
) -> Result<(EditSession, HttpPermissionStore), Box<dyn std::error::Error>> {
    let timeout = Duration::from_secs(endpoints.timeout_secs);
    let registry = HttpModuleRegistry::new(&endpoints.registry_url, timeout)?;
    let store = HttpPermissionStore::new(&endpoints.store_url, timeout)?;
    let session = EditSession::open(&registry, &store, principal, endpoints.role).await?;
    tracing::info!(
        principal,
        role = %session.role(),
        state = ?session.state(),
        "session open"
    );
    if session.is_degraded() {
        eprintln!("warning: module registry unavailable; showing stored rows only");
    }
    Ok((session, store))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

/// Replays a journal onto a stored grant document. The starting grant gets
/// the same validation and `all` repair an online session applies on load.
fn replay_offline(
    start: &PermissionGrant,
    registry: &[ModuleDescriptor],
    records: &[MutationRecord],
) -> GatekeepResult<PermissionGrant> {
    start.validate()?;
    let (start, repaired) = gatekeep_engine::normalize(start);
    if repaired > 0 {
        tracing::warn!(principal_id = %start.principal_id, repaired, "repaired inconsistent `all` flags");
    }
    gatekeep_engine::replay(&start, registry, records)
}

enum Outcome {
    Done,
    Denied,
}

fn exit_status<E>(result: &Result<Outcome, E>) -> u8 {
    match result {
        Ok(Outcome::Done) => 0,
        Ok(Outcome::Denied) => EXIT_DENIED,
        Err(_) => EXIT_FAILURE,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = run(cli).await;
    if let Err(e) = &result {
        eprintln!("error: {e}");
    }
    ExitCode::from(exit_status(&result))
}

async fn run(cli: Cli) -> Result<Outcome, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Show {
            endpoints,
            principal,
            json,
        } => {
            let (session, _) = open_session(&endpoints, &principal).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(session.grant())?);
            } else {
                print!(
                    "{}",
                    gatekeep_engine::render_grant(session.grant(), session.registry())
                );
            }
        }

        Commands::Set {
            endpoints,
            principal,
            module,
            sub,
            action,
            value,
            journal,
        } => {
            let (mut session, store) = open_session(&endpoints, &principal).await?;
            let request = MutationRequest {
                module,
                sub_module: sub,
                action,
                value,
            };
            session.apply_request(&request)?;
            session.save(&store).await?;

            if let Some(path) = journal {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)?;
                let mut sink = JournalSink::new(file);
                sink.write_session(&session)?;
                let n = sink.finish()?;
                tracing::info!(rows = n, path = %path, "journal appended");
            }

            print!(
                "{}",
                gatekeep_engine::render_grant(session.grant(), session.registry())
            );
        }

        Commands::Check {
            endpoints,
            principal,
            module,
            sub,
            action,
        } => {
            let key: ActionKey = action.parse()?;
            let (session, _) = open_session(&endpoints, &principal).await?;
            let allowed = session.is_allowed(&module, key, sub.as_deref());
            println!("{}", if allowed { "allowed" } else { "denied" });
            if !allowed {
                return Ok(Outcome::Denied);
            }
        }

        Commands::Replay {
            grant,
            journal,
            registry,
        } => {
            let start: PermissionGrant = read_json(&grant)?;
            let registry: Vec<ModuleDescriptor> = match registry {
                Some(path) => read_json(&path)?,
                None => Vec::new(),
            };

            let file = std::fs::File::open(&journal)?;
            let records = gatekeep_engine::read_journal(std::io::BufReader::new(file))?;
            let result = replay_offline(&start, &registry, &records)?;

            tracing::info!(records = records.len(), modules = result.len(), "replay complete");
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(Outcome::Done)
}

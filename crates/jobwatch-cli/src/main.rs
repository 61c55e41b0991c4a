//! Terminal client for the analysis backend: submit jobs, follow their
//! progress stream, inspect results and run admin maintenance.

mod config;
mod observability;
mod render;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use jobwatch_api::{ALL_JOBS, Access, AdminClient, JobsClient, Route, guard};
use jobwatch_stream::HttpEventSource;
use tracing::info;

use crate::config::{ClientSettings, admin_session};
use crate::observability::LogSettings;
use crate::watch::{WatchOutcome, watch_job};

#[derive(Parser)]
#[command(name = "jobwatch", version, about = "Submit and follow document-analysis jobs")]
struct Cli {
    /// Backend base URL (without `/api`).
    #[arg(long, env = "JOBWATCH_BASE_URL", default_value = jobwatch_api::DEFAULT_BASE_URL, global = true)]
    base_url: String,
    /// Log filter (`warn`, `debug`, `jobwatch_stream=debug`, ...).
    #[arg(long, env = "JOBWATCH_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,
    /// Write logs as JSON lines to this file instead of stderr.
    #[arg(long, env = "JOBWATCH_JSON_LOG_PATH", global = true)]
    log_json: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Queue an essay job for a Project Gutenberg book.
    Submit {
        gutenberg_id: u64,
        /// Follow the job's progress until it finishes.
        #[arg(long)]
        watch: bool,
    },
    /// Follow a job's progress stream until it finishes (Ctrl-C to stop).
    Watch { job_id: String },
    /// Show a job's current status.
    Status {
        job_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Print the essay produced by a succeeded job.
    Result {
        job_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Search the Gutenberg catalogue.
    Search { query: String },
    /// Admin maintenance (HTTP Basic credentials required).
    Admin {
        #[arg(long, env = "JOBWATCH_ADMIN_USER")]
        user: Option<String>,
        #[arg(long, env = "JOBWATCH_ADMIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand)]
enum AdminCommand {
    /// List ingested documents.
    Documents,
    /// List jobs with their documents.
    Jobs,
    /// List vector namespaces with no owning document.
    Orphans,
    DeleteOrphan { namespace: String },
    DeleteOrphans,
    DeleteSummary { document_id: String },
    DeleteVectors { document_id: String },
    DeleteDocument { document_id: String },
    DeleteJob { job_id: String },
    /// Delete jobs by status (`all` for every job).
    DeleteJobs {
        #[arg(long, default_value = ALL_JOBS)]
        status: String,
    },
    DeleteSummaries,
    DeleteAllVectors,
    /// Delete all vectors, summaries, jobs and artifacts.
    Nuke {
        #[arg(long)]
        yes: bool,
    },
}

impl Cli {
    fn log_settings(&self) -> LogSettings {
        LogSettings {
            filter: self.log_level.clone(),
            json_path: self.log_json.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    config::init_env();
    let cli = Cli::parse();
    let _log_guard = match observability::init_logging(&cli.log_settings()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings = ClientSettings::new(cli.base_url);
    match cli.command {
        Command::Submit {
            gutenberg_id,
            watch,
        } => {
            let jobs = JobsClient::new(settings.api())?;
            let job = jobs.create_job(gutenberg_id).await?;
            info!(event = "cli.job_submitted", domain = "cli", job_id = %job.id, gutenberg_id);
            println!("{}", job.id);
            if watch {
                return follow(&settings, &job.id).await;
            }
        }
        Command::Watch { job_id } => return follow(&settings, &job_id).await,
        Command::Status { job_id, json } => {
            let job = JobsClient::new(settings.api())?.job_status(&job_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&job)?);
            } else {
                println!("{}", render::status_summary(&job));
            }
        }
        Command::Result { job_id, json } => {
            let result = JobsClient::new(settings.api())?.job_result(&job_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", render::result_markdown(&result));
            }
        }
        Command::Search { query } => {
            let search = JobsClient::new(settings.api())?
                .search_gutenberg(&query)
                .await?;
            for book in &search.results {
                let authors = book
                    .authors
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                println!("{:>6}  {}  ({})", book.id, book.title, authors);
            }
            println!("{} result(s)", search.count);
        }
        Command::Admin {
            user,
            password,
            command,
        } => {
            let session = admin_session(user, password);
            if let Access::Redirect(route) = guard(&Route::Admin, session.as_ref()) {
                bail!(
                    "admin credentials required (set JOBWATCH_ADMIN_USER and JOBWATCH_ADMIN_PASSWORD; login view: {})",
                    route.path()
                );
            }
            let session = session.context("admin session missing after guard")?;
            let admin = AdminClient::new(settings.api(), session)?;
            run_admin(&admin, command).await?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn follow(settings: &ClientSettings, job_id: &str) -> anyhow::Result<ExitCode> {
    let source = Arc::new(HttpEventSource::new(settings.stream())?);
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let mut stdout = std::io::stdout();
    let outcome = watch_job(job_id, source, shutdown, &mut stdout).await?;
    if matches!(outcome, WatchOutcome::Interrupted(_)) {
        return Ok(ExitCode::from(130));
    }
    Ok(if render::succeeded(outcome.state()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_admin(admin: &AdminClient, command: AdminCommand) -> anyhow::Result<()> {
    match command {
        AdminCommand::Documents => {
            for doc in admin.list_documents().await? {
                println!(
                    "{}  {:<10} summary={:<5} {} / {}",
                    doc.id,
                    doc.ingest_status,
                    doc.has_summary,
                    doc.title.as_deref().unwrap_or("-"),
                    doc.author.as_deref().unwrap_or("-"),
                );
            }
        }
        AdminCommand::Jobs => {
            for job in admin.list_jobs().await? {
                println!(
                    "{}  {:<10} {}  {}",
                    job.id,
                    job.status,
                    job.created_at.as_deref().unwrap_or("-"),
                    job.title.as_deref().unwrap_or("-"),
                );
            }
        }
        AdminCommand::Orphans => {
            for ns in admin.list_orphan_namespaces().await? {
                println!("{}  {} vectors", ns.namespace, ns.vector_count);
            }
        }
        AdminCommand::DeleteOrphan { namespace } => {
            println!("deleted {}", admin.delete_orphan_namespace(&namespace).await?);
        }
        AdminCommand::DeleteOrphans => {
            println!("deleted {}", admin.bulk_delete_orphan_namespaces().await?);
        }
        AdminCommand::DeleteSummary { document_id } => {
            println!("ok={}", admin.delete_document_summary(&document_id).await?);
        }
        AdminCommand::DeleteVectors { document_id } => {
            println!("ok={}", admin.delete_document_vectors(&document_id).await?);
        }
        AdminCommand::DeleteDocument { document_id } => {
            println!("deleted {}", admin.delete_document(&document_id).await?);
        }
        AdminCommand::DeleteJob { job_id } => {
            println!("deleted {}", admin.delete_job(&job_id).await?);
        }
        AdminCommand::DeleteJobs { status } => {
            println!("deleted {}", admin.bulk_delete_jobs(&status).await?);
        }
        AdminCommand::DeleteSummaries => {
            println!("deleted {}", admin.bulk_delete_summaries().await?);
        }
        AdminCommand::DeleteAllVectors => {
            println!("deleted {}", admin.bulk_delete_vectors().await?);
        }
        AdminCommand::Nuke { yes } => {
            if !yes {
                bail!("refusing to wipe everything without --yes");
            }
            println!("ok={}", admin.bulk_nuke().await?);
        }
    }
    Ok(())
}

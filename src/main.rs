use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use factrail::extract::{oracle_candidates, pattern_candidates};
use factrail::models::{OverallStatus, PublishGate, SourceCatalog, SourceId};
use factrail::pipeline::{persist_record, LlmOracle, MockOracle, Pipeline, SemanticOracle};
use factrail::registry::ClaimRegistry;
use factrail::{ClaimId, FsEvidenceStore, RegistryError, VerifyConfig};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "factrail")]
#[command(about = "Verifies cited claims in a report against captured evidence")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full verification pipeline over a document
    Verify {
        /// Path to the finished document
        #[arg(short, long)]
        document: PathBuf,

        /// Workspace directory (sources.json, evidence/, registry.wal)
        #[arg(short, long)]
        workspace: PathBuf,

        /// Run every stage even after a failed one
        #[arg(long)]
        keep_going: bool,

        /// Never call the LLM oracle
        #[arg(long)]
        offline: bool,

        /// Lowest overall status the publish gate accepts
        #[arg(long, default_value = "VERIFIED")]
        min_status: String,
    },

    /// Extract claims from a captured source into the registry
    Extract {
        /// Source id, e.g. S001
        #[arg(short, long)]
        source: String,

        /// Workspace directory
        #[arg(short, long)]
        workspace: PathBuf,

        /// Never call the LLM oracle
        #[arg(long)]
        offline: bool,
    },

    /// Apply an administrative correction to a stored claim
    Correct {
        /// Claim id, e.g. C0012
        #[arg(short, long)]
        claim: String,

        /// Workspace directory
        #[arg(short, long)]
        workspace: PathBuf,

        /// Replacement claim text
        #[arg(short, long)]
        text: String,

        /// Audit note explaining the correction
        #[arg(short, long)]
        note: Option<String>,
    },
}

fn valid_api_key(key: &str) -> bool {
    let trimmed = key.trim();
    !trimmed.is_empty() && !trimmed.contains("...")
}

fn select_oracle(offline: bool) -> Arc<dyn SemanticOracle> {
    if offline {
        return Arc::new(MockOracle::default());
    }
    let api_key = env::var("OPENAI_API_KEY").ok();
    let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
    match api_key.as_deref() {
        Some(key) if valid_api_key(key) => Arc::new(LlmOracle::new(key, &model)),
        _ => {
            warn!("no usable OPENAI_API_KEY; oracle answers will be conservative non-matches");
            Arc::new(MockOracle::default())
        }
    }
}

fn open_workspace(
    workspace: &PathBuf,
) -> anyhow::Result<(SourceCatalog, Arc<FsEvidenceStore>, Arc<ClaimRegistry>)> {
    let catalog = SourceCatalog::load(workspace.join("sources.json"))
        .context("loading sources.json from workspace")?;
    let store = Arc::new(FsEvidenceStore::new(workspace.join("evidence")));
    let registry = Arc::new(ClaimRegistry::open(
        workspace.join("registry.wal"),
        Arc::clone(&store) as Arc<dyn factrail::EvidenceStore>,
    )?);
    Ok((catalog, store, registry))
}

async fn cmd_verify(
    document: PathBuf,
    workspace: PathBuf,
    keep_going: bool,
    offline: bool,
    min_status: String,
) -> anyhow::Result<ExitCode> {
    let text = fs::read_to_string(&document)
        .with_context(|| format!("reading document {}", document.display()))?;
    let (catalog, store, registry) = open_workspace(&workspace)?;

    let mut config = VerifyConfig::from_env();
    if keep_going {
        config.stop_on_fail = false;
    }

    let pipeline = Pipeline {
        catalog,
        store,
        registry,
        oracle: select_oracle(offline),
        config: Arc::new(config),
    };

    let record = pipeline.run(&text).await?;
    let path = persist_record(&record, workspace.join("records"))?;
    info!(record = %path.display(), chain = %record.chain_hash, "record written");

    for issue in &record.blocking_issues {
        error!(code = %issue.code, source = ?issue.source_id, "{}", issue.detail);
    }

    let min_status = parse_status(&min_status)?;
    let gate = PublishGate { min_status };
    println!("{}", record.overall);

    Ok(match record.overall {
        _ if gate.allow(record.overall) => ExitCode::SUCCESS,
        OverallStatus::NeedsReview => ExitCode::SUCCESS,
        OverallStatus::Incomplete => ExitCode::from(3),
        _ => ExitCode::from(2),
    })
}

async fn cmd_extract(source: String, workspace: PathBuf, offline: bool) -> anyhow::Result<ExitCode> {
    let source_id: SourceId = source
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid source id {source}"))?;
    let (_catalog, store, registry) = open_workspace(&workspace)?;
    let text = factrail::EvidenceStore::extracted_text(store.as_ref(), source_id)?;

    let mut candidates = pattern_candidates(source_id, &text);
    if !offline {
        let oracle = select_oracle(false);
        let config = VerifyConfig::from_env();
        match oracle_candidates(oracle.as_ref(), source_id, &text, config.oracle_timeout).await {
            Ok(mut extra) => candidates.append(&mut extra),
            Err(err) => warn!("oracle extraction skipped: {err}"),
        }
    }

    let (mut added, mut duplicate, mut rejected) = (0usize, 0usize, 0usize);
    for candidate in candidates {
        match registry.add_claim(candidate) {
            Ok(outcome) if outcome.is_duplicate() => duplicate += 1,
            Ok(_) => added += 1,
            Err(RegistryError::ExcerptNotFound { .. }) => rejected += 1,
            Err(err) => return Err(err.into()),
        }
    }
    info!(added, duplicate, rejected, "extraction finished for {source_id}");
    println!("added={added} duplicate={duplicate} rejected={rejected}");
    Ok(ExitCode::SUCCESS)
}

fn cmd_correct(
    claim: String,
    workspace: PathBuf,
    text: String,
    note: Option<String>,
) -> anyhow::Result<ExitCode> {
    let claim_id: ClaimId = claim
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid claim id {claim}"))?;
    let (_catalog, _store, registry) = open_workspace(&workspace)?;
    let corrected = registry.correct(factrail::registry::Correction {
        claim_id,
        corrected_text: text,
        note,
    })?;
    println!("{} corrected", corrected.id);
    Ok(ExitCode::SUCCESS)
}

fn parse_status(raw: &str) -> anyhow::Result<OverallStatus> {
    match raw.trim().to_uppercase().as_str() {
        "VERIFIED" => Ok(OverallStatus::Verified),
        "NEEDS_REVIEW" => Ok(OverallStatus::NeedsReview),
        "INCOMPLETE" => Ok(OverallStatus::Incomplete),
        "FAILED" => Ok(OverallStatus::Failed),
        other => Err(anyhow::anyhow!("unknown status {other}")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Verify {
            document,
            workspace,
            keep_going,
            offline,
            min_status,
        } => cmd_verify(document, workspace, keep_going, offline, min_status).await,
        Commands::Extract {
            source,
            workspace,
            offline,
        } => cmd_extract(source, workspace, offline).await,
        Commands::Correct {
            claim,
            workspace,
            text,
            note,
        } => cmd_correct(claim, workspace, text, note),
    }
}

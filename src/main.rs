//! fixwise: command-line front end for the triage workspace.
//!
//! Collections live under `~/FixWise` unless `--data-dir` is given. Output is
//! JSON on stdout; operator-facing errors go to stderr.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use fixwise_lib::config::{self, AnalysisConfig};
use fixwise_lib::models::{Feedback, FeedbackRating, ProcessingStatus};
use fixwise_lib::pipeline::diagnosis::{
    build_manual_diagnosis, DiagnosisOrchestrator, DiagnosisSubmission, GeminiClient, ImageData,
    ManualEntry,
};
use fixwise_lib::store::FileStore;
use fixwise_lib::workspace::{
    dashboard_summary, filter_history, logistics_query_url, new_knowledge_entry,
    search_knowledge, DashboardGranularity, HistoryTimeRange, TriageWorkspace,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const NO_TRACKING_MESSAGE: &str = "该记录没有物流单号。";

#[derive(Parser, Debug)]
#[command(name = "fixwise")]
#[command(about = "Product-support fault triage: AI diagnosis, repair tracking, expert knowledge")]
#[command(version)]
struct Cli {
    /// Directory holding the saved collections.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Diagnose a submission read as JSON from stdin and record it.
    Diagnose,
    /// Record an operator-entered case read as JSON from stdin.
    Manual,
    /// List history, newest first.
    History {
        query: Option<String>,
        #[arg(long, value_enum, default_value_t = RangeArg::All)]
        range: RangeArg,
        /// Only records from this calendar day (YYYY-MM-DD).
        #[arg(long, conflicts_with = "range")]
        day: Option<NaiveDate>,
    },
    /// Print one record.
    Show { id: String },
    /// Set the handling status of a record.
    Status {
        id: String,
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// Set or clear (when omitted) the operator remark.
    Remark { id: String, text: Option<String> },
    /// Set or clear (when omitted) the return tracking number.
    Track { id: String, number: Option<String> },
    /// Record the fault found after repair; omit to mark unverified.
    Actual { id: String, text: Option<String> },
    /// Rate the diagnosis.
    Feedback {
        id: String,
        #[arg(value_enum)]
        rating: RatingArg,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Print the courier lookup URL for a record's tracking number.
    Logistics { id: String },
    /// Expert knowledge base.
    Kb {
        #[command(subcommand)]
        command: KbCommands,
    },
    /// Dashboard aggregates for one calendar window.
    Stats {
        #[arg(value_enum, default_value_t = DashboardGranularity::Month)]
        granularity: DashboardGranularity,
        #[arg(long)]
        category: Option<String>,
        /// Reference day for the window (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand, Debug)]
enum KbCommands {
    /// Search by product, fault type or location.
    List { query: Option<String> },
    /// Add an entry, replacing one with the same product and fault type.
    Add {
        product: String,
        fault_type: String,
        #[arg(long, default_value = "")]
        cause: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "")]
        solution: String,
    },
    /// Change fields of an existing entry.
    Edit {
        id: String,
        #[arg(long)]
        product: Option<String>,
        #[arg(long)]
        fault_type: Option<String>,
        #[arg(long)]
        cause: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        solution: Option<String>,
    },
    Delete { id: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RangeArg {
    All,
    Week,
    Month,
    Year,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    Unprocessed,
    Processing,
    Processed,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RatingArg {
    Helpful,
    NotHelpful,
}

impl From<RangeArg> for HistoryTimeRange {
    fn from(range: RangeArg) -> Self {
        match range {
            RangeArg::All => Self::All,
            RangeArg::Week => Self::Week,
            RangeArg::Month => Self::Month,
            RangeArg::Year => Self::Year,
        }
    }
}

impl From<StatusArg> for ProcessingStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Unprocessed => Self::Unprocessed,
            StatusArg::Processing => Self::Processing,
            StatusArg::Processed => Self::Processed,
        }
    }
}

impl From<RatingArg> for FeedbackRating {
    fn from(rating: RatingArg) -> Self {
        match rating {
            RatingArg::Helpful => Self::Helpful,
            RatingArg::NotHelpful => Self::NotHelpful,
        }
    }
}

/// Stdin payload; the image may be given as a file path instead of inline.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StdinInput<T> {
    #[serde(flatten)]
    inner: T,
    #[serde(default)]
    image_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    fixwise_lib::init_tracing();

    match run(cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<String, BoxError> {
    let dir = cli.data_dir.unwrap_or_else(config::app_data_dir);
    let store = FileStore::open(dir)?;
    let mut workspace = TriageWorkspace::load(&store)?;

    let output = match cli.command {
        Commands::Diagnose => {
            let input: StdinInput<DiagnosisSubmission> = serde_json::from_str(&read_stdin()?)?;
            let mut submission = input.inner;
            attach_image(&mut submission.image, input.image_path)?;

            let analysis = AnalysisConfig::from_env()?;
            let client = GeminiClient::new(&analysis)?;
            tracing::info!(model = %client.model(), "Starting diagnosis");
            let orchestrator = DiagnosisOrchestrator::new(client);

            let diagnosis = orchestrator
                .diagnose(&submission, workspace.history(), workspace.knowledge())
                .await
                .map_err(|e| e.user_message())?;

            let output = to_json(&diagnosis)?;
            workspace.record_diagnosis(diagnosis);
            workspace.save(&store)?;
            output
        }
        Commands::Manual => {
            let input: StdinInput<ManualEntry> = serde_json::from_str(&read_stdin()?)?;
            let mut entry = input.inner;
            attach_image(&mut entry.image, input.image_path)?;

            let diagnosis = build_manual_diagnosis(&entry).map_err(|e| e.user_message())?;
            let output = to_json(&diagnosis)?;
            workspace.record_diagnosis(diagnosis);
            workspace.save(&store)?;
            output
        }
        Commands::History { query, range, day } => {
            let range = day.map_or_else(|| range.into(), HistoryTimeRange::Day);
            let query = query.unwrap_or_default();
            to_json(&filter_history(workspace.history(), &query, range, &Local::now()))?
        }
        Commands::Show { id } => match workspace.find(&id) {
            Some(record) => to_json(record)?,
            None => return Err(format!("Record not found: {id}").into()),
        },
        Commands::Status { id, status } => {
            let output = to_json(workspace.update_status(&id, status.into())?)?;
            workspace.save(&store)?;
            output
        }
        Commands::Remark { id, text } => {
            let output = to_json(workspace.update_remark(&id, text.as_deref().unwrap_or(""))?)?;
            workspace.save(&store)?;
            output
        }
        Commands::Track { id, number } => {
            let output =
                to_json(workspace.update_tracking(&id, number.as_deref().unwrap_or(""))?)?;
            workspace.save(&store)?;
            output
        }
        Commands::Actual { id, text } => {
            let output =
                to_json(workspace.update_actual_result(&id, text.as_deref().unwrap_or(""))?)?;
            workspace.save(&store)?;
            output
        }
        Commands::Feedback {
            id,
            rating,
            comment,
        } => {
            let feedback = Feedback {
                rating: rating.into(),
                comment: comment
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty()),
            };
            let output = to_json(workspace.set_feedback(&id, feedback)?)?;
            workspace.save(&store)?;
            output
        }
        Commands::Logistics { id } => {
            let record = workspace
                .find(&id)
                .ok_or_else(|| format!("Record not found: {id}"))?;
            record
                .tracking_number
                .as_deref()
                .and_then(logistics_query_url)
                .ok_or(NO_TRACKING_MESSAGE)?
        }
        Commands::Kb { command } => run_kb(command, &mut workspace, &store)?,
        Commands::Stats {
            granularity,
            category,
            date,
        } => {
            let reference = reference_time(date)?;
            let summary = dashboard_summary(
                workspace.history(),
                granularity,
                &reference,
                category.as_deref(),
            );
            to_json(&summary)?
        }
    };

    Ok(output)
}

fn run_kb(
    command: KbCommands,
    workspace: &mut TriageWorkspace,
    store: &FileStore,
) -> Result<String, BoxError> {
    let output = match command {
        KbCommands::List { query } => {
            let query = query.unwrap_or_default();
            return to_json(&search_knowledge(workspace.knowledge(), &query));
        }
        KbCommands::Add {
            product,
            fault_type,
            cause,
            location,
            solution,
        } => {
            let entry = new_knowledge_entry(&product, &fault_type, &cause, &location, &solution);
            let output = to_json(&entry)?;
            workspace.save_to_knowledge(entry)?;
            output
        }
        KbCommands::Edit {
            id,
            product,
            fault_type,
            cause,
            location,
            solution,
        } => {
            let mut entry = workspace
                .knowledge()
                .iter()
                .find(|k| k.id == id)
                .cloned()
                .ok_or_else(|| format!("Record not found: {id}"))?;
            let fields = [
                (&mut entry.product_name, product),
                (&mut entry.fault_type, fault_type),
                (&mut entry.cause, cause),
                (&mut entry.location, location),
                (&mut entry.solution, solution),
            ];
            for (field, value) in fields {
                if let Some(value) = value {
                    *field = value.trim().to_string();
                }
            }
            if entry.product_name.is_empty() || entry.fault_type.is_empty() {
                return Err("Knowledge entry needs a product name and fault type".into());
            }
            let output = to_json(&entry)?;
            workspace.update_knowledge(entry)?;
            output
        }
        KbCommands::Delete { id } => to_json(&workspace.delete_knowledge(&id)?)?,
    };

    workspace.save(store)?;
    Ok(output)
}

/// Local midnight of `date`, or now.
fn reference_time(date: Option<NaiveDate>) -> Result<DateTime<Local>, BoxError> {
    let Some(date) = date else {
        return Ok(Local::now());
    };
    date.and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest()
        .ok_or_else(|| format!("No local time for {date}").into())
}

fn attach_image(slot: &mut Option<ImageData>, path: Option<PathBuf>) -> Result<(), BoxError> {
    if let Some(path) = path {
        *slot = Some(ImageData::from_path(&path)?);
    }
    Ok(())
}

fn read_stdin() -> Result<String, BoxError> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    Ok(input)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, BoxError> {
    Ok(serde_json::to_string_pretty(value)?)
}

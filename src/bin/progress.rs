//! Progress CLI - Command-line interface for therapy-progress
//!
//! Commands:
//! - attention: Multi-session attention report over the most recent sessions
//! - summary: Per-session summaries as a given screen shows them
//! - progress: Independence rate across sessions
//! - billing: Billable hours for a day of meetings
//! - validate: Validate raw session payloads
//! - config: Print the effective configuration

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use serde::Serialize;
use therapy_progress::aggregate::MissingStimulusPolicy;
use therapy_progress::billing::{total_for_meetings, Meeting};
use therapy_progress::classify::{ClassifierFamily, RatioClassificationPolicy};
use therapy_progress::config::{CallSite, EngineConfig};
use therapy_progress::labels::Discipline;
use therapy_progress::progress::progress_series;
use therapy_progress::report::{ReportEncoder, SessionReport};
use therapy_progress::schema::{RawSession, SessionAdapter, ValidationError};
use therapy_progress::summary::AccuracyPolicy;
use therapy_progress::types::Session;
use therapy_progress::window::{DateRange, WindowAggregator, WindowFilters, WindowSize};
use therapy_progress::{ProgressError, ENGINE_VERSION};

/// Progress - attempt aggregation and status classification for therapy sessions
#[derive(Parser)]
#[command(name = "progress")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Aggregate therapy session attempts into progress reports", long_about = None)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flag the stimuli that need attention over the most recent sessions
    Attention {
        #[command(flatten)]
        input: InputArgs,

        /// Number of most recent sessions (1, 3 or 5)
        #[arg(long)]
        window_size: Option<u32>,

        /// Only sessions run by this therapist
        #[arg(long)]
        therapist: Option<String>,

        /// Only sessions of this program
        #[arg(long)]
        program: Option<String>,

        /// Only this stimulus
        #[arg(long)]
        stimulus: Option<String>,

        /// First session date to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last session date to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Therapy discipline used for display labels
        #[arg(long)]
        discipline: Option<DisciplineArg>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Summarize each session as a given screen shows it
    Summary {
        #[command(flatten)]
        input: InputArgs,

        /// Screen whose policies apply
        #[arg(long, default_value = "sessions-list")]
        call_site: CallSiteArg,

        /// Therapy discipline (selects labels and classifier family)
        #[arg(long)]
        discipline: Option<DisciplineArg>,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Independence rate across sessions, oldest first
    Progress {
        #[command(flatten)]
        input: InputArgs,

        /// Only this stimulus
        #[arg(long)]
        stimulus: Option<String>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Billable hours for a JSON array of {"start", "end"} meetings
    Billing {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate raw session payloads
    Validate {
        #[command(flatten)]
        input: InputArgs,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration and per-screen policies
    Config,
}

#[derive(Args)]
struct InputArgs {
    /// Input file path (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Input format
    #[arg(long, default_value = "json")]
    input_format: InputFormat,

    /// Handling of attempts without a stimulus id
    #[arg(long)]
    missing_stimulus: Option<MissingStimulusArg>,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one session per line)
    Ndjson,
    /// JSON array of sessions
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum DisciplineArg {
    SpeechTherapy,
    OccupationalTherapy,
    Physiotherapy,
    MusicTherapy,
}

impl From<DisciplineArg> for Discipline {
    fn from(arg: DisciplineArg) -> Self {
        match arg {
            DisciplineArg::SpeechTherapy => Discipline::SpeechTherapy,
            DisciplineArg::OccupationalTherapy => Discipline::OccupationalTherapy,
            DisciplineArg::Physiotherapy => Discipline::Physiotherapy,
            DisciplineArg::MusicTherapy => Discipline::MusicTherapy,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CallSiteArg {
    SessionRegistration,
    LastSessionPreview,
    SessionsList,
    AttentionReport,
}

impl From<CallSiteArg> for CallSite {
    fn from(arg: CallSiteArg) -> Self {
        match arg {
            CallSiteArg::SessionRegistration => CallSite::SessionRegistration,
            CallSiteArg::LastSessionPreview => CallSite::LastSessionPreview,
            CallSiteArg::SessionsList => CallSite::SessionsList,
            CallSiteArg::AttentionReport => CallSite::AttentionReport,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MissingStimulusArg {
    /// Fail the payload
    Reject,
    /// Skip the attempt
    Drop,
    /// Count under the "unknown" stimulus
    Bucket,
}

impl From<MissingStimulusArg> for MissingStimulusPolicy {
    fn from(arg: MissingStimulusArg) -> Self {
        match arg {
            MissingStimulusArg::Reject => MissingStimulusPolicy::Reject,
            MissingStimulusArg::Drop => MissingStimulusPolicy::Drop,
            MissingStimulusArg::Bucket => MissingStimulusPolicy::Bucket,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logging follows RUST_LOG; `--verbose` raises the level to debug
fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn run(cli: Cli) -> Result<(), ProgressCliError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Attention {
            input,
            window_size,
            therapist,
            program,
            stimulus,
            from,
            to,
            discipline,
            output_format,
        } => {
            let mut config = config;
            if let Some(size) = window_size {
                config.window_size = WindowSize::try_from(size)?;
            }
            if let Some(discipline) = discipline {
                config.discipline = discipline.into();
            }
            let date_range = match (from, to) {
                (None, None) => None,
                (from, to) => Some(DateRange { from, to }),
            };
            let filters = WindowFilters {
                stimulus_id: stimulus,
                therapist_id: therapist,
                program_id: program,
                date_range,
            };
            cmd_attention(&input, config, &filters, output_format)
        }

        Commands::Summary {
            input,
            call_site,
            discipline,
            output_format,
        } => {
            let mut config = config;
            if let Some(discipline) = discipline {
                config.discipline = discipline.into();
            }
            cmd_summary(&input, config, call_site.into(), output_format)
        }

        Commands::Progress {
            input,
            stimulus,
            output_format,
        } => cmd_progress(&input, config, stimulus.as_deref(), output_format),

        Commands::Billing { input, json } => cmd_billing(&input, json),

        Commands::Validate { input, json } => cmd_validate(&input, config, json),

        Commands::Config => cmd_config(&config),
    }
}

fn cmd_attention(
    input: &InputArgs,
    config: EngineConfig,
    filters: &WindowFilters,
    output_format: OutputFormat,
) -> Result<(), ProgressCliError> {
    let sessions = load_sessions(input, &config)?;

    let policy = config.ratio_policy_for(CallSite::AttentionReport);
    let window = WindowAggregator::with_policy(policy).aggregate_window(
        &sessions,
        config.window_size,
        filters,
    );
    let report =
        ReportEncoder::new().encode_attention(&window, config.discipline, config.window_size);

    print!("{}", format_output(&[report], &output_format)?);
    Ok(())
}

fn cmd_summary(
    input: &InputArgs,
    config: EngineConfig,
    site: CallSite,
    output_format: OutputFormat,
) -> Result<(), ProgressCliError> {
    let sessions = load_sessions(input, &config)?;

    let encoder = ReportEncoder::new();
    let reports: Vec<SessionReport> = sessions
        .iter()
        .map(|session| encoder.encode_session(session, &config, site))
        .collect();

    print!("{}", format_output(&reports, &output_format)?);
    Ok(())
}

fn cmd_progress(
    input: &InputArgs,
    config: EngineConfig,
    stimulus: Option<&str>,
    output_format: OutputFormat,
) -> Result<(), ProgressCliError> {
    let sessions = load_sessions(input, &config)?;

    let policy = config.accuracy_policy_for(CallSite::SessionsList);
    let series = progress_series(&sessions, policy, stimulus);
    let report = ReportEncoder::new().encode_progress(&series);

    print!("{}", format_output(&[report], &output_format)?);
    Ok(())
}

fn cmd_billing(input: &Path, json: bool) -> Result<(), ProgressCliError> {
    let meetings: Vec<Meeting> = serde_json::from_str(&read_input(input)?)?;
    let totals = total_for_meetings(&meetings)?;

    if json {
        let report = ReportEncoder::new().encode_billing(meetings.len(), totals);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Billing Report");
        println!("==============");
        println!("Meetings:         {}", meetings.len());
        println!("Minutes realized: {}", totals.minutes_realized);
        println!("Hours billed:     {}", totals.hours_billed);
    }

    Ok(())
}

fn cmd_validate(
    input: &InputArgs,
    config: EngineConfig,
    json: bool,
) -> Result<(), ProgressCliError> {
    let raw = parse_raw_sessions(input)?;
    let policy = input
        .missing_stimulus
        .map(MissingStimulusPolicy::from)
        .unwrap_or(config.missing_stimulus);

    let results = SessionAdapter::validate_sessions(&raw, policy);

    let mut invalid: Vec<usize> = results.iter().map(|r| r.session_index).collect();
    invalid.dedup();

    let report = ValidationReport {
        total_sessions: raw.len(),
        valid_sessions: raw.len() - invalid.len(),
        invalid_sessions: invalid.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                session_index: r.session_index,
                session_id: r.session_id.clone(),
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total sessions:   {}", report.total_sessions);
        println!("Valid sessions:   {}", report.valid_sessions);
        println!("Invalid sessions: {}", report.invalid_sessions);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Session {} (index {}): {}",
                    err.session_id, err.session_index, err.error
                );
            }
        }
    }

    if report.invalid_sessions > 0 {
        Err(ProgressCliError::ValidationFailed(report.invalid_sessions))
    } else {
        Ok(())
    }
}

fn cmd_config(config: &EngineConfig) -> Result<(), ProgressCliError> {
    let report = ConfigReport {
        config: config.clone(),
        call_sites: CallSite::ALL
            .iter()
            .map(|site| CallSitePolicies {
                call_site: *site,
                ratio_policy: config.ratio_policy_for(*site),
                accuracy_policy: config.accuracy_policy_for(*site),
                classifier_family: config.classifier_family_for(*site),
            })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<EngineConfig, ProgressCliError> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            log::debug!("Loaded configuration from {}", path.display());
            Ok(EngineConfig::from_json(&json)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, ProgressCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            log::info!("Reading from interactive stdin; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_raw_sessions(input: &InputArgs) -> Result<Vec<RawSession>, ProgressCliError> {
    let data = read_input(&input.input)?;
    let raw = match input.input_format {
        InputFormat::Ndjson => SessionAdapter::parse_ndjson(&data)?,
        InputFormat::Json => SessionAdapter::parse_array(&data)?,
    };
    Ok(raw)
}

fn load_sessions(input: &InputArgs, config: &EngineConfig) -> Result<Vec<Session>, ProgressCliError> {
    let raw = parse_raw_sessions(input)?;
    let policy = input
        .missing_stimulus
        .map(MissingStimulusPolicy::from)
        .unwrap_or(config.missing_stimulus);

    let sessions = SessionAdapter::to_sessions(&raw, policy)?;
    if sessions.is_empty() {
        log::warn!("No sessions in input");
    }
    Ok(sessions)
}

fn format_output<T: Serialize>(
    records: &[T],
    format: &OutputFormat,
) -> Result<String, ProgressCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in records {
                lines.push(serde_json::to_string(record)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(single_or_array(records, serde_json::to_string)? + "\n"),
        OutputFormat::JsonPretty => {
            Ok(single_or_array(records, serde_json::to_string_pretty)? + "\n")
        }
    }
}

/// Encode one record on its own, several as an array
fn single_or_array<T: Serialize>(
    records: &[T],
    encode: fn(&serde_json::Value) -> serde_json::Result<String>,
) -> Result<String, ProgressCliError> {
    let value = match records {
        [single] => serde_json::to_value(single)?,
        many => serde_json::to_value(many)?,
    };
    Ok(encode(&value)?)
}

// Error types

#[derive(Debug)]
enum ProgressCliError {
    Io(io::Error),
    Engine(ProgressError),
    Json(serde_json::Error),
    Validation(ValidationError),
    ValidationFailed(usize),
}

impl From<io::Error> for ProgressCliError {
    fn from(e: io::Error) -> Self {
        ProgressCliError::Io(e)
    }
}

impl From<ProgressError> for ProgressCliError {
    fn from(e: ProgressError) -> Self {
        match e {
            ProgressError::Validation(e) => ProgressCliError::Validation(e),
            other => ProgressCliError::Engine(other),
        }
    }
}

impl From<serde_json::Error> for ProgressCliError {
    fn from(e: serde_json::Error) -> Self {
        ProgressCliError::Json(e)
    }
}

impl From<ValidationError> for ProgressCliError {
    fn from(e: ValidationError) -> Self {
        ProgressCliError::Validation(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ProgressCliError> for CliError {
    fn from(e: ProgressCliError) -> Self {
        match e {
            ProgressCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ProgressCliError::Engine(ProgressError::ConfigError(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'progress config' to see the accepted fields".to_string()),
            },
            ProgressCliError::Engine(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input is a JSON array or NDJSON of session objects".to_string()),
            },
            ProgressCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ProgressCliError::Validation(e) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'progress validate' for details".to_string()),
            },
            ProgressCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} sessions failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct ValidationReport {
    total_sessions: usize,
    valid_sessions: usize,
    invalid_sessions: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(Serialize)]
struct ValidationErrorDetail {
    session_index: usize,
    session_id: String,
    error: String,
}

#[derive(Serialize)]
struct ConfigReport {
    config: EngineConfig,
    call_sites: Vec<CallSitePolicies>,
}

#[derive(Serialize)]
struct CallSitePolicies {
    call_site: CallSite,
    ratio_policy: RatioClassificationPolicy,
    accuracy_policy: AccuracyPolicy,
    classifier_family: ClassifierFamily,
}

//! Focus CLI - Command-line interface for Synheart Focus
//!
//! Commands:
//! - replay: Process a recorded event stream into a session report (batch mode)
//! - run: Process events from stdin and emit live status (streaming mode)
//! - validate: Validate tracker event schema
//! - doctor: Diagnose configuration and environment
//! - config: Print the effective tracker configuration
//! - schema: Print schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use synheart_focus::encoder::REPORT_VERSION;
use synheart_focus::pipeline::{EventOutcome, FocusProcessor};
use synheart_focus::schema::{TrackerEvent, TrackerEventAdapter, SCHEMA_VERSION};
use synheart_focus::types::FocusReport;
use synheart_focus::{
    replay_events, ConfigError, FocusError, FocusReportEncoder, TrackerConfig, FOCUS_VERSION,
    PRODUCER_NAME,
};

/// Focus - On-device attention estimation from facial landmarks
#[derive(Parser)]
#[command(name = "focus")]
#[command(author = "Synheart AI Inc")]
#[command(version = FOCUS_VERSION)]
#[command(about = "Estimate attention and question difficulty from landmark frames", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded event stream into a session report (batch mode)
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Tracker configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Threshold preset used when no config file is given
        #[arg(long, default_value = "default")]
        preset: Preset,
    },

    /// Process events from stdin and emit live status (streaming mode)
    Run {
        /// Tracker configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Threshold preset used when no config file is given
        #[arg(long, default_value = "default")]
        preset: Preset,

        /// Flush output after each record
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Validate tracker event schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a tracker configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective tracker configuration as TOML
    Config {
        /// Tracker configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Threshold preset used when no config file is given
        #[arg(long, default_value = "default")]
        preset: Preset,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Detect from the first character
    Auto,
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Single-line JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum Preset {
    Default,
    Strict,
    Lenient,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (focus.tracker_event.v1)
    Input,
    /// Output schema (focus.session_report.v1)
    Output,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

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

/// Log to stderr so stdout stays machine readable
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), FocusCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            input_format,
            output_format,
            config,
            preset,
        } => {
            let config = load_config(config.as_deref(), preset)?;
            cmd_replay(&input, &output, input_format, output_format, config)
        }
        Commands::Run {
            config,
            preset,
            flush,
        } => {
            let config = load_config(config.as_deref(), preset)?;
            cmd_run(config, flush)
        }
        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),
        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
        Commands::Config { config, preset } => {
            let config = load_config(config.as_deref(), preset)?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

/// Preset or config file, then `FOCUS_*` environment overrides
fn load_config(path: Option<&Path>, preset: Preset) -> Result<TrackerConfig, FocusCliError> {
    let mut config = match path {
        Some(path) => TrackerConfig::from_file(path)?,
        None => match preset {
            Preset::Default => TrackerConfig::default(),
            Preset::Strict => TrackerConfig::strict(),
            Preset::Lenient => TrackerConfig::lenient(),
        },
    };
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

fn read_input(input: &Path) -> Result<String, FocusCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_events(data: &str, format: InputFormat) -> Result<Vec<TrackerEvent>, FocusCliError> {
    let events = match format {
        InputFormat::Auto => TrackerEventAdapter::parse_auto(data)?,
        InputFormat::Ndjson => TrackerEventAdapter::parse_ndjson(data)?,
        InputFormat::Json => TrackerEventAdapter::parse_array(data)?,
    };
    Ok(events)
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: TrackerConfig,
) -> Result<(), FocusCliError> {
    let input_data = read_input(input)?;

    let events = parse_events(&input_data, input_format)?;
    if events.is_empty() {
        return Err(FocusCliError::NoEvents);
    }

    let report = replay_events(&events, config)?;

    let mut output_data = format_output(&report, &output_format)?;
    output_data.push('\n');
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_run(config: TrackerConfig, flush: bool) -> Result<(), FocusCliError> {
    let mut processor = FocusProcessor::with_config(config)?;
    let encoder = FocusReportEncoder::new();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut last_timestamp = None;

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let event: TrackerEvent = serde_json::from_str(trimmed)
            .map_err(|e| FocusCliError::ParseError(format!("Failed to parse event: {}", e)))?;
        event.validate()?;

        if !processor.is_tracking() {
            processor.start(event.timestamp_ms);
        }
        last_timestamp = Some(event.timestamp_ms);

        let record = match processor.process_event(&event)? {
            EventOutcome::Frame(_) => serde_json::to_string(&processor.status())?,
            EventOutcome::QuestionStarted(Some(closed)) | EventOutcome::QuestionEnded(Some(closed)) => {
                serde_json::to_string(&closed)?
            }
            EventOutcome::QuestionStarted(None) | EventOutcome::QuestionEnded(None) => continue,
        };

        writeln!(stdout, "{}", record)?;
        if flush {
            stdout.flush()?;
        }
    }

    // Final report once the stream ends
    if let Some(now) = last_timestamp {
        if let Some(summary) = processor.stop(now) {
            let report = encoder.encode(&summary);
            writeln!(stdout, "{}", serde_json::to_string(&report)?)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), FocusCliError> {
    let input_data = read_input(input)?;
    let events = parse_events(&input_data, input_format)?;

    let results = TrackerEventAdapter::validate_events(&events);

    let report = ValidationReport {
        total_events: events.len(),
        valid_events: events.len() - results.len(),
        invalid_events: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                event_id: r.event_id.clone(),
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total events:   {}", report.total_events);
        println!("Valid events:   {}", report.valid_events);
        println!("Invalid events: {}", report.invalid_events);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Event {} (index {}): {}",
                    err.event_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_events > 0 {
        Err(FocusCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), FocusCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "focus_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Focus version {}", FOCUS_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}, output: {}", SCHEMA_VERSION, REPORT_VERSION),
    });

    // Check config file if provided
    if let Some(config_path) = config {
        let check = if !config_path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist; defaults will be used".to_string(),
            }
        } else {
            match TrackerConfig::from_file(config_path) {
                Ok(_) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Config file valid ({})", config_path.display()),
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid config: {}", e),
                },
            }
        };
        checks.push(check);
    }

    // Check FOCUS_* overrides against the defaults
    let mut env_config = TrackerConfig::default();
    let env_check = match env_config
        .apply_env_overrides()
        .and_then(|()| env_config.validate())
    {
        Ok(()) => DoctorCheck {
            name: "env_overrides".to_string(),
            status: CheckStatus::Ok,
            message: if env_config == TrackerConfig::default() {
                "No FOCUS_* overrides set".to_string()
            } else {
                "FOCUS_* overrides valid".to_string()
            },
        },
        Err(e) => DoctorCheck {
            name: "env_overrides".to_string(),
            status: CheckStatus::Error,
            message: format!("Invalid FOCUS_* override: {}", e),
        },
    };
    checks.push(env_check);

    // Check stdin is available (for streaming mode)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FOCUS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Focus Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(FocusCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), FocusCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("The focus.tracker_event.v1 schema supports three record types:");
                println!();
                println!("1. frame - One camera frame");
                println!("   - landmarks: array of {{x, y, z?}} in normalized image space");
                println!("   - landmarks: null when no face was detected");
                println!("   - Face Mesh topology with refined iris points (478 landmarks)");
                println!();
                println!("2. question_start - Opens a question interval");
                println!("   - question_id (unique within a session)");
                println!("   - metadata: optional opaque JSON carried into the report");
                println!();
                println!("3. question_end - Closes the open question interval");
                println!();
                println!("Every event carries timestamp_ms on the caller's clock; frames");
                println!("earlier than the last processed frame are dropped.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: {}", REPORT_VERSION);
                println!();
                println!("Session report fields:");
                println!("  - report_version, producer (name, version, instance_id)");
                println!("  - computed_at_utc (RFC 3339)");
                println!("  - quality: coverage (0-1) and flags");
                println!("  - session: frame counts, focused/unfocused time (ms),");
                println!("    focus_score (0-100), look_away_count");
                println!("  - session.questions: per-question focus_score, duration_ms,");
                println!("    look_away_count, difficulty (easy | normal | hard)");
                println!("  - session.insights: question ids grouped by difficulty");
            }
        }
    }
    Ok(())
}

fn format_output(report: &FocusReport, format: &OutputFormat) -> Result<String, FocusCliError> {
    let output = match format {
        OutputFormat::Json => serde_json::to_string(report)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(report)?,
    };
    Ok(output)
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/focus.tracker_event.v1.json",
        "title": "focus.tracker_event.v1",
        "description": "Synheart focus tracker event schema",
        "type": "object",
        "required": ["schema_version", "timestamp_ms", "record_type", "payload"],
        "properties": {
            "schema_version": {
                "type": "string",
                "const": "focus.tracker_event.v1"
            },
            "event_id": { "type": "string" },
            "timestamp_ms": { "type": "integer", "minimum": 0 },
            "record_type": {
                "type": "string",
                "enum": ["frame", "question_start", "question_end"]
            },
            "payload": {
                "type": "object",
                "properties": {
                    "frame": {
                        "type": "object",
                        "properties": {
                            "landmarks": {
                                "type": ["array", "null"],
                                "items": {
                                    "type": "object",
                                    "required": ["x", "y"],
                                    "properties": {
                                        "x": { "type": "number" },
                                        "y": { "type": "number" },
                                        "z": { "type": "number" }
                                    }
                                }
                            }
                        }
                    },
                    "question_start": {
                        "type": "object",
                        "required": ["question_id"],
                        "properties": {
                            "question_id": { "type": "string", "minLength": 1 },
                            "metadata": {}
                        }
                    },
                    "question_end": {
                        "type": "object",
                        "properties": {
                            "question_id": { "type": "string" }
                        }
                    }
                }
            }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/focus.session_report.v1.json",
        "title": "focus.session_report.v1",
        "description": "Synheart focus session report",
        "type": "object",
        "required": ["report_version", "producer", "computed_at_utc", "quality", "session"],
        "properties": {
            "report_version": { "type": "string" },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "computed_at_utc": { "type": "string", "format": "date-time" },
            "quality": {
                "type": "object",
                "properties": {
                    "coverage": { "type": "number" },
                    "flags": { "type": "array", "items": { "type": "string" } }
                }
            },
            "session": {
                "type": "object",
                "properties": {
                    "total_frames": { "type": "integer" },
                    "focused_frames": { "type": "integer" },
                    "skipped_frames": { "type": "integer" },
                    "focus_score": { "type": "integer", "minimum": 0, "maximum": 100 },
                    "look_away_count": { "type": "integer" },
                    "focused_time_ms": { "type": "integer" },
                    "unfocused_time_ms": { "type": "integer" },
                    "questions": {
                        "type": "object",
                        "additionalProperties": {
                            "type": "object",
                            "properties": {
                                "focus_score": { "type": "number" },
                                "duration_ms": { "type": "integer" },
                                "look_away_count": { "type": "integer" },
                                "difficulty": { "enum": ["easy", "normal", "hard"] }
                            }
                        }
                    },
                    "insights": { "type": "object" }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum FocusCliError {
    Io(io::Error),
    Focus(FocusError),
    Config(ConfigError),
    Json(serde_json::Error),
    Validation(synheart_focus::schema::ValidationError),
    NoEvents,
    ValidationFailed(usize),
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for FocusCliError {
    fn from(e: io::Error) -> Self {
        FocusCliError::Io(e)
    }
}

impl From<FocusError> for FocusCliError {
    fn from(e: FocusError) -> Self {
        FocusCliError::Focus(e)
    }
}

impl From<ConfigError> for FocusCliError {
    fn from(e: ConfigError) -> Self {
        FocusCliError::Config(e)
    }
}

impl From<serde_json::Error> for FocusCliError {
    fn from(e: serde_json::Error) -> Self {
        FocusCliError::Json(e)
    }
}

impl From<synheart_focus::schema::ValidationError> for FocusCliError {
    fn from(e: synheart_focus::schema::ValidationError) -> Self {
        FocusCliError::Validation(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FocusCliError> for CliError {
    fn from(e: FocusCliError) -> Self {
        match e {
            FocusCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FocusCliError::Focus(e) => {
                let hint = match &e {
                    FocusError::DuplicateQuestion(_) | FocusError::QuestionAlreadyOpen { .. } => {
                        "Check question_start/question_end ordering in the input"
                    }
                    FocusError::Config(_) => "Run 'focus config' to inspect the effective configuration",
                    _ => "Ensure input matches focus.tracker_event.v1 schema",
                };
                CliError {
                    code: "TRACKER_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            FocusCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'focus doctor --config <file>' for details".to_string()),
            },
            FocusCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FocusCliError::Validation(e) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'focus validate' for details".to_string()),
            },
            FocusCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            FocusCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            FocusCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            FocusCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    event_id: Option<String>,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

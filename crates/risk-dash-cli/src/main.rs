mod config;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use risk_dash_core::{
    adapt_value, demo_repository, AnalysisBackend, AnalysisForm, DashboardContext,
    DashboardSettings, HttpBackend, Job, JobController, JobObserver, JobOutcome, JobPhase,
    LogLevel, LogLine, PanelController, PollSettings, DEMO_TEMPLATES,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::{load_settings, Overrides};

#[derive(Parser, Debug)]
#[command(
    name = "risk-dash",
    author,
    version,
    about = "Risk analysis dashboard front end"
)]
struct Cli {
    /// Settings file (TOML, YAML or JSON)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Analysis service base URL
    #[arg(long = "base-url", value_name = "URL", global = true)]
    base_url: Option<String>,

    /// Access token forwarded on every request
    #[arg(long, value_name = "TOKEN", global = true, conflicts_with = "page_url")]
    token: Option<String>,

    /// Dashboard page URL to read the `token` query parameter from
    #[arg(long = "page-url", value_name = "URL", global = true)]
    page_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit an analysis and follow it until it finishes
    Analyze {
        #[command(flatten)]
        form: FormArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the current status and logs of a job once
    Status {
        #[arg(value_name = "REQUEST_ID")]
        request_id: String,
    },
    /// Load a bundled demo dataset
    Demo {
        /// Demo name (see --list)
        name: Option<String>,
        /// List the available demo datasets
        #[arg(long)]
        list: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Render a saved report file
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug)]
struct FormArgs {
    /// Risk scenario to analyze
    #[arg(long)]
    theme: String,
    /// Entity ids (comma-separated), one 6-character id, or a watchlist id or name
    #[arg(long)]
    companies: String,
    #[arg(long, default_value = "")]
    focus: String,
    /// YYYY-MM-DD
    #[arg(long = "start-date", default_value = "")]
    start_date: String,
    /// YYYY-MM-DD
    #[arg(long = "end-date", default_value = "")]
    end_date: String,
    /// D, W, M, 3M or Y
    #[arg(long, default_value = "")]
    frequency: String,
    /// A year or a comma-separated list of years
    #[arg(long = "fiscal-year", default_value = "")]
    fiscal_year: String,
    #[arg(long = "llm-model", default_value = "")]
    llm_model: String,
    #[arg(long = "document-type", default_value = "")]
    document_type: String,
    #[arg(long = "rerank-threshold", default_value = "")]
    rerank_threshold: String,
    #[arg(long = "document-limit", default_value = "")]
    document_limit: String,
    #[arg(long = "batch-size", default_value = "")]
    batch_size: String,
    /// JSON object; single quotes are accepted
    #[arg(long = "control-entities", default_value = "")]
    control_entities: String,
    /// Comma-separated keywords
    #[arg(long, default_value = "")]
    keywords: String,
}

impl From<FormArgs> for AnalysisForm {
    fn from(args: FormArgs) -> Self {
        Self {
            theme: args.theme,
            focus: args.focus,
            companies: args.companies,
            start_date: args.start_date,
            end_date: args.end_date,
            frequency: args.frequency,
            fiscal_year: args.fiscal_year,
            llm_model: args.llm_model,
            document_type: args.document_type,
            rerank_threshold: args.rerank_threshold,
            document_limit: args.document_limit,
            batch_size: args.batch_size,
            control_entities: args.control_entities,
            keywords: args.keywords,
        }
    }
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Where to write the HTML dashboard
    #[arg(long, value_name = "FILE", default_value = "dashboard.html")]
    out: PathBuf,
    /// Print the report as JSON instead of writing HTML
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = load_settings(
        cli.config.as_deref(),
        Overrides {
            base_url: cli.base_url.as_deref(),
            token: cli.token.as_deref(),
            page_url: cli.page_url.as_deref(),
        },
    )?;
    debug!(base_url = %settings.base_url, token = settings.token.is_some(), "settings loaded");
    match cli.command {
        Commands::Analyze { form, output } => analyze(&settings, form.into(), &output).await?,
        Commands::Status { request_id } => status(&settings, &request_id).await?,
        Commands::Demo { name, list, output } => {
            demo(&settings, name.as_deref(), list, &output).await?
        }
        Commands::Render { file, output } => render(&file, &output)?,
    }
    Ok(())
}

/// Prints log lines as polls replace them.
struct ConsoleObserver<'a> {
    ctx: &'a mut DashboardContext,
    shown: Vec<LogLine>,
}

impl JobObserver for ConsoleObserver<'_> {
    fn on_phase(&mut self, phase: JobPhase) {
        if phase == JobPhase::Polling {
            println!("{}", "Job submitted, waiting for results...".dimmed());
        }
        self.ctx.on_phase(phase);
    }

    fn on_update(&mut self, job: &Job) {
        let fresh = if job.logs.starts_with(&self.shown) {
            &job.logs[self.shown.len()..]
        } else {
            &job.logs[..]
        };
        for line in fresh {
            print_log_line(line);
        }
        self.shown = job.logs.clone();
        self.ctx.on_update(job);
    }
}

fn print_log_line(line: &LogLine) {
    let text = line.text.as_str();
    match line.level {
        LogLevel::Error => println!("{}", text.red()),
        LogLevel::Success => println!("{}", text.green()),
        LogLevel::Info => println!("{}", text.blue()),
        LogLevel::Plain => println!("{text}"),
    }
}

async fn analyze(settings: &DashboardSettings, form: AnalysisForm, output: &OutputArgs) -> Result<()> {
    let backend = Arc::new(HttpBackend::new(settings)?);
    let controller = Arc::new(JobController::with_poll_settings(
        backend,
        PollSettings {
            max_attempts: settings.max_poll_attempts,
            ..PollSettings::default()
        },
    ));

    let mut ctx = DashboardContext::new();
    ctx.begin_run(&form);
    let interrupt = Arc::clone(&controller);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let started = Instant::now();
    let outcome = {
        let mut observer = ConsoleObserver {
            ctx: &mut ctx,
            shown: Vec::new(),
        };
        controller.run(&form, &mut observer).await
    }
    .context("analysis did not complete")?;
    let elapsed = humantime::format_duration(Duration::from_secs(started.elapsed().as_secs()));

    match outcome {
        JobOutcome::Completed { .. } => {
            println!("{} in {elapsed}", "Analysis completed".green().bold());
            ctx.apply_outcome(outcome);
            emit(&ctx, output)
        }
        JobOutcome::Failed { job } => bail!("analysis job {} failed after {elapsed}", job.id),
        JobOutcome::Cancelled { .. } => bail!("analysis cancelled after {elapsed}"),
    }
}

async fn status(settings: &DashboardSettings, request_id: &str) -> Result<()> {
    let backend = HttpBackend::new(settings)?;
    let response = backend
        .status(request_id)
        .await
        .with_context(|| format!("failed to fetch status of job {request_id}"))?;
    let status = response
        .status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("{} {}", "Status:".bold(), status);
    for line in response.log_lines() {
        print_log_line(&line);
    }
    if response.report.is_some() {
        println!("{}", "Report is available.".green());
    }
    Ok(())
}

async fn demo(
    settings: &DashboardSettings,
    name: Option<&str>,
    list: bool,
    output: &OutputArgs,
) -> Result<()> {
    if list {
        for template in DEMO_TEMPLATES {
            println!(
                "- {name:<24} {theme} ({universe})",
                name = template.name,
                theme = template.theme,
                universe = template.universe
            );
        }
        return Ok(());
    }
    let Some(name) = name else {
        bail!("a demo name is required (see `demo --list`)");
    };
    let panel = PanelController::new(demo_repository(settings)?);
    let mut ctx = DashboardContext::new();
    panel
        .load_demo(name, &mut ctx)
        .await
        .context("Failed to load demo data")?;
    emit(&ctx, output)
}

fn render(file: &Path, output: &OutputArgs) -> Result<()> {
    let raw = fs::read_to_string(file)
        .with_context(|| format!("failed to read report file {}", file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("invalid JSON in report file {}", file.display()))?;
    let report = adapt_value(&value)?;
    let mut ctx = DashboardContext::new();
    ctx.show_report(report);
    emit(&ctx, output)
}

fn emit(ctx: &DashboardContext, output: &OutputArgs) -> Result<()> {
    if output.json {
        let json = ctx.export_json().context("no report to export")?;
        println!("{json}");
        return Ok(());
    }
    fs::write(&output.out, ctx.render_page())
        .with_context(|| format!("failed to write dashboard to {}", output.out.display()))?;
    let companies = ctx.last_report().map_or(0, |r| r.company_count());
    println!(
        "Dashboard written to {} ({companies} companies)",
        output.out.display()
    );
    Ok(())
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tokio=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

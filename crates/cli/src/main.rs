use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use extract::{AnalysisTask, Analyzer, GeminiClient};
use ingest::DocumentLoader;
use session::{AppConfig, AppState, KNOWN_MODELS, PreferenceStore, ThemeMode};
use std::io::Read;
use std::path::{Path, PathBuf};
use visualize::{ChartType, ReportOptions, render_report, render_text};

mod interactive;

#[derive(Parser, Debug)]
#[command(name = "insights", version, about = "Extract facts, themes and summaries from documents with Gemini")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one analysis and print the result
    Analyze(AnalyzeArgs),
    /// Show or change saved preferences
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
    /// List the known model names
    Models,
    /// Keep a session open and read commands from stdin
    Interactive,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Load the document from a .txt, .md, .pdf or .docx file
    #[arg(long, group = "source")]
    file: Option<PathBuf>,

    /// Load the document from a web page or plain-text URL
    #[arg(long, group = "source")]
    url: Option<String>,

    /// Use this text as the document
    #[arg(long, group = "source")]
    text: Option<String>,

    /// Read the document from stdin
    #[arg(long, group = "source")]
    stdin: bool,

    /// facts, query, summarize, web or themes
    #[arg(long, default_value = "query", value_parser = parse_task)]
    task: AnalysisTask,

    #[arg(long, short, default_value = "")]
    query: String,

    /// bar, line, pie, doughnut, map or matrix
    #[arg(long, value_parser = parse_chart)]
    chart: Option<ChartType>,

    /// Write an HTML report to this path
    #[arg(long)]
    html: Option<PathBuf>,

    /// Print the parsed response as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Model for this run only
    #[arg(long)]
    model: Option<String>,

    /// Theme for this run only (light, dark or system)
    #[arg(long, value_parser = parse_theme)]
    theme: Option<ThemeMode>,
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Print the current preferences
    Show,
    /// Save the model name used for requests
    SetModel { name: String },
    /// Save the report theme
    SetTheme {
        #[arg(value_parser = parse_theme)]
        theme: ThemeMode,
    },
}

fn parse_task(s: &str) -> Result<AnalysisTask, String> {
    AnalysisTask::from_slug(s).ok_or_else(|| {
        let slugs: Vec<_> = AnalysisTask::ALL.iter().map(|t| t.slug()).collect();
        format!("unknown task '{}' (expected one of: {})", s, slugs.join(", "))
    })
}

fn parse_chart(s: &str) -> Result<ChartType, String> {
    ChartType::from_slug(s).ok_or_else(|| {
        let slugs: Vec<_> = ChartType::ALL.iter().map(|c| c.slug()).collect();
        format!("unknown chart '{}' (expected one of: {})", s, slugs.join(", "))
    })
}

fn parse_theme(s: &str) -> Result<ThemeMode, String> {
    ThemeMode::parse(s).ok_or_else(|| format!("unknown theme '{}' (expected light, dark or system)", s))
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("insights error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json)?;

    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "Configuration loaded");

    match cli.command {
        Command::Analyze(args) => analyze(&config, args).await,
        Command::Settings { action } => settings(&config, action.unwrap_or(SettingsAction::Show)),
        Command::Models => {
            let store = PreferenceStore::load(config.resolved_preferences_path());
            for model in KNOWN_MODELS {
                let marker = if model == store.preferences().model { "*" } else { " " };
                println!("{} {}", marker, model);
            }
            Ok(())
        }
        Command::Interactive => interactive::run(&config).await,
    }
}

fn init_tracing(verbose: bool, json: bool) -> Result<()> {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if json { builder.json().try_init() } else { builder.try_init() };
    result.map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

pub(crate) fn build_analyzer(config: &AppConfig) -> Analyzer<GeminiClient> {
    let client = GeminiClient::new(config.model.base_url.clone(), config.request_timeout())
        .with_credential_vars(config.model.credential_vars.clone());
    Analyzer::new(client)
}

pub(crate) fn build_loader(config: &AppConfig) -> DocumentLoader {
    DocumentLoader::new(config.documents.max_file_bytes, config.fetch_timeout())
}

async fn analyze(config: &AppConfig, args: AnalyzeArgs) -> Result<()> {
    let store = PreferenceStore::load(config.resolved_preferences_path());
    let mut preferences = store.preferences().clone();
    if let Some(model) = args.model {
        preferences.model = model;
    }
    let theme = args.theme.unwrap_or(preferences.theme);

    let mut state = AppState::new(config.log.capacity, preferences);
    let loader = build_loader(config);

    if let Some(path) = &args.file {
        let token = state.begin_document_load();
        let result = loader.load_file(path).await;
        state.complete_document_load(token, result);
    } else if let Some(url) = &args.url {
        let token = state.begin_document_load();
        let result = loader.load_url(url).await;
        state.complete_document_load(token, result);
    } else if let Some(text) = args.text {
        state.set_document_text(text);
    } else if args.stdin {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read document from stdin")?;
        state.set_document_text(text);
    }

    if let Some(status) = state.document_status() {
        if status.is_error {
            anyhow::bail!("{}", status.message);
        }
        eprintln!("{}", status.message);
    }

    state.select_task(args.task);
    state.set_query(args.query);

    let ticket = state.begin_submission()?;
    let analyzer = build_analyzer(config);
    let result = ticket.run(&analyzer).await;
    state.complete_submission(&ticket, result)?;

    if let Some(chart) = args.chart {
        if state.response().is_some() {
            state
                .select_chart(chart)
                .with_context(|| format!("cannot show a {} for this result", chart.option_label()))?;
        }
    }

    if args.json {
        if let Some(data) = state.response() {
            println!("{}", serde_json::to_string_pretty(data).context("failed to encode response")?);
        }
    } else {
        println!("{}", render_text(&state.panel()));
    }

    if let Some(path) = &args.html {
        write_report(&state, theme, None, path)?;
        eprintln!("Report written to {}", path.display());
    }

    if let Some(message) = state.analysis_error() {
        anyhow::bail!("{}", message);
    }
    Ok(())
}

pub(crate) fn write_report(state: &AppState, theme: ThemeMode, hovered: Option<String>, path: &Path) -> Result<()> {
    let mut options = ReportOptions::default()
        .with_chart(Some(state.chart()))
        .with_appearance(theme.resolve());
    options.hovered_theme = hovered;

    let html = render_report(&state.panel(), &options).context("failed to render report")?;
    std::fs::write(path, html).with_context(|| format!("failed to write report to {}", path.display()))
}

fn settings(config: &AppConfig, action: SettingsAction) -> Result<()> {
    let mut store = PreferenceStore::load(config.resolved_preferences_path());
    match action {
        SettingsAction::Show => {}
        SettingsAction::SetModel { name } => store.set_model(&name).context("failed to save model")?,
        SettingsAction::SetTheme { theme } => store.set_theme(theme).context("failed to save theme")?,
    }
    print_settings(&store);
    Ok(())
}

pub(crate) fn print_settings(store: &PreferenceStore) {
    let preferences = store.preferences();
    println!("Preferences: {}", store.path().display());
    println!("  model: {}", preferences.model);
    println!("  theme: {} ({:?})", preferences.theme, preferences.theme.resolve());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_args() {
        let cli = Cli::try_parse_from([
            "insights", "analyze", "--text", "Revenue was $5,000,000.", "--task", "facts", "-q", "Revenue", "--chart", "pie",
        ])
        .unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.task, AnalysisTask::FactExtraction);
        assert_eq!(args.query, "Revenue");
        assert_eq!(args.chart, Some(ChartType::Pie));
    }

    #[test]
    fn test_sources_are_exclusive() {
        let err = Cli::try_parse_from(["insights", "analyze", "--text", "a", "--url", "https://a.example"]);
        assert!(err.is_err());
    }

    #[test]
    fn test_unknown_task_is_rejected() {
        let err = Cli::try_parse_from(["insights", "analyze", "--task", "poetry"]).unwrap_err();
        assert!(err.to_string().contains("unknown task 'poetry'"));
    }

    #[test]
    fn test_settings_defaults_to_show() {
        let cli = Cli::try_parse_from(["insights", "--verbose", "settings"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Settings { action: None }));
    }
}

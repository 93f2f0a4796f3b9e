//! Newsfetch CLI Application
//!
//! A command-line interface for fetching news articles with bounded
//! concurrency and per-site request spacing. Articles come from a Google News
//! keyword search, from `--url` flags or from a file of URLs.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use newsfetch_lib::{
    load_env_config, parse_duration_string, parse_url_list, ConfigManager, EnvConfig, FetchConfig,
    FetchError, FetchPool, FetchResult, FetchTask, FileConfig, HttpPageFetcher, NewsSearch,
    SearchConfig, MAX_WORKERS_LIMIT,
};
use std::collections::BTreeMap;
use std::process;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for newsfetch
#[derive(Parser, Debug, Default)]
#[command(name = "newsfetch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch news articles concurrently without hammering any single site")]
#[command(
    long_about = "Fetch news articles concurrently while spacing requests to each site.\n\nArticles come from a Google News keyword search, --url flags or a file of URLs.\nAt most 10 pages are fetched at once, and requests to the same host are at least 500ms apart by default."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Keyword to search Google News for
    #[arg(value_name = "KEYWORD", help_heading = "Article Selection")]
    pub keyword: Option<String>,

    /// Article URL to fetch (repeatable)
    #[arg(
        short = 'u',
        long = "url",
        value_name = "URL",
        action = clap::ArgAction::Append,
        help_heading = "Article Selection"
    )]
    pub urls: Vec<String>,

    /// Input file with article URLs (one per line, # comments allowed)
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        help_heading = "Article Selection"
    )]
    pub file: Option<String>,

    /// Maximum number of search results to fetch (default: 20)
    #[arg(long = "max-articles", value_name = "N", help_heading = "Article Selection")]
    pub max_articles: Option<usize>,

    /// List the articles that would be fetched without fetching them
    #[arg(long = "dry-run", help_heading = "Article Selection")]
    pub dry_run: bool,

    /// Max concurrent page fetches (default: 10, range 1-100)
    #[arg(short = 'c', long = "concurrency", value_name = "N", help_heading = "Performance")]
    pub concurrency: Option<usize>,

    /// Minimum spacing between requests to one site, e.g. 500ms, 2s
    #[arg(long = "interval", value_name = "DURATION", help_heading = "Performance")]
    pub interval: Option<String>,

    /// Per-request timeout, e.g. 10s
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Output results in CSV format
    #[arg(long = "csv", help_heading = "Output Format")]
    pub csv: bool,

    /// Enable grouped, structured output with section headers
    #[arg(short = 'p', long = "pretty", help_heading = "Output Format")]
    pub pretty: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show detailed debug information and error messages
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging and content previews
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// How results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl OutputFormat {
    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
struct RunSettings {
    fetch: FetchConfig,
    search: SearchConfig,
    format: OutputFormat,
    json_pretty: bool,
    pretty: bool,
    file: Option<String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            search: SearchConfig::default(),
            format: OutputFormat::Text,
            json_pretty: true,
            pretty: false,
            file: None,
        }
    }
}

/// Error statistics for aggregated reporting, keyed by error category
#[derive(Debug, Default)]
pub(crate) struct ErrorStats {
    by_kind: BTreeMap<&'static str, Vec<String>>,
}

impl ErrorStats {
    fn from_results(results: &[FetchResult]) -> Self {
        let mut stats = Self::default();
        for result in results {
            if let Some(error) = &result.error {
                stats.add_error(&result.task.url, error);
            }
        }
        stats
    }

    fn add_error(&mut self, url: &str, error: &FetchError) {
        self.by_kind
            .entry(error.kind())
            .or_default()
            .push(url.to_string());
    }

    pub(crate) fn has_errors(&self) -> bool {
        !self.by_kind.is_empty()
    }

    /// One line per category, e.g. "2 timeouts: a.com/x, b.com/y".
    pub(crate) fn summary_lines(&self, max_show: usize) -> Vec<String> {
        self.by_kind
            .iter()
            .map(|(kind, urls)| {
                let shown = if urls.len() <= max_show {
                    urls.join(", ")
                } else {
                    format!(
                        "{}, ... and {} more",
                        urls[..max_show].join(", "),
                        urls.len() - max_show
                    )
                };
                format!("{} {}: {}", urls.len(), category_label(kind, urls.len()), shown)
            })
            .collect()
    }
}

fn category_label(kind: &str, count: usize) -> String {
    let base = match kind {
        "timeout" => "timeout",
        "network" => "network error",
        "status" => "HTTP error",
        "parse" => "unreadable response",
        "invalid_url" => "invalid URL",
        _ => "other error",
    };
    if count == 1 {
        base.to_string()
    } else {
        format!("{}s", base)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_logging(&args);
    tracing::debug!("newsfetch v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run_fetch(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--debug` and `--verbose` pick the level.
fn init_logging(args: &Args) {
    let default_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    let has_env_file = std::env::var("NF_FILE").is_ok_and(|f| !f.trim().is_empty());

    // Must have a keyword, URLs or a file
    if args.keyword.is_none() && args.urls.is_empty() && args.file.is_none() && !has_env_file {
        return Err(
            "You must specify a search keyword, article URLs with --url, or a file with --file"
                .to_string(),
        );
    }

    if let Some(keyword) = &args.keyword {
        if keyword.trim().is_empty() {
            return Err("Search keyword cannot be empty".to_string());
        }
    }

    // Can't have multiple output formats
    if args.json && args.csv {
        return Err("Cannot specify multiple output formats (--json, --csv)".to_string());
    }

    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > MAX_WORKERS_LIMIT {
            return Err(format!(
                "Concurrency must be between 1 and {}",
                MAX_WORKERS_LIMIT
            ));
        }
    }

    if args.max_articles == Some(0) {
        return Err("--max-articles must be at least 1".to_string());
    }

    for (flag, value) in [("--interval", &args.interval), ("--timeout", &args.timeout)] {
        if let Some(value) = value {
            if parse_duration_string(value).is_none() {
                return Err(format!(
                    "Invalid {} '{}'. Use format like '500ms', '5s', '2m'",
                    flag, value
                ));
            }
        }
    }

    if args.timeout.as_deref().and_then(parse_duration_string) == Some(Duration::ZERO) {
        return Err("--timeout must be greater than zero".to_string());
    }

    Ok(())
}

async fn run_fetch(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = build_settings(&args)?;
    let tasks = collect_tasks(&args, &settings).await?;

    // Dry-run: list tasks and exit without fetching
    if args.dry_run {
        print_dry_run(&tasks, &settings)?;
        return Ok(());
    }

    let is_text = settings.format == OutputFormat::Text;
    let workers = settings.fetch.max_workers.min(tasks.len());

    if settings.pretty && is_text {
        ui::print_header(
            tasks.len(),
            workers,
            settings.fetch.min_interval,
            args.keyword.as_deref(),
        );
    }

    // Spinner::start returns None if stderr isn't a TTY.
    let spinner = if is_text {
        ui::Spinner::start(format!("Fetching {} articles...", tasks.len()))
    } else {
        None
    };

    let fetcher = HttpPageFetcher::with_config(&settings.fetch)?;
    let pool = FetchPool::with_config(fetcher, settings.fetch.clone());

    let start_time = Instant::now();
    let results = pool.run(tasks).await;
    let duration = start_time.elapsed();

    if let Some(s) = spinner {
        s.stop().await;
    }

    display_results(&results?, &args, &settings, duration)?;

    Ok(())
}

/// Build run settings with config file integration.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments (explicit user input)
/// 2. Environment variables (NF_*)
/// 3. Local config file (./newsfetch.toml)
/// 4. Global config file (~/.newsfetch.toml)
/// 5. XDG config file (~/.config/newsfetch/config.toml)
/// 6. Built-in defaults
fn build_settings(args: &Args) -> Result<RunSettings, Box<dyn std::error::Error>> {
    let env_config = load_env_config(args.verbose);
    let file_config = load_file_config(args, &env_config)?;

    let mut settings = RunSettings::default();
    settings = apply_file_config(settings, &file_config);
    settings = apply_environment_config(settings, &env_config);
    settings = apply_cli_args(settings, args);

    settings.fetch.validate()?;
    Ok(settings)
}

/// Load the explicit config file (`--config`, then `NF_CONFIG`) or discover one.
fn load_file_config(
    args: &Args,
    env_config: &EnvConfig,
) -> Result<FileConfig, Box<dyn std::error::Error>> {
    let config_manager = ConfigManager::new(args.verbose);

    let explicit = args
        .config
        .as_deref()
        .map(|path| (path, "--config"))
        .or_else(|| env_config.config.as_deref().map(|path| (path, "NF_CONFIG")));

    match explicit {
        Some((path, source)) => {
            tracing::info!(%path, %source, "using explicit config file");
            let file_config = config_manager
                .load_file(path)
                .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?;
            Ok(file_config)
        }
        None => Ok(config_manager.discover_and_load()?),
    }
}

fn apply_file_config(mut settings: RunSettings, file_config: &FileConfig) -> RunSettings {
    settings.fetch = file_config.apply_fetch(settings.fetch);
    settings.search = file_config.apply_search(settings.search);

    if let Some(output) = &file_config.output {
        if let Some(format) = output.default_format.as_deref().and_then(OutputFormat::from_name) {
            settings.format = format;
        }
        if let Some(json_pretty) = output.json_pretty {
            settings.json_pretty = json_pretty;
        }
    }

    settings
}

/// Apply NF_* environment variables.
fn apply_environment_config(mut settings: RunSettings, env_config: &EnvConfig) -> RunSettings {
    if env_config.has_output_format_conflict() {
        tracing::warn!("both NF_JSON and NF_CSV are set, using JSON");
    }

    if let Some(concurrency) = env_config.concurrency {
        settings.fetch = settings.fetch.with_max_workers(concurrency);
    }
    if let Some(interval) = env_config.interval.as_deref().and_then(parse_duration_string) {
        settings.fetch = settings.fetch.with_min_interval(interval);
    }
    if let Some(timeout) = env_config.timeout.as_deref().and_then(parse_duration_string) {
        settings.fetch = settings.fetch.with_timeout(timeout);
    }
    if let Some(agent) = &env_config.user_agent {
        settings.fetch = settings.fetch.with_user_agent(agent.clone());
    }
    if let Some(max) = env_config.max_articles {
        settings.search.max_articles = max;
    }

    if env_config.json == Some(true) {
        settings.format = OutputFormat::Json;
    } else if env_config.csv == Some(true) {
        settings.format = OutputFormat::Csv;
    }
    if let Some(pretty) = env_config.pretty {
        settings.pretty = pretty;
    }
    if let Some(file) = &env_config.file {
        settings.file = Some(file.clone());
    }

    settings
}

/// Apply CLI arguments (highest precedence).
///
/// Only flags the user actually passed override earlier layers.
fn apply_cli_args(mut settings: RunSettings, args: &Args) -> RunSettings {
    if let Some(concurrency) = args.concurrency {
        settings.fetch = settings.fetch.with_max_workers(concurrency);
    }
    if let Some(interval) = args.interval.as_deref().and_then(parse_duration_string) {
        settings.fetch = settings.fetch.with_min_interval(interval);
    }
    if let Some(timeout) = args.timeout.as_deref().and_then(parse_duration_string) {
        settings.fetch = settings.fetch.with_timeout(timeout);
    }
    if let Some(max) = args.max_articles {
        settings.search.max_articles = max;
    }

    if args.json {
        settings.format = OutputFormat::Json;
    } else if args.csv {
        settings.format = OutputFormat::Csv;
    }
    if args.pretty {
        settings.pretty = true;
    }
    if args.file.is_some() {
        settings.file = args.file.clone();
    }

    settings
}

/// Gather tasks from the keyword search, `--url` flags and the URL file, in that order.
async fn collect_tasks(
    args: &Args,
    settings: &RunSettings,
) -> Result<Vec<FetchTask>, Box<dyn std::error::Error>> {
    let mut tasks = Vec::new();

    if let Some(keyword) = &args.keyword {
        let search = NewsSearch::with_config(settings.search.clone(), settings.fetch.timeout)?;
        let found = search.search(keyword).await?;
        if found.is_empty() {
            eprintln!("No search results found for '{}'", keyword);
        }
        tasks.extend(found);
    }

    tasks.extend(args.urls.iter().map(FetchTask::new));

    if let Some(file) = &settings.file {
        tasks.extend(read_urls_from_file(file)?);
    }

    if tasks.is_empty() {
        return Err("No articles to fetch.".into());
    }

    Ok(tasks)
}

fn read_urls_from_file(file_path: &str) -> Result<Vec<FetchTask>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(file_path)
        .map_err(|e| FetchError::file_error(file_path, e.to_string()))?;

    let (urls, invalid_lines) = parse_url_list(&content);

    // Report invalid lines if any
    if !invalid_lines.is_empty() {
        eprintln!(
            "Found {} invalid entries in the file:",
            invalid_lines.len()
        );
        for invalid in &invalid_lines[..invalid_lines.len().min(5)] {
            eprintln!("  {}", invalid);
        }
        if invalid_lines.len() > 5 {
            eprintln!("  ... and {} more invalid entries", invalid_lines.len() - 5);
        }
        eprintln!();
    }

    if urls.is_empty() {
        return Err(format!("No valid URLs found in '{}'.", file_path).into());
    }

    Ok(urls.into_iter().map(FetchTask::new).collect())
}

fn print_dry_run(
    tasks: &[FetchTask],
    settings: &RunSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    if settings.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(tasks)?);
    } else {
        for task in tasks {
            match &task.headline {
                Some(headline) => println!("{}\t{}", task.url, headline),
                None => println!("{}", task.url),
            }
        }
    }
    eprintln!("{} articles would be fetched", tasks.len());
    Ok(())
}

fn display_results(
    results: &[FetchResult],
    args: &Args,
    settings: &RunSettings,
    duration: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    match settings.format {
        OutputFormat::Json => display_json_results(results, settings.json_pretty)?,
        OutputFormat::Csv => display_csv_results(results),
        OutputFormat::Text => display_text_results(results, args, settings, duration),
    }

    Ok(())
}

/// Display results in JSON format
fn display_json_results(
    results: &[FetchResult],
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = if pretty {
        serde_json::to_string_pretty(results)?
    } else {
        serde_json::to_string(results)?
    };
    println!("{}", json);
    Ok(())
}

/// Display results in CSV format
fn display_csv_results(results: &[FetchResult]) {
    println!("url,headline,domain,status,chars,duration_ms,error");

    for result in results {
        let status = if result.is_success() { "fetched" } else { "failed" };
        let duration_ms = result
            .fetch_duration
            .map(|d| d.as_millis().to_string())
            .unwrap_or_else(|| "-".to_string());
        let error = result
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default();

        println!(
            "{},{},{},{},{},{},{}",
            csv_field(&result.task.url),
            csv_field(result.task.headline.as_deref().unwrap_or("")),
            csv_field(result.domain.as_str()),
            status,
            result.content.chars().count(),
            duration_ms,
            csv_field(&error),
        );
    }
}

/// Quote a CSV field when it contains a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Display results in human-readable text format
fn display_text_results(
    results: &[FetchResult],
    args: &Args,
    settings: &RunSettings,
    duration: Duration,
) {
    if settings.pretty {
        // Pretty mode: grouped layout with section headers
        ui::print_grouped_results(results, args.verbose, args.debug);
    } else {
        for result in results {
            ui::print_result(result, args.verbose, args.debug);
        }
    }

    if results.len() > 1 {
        let fetched = results.iter().filter(|r| r.is_success()).count();
        println!();
        ui::print_summary(results.len(), fetched, results.len() - fetched, duration);
    }

    ui::print_error_summary(&ErrorStats::from_results(results));
}

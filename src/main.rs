use std::io::IsTerminal;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};

use scribe_core::{OutputFormat, ScribeConfig, ScribeError, DEFAULT_CONFIG_FILE};
use scribe_difflens::filter::NoiseFilter;
use scribe_summarize::clipboard::{Clipboard, CommandClipboard, NoClipboard};
use scribe_summarize::llm::OllamaClient;
use scribe_summarize::pipeline::DiffSummarizer;
use scribe_summarize::prompt::PromptTemplate;

#[derive(Parser)]
#[command(
    name = "scribe",
    version,
    about = "Write a commit message for your staged changes with a local LLM",
    long_about = "Reads a staged diff, drops lockfile and manifest noise, and asks a local\n\
                   inference server (Ollama) for a short imperative commit message.\n\
                   The message is printed and copied to the clipboard.\n\n\
                   The inference server is never started for you; run `ollama serve` first.\n\n\
                   Examples:\n  \
                     git diff --staged | scribe           Summarize staged changes\n  \
                     scribe --diff changes.patch          Summarize a saved diff\n  \
                     git diff --staged | scribe --dry-run Show the prompt only\n  \
                     scribe doctor                        Check server and model"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Read the diff from a file instead of stdin
    #[arg(long, value_name = "FILE")]
    diff: Option<PathBuf>,

    /// Model to ask (overrides llm.model)
    #[arg(long)]
    model: Option<String>,

    /// Inference server base URL (overrides llm.base_url)
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Seconds to wait for the model (overrides llm.timeout_secs)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Do not copy the message to the clipboard
    #[arg(long)]
    no_clipboard: bool,

    /// Print the prompt that would be sent and exit without calling the model
    #[arg(long)]
    dry_run: bool,

    /// Path to configuration file (default: .scribe.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format.\n\n\
                       Formats:\n  \
                         text  The bare commit message (default)\n  \
                         json  The message with run statistics, camelCase keys"
    )]
    format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Create a default .scribe.toml configuration file
    #[command(long_about = "Create a default .scribe.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .scribe.toml already exists.")]
    Init,
    /// Check the inference server, model, and clipboard setup
    #[command(long_about = "Check the inference server, model, and clipboard setup.\n\n\
        Contacts the configured server, verifies the model has been pulled, and\n\
        reports which clipboard command will be used. Exits non-zero if a check fails.")]
    Doctor,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

const DEFAULT_CONFIG: &str = r#"# scribe configuration

[llm]
# base_url = "http://localhost:11434"
# model = "hf.co/bartowski/Meta-Llama-3.1-8B-Instruct-GGUF:Q4_K_M"
# temperature = 0.0
# timeout_secs = 60

[filter]
# Sections for these file names are left out of the prompt, and the
# message gets "and updated documentation" appended instead.
# noise_files = ["pyproject.toml", "uv.lock", "poetry.lock", "package-lock.json", "yarn.lock", "pnpm-lock.yaml", "Cargo.lock"]
# extra_patterns = ["docs/**"]

[message]
# max_length = 128

[clipboard]
# enabled = true
# command = ["pbcopy"]
"#;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<ScribeConfig> {
    let mut config = match &cli.config {
        Some(path) => ScribeConfig::from_file(path)
            .wrap_err(format!("loading {}", path.display()))?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                ScribeConfig::from_file(default_path)?
            } else {
                ScribeConfig::default()
            }
        }
    };

    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
    if let Some(url) = &cli.url {
        config.llm.base_url = url.clone();
    }
    if let Some(timeout) = cli.timeout {
        if timeout == 0 {
            miette::bail!("--timeout must be greater than zero");
        }
        config.llm.timeout_secs = timeout;
    }
    if cli.no_clipboard {
        config.clipboard.enabled = false;
    }
    Ok(config)
}

fn read_diff_input(file: &Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err(format!("reading {}", path.display())),
        None => {
            // Nothing is piped in; reading would wait on the keyboard.
            if std::io::stdin().is_terminal() {
                return Err(ScribeError::NothingStaged.into());
            }
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .into_diagnostic()
                .wrap_err("reading stdin")?;
            Ok(input)
        }
    }
}

fn clipboard_for(config: &ScribeConfig) -> Result<Box<dyn Clipboard>> {
    if !config.clipboard.enabled {
        return Ok(Box::new(NoClipboard));
    }
    match &config.clipboard.command {
        Some(command) => Ok(Box::new(CommandClipboard::from_command(command)?)),
        None => match CommandClipboard::detect() {
            Some(clipboard) => Ok(Box::new(clipboard)),
            None => {
                tracing::warn!("no clipboard command known for this platform");
                Ok(Box::new(NoClipboard))
            }
        },
    }
}

async fn run_summarize(cli: &Cli, config: &ScribeConfig) -> Result<()> {
    let filter = NoiseFilter::from_config(&config.filter)?;
    let template = PromptTemplate::new(config.message.max_length);
    let client = OllamaClient::new(&config.llm)?;
    let summarizer = DiffSummarizer::new(client, filter, template);

    let input = read_diff_input(&cli.diff)?;

    if cli.dry_run {
        let prepared = summarizer.prepare(&input)?;
        match cli.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "system": prepared.request.system,
                    "user": prepared.request.user,
                    "documentationUpdated": prepared.request.documentation_updated,
                    "skipped": prepared.filtered.skipped,
                });
                println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
            }
            OutputFormat::Text => print!("{}", prepared.request.user),
        }
        return Ok(());
    }

    let spinner = if std::io::stderr().is_terminal() && !cli.verbose {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_style(
            indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                .into_diagnostic()?,
        );
        pb.set_message(format!("Asking {}...", config.llm.model));
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let result = summarizer.summarize(&input).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let summary = result?;

    match cli.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).into_diagnostic()?
            );
        }
        OutputFormat::Text => println!("{summary}"),
    }

    let clipboard = clipboard_for(config)?;
    if let Err(e) = clipboard.copy(&summary.message) {
        tracing::warn!(error = %e, "could not copy the message to the clipboard");
    }

    Ok(())
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            "pass" => "\u{2713}",
            "fail" => "\u{2717}",
            _ => "~",
        }
    }

    fn colored_symbol(&self) -> String {
        match self.status {
            "pass" => "\x1b[32m\u{2713}\x1b[0m".into(),
            "fail" => "\x1b[31m\u{2717}\x1b[0m".into(),
            _ => "\x1b[33m~\x1b[0m".into(),
        }
    }
}

fn on_path(program: &str) -> bool {
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| {
        dir.join(program).is_file() || dir.join(format!("{program}.exe")).is_file()
    })
}

async fn run_doctor(
    cli: &Cli,
    config: &ScribeConfig,
    format: OutputFormat,
    use_color: bool,
) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. Config file
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    if config_path.exists() {
        checks.push(CheckResult::pass(
            "config_file",
            format!("{} loaded", config_path.display()),
        ));
    } else {
        checks.push(CheckResult::info(
            "config_file",
            "using defaults (run 'scribe init' to customize)",
        ));
    }

    // 2. Noise filter
    match NoiseFilter::from_config(&config.filter) {
        Ok(_) => checks.push(CheckResult::pass(
            "noise_filter",
            format!("{} noise file names", config.filter.noise_files.len()),
        )),
        Err(e) => checks.push(CheckResult::fail(
            "noise_filter",
            e.to_string(),
            "fix filter.extra_patterns in your config",
        )),
    }

    // 3. Server and model
    let client = OllamaClient::new(&config.llm)?;
    match client.list_models().await {
        Ok(models) => {
            checks.push(CheckResult::pass(
                "inference_server",
                format!("reachable at {} ({} models)", client.base_url(), models.len()),
            ));
            let wanted = &config.llm.model;
            let pulled = models
                .iter()
                .any(|m| m == wanted || *m == format!("{wanted}:latest"));
            if pulled {
                checks.push(CheckResult::pass("model", wanted.clone()));
            } else {
                checks.push(CheckResult::fail(
                    "model",
                    format!("{wanted} not pulled"),
                    format!("run 'ollama pull {wanted}'"),
                ));
            }
        }
        Err(e) => {
            checks.push(CheckResult::fail(
                "inference_server",
                e.to_string(),
                "start it with 'ollama serve'",
            ));
        }
    }

    // 4. Clipboard
    if !config.clipboard.enabled {
        checks.push(CheckResult::info("clipboard", "disabled"));
    } else {
        let command = match &config.clipboard.command {
            Some(command) => CommandClipboard::from_command(command).ok(),
            None => CommandClipboard::detect(),
        };
        match command {
            Some(c) if on_path(c.program()) => {
                checks.push(CheckResult::pass("clipboard", c.command_line()));
            }
            Some(c) => checks.push(CheckResult::fail(
                "clipboard",
                format!("{} not found on PATH", c.program()),
                "install it or set clipboard.command in .scribe.toml",
            )),
            None => checks.push(CheckResult::info(
                "clipboard",
                "no default command for this platform",
            )),
        }
    }

    let failed = checks.iter().filter(|c| c.status == "fail").count();

    match format {
        OutputFormat::Json => {
            let version = env!("CARGO_PKG_VERSION");
            let json = serde_json::json!({
                "version": version,
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        OutputFormat::Text => {
            let version = env!("CARGO_PKG_VERSION");
            println!("scribe v{version} environment check\n");

            for check in &checks {
                let sym = if use_color {
                    check.colored_symbol()
                } else {
                    check.symbol().to_string()
                };
                let label = check.name.replace('_', " ");
                println!("  {sym} {label:<18} {}", check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }

            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    if failed > 0 {
        miette::bail!("{failed} check(s) failed");
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    tracing::debug!(
        model = %config.llm.model,
        url = %config.llm.base_url,
        timeout_secs = config.llm.timeout_secs,
        "configuration resolved"
    );

    match &cli.command {
        None => run_summarize(&cli, &config).await?,
        Some(Command::Init) => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                miette::bail!("{DEFAULT_CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {DEFAULT_CONFIG_FILE} with default configuration");
        }
        Some(Command::Doctor) => {
            run_doctor(&cli, &config, cli.format, use_color).await?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "scribe", &mut std::io::stdout());
        }
    }

    Ok(())
}

use anyhow::{Context, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use onetouch_cli::config::{self, CliOverrides, ConfigMerger, MergedConfig, OnetouchConfig};
use onetouch_core::adapters::ShellProcessPort;
use onetouch_core::hooks::{self, HookEnv, HookOutcome};
use onetouch_core::pipeline::{
    load_descriptor, run_build, run_configure, run_init, run_run, run_sync,
};
use onetouch_profiles::load_profiles;
use onetouch_types::{CommandOptions, Platform, StdioMode};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// `false` forces info-level logging even with `--verbose`.
const VERBOSE_VAR: &str = "ONETOUCH_VERBOSE";

#[derive(Debug, Parser)]
#[command(
    name = "onetouch",
    version,
    about = "Bundle, configure and package the Capacitor app for Android and iOS."
)]
struct Cli {
    /// Package for release.
    #[arg(short, long, global = true, default_value_t = false)]
    release: bool,

    /// Build configuration key from build.json.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// How child processes treat stdio (default: inherit).
    #[arg(long, value_enum, global = true)]
    stdio: Option<StdioArg>,

    /// Project root (default: current directory).
    #[arg(long, global = true, default_value = ".")]
    project_root: Utf8PathBuf,

    /// Log per-mutation detail.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Bundle web elements, initialize the native platform.
    Init(PlatformArgs),
    /// Bundle web elements, synchronize them with the native platform.
    Sync(PlatformArgs),
    /// Bundle web elements, synchronize them with the native platform and run on the device.
    Run(PlatformArgs),
    /// Bundle web elements, synchronize them with the native platform and package for distribution.
    Build(PlatformArgs),
    /// Configure the native project only.
    Configure(ConfigureArgs),
    /// List the selectable build configuration keys.
    ListConfigs(ListConfigsArgs),
    /// Hooks invoked by the scaffolding tool.
    #[command(subcommand)]
    Hook(HookCommand),
}

#[derive(Debug, Parser)]
struct PlatformArgs {
    /// Native platform.
    #[arg(value_enum)]
    platform: PlatformArg,
}

#[derive(Debug, Parser)]
struct ConfigureArgs {
    /// Native platform.
    #[arg(value_enum)]
    platform: PlatformArg,

    /// Print the pending edits as a unified diff and leave the project untouched.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Debug, Parser)]
struct ListConfigsArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Subcommand)]
enum HookCommand {
    /// Raise the Podfile's iOS platform floor to minIosVersion.
    BeforeSync,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum PlatformArg {
    Android,
    Ios,
}

impl From<PlatformArg> for Platform {
    fn from(p: PlatformArg) -> Self {
        match p {
            PlatformArg::Android => Platform::Android,
            PlatformArg::Ios => Platform::Ios,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum StdioArg {
    Inherit,
    Ignore,
    Pipe,
}

impl From<StdioArg> for StdioMode {
    fn from(s: StdioArg) -> Self {
        match s {
            StdioArg::Inherit => StdioMode::Inherit,
            StdioArg::Ignore => StdioMode::Ignore,
            StdioArg::Pipe => StdioMode::Pipe,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // The file may ask for verbose logging, so it is read before the subscriber exists.
    let file_config = config::load_or_default(&cli.project_root);
    let file_verbose = file_config.as_ref().ok().and_then(|c| c.verbose);
    let env_verbose = std::env::var(VERBOSE_VAR).ok();
    init_logging(log_level(
        cli.verbose || file_verbose.unwrap_or(false),
        env_verbose.as_deref(),
    ));

    if let Err(e) = real_main(cli, file_config) {
        error!("{:?}", e);
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `RUST_LOG` is handled by the filter itself; this picks the fallback level.
fn log_level(verbose: bool, env: Option<&str>) -> &'static str {
    match env {
        Some("false") | Some("0") => "info",
        Some("true") | Some("1") => "debug",
        _ if verbose => "debug",
        _ => "info",
    }
}

fn real_main(cli: Cli, file_config: anyhow::Result<OnetouchConfig>) -> anyhow::Result<()> {
    let file_config = file_config.context("load onetouch.toml config")?;
    let project_root = absolute_root(&cli.project_root)?;
    let merged = ConfigMerger::new(file_config).merge(&CliOverrides {
        project_root,
        stdio: cli.stdio.map(StdioMode::from),
        verbose: cli.verbose,
    });
    debug!(
        "merged config: settings={:?}, stdio={:?}",
        merged.settings, merged.stdio
    );

    match &cli.cmd {
        Command::Init(args) => {
            let options = command_options(&cli, &merged, args.platform);
            // Unknown configuration keys are rejected up front.
            load_descriptor(&merged.settings, &options)?;
            run_init(&merged.settings, &options, &ShellProcessPort)
        }
        Command::Sync(args) => {
            let options = command_options(&cli, &merged, args.platform);
            let descriptor = load_descriptor(&merged.settings, &options)?;
            run_sync(&merged.settings, &options, &descriptor, &ShellProcessPort)?;
            Ok(())
        }
        Command::Run(args) => {
            let options = command_options(&cli, &merged, args.platform);
            let descriptor = load_descriptor(&merged.settings, &options)?;
            run_run(&merged.settings, &options, &descriptor, &ShellProcessPort)?;
            Ok(())
        }
        Command::Build(args) => {
            let options = command_options(&cli, &merged, args.platform);
            let descriptor = load_descriptor(&merged.settings, &options)?;
            let outcome = run_build(&merged.settings, &options, &descriptor, &ShellProcessPort)?;
            println!("{}", outcome.artifact);
            Ok(())
        }
        Command::Configure(args) => cmd_configure(&cli, &merged, args),
        Command::ListConfigs(args) => cmd_list_configs(&merged, args),
        Command::Hook(HookCommand::BeforeSync) => cmd_before_sync(&merged),
    }
}

/// Artifact paths are reported relative to this, so it is made absolute once.
fn absolute_root(root: &Utf8Path) -> anyhow::Result<Utf8PathBuf> {
    let abs = std::path::absolute(root).with_context(|| format!("resolve project root {root}"))?;
    Utf8PathBuf::from_path_buf(abs).map_err(|p| anyhow!("non-utf8 project root {}", p.display()))
}

fn command_options(cli: &Cli, merged: &MergedConfig, platform: PlatformArg) -> CommandOptions {
    CommandOptions {
        platform: platform.into(),
        release: cli.release,
        config: cli.config.clone(),
        stdio: merged.stdio,
    }
}

fn cmd_configure(cli: &Cli, merged: &MergedConfig, args: &ConfigureArgs) -> anyhow::Result<()> {
    let options = command_options(cli, merged, args.platform);
    let descriptor = load_descriptor(&merged.settings, &options)?;
    let outcome = run_configure(&merged.settings, &options, &descriptor, args.dry_run)?;

    if args.dry_run {
        print!("{}", outcome.diff);
        for op in &outcome.summary.fs_ops {
            println!("# {op}");
        }
    }
    if let Some(report) = &outcome.report {
        for feature in &report.skipped {
            info!(platform = %options.platform, feature = %feature, "skipped");
        }
    }
    Ok(())
}

fn cmd_list_configs(merged: &MergedConfig, args: &ListConfigsArgs) -> anyhow::Result<()> {
    let path = merged.settings.profiles_path();
    let profiles = load_profiles(&path)?;
    let keys = profiles.config_keys();
    match args.format {
        OutputFormat::Text => {
            for key in keys {
                println!("{key}");
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&keys).context("serialize config keys")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn cmd_before_sync(merged: &MergedConfig) -> anyhow::Result<()> {
    let env = HookEnv::from_env();
    let root = env
        .root_dir
        .clone()
        .unwrap_or_else(|| merged.settings.project_root.clone());
    let profiles = root.join(&merged.settings.paths.profiles);

    match hooks::before_sync(&env, &profiles).context("before-sync hook")? {
        HookOutcome::Raised { podfile, to } => {
            info!(path = %podfile, min_ios_version = %to, "updated Podfile");
        }
        other => debug!(outcome = ?other, "before-sync: nothing to do"),
    }
    Ok(())
}

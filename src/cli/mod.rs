//! CLI mode for cf-download: argument parsing, setup checks and reporting.

mod progress;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tokio_util::sync::CancellationToken;

use crate::{
    AppConfig, AppTarget, CfCli, Downloader, Error, FileSystem, FilterList, PathContext, Result,
    TokioFileSystem,
};

use progress::{print_summary, spawn_spinner};

/// Parsed command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// App whose files are mirrored.
    pub app: String,
    /// Starting directory on the server, if not the app root.
    pub path: Option<String>,
    /// Write into an existing destination.
    pub overwrite: bool,
    /// Log every file instead of showing the spinner.
    pub verbose: bool,
    /// Semicolon-delimited paths to skip.
    pub omit: String,
    /// Maximum concurrent remote reads.
    pub routines: Option<usize>,
    /// App instance to read from.
    pub instance: u32,
    /// Retries for listings that fail transiently.
    pub listing_retries: Option<u32>,
    /// Explicit configuration file.
    pub config: Option<PathBuf>,
    /// Print usage and exit.
    pub help: bool,
}

impl CliArgs {
    /// Applies command-line overrides on top of the loaded configuration.
    #[must_use]
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(routines) = self.routines {
            config.download = config.download.with_max_concurrent_fetches(routines);
        }
        if self.overwrite {
            config.download.force_overwrite = true;
        }
        if let Some(attempts) = self.listing_retries {
            config.download.listing_retry.attempts = attempts;
        }
        config
    }
}

/// Parses `APP_NAME [PATH] [flags]`.
///
/// # Errors
///
/// Returns [`Error::Usage`] for a missing or misplaced app name, unknown
/// options, and missing or malformed flag values.
pub fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut parsed = CliArgs::default();

    let Some(first) = args.first() else {
        return Err(Error::Usage("missing app name".to_string()));
    };
    if matches!(first.as_str(), "-h" | "--help") {
        parsed.help = true;
        return Ok(parsed);
    }
    if first.starts_with('-') {
        return Err(Error::Usage(
            "app name begins with '-' or '--'. Correct usage: cf-download APP_NAME [--flags]".to_string(),
        ));
    }
    parsed.app.clone_from(first);

    let mut i = 1;
    if let Some(path) = args.get(1).filter(|a| !a.starts_with('-')) {
        parsed.path = Some(path.clone());
        i = 2;
    }

    while i < args.len() {
        match args[i].as_str() {
            "--overwrite" => parsed.overwrite = true,
            "--verbose" => parsed.verbose = true,
            "--omit" => parsed.omit = value(args, &mut i)?.to_string(),
            "--routines" => parsed.routines = Some(number(args, &mut i)?),
            "-i" => parsed.instance = number(args, &mut i)?,
            "--retry-listings" => parsed.listing_retries = Some(number(args, &mut i)?),
            "--config" => parsed.config = Some(PathBuf::from(value(args, &mut i)?)),
            "-h" | "--help" => parsed.help = true,
            arg if arg.starts_with('-') => {
                return Err(Error::Usage(format!("unknown option: {arg}")));
            }
            arg => return Err(Error::Usage(format!("unexpected argument: {arg}"))),
        }
        i += 1;
    }

    Ok(parsed)
}

/// Consumes the value following the flag at `args[*i]`.
fn value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| Error::Usage(format!("{flag} requires a value")))
}

fn number<T: FromStr>(args: &[String], i: &mut usize) -> Result<T> {
    let flag = &args[*i];
    let raw = value(args, i)?;
    raw.parse()
        .map_err(|_| Error::Usage(format!("invalid value for {flag}: {raw}")))
}

fn print_usage() {
    eprintln!("Usage: cf-download APP_NAME [PATH] [OPTIONS]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  APP_NAME                Cloud Foundry app to download from");
    eprintln!("  PATH                    Starting directory on the app (default: /)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --overwrite             Overwrite existing files");
    eprintln!("  --verbose               Verbose output");
    eprintln!("  --omit \"a/b;c\"          Omit directories or files delimited by semicolons");
    eprintln!("  --routines <N>          Max number of concurrent remote reads");
    eprintln!("  -i <N>                  App instance to download from (default: 0)");
    eprintln!("  --retry-listings <N>    Retry listings that hit a server error (default: 0)");
    eprintln!("  --config <PATH>         Configuration file");
    eprintln!("  -h, --help              Show this help");
    eprintln!();
    eprintln!("Paths listed in .cfignore in the working directory are also skipped.");
}

/// Returns the local directory a whole app is mirrored into.
#[must_use]
pub fn destination_root(working_dir: &Path, app: &str) -> PathBuf {
    working_dir.join(format!("{app}-download"))
}

/// Pairs the starting server path with its local directory.
#[must_use]
pub fn directory_context(working_dir: &Path, app: &str, path: Option<&str>) -> PathContext {
    let root = destination_root(working_dir, app);
    match path.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(path) => PathContext::root(path, root.join(path)),
        None => PathContext::root("/", root),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "info" } else { "error" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

/// Runs the CLI with the given arguments (program name excluded).
///
/// # Errors
///
/// Returns an error if setup fails: bad arguments, `CF_TRACE` enabled, an
/// existing destination without `--overwrite`, an unreadable config or
/// ignore file, or an unlistable starting directory.
pub async fn run(args: Vec<String>) -> Result<()> {
    let args = parse_args(&args).inspect_err(|_| print_usage())?;
    if args.help {
        print_usage();
        return Ok(());
    }
    init_logging(args.verbose);

    if std::env::var("CF_TRACE").is_ok_and(|v| v.eq_ignore_ascii_case("true")) {
        return Err(Error::TraceEnabled);
    }

    let config_path = args.config.clone().unwrap_or_else(AppConfig::default_path);
    let config = args.apply(AppConfig::load(&config_path)?);

    let working_dir = std::env::current_dir()?;
    let root = directory_context(&working_dir, &args.app, args.path.as_deref());
    if TokioFileSystem.path_exists(root.local_path()).await && !config.download.force_overwrite {
        return Err(Error::DestinationExists {
            path: root.local_path().to_path_buf(),
        });
    }

    let filter = FilterList::load(&working_dir.join(config.ignore_file()), &args.omit).await?;

    let cancel = CancellationToken::new();
    let downloader = Downloader::new(
        CfCli::new(config.remote.program.clone()),
        AppTarget::new(&args.app, args.instance),
        config.download.clone(),
    )
    .with_filter(filter)
    .with_cancellation(cancel.clone());

    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, finishing in-flight work");
                cancel.cancel();
            }
        })
    };

    let stop_spinner = CancellationToken::new();
    let spinner = (!args.verbose).then(|| spawn_spinner(downloader.state(), stop_spinner.clone()));

    let result = downloader.run(root).await;

    stop_spinner.cancel();
    if let Some(spinner) = spinner {
        let _ = spinner.await;
    }
    interrupt.abort();

    print_summary(&result?, &args.app);
    Ok(())
}

use clap::Parser;
use derive_more::{Display, Error};
use exn::ResultExt;
use platter_config::Config;
use platter_library::{Context, RunSummary, Toolchain};
use platter_media::{Ffmpeg, JpegSquare};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Convert album folders of WAV recordings into tagged AAC files.
///
/// Every directory in the library root named `<year> <album>` is processed:
/// `in/<order> <title> - <composer>.WAV` becomes
/// `out/<order> <title> - <composer>.m4a`, with `art.png` embedded as the
/// cover when present. Unchanged tracks are skipped.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Library root containing the album directories.
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Extra configuration file (TOML or YAML), applied over any others.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log more (repeat for even more).
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,
    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn level(&self) -> LevelFilter {
        match (self.quiet, self.verbose) {
            (true, _) => LevelFilter::WARN,
            (false, 0) => LevelFilter::INFO,
            (false, 1) => LevelFilter::DEBUG,
            (false, _) => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Display, Error)]
enum CliError {
    #[display("invalid configuration")]
    Config,
    #[display("required tools are unavailable")]
    Toolchain,
    #[display("library run failed")]
    Run,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let filter = EnvFilter::builder().with_default_directive(cli.level().into()).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    match execute(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

fn execute(cli: &Cli) -> Result<RunSummary, exn::Exn<CliError>> {
    let config = Config::load(&cli.root, cli.config.as_deref()).or_raise(|| CliError::Config)?;
    let ffmpeg = Ffmpeg::new(config.ffmpeg.as_deref(), &config.bitrate).or_raise(|| CliError::Toolchain)?;
    let tools = Toolchain {
        encoder: &ffmpeg,
        tagger: &ffmpeg,
        resizer: &JpegSquare,
    };
    let ctx = Context::open(&cli.root, &config.cache_dir)
        .or_raise(|| CliError::Run)?
        .with_artist(&config.artist)
        .with_cover_size(config.cover_size)
        .with_ignored(&config.ignore);
    platter_library::run(&ctx, tools).or_raise(|| CliError::Run)
}

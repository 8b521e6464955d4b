mod create;
mod output;
mod progress;
mod update;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use parcel_pm::{transport_from_config, Config, Distributor};

use output::{Output, Verbosity};

#[derive(Parser, Debug)]
#[command(name = "parcel")]
#[command(about = "Build, publish and fetch package archives")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Use the given directory as working directory
    #[arg(short = 'd', long, global = true, value_name = "DIR")]
    working_dir: Option<PathBuf>,

    /// Remote store (http(s) URL, file URL or directory), overrides the configuration
    #[arg(long, global = true, value_name = "LOCATION")]
    remote: Option<String>,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Disable progress output
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build an archive from a manifest and upload it to the remote store
    Create(create::CreateArgs),

    /// Download and extract every dependency listed in a manifest
    Update(update::UpdateArgs),
}

/// State shared by the commands
pub struct CommandContext {
    pub working_dir: PathBuf,
    pub remote: Option<String>,
    pub output: Output,
    pub progress: bool,
}

impl CommandContext {
    /// Resolve a path given on the command line against the working directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.working_dir.join(path)
    }

    /// Build a distributor for the working directory using the layered configuration
    pub fn distributor(&self) -> parcel_pm::Result<Distributor> {
        let mut config = Config::build(true)?;
        if let Some(remote) = &self.remote {
            config.set_remote_url(remote.clone());
        }

        let transport = transport_from_config(&config.remote)?;
        log::debug!(
            "Using remote store {} (configured by {:?})",
            transport.endpoint(),
            config.source_of("url")
        );

        Ok(Distributor::new(&self.working_dir, transport))
    }
}

fn verbosity(args: &Args) -> Verbosity {
    if args.quiet {
        return Verbosity::Quiet;
    }
    match args.verbose {
        0 => Verbosity::Normal,
        1 => Verbosity::Verbose,
        2 => Verbosity::VeryVerbose,
        _ => Verbosity::Debug,
    }
}

fn init_logging(verbosity: Verbosity) {
    let level = match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "info",
        Verbosity::VeryVerbose => "debug",
        Verbosity::Debug => "trace",
    };

    // RUST_LOG still wins when set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run() -> Result<i32> {
    let args = Args::parse();

    let verbosity = verbosity(&args);
    init_logging(verbosity);

    let working_dir = match &args.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let mut output = Output::new();
    output.set_verbosity(verbosity);

    let ctx = CommandContext {
        working_dir,
        remote: args.remote.clone(),
        progress: !args.no_progress && !output.is_quiet(),
        output,
    };

    match args.command {
        Commands::Create(create_args) => create::execute(create_args, &ctx),
        Commands::Update(update_args) => update::execute(update_args, &ctx),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_with_global_flags() {
        let args = Args::try_parse_from([
            "parcel", "create", "parcel.json", "-d", "/tmp/project", "--remote", "/srv/store", "-vv",
        ])
        .unwrap();

        assert_eq!(args.working_dir, Some(PathBuf::from("/tmp/project")));
        assert_eq!(args.remote.as_deref(), Some("/srv/store"));
        assert_eq!(verbosity(&args), Verbosity::VeryVerbose);
        match args.command {
            Commands::Create(create_args) => assert_eq!(create_args.manifest, PathBuf::from("parcel.json")),
            other => panic!("expected create, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_update_quiet() {
        let args = Args::try_parse_from(["parcel", "-q", "update", "deps.json"]).unwrap();

        assert_eq!(verbosity(&args), Verbosity::Quiet);
        assert!(matches!(args.command, Commands::Update(_)));
    }

    #[test]
    fn test_manifest_argument_is_required() {
        assert!(Args::try_parse_from(["parcel", "update"]).is_err());
        assert!(Args::try_parse_from(["parcel", "-q", "-v", "create", "m.json"]).is_err());
    }

    #[test]
    fn test_resolve_against_working_dir() {
        let ctx = CommandContext {
            working_dir: PathBuf::from("/work"),
            remote: None,
            output: Output::new(),
            progress: false,
        };

        assert_eq!(ctx.resolve(Path::new("parcel.json")), PathBuf::from("/work/parcel.json"));
        assert_eq!(ctx.resolve(Path::new("/abs/parcel.json")), PathBuf::from("/abs/parcel.json"));
    }
}

use anyhow::Result;
use clap::Parser;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod link;
mod mapping;
mod paths;
mod structs;

pub use structs::*;

pub const PROGRAM: &str = "RescueSymlinkProgram";

/// A minimal functionality SymlinkProgram that can be used when the
/// original script is not working.
#[derive(Debug, Parser)]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Installation directory of the program, e.g. /Programs/Glibc/Current
    package: PathBuf,
    /// Index to link into, defaults to /System/Index
    index: Option<PathBuf>,
    /// Ignored
    #[arg(hide = true)]
    extra: Vec<OsString>,
}

impl Cli {
    /// Parses everything after `argv0` as plain positionals, so `--help` or
    /// `-foo` past the first argument are just paths.
    fn parse_paths(argv0: &OsStr, rest: &[OsString]) -> Result<Self, clap::Error> {
        let args = [argv0, OsStr::new("--")]
            .into_iter()
            .chain(rest.iter().map(OsString::as_os_str));
        Self::try_parse_from(args)
    }
}

fn print_usage(argv0: &str) {
    eprintln!("{PROGRAM}");
    eprintln!(
        "A minimal functionality SymlinkProgram that can be used when the original script is not working."
    );
    eprintln!("Usage:   {argv0} <program_path> [goboIndex]");
    eprintln!("Example: {argv0} /Programs/Glibc/Current /System/Index");
}

fn config_trace() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_env_filter(filter)
        .init();
}

fn run(package: &Path, index: Option<&Path>) -> Result<()> {
    warn!("{PROGRAM}: Warning, this script should only be used when SymlinkProgram fails.");
    let default_index = config::GlobalConfig::load().default_index();
    let roots = config::resolve_roots(package, index, &default_index)?;
    if roots.index_defaulted {
        debug!("{PROGRAM}: index taken from default {}", default_index.display());
    }
    info!(
        "{PROGRAM}: Linking {} inside {}",
        roots.package.display(),
        roots.index.display()
    );
    link::link_all(&roots);
    info!("{PROGRAM}: Done");
    Ok(())
}

/// Usage is only asked for by a missing first argument or a first
/// argument that is exactly `--help`.
fn app<I: IntoIterator<Item = OsString>>(args: I) -> ExitCode {
    let args: Vec<OsString> = args.into_iter().collect();
    let argv0 = args
        .first()
        .map(|a| a.to_string_lossy().into_owned())
        .unwrap_or_else(|| PROGRAM.to_owned());
    let rest = args.get(1..).unwrap_or_default();
    if rest.first().is_none_or(|a| a == "--help") {
        print_usage(&argv0);
        return ExitCode::FAILURE;
    }
    let cli = match Cli::parse_paths(OsStr::new(&argv0), rest) {
        Ok(cli) => cli,
        Err(e) => {
            eprint!("{e}");
            print_usage(&argv0);
            return ExitCode::FAILURE;
        }
    };
    if !cli.extra.is_empty() {
        debug!("{PROGRAM}: ignoring extra arguments {:?}", cli.extra);
    }
    match run(&cli.package, cli.index.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{PROGRAM}: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    config_trace();
    app(std::env::args_os())
}

#[cfg(test)]
fn args<const N: usize>(a: [&str; N]) -> Vec<OsString> {
    a.into_iter().map(OsString::from).collect()
}

#[test]
fn test_cli_paths() -> Result<()> {
    let argv0 = OsStr::new(PROGRAM);
    let cli = Cli::parse_paths(argv0, &args(["/Programs/Glibc/Current"]))?;
    assert_eq!(cli.package, PathBuf::from("/Programs/Glibc/Current"));
    assert!(cli.index.is_none());
    let cli = Cli::parse_paths(argv0, &args(["/Programs/Glibc/Current", "/Mount/Index"]))?;
    assert_eq!(cli.index.as_deref(), Some(Path::new("/Mount/Index")));
    Ok(())
}

#[test]
fn test_cli_help_past_first_is_a_path() -> Result<()> {
    let argv0 = OsStr::new(PROGRAM);
    let cli = Cli::parse_paths(argv0, &args(["/Programs/Glibc/Current", "--help"]))?;
    assert_eq!(cli.package, PathBuf::from("/Programs/Glibc/Current"));
    assert_eq!(cli.index.as_deref(), Some(Path::new("--help")));
    Ok(())
}

#[test]
fn test_cli_ignores_extra_and_hyphen_paths() -> Result<()> {
    let argv0 = OsStr::new(PROGRAM);
    let cli = Cli::parse_paths(argv0, &args(["/pkg", "/idx", "extra", "--more"]))?;
    assert_eq!(cli.index.as_deref(), Some(Path::new("/idx")));
    assert_eq!(cli.extra, args(["extra", "--more"]));
    let cli = Cli::parse_paths(argv0, &args(["-pkgdir"]))?;
    assert_eq!(cli.package, PathBuf::from("-pkgdir"));
    Ok(())
}

#[test]
fn test_app_usage_exits_failure() {
    assert_eq!(app(args([])), ExitCode::FAILURE);
    assert_eq!(app(args([PROGRAM])), ExitCode::FAILURE);
    assert_eq!(app(args([PROGRAM, "--help"])), ExitCode::FAILURE);
    assert_eq!(app(args([PROGRAM, "--help", "/tmp"])), ExitCode::FAILURE);
}

#[test]
fn test_app_missing_package_exits_failure() {
    assert_eq!(app(args([PROGRAM, "/nonexistent/package"])), ExitCode::FAILURE);
    assert_eq!(app(args([PROGRAM, "-pkgdir"])), ExitCode::FAILURE);
}

#[test]
fn test_app_links_and_exits_success() -> Result<()> {
    let tmp = tempfile::TempDir::new()?;
    let package = tmp.path().join("Programs/Glibc/2.31");
    let index = tmp.path().join("System/Index");
    std::fs::create_dir_all(package.join("bin"))?;
    std::fs::create_dir_all(index.join("bin"))?;
    std::fs::write(package.join("bin/ldd"), "ldd")?;
    let code = app([
        OsString::from(PROGRAM),
        package.clone().into_os_string(),
        index.clone().into_os_string(),
        OsString::from("extra"),
    ]);
    assert_eq!(code, ExitCode::SUCCESS);
    assert_eq!(std::fs::read_link(index.join("bin/ldd"))?, package.join("bin/ldd"));
    Ok(())
}

#[test]
fn test_run_rejects_missing_package() {
    let err = run(Path::new("/nonexistent/package"), None).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/package"));
}

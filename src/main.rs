//! Safe Browsing scanner CLI.

use clap::{ArgAction, Parser};
use sbscan::config::{default_input_path, default_users_dir};
use sbscan::status::CODE_INVALID;
use sbscan::{Config, SafeBrowsingClient, SafeBrowsingConfig, Scanner, SuspensionOracle};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const EXIT_CODE_HELP: &str = "\
Exit codes (bitwise OR of the following):
  0  if and only if all URLs were looked up and are safe
  1  if at least one URL is not safe
  2  if at least one URL lookup failed
  4  if the input was invalid";

#[derive(Parser, Debug)]
#[command(name = "sbscan")]
#[command(
    about = "Look up cPanel-hosted domains with Google Safe Browsing.\n\
             Reads 'domain: account' lines, skips suspended accounts, and prints\n\
             a report for every URL flagged by the Safe Browsing API."
)]
#[command(version)]
#[command(after_help = EXIT_CODE_HELP)]
struct Args {
    /// Safe Browsing API key
    #[arg(long, value_name = "KEY")]
    apikey: Option<String>,

    /// Path to the verdict cache database. Persistence is disabled when unset.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Path to the userdomains file containing 'domain: account' lines
    #[arg(short = 'f', long = "file", default_value_os_t = default_input_path())]
    file: PathBuf,

    /// Ignore suspended accounts
    #[arg(long, default_value_t = true, action = ArgAction::Set, value_name = "BOOL")]
    ignoresuspended: bool,

    /// Directory holding cPanel per-account status files
    #[arg(long, default_value_os_t = default_users_dir())]
    users_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging. Stdout carries the verdict stream, so every
    // diagnostic goes to stderr.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let api_key = match args.apikey {
        Some(key) if !key.is_empty() => key,
        _ => {
            eprintln!("No --apikey specified");
            return ExitCode::from(CODE_INVALID);
        }
    };

    let config = Config {
        input_path: args.file,
        users_dir: args.users_dir,
        ignore_suspended: args.ignoresuspended,
        db_path: args.db,
        safebrowsing: SafeBrowsingConfig::with_api_key(api_key),
    };

    if let Err(e) = config.validate() {
        eprintln!("Unable to initialize Safe Browsing client: {}", e);
        return ExitCode::from(CODE_INVALID);
    }

    let client = match SafeBrowsingClient::new(config.safebrowsing.clone(), config.db_path.clone())
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Unable to initialize Safe Browsing client: {}", e);
            return ExitCode::from(CODE_INVALID);
        }
    };

    let input = match File::open(&config.input_path) {
        Ok(file) => BufReader::new(file),
        Err(e) => {
            eprintln!("Unable to open file {}: {}", config.input_path.display(), e);
            return ExitCode::from(CODE_INVALID);
        }
    };

    let oracle = SuspensionOracle::new(&config.users_dir);
    let mut scanner = Scanner::new(&client, oracle, config.ignore_suspended);

    let flags = match scanner
        .run(input, &mut io::stdout(), &mut io::stderr())
        .await
    {
        Ok(flags) => flags,
        Err(e) => {
            // A scanner that cannot emit verdicts has produced an invalid run
            eprintln!("Unable to write output: {}", e);
            return ExitCode::from(CODE_INVALID);
        }
    };

    client.save_cache();

    ExitCode::from(flags.code())
}

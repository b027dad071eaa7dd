//! modsync CLI - mirror a Go module proxy to a local directory.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use commands::{get, list, sync};

#[derive(Parser)]
#[command(name = "modsync")]
#[command(about = "Mirror proxy.golang.org to a local directory", long_about = None)]
#[command(version = modsync::VERSION)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Config file (default: <config dir>/modsync/config.ini)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Continuously mirror new versions listed by the module index
    Sync(sync::SyncArgs),

    /// Mirror a single module version and its dependencies
    Get(get::GetArgs),

    /// Print index records as JSON lines
    List(list::ListArgs),

    /// Display version details
    Version,
}

fn main() {
    let cli = Cli::parse();

    let _log_guard = match modsync::logging::init(cli.verbose, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Sync(args) => sync::run(args, config),
        Commands::Get(args) => get::run(args, config),
        Commands::List(args) => list::run(args, config),
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_get_with_version() {
        let cli = Cli::try_parse_from([
            "modsync",
            "--verbose",
            "get",
            "golang.org/x/text",
            "--module-version",
            "v0.3.0",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Get(args) => {
                assert_eq!(args.module, "golang.org/x/text");
                assert_eq!(args.module_version, "v0.3.0");
            }
            _ => panic!("expected get"),
        }
    }

    #[test]
    fn test_parse_list_defaults() {
        let cli = Cli::try_parse_from(["modsync", "list"]).unwrap();
        match cli.command {
            Commands::List(args) => {
                assert_eq!(args.limit, 100);
                assert!(args.since.is_none());
            }
            _ => panic!("expected list"),
        }
    }
}

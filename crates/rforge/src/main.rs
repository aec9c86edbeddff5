mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "rforge", version, about = "Telemetry link and record tooling")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true, env = "RFORGE_FORMAT")]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "text",
        global = true,
        env = "RFORGE_LOG_FORMAT"
    )]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        global = true,
        env = "RFORGE_LOG_LEVEL"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_encode_subcommand() {
        let cli = Cli::try_parse_from(["rforge", "encode", "--command", "ping", "--data", "ABC"])
            .expect("encode args should parse");
        assert!(matches!(cli.command, Command::Encode(_)));
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "rforge", "encode", "--command", "ping", "--hex", "4142", "--data", "AB",
        ])
        .expect_err("conflicting args should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_stats_subcommand() {
        let cli = Cli::try_parse_from([
            "rforge", "stats", "/tmp/run.rfr", "--channel", "2", "--window", "500",
        ])
        .expect("stats args should parse");
        match cli.command {
            Command::Stats(args) => {
                assert_eq!(args.channel, 2);
                assert_eq!(args.window, 500);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["rforge", "replay", "/tmp/run.rfr", "--format", "pretty"])
            .expect("replay args should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Pretty)));
    }
}

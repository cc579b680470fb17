// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `autorunner`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "autorunner",
    version,
    about = "Run package-manager installs and scripts, stream their output and watch for source changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `autorunner.toml` in the project directory, if present.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `AUTORUNNER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Project directory containing `package.json`.
    #[arg(long, value_name = "DIR", default_value = ".", global = true)]
    pub project: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the scripts declared in `package.json`.
    Scripts,

    /// Install dependencies with the project's package manager.
    Install,

    /// Delete the dependency directory, then install.
    Reinstall {
        /// Do not ask for confirmation.
        #[arg(long, short)]
        yes: bool,
    },

    /// Run a `package.json` script.
    Run {
        script: String,

        /// Keep watching source files after the script ends (until Ctrl-C).
        #[arg(long)]
        watch: bool,
    },

    /// Only watch source files and report changes (until Ctrl-C).
    Watch,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "autorunner",
            "run",
            "dev",
            "--watch",
            "--project",
            "web",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.project, PathBuf::from("web"));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(matches!(args.command, Command::Run { ref script, watch: true } if script == "dev"));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(CliArgs::try_parse_from(["autorunner"]).is_err());
    }

    #[test]
    fn reinstall_short_yes() {
        let args = CliArgs::try_parse_from(["autorunner", "reinstall", "-y"]).unwrap();
        assert!(matches!(args.command, Command::Reinstall { yes: true }));
        assert_eq!(args.project, PathBuf::from("."));
        assert!(args.config.is_none());
    }
}

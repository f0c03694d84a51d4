use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::view::{PriorityFilter, SortMode, StatusFilter};

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "slate",
    version,
    about = "Slate: a small local task list",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    /// Config file to read instead of $SLATERC or ~/.slaterc.
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Storage directory, overriding data.location.
    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a task to the top of the list.
    Add {
        /// high | medium | low; anything else means medium.
        #[arg(short, long, default_value = "medium")]
        priority: String,
        /// Words of the task; put text starting with `-` after `--`.
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Flip a task between active and completed.
    Toggle {
        /// Task id or a unique prefix of one.
        id: String,
    },

    /// Remove a task.
    Delete {
        /// Task id or a unique prefix of one.
        id: String,
    },

    /// Show tasks (the default command).
    List {
        #[arg(long, value_enum)]
        filter: Option<StatusFilter>,
        #[arg(long, value_enum)]
        priority: Option<PriorityFilter>,
        #[arg(long, value_enum)]
        sort: Option<SortMode>,
    },

    /// Print the number of incomplete tasks.
    Count,

    /// Interactive session reading commands from stdin.
    Shell,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls `rc.key=value` / `rc.key:value` words out of the argument list so
/// they work in any position.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<OsString> {
        words.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_removed() {
        let pre = preprocess_args(&args(&["slate", "rc.color=off", "list", "rc.default.sort:priority"]))
            .expect("preprocess");
        assert_eq!(pre.cleaned_args, args(&["slate", "list"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.default.sort".to_string(), "priority".to_string()),
            ]
        );
    }

    #[test]
    fn add_collects_trailing_words() {
        let cli = GlobalCli::try_parse_from(["slate", "add", "-p", "high", "Buy", "milk"]).expect("parse");
        match cli.command {
            Some(Command::Add { priority, text }) => {
                assert_eq!(priority, "high");
                assert_eq!(text.join(" "), "Buy milk");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn add_priority_may_follow_text() {
        let cli = GlobalCli::try_parse_from(["slate", "add", "Buy", "milk", "-p", "high"]).expect("parse");
        match cli.command {
            Some(Command::Add { priority, text }) => {
                assert_eq!(priority, "high");
                assert_eq!(text, vec!["Buy", "milk"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = GlobalCli::try_parse_from(["slate", "add", "--", "-5", "degrees"]).expect("parse");
        match cli.command {
            Some(Command::Add { priority, text }) => {
                assert_eq!(priority, "medium");
                assert_eq!(text.join(" "), "-5 degrees");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn list_accepts_value_aliases() {
        let cli = GlobalCli::try_parse_from(["slate", "list", "--sort", "createdAt", "--filter", "active"])
            .expect("parse");
        match cli.command {
            Some(Command::List { filter, priority, sort }) => {
                assert_eq!(filter, Some(StatusFilter::Active));
                assert_eq!(priority, None);
                assert_eq!(sort, Some(SortMode::Created));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rc_flag_parses_key_value() {
        let cli = GlobalCli::try_parse_from(["slate", "--rc", "color=off", "count"]).expect("parse");
        assert_eq!(cli.rc_overrides.len(), 1);
        assert_eq!(cli.rc_overrides[0].key, "color");
        assert_eq!(cli.rc_overrides[0].value, "off");
    }
}

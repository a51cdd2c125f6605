use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use holoboard_core::admin::AdminCommand;
use holoboard_core::{CONFIG_FILE, Location, SenderKind, Ticks, parse_ticks};

#[derive(Parser, Debug)]
#[command(name = "holoboard", version, about = "Command-driven floating scoreboards")]
pub struct Cli {
    /// Board config file [default: ./boards.toml, else the user config dir]
    #[arg(short, long, env = "HOLOBOARD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.config {
            return path.clone();
        }
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .map(|dir| dir.join("holoboard").join(CONFIG_FILE))
            .unwrap_or(local)
    }
}

/// Options for commands that host the engine
#[derive(Args, Debug, Clone)]
pub struct HostArgs {
    /// Directory boards are rendered into, one file per board
    #[arg(short, long, default_value = "holograms")]
    pub output: PathBuf,

    /// Milliseconds per scheduler tick
    #[arg(long, default_value_t = 50)]
    pub tick_ms: u64,

    /// Seconds before a board command is killed
    #[arg(long, default_value_t = 30)]
    pub command_timeout: u64,
}

impl HostArgs {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Host the engine until Ctrl+C or `quit` on the console
    Run {
        #[command(flatten)]
        host: HostArgs,

        /// Load boards immediately instead of after `delay_after_enable`
        #[arg(long)]
        now: bool,
    },
    /// Refresh every board once and print the results
    Refresh {
        #[command(flatten)]
        host: HostArgs,
    },
    /// List configured boards
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a board
    Create {
        id: String,
        /// world:x,y,z
        location: Location,
        #[arg(value_parser = duration)]
        interval: Ticks,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Delete a board
    Remove { id: String },
    /// Change how often a board refreshes
    SetInterval {
        id: String,
        #[arg(value_parser = duration)]
        interval: Ticks,
    },
    /// Change how long a board waits for command output
    SetDelay {
        id: String,
        #[arg(value_parser = duration)]
        delay: Ticks,
    },
    /// Replace a board's filters (pattern=replacement); none clears them
    SetFilter { id: String, filters: Vec<String> },
    /// Move a board (world:x,y,z)
    SetLocation { id: String, location: Location },
    /// Change the command a board runs
    SetCommand {
        id: String,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Run a board's command as PLAYER or CONSOLE
    SetSender {
        id: String,
        sender: SenderKind,
    },
}

fn duration(text: &str) -> Result<Ticks, String> {
    parse_ticks(text).map_err(|e| e.to_string())
}

impl Command {
    /// The config edit this subcommand stands for, if it is one
    pub fn edit(&self) -> Option<AdminCommand> {
        let edit = match self {
            Self::Create {
                id,
                location,
                interval,
                command,
            } => AdminCommand::Create {
                id: id.clone(),
                location: location.clone(),
                interval: *interval,
                command: command.join(" "),
            },
            Self::Remove { id } => AdminCommand::Remove { id: id.clone() },
            Self::SetInterval { id, interval } => AdminCommand::Interval {
                id: id.clone(),
                interval: *interval,
            },
            Self::SetDelay { id, delay } => AdminCommand::Delay {
                id: id.clone(),
                delay: *delay,
            },
            Self::SetFilter { id, filters } => AdminCommand::Filter {
                id: id.clone(),
                filters: filters.clone(),
            },
            Self::SetLocation { id, location } => AdminCommand::Location {
                id: id.clone(),
                location: location.clone(),
            },
            Self::SetCommand { id, command } => AdminCommand::Command {
                id: id.clone(),
                command: command.join(" "),
            },
            Self::SetSender { id, sender } => AdminCommand::Sender {
                id: id.clone(),
                sender: *sender,
            },
            Self::Run { .. } | Self::Refresh { .. } | Self::List { .. } => return None,
        };
        Some(edit)
    }
}

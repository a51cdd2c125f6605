//! Administrative commands.
//!
//! A console line such as `interval top 5m` parses into an [`AdminCommand`].
//! Durations, locations, sender kinds and filters are validated while
//! parsing, so a command that parsed can only fail on a missing board.
//!
//! Commands run either against a live [`Engine`] ([`AdminCommand::execute`])
//! or, for edits, directly against a [`BoardConfig`]
//! ([`AdminCommand::apply`]) when no engine is running.

use std::fmt::Write;
use std::sync::Arc;

use tracing::info;

use crate::board::{Board, BoardSettings, RefreshOutcome};
use crate::capture::SenderKind;
use crate::config::{BoardConfig, BoardDefinition};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::filter::FilterChain;
use crate::location::Location;
use crate::time::{Ticks, format_ticks, parse_ticks};

pub const USAGE: &str = "\
create <id> <world:x,y,z> <interval> <command...>
remove <id>
interval <id> <interval>
delay <id> <delay>
filter <id> [pattern=replacement...]
location <id> <world:x,y,z>
command <id> <command...>
sender <id> <PLAYER|CONSOLE>
refresh [id]
list
info <id>
save
reload";

#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    Create {
        id: String,
        location: Location,
        interval: Ticks,
        command: String,
    },
    Remove {
        id: String,
    },
    Interval {
        id: String,
        interval: Ticks,
    },
    Delay {
        id: String,
        delay: Ticks,
    },
    /// Replace the filter chain; no definitions clears it
    Filter {
        id: String,
        filters: Vec<String>,
    },
    Location {
        id: String,
        location: Location,
    },
    Command {
        id: String,
        command: String,
    },
    Sender {
        id: String,
        sender: SenderKind,
    },
    /// Refresh one board, or every board
    Refresh {
        id: Option<String>,
    },
    List,
    Info {
        id: String,
    },
    Save,
    Reload,
}

fn usage(verb: &str) -> Error {
    let line = USAGE
        .lines()
        .find(|l| l.split_whitespace().next() == Some(verb))
        .unwrap_or(verb);
    Error::InvalidCommand(format!("usage: {line}"))
}

impl AdminCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let words = shell_words::split(line).map_err(|e| Error::InvalidCommand(e.to_string()))?;
        let Some((verb, args)) = words.split_first() else {
            return Err(Error::InvalidCommand("empty command".to_string()));
        };
        let verb = verb.to_ascii_lowercase();
        let bad = || usage(&verb);

        let command = match (verb.as_str(), args) {
            ("create", [id, location, interval, command @ ..]) if !command.is_empty() => {
                Self::Create {
                    id: id.clone(),
                    location: location.parse()?,
                    interval: parse_ticks(interval)?,
                    command: command.join(" "),
                }
            }
            ("remove", [id]) => Self::Remove { id: id.clone() },
            ("interval", [id, interval]) => Self::Interval {
                id: id.clone(),
                interval: parse_ticks(interval)?,
            },
            ("delay", [id, delay]) => Self::Delay {
                id: id.clone(),
                delay: parse_ticks(delay)?,
            },
            ("filter", [id, filters @ ..]) => {
                FilterChain::parse(filters)?;
                Self::Filter {
                    id: id.clone(),
                    filters: filters.to_vec(),
                }
            }
            ("location", [id, location]) => Self::Location {
                id: id.clone(),
                location: location.parse()?,
            },
            ("command", [id, command @ ..]) if !command.is_empty() => Self::Command {
                id: id.clone(),
                command: command.join(" "),
            },
            ("sender", [id, sender]) => Self::Sender {
                id: id.clone(),
                sender: sender
                    .parse()
                    .map_err(|_| Error::InvalidCommand(format!("unknown sender '{sender}'")))?,
            },
            ("refresh", []) => Self::Refresh { id: None },
            ("refresh", [id]) => Self::Refresh {
                id: Some(id.clone()),
            },
            ("list", []) => Self::List,
            ("info", [id]) => Self::Info { id: id.clone() },
            ("save", []) => Self::Save,
            ("reload", []) => Self::Reload,
            (
                "create" | "remove" | "interval" | "delay" | "filter" | "location" | "command"
                | "sender" | "refresh" | "list" | "info" | "save" | "reload",
                _,
            ) => return Err(bad()),
            _ => return Err(Error::InvalidCommand(format!("unknown command '{verb}'"))),
        };
        Ok(command)
    }

    /// Whether the command changes board definitions
    pub fn is_edit(&self) -> bool {
        matches!(
            self,
            Self::Create { .. }
                | Self::Remove { .. }
                | Self::Interval { .. }
                | Self::Delay { .. }
                | Self::Filter { .. }
                | Self::Location { .. }
                | Self::Command { .. }
                | Self::Sender { .. }
        )
    }

    /// Run against a live engine. Edits are saved to the config file right
    /// away.
    pub fn execute(&self, engine: &Engine) -> Result<String> {
        let registry = engine.registry()?;
        if self.is_edit() {
            engine.prepare_edit()?;
        }
        let board = |id: &str| -> Result<Arc<Board>> {
            registry
                .get(id)
                .ok_or_else(|| Error::BoardNotFound(id.to_string()))
        };

        let reply = match self {
            Self::Create {
                id,
                location,
                interval,
                command,
            } => {
                let settings = BoardSettings {
                    interval: *interval,
                    ..BoardSettings::new(command.clone(), location.clone())
                };
                registry.create(id.clone(), settings)?;
                format!("Created board {id}")
            }
            Self::Remove { id } => {
                registry.remove(&*board(id)?);
                format!("Removed board {id}")
            }
            Self::Interval { id, interval } => {
                registry.set_interval(id, *interval)?;
                format!("Board {id} refreshes every {}", format_ticks(*interval))
            }
            Self::Delay { id, delay } => {
                board(id)?.set_delay(*delay);
                format!("Board {id} reads output after {}", format_ticks(*delay))
            }
            Self::Filter { id, filters } => {
                let chain = FilterChain::parse(filters)?;
                board(id)?.set_filters(chain);
                format!("Board {id} has {} filters", filters.len())
            }
            Self::Location { id, location } => {
                board(id)?.set_location(location.clone());
                format!("Board {id} moved to {location}")
            }
            Self::Command { id, command } => {
                board(id)?.set_command(command.clone());
                format!("Board {id} runs '{command}'")
            }
            Self::Sender { id, sender } => {
                board(id)?.set_sender(*sender);
                format!("Board {id} runs as {sender}")
            }
            Self::Refresh { id: Some(id) } => {
                let outcome = board(id)?.refresh(registry.host());
                describe_outcome(id, outcome)
            }
            Self::Refresh { id: None } => {
                let count = registry.refresh_all().len();
                registry.host().messages().refresh_all(count)
            }
            Self::List => list(&registry.boards()),
            Self::Info { id } => info_text(&*board(id)?),
            Self::Save => {
                let count = engine.save()?;
                format!("Saved {count} boards to {}", engine.config_path().display())
            }
            Self::Reload => {
                let count = engine.reload()?;
                format!("Reloaded {count} boards")
            }
        };

        if self.is_edit() {
            engine.save()?;
        }
        info!("{}", reply);
        Ok(reply)
    }

    /// Apply an edit straight to a config, without a running engine.
    pub fn apply(&self, config: &mut BoardConfig) -> Result<String> {
        match self {
            Self::Create {
                id,
                location,
                interval,
                command,
            } => {
                if config.boards.contains_key(id) {
                    return Err(Error::DuplicateBoard(id.clone()));
                }
                let definition = BoardDefinition {
                    interval: format_ticks(*interval),
                    ..BoardDefinition::new(command.clone(), location.clone())
                };
                config.boards.insert(id.clone(), definition);
                Ok(format!("Created board {id}"))
            }
            Self::Remove { id } => {
                config
                    .boards
                    .remove(id)
                    .ok_or_else(|| Error::BoardNotFound(id.clone()))?;
                Ok(format!("Removed board {id}"))
            }
            _ if self.is_edit() => {
                let id = self.board_id().unwrap_or_default();
                let definition = config
                    .boards
                    .get_mut(id)
                    .ok_or_else(|| Error::BoardNotFound(id.to_string()))?;
                self.edit_definition(id, definition)
            }
            _ => Err(Error::InvalidCommand(
                "this command needs a running engine".to_string(),
            )),
        }
    }

    fn edit_definition(&self, id: &str, def: &mut BoardDefinition) -> Result<String> {
        let reply = match self {
            Self::Interval { interval, .. } => {
                def.interval = format_ticks(*interval);
                format!("Board {id} refreshes every {}", def.interval)
            }
            Self::Delay { delay, .. } => {
                def.delay = format_ticks(*delay);
                format!("Board {id} reads output after {}", def.delay)
            }
            Self::Filter { filters, .. } => {
                FilterChain::parse(filters)?;
                def.filters = filters.clone();
                format!("Board {id} has {} filters", filters.len())
            }
            Self::Location { location, .. } => {
                def.location = location.clone();
                format!("Board {id} moved to {location}")
            }
            Self::Command { command, .. } => {
                def.command = command.clone();
                format!("Board {id} runs '{command}'")
            }
            Self::Sender { sender, .. } => {
                def.sender = *sender;
                format!("Board {id} runs as {sender}")
            }
            _ => {
                return Err(Error::InvalidCommand(format!(
                    "cannot edit board {id} with this command"
                )));
            }
        };
        Ok(reply)
    }

    /// The board a command targets, if it targets one
    pub fn board_id(&self) -> Option<&str> {
        match self {
            Self::Create { id, .. }
            | Self::Remove { id }
            | Self::Interval { id, .. }
            | Self::Delay { id, .. }
            | Self::Filter { id, .. }
            | Self::Location { id, .. }
            | Self::Command { id, .. }
            | Self::Sender { id, .. }
            | Self::Info { id } => Some(id),
            Self::Refresh { id } => id.as_deref(),
            Self::List | Self::Save | Self::Reload => None,
        }
    }
}

fn describe_outcome(id: &str, outcome: RefreshOutcome) -> String {
    match outcome {
        RefreshOutcome::Scheduled => format!("Refreshing board {id}"),
        RefreshOutcome::DispatchFailed => format!("Board {id}: command failed"),
        RefreshOutcome::CaptureUnavailable => format!("Board {id}: no actor available"),
        RefreshOutcome::Removed => format!("Board {id} was removed"),
    }
}

fn list(boards: &[Arc<Board>]) -> String {
    if boards.is_empty() {
        return "No boards".to_string();
    }
    let mut out = String::new();
    for board in boards {
        let settings = board.settings();
        let _ = writeln!(
            out,
            "{}: '{}' every {} at {}",
            board.id(),
            settings.command,
            format_ticks(settings.interval),
            settings.location
        );
    }
    out.trim_end().to_string()
}

fn info_text(board: &Board) -> String {
    let info = board.info();
    let mut out = String::new();
    let _ = writeln!(out, "Board {}", info.id);
    let _ = writeln!(out, "  command:  {}", info.command);
    let _ = writeln!(out, "  location: {}", info.location);
    let _ = writeln!(out, "  interval: {}", info.interval);
    let _ = writeln!(out, "  delay:    {}", info.delay);
    let _ = writeln!(out, "  sender:   {}", info.sender);
    for (i, filter) in info.filters.iter().enumerate() {
        let _ = writeln!(out, "  filter {}: {}", i + 1, filter);
    }
    let _ = writeln!(out, "  state:    {:?}", info.state);
    if let Some(at) = info.last_refreshed {
        let _ = writeln!(out, "  refreshed: {}", at.format("%Y-%m-%d %H:%M:%S"));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::DEFAULT_DELAY;
    use crate::config::DEFAULT_ENABLE_DELAY;
    use crate::testing::TestHost;
    use crate::time::{minutes, seconds};
    use tempfile::{TempDir, tempdir};

    fn engine(test: &TestHost) -> (TempDir, Engine) {
        let dir = tempdir().unwrap();
        let engine = Engine::enable(test.builder(), dir.path().join("boards.toml"));
        engine.load_now().unwrap();
        (dir, engine)
    }

    fn run(engine: &Engine, line: &str) -> Result<String> {
        AdminCommand::parse(line)?.execute(engine)
    }

    #[test]
    fn test_parse_create() {
        let cmd = AdminCommand::parse("create top world:0,64,0 5m /say hello world").unwrap();
        assert_eq!(
            cmd,
            AdminCommand::Create {
                id: "top".to_string(),
                location: Location::new("world", 0.0, 64.0, 0.0),
                interval: minutes(5),
                command: "/say hello world".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_quoted_filters() {
        let cmd = AdminCommand::parse(r#"filter top "There are (\d+).*=Online: $1" "^#.*$""#)
            .unwrap();
        assert_eq!(
            cmd,
            AdminCommand::Filter {
                id: "top".to_string(),
                filters: vec![
                    r"There are (\d+).*=Online: $1".to_string(),
                    "^#.*$".to_string()
                ],
            }
        );
        assert_eq!(
            AdminCommand::parse("filter top").unwrap(),
            AdminCommand::Filter {
                id: "top".to_string(),
                filters: vec![]
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            AdminCommand::parse("interval top soon"),
            Err(Error::InvalidDuration { .. })
        ));
        assert!(matches!(
            AdminCommand::parse("filter top ("),
            Err(Error::InvalidPattern { .. })
        ));
        assert!(matches!(
            AdminCommand::parse("sender top nobody"),
            Err(Error::InvalidCommand(_))
        ));
        assert!(matches!(
            AdminCommand::parse("remove"),
            Err(Error::InvalidCommand(msg)) if msg == "usage: remove <id>"
        ));
        assert!(AdminCommand::parse("").is_err());
        assert!(AdminCommand::parse("fly top").is_err());
        assert!(AdminCommand::parse("create top world:0,0,0 5m").is_err());
    }

    #[test]
    fn test_verb_is_case_insensitive() {
        assert_eq!(AdminCommand::parse("LIST").unwrap(), AdminCommand::List);
        assert_eq!(
            AdminCommand::parse("Sender top player").unwrap(),
            AdminCommand::Sender {
                id: "top".to_string(),
                sender: SenderKind::Player
            }
        );
    }

    #[test]
    fn test_create_schedules_and_saves() {
        let test = TestHost::new();
        test.dispatcher.script("/list", &["x"]);
        let (_dir, engine) = engine(&test);

        let reply = run(&engine, "create top world:0,64,0 10s /list").unwrap();
        assert_eq!(reply, "Created board top");
        assert!(engine.registry().unwrap().is_scheduled("top"));

        let saved = BoardConfig::load(engine.config_path()).unwrap();
        assert_eq!(saved.boards["top"].interval, "10s");

        assert!(matches!(
            run(&engine, "create top world:0,64,0 10s /list"),
            Err(Error::DuplicateBoard(_))
        ));
    }

    #[test]
    fn test_create_before_deferred_load_is_kept() {
        let test = TestHost::new();
        let dir = tempdir().unwrap();
        let engine = Engine::enable(test.builder(), dir.path().join("boards.toml"));

        run(&engine, "create fresh world:0,0,0 1m /list").unwrap();
        test.scheduler.advance(DEFAULT_ENABLE_DELAY + 1);

        assert!(engine.registry().unwrap().contains("fresh"));
        let saved = BoardConfig::load(engine.config_path()).unwrap();
        assert!(saved.boards.contains_key("fresh"));
    }

    #[test]
    fn test_edit_refused_when_config_unreadable() {
        let test = TestHost::new();
        let dir = tempdir().unwrap();
        let path = dir.path().join("boards.toml");
        std::fs::write(&path, "[boards.oops").unwrap();
        let engine = Engine::enable(test.builder(), &path);

        assert!(matches!(
            run(&engine, "create fresh world:0,0,0 1m /list"),
            Err(Error::ConfigUnreadable { .. })
        ));
        assert!(engine.registry().unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[boards.oops");
    }

    #[test]
    fn test_interval_reschedules() {
        let test = TestHost::new();
        test.dispatcher.script("/list", &["x"]);
        let (_dir, engine) = engine(&test);
        run(&engine, "create top world:0,64,0 1h /list").unwrap();
        test.scheduler.tick();

        run(&engine, "interval top 1s").unwrap();
        test.scheduler.advance(21);
        assert_eq!(test.dispatcher.calls().len(), 3);
    }

    #[test]
    fn test_edits_reach_the_board() {
        let test = TestHost::new();
        test.dispatcher.script("/tps", &["TPS: 20.0", ""]);
        let (_dir, engine) = engine(&test);
        run(&engine, "create top world:0,64,0 1h /list").unwrap();

        run(&engine, "command top /tps").unwrap();
        run(&engine, "delay top 2s").unwrap();
        run(&engine, "sender top player").unwrap();
        run(&engine, r#"filter top "TPS: =Ticks per second: ""#).unwrap();
        run(&engine, "location top nether:1,2,3").unwrap();

        let board = engine.registry().unwrap().get("top").unwrap();
        assert_eq!(board.command(), "/tps");
        assert_eq!(board.delay(), seconds(2));
        assert_eq!(board.sender(), SenderKind::Player);
        assert_eq!(board.filters().len(), 1);
        assert_eq!(board.location(), Location::new("nether", 1.0, 2.0, 3.0));

        // The periodic run on the first tick restarts the cycle
        run(&engine, "refresh top").unwrap();
        test.scheduler.advance(seconds(2) + 1);
        assert!(
            board
                .last_output()
                .unwrap()
                .starts_with("Ticks per second: 20.0")
        );
    }

    #[test]
    fn test_unknown_board() {
        let test = TestHost::new();
        let (_dir, engine) = engine(&test);
        for line in ["remove nope", "interval nope 5s", "info nope", "refresh nope"] {
            assert!(
                matches!(run(&engine, line), Err(Error::BoardNotFound(_))),
                "{line}"
            );
        }
    }

    #[test]
    fn test_refresh_all_and_list() {
        let test = TestHost::new();
        test.dispatcher.script("/list", &["x"]);
        let (_dir, engine) = engine(&test);
        assert_eq!(run(&engine, "list").unwrap(), "No boards");

        run(&engine, "create a world:0,0,0 1h /list").unwrap();
        run(&engine, "create b world:0,0,0 1h /list").unwrap();
        assert_eq!(run(&engine, "refresh").unwrap(), "Refreshed 2 boards");

        let listing = run(&engine, "list").unwrap();
        assert_eq!(listing.lines().count(), 2);
        assert!(listing.starts_with("a: '/list' every 1h at world (0, 0, 0)"));

        test.scheduler.advance(DEFAULT_DELAY + 1);
        assert!(run(&engine, "info a").unwrap().contains("refreshed:"));
    }

    #[test]
    fn test_remove_tears_down() {
        let test = TestHost::new();
        let (_dir, engine) = engine(&test);
        run(&engine, "create top world:0,0,0 1h /list").unwrap();

        assert_eq!(run(&engine, "remove top").unwrap(), "Removed board top");
        assert!(engine.registry().unwrap().is_empty());
        assert!(
            BoardConfig::load(engine.config_path())
                .unwrap()
                .boards
                .is_empty()
        );
    }

    #[test]
    fn test_apply_edits_config_offline() {
        let mut config = BoardConfig::default();
        AdminCommand::parse("create top world:0,64,0 90s /list")
            .unwrap()
            .apply(&mut config)
            .unwrap();
        AdminCommand::parse("sender top PLAYER")
            .unwrap()
            .apply(&mut config)
            .unwrap();

        let def = &config.boards["top"];
        assert_eq!(def.interval, "1m30s");
        assert_eq!(def.sender, SenderKind::Player);

        assert!(matches!(
            AdminCommand::parse("delay nope 5s").unwrap().apply(&mut config),
            Err(Error::BoardNotFound(_))
        ));
        assert!(matches!(
            AdminCommand::List.apply(&mut config),
            Err(Error::InvalidCommand(_))
        ));
    }
}

//! Runs board commands as local processes.
//!
//! The leading `/` of a board command is dropped, the rest is split like a
//! shell would split it, and the first word is resolved on `PATH`. Every line
//! the process writes to stdout or stderr is sent to the board's sender as it
//! arrives. The identity the command runs as is exported through environment
//! variables:
//!
//! | Variable            | Value                        |
//! |---------------------|------------------------------|
//! | `HOLOBOARD_SENDER`  | `CONSOLE` or `PLAYER`        |
//! | `HOLOBOARD_ACTOR`   | console or player name       |
//! | `HOLOBOARD_WORLD`   | player world (players only)  |
//! | `HOLOBOARD_X/Y/Z`   | player position (players only) |

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use holoboard_core::{Actor, CommandDispatcher, CommandSender};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

pub struct ProcessDispatcher {
    timeout: Duration,
}

impl ProcessDispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn spawn(&self, sender: Arc<dyn CommandSender>, command: &str) -> Result<()> {
        let (program, args) = resolve(command)?;

        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .envs(actor_env(sender.actor()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to start {}", program.display()))?;
        debug!("Started '{}' (pid {})", command, child.id());

        let readers = [
            child.stdout.take().map(|out| forward(out, Arc::clone(&sender))),
            child.stderr.take().map(|err| forward(err, Arc::clone(&sender))),
        ];

        let timeout = self.timeout;
        let command = command.to_string();
        thread::spawn(move || {
            reap(&mut child, &command, timeout);
            for reader in readers.into_iter().flatten() {
                let _ = reader.join();
            }
        });
        Ok(())
    }
}

impl CommandDispatcher for ProcessDispatcher {
    fn dispatch(&self, sender: Arc<dyn CommandSender>, command: &str) -> bool {
        match self.spawn(sender, command) {
            Ok(()) => true,
            Err(e) => {
                warn!("Cannot run '{}': {:#}", command, e);
                false
            }
        }
    }
}

/// Split a board command into a resolved program and its arguments.
fn resolve(command: &str) -> Result<(PathBuf, Vec<String>)> {
    let line = command.trim().trim_start_matches('/');
    let mut words = shell_words::split(line).context("Unbalanced quotes")?;
    if words.is_empty() {
        bail!("Empty command");
    }
    let name = words.remove(0);
    let program = which::which(&name).with_context(|| format!("'{name}' not found"))?;
    Ok((program, words))
}

fn actor_env(actor: &Actor) -> Vec<(&'static str, String)> {
    let mut env = vec![
        ("HOLOBOARD_SENDER", actor.kind().to_string()),
        ("HOLOBOARD_ACTOR", actor.name().to_string()),
    ];
    if let Some(location) = actor.location() {
        env.push(("HOLOBOARD_WORLD", location.world.clone()));
        env.push(("HOLOBOARD_X", location.x.to_string()));
        env.push(("HOLOBOARD_Y", location.y.to_string()));
        env.push(("HOLOBOARD_Z", location.z.to_string()));
    }
    env
}

fn forward<R: Read + Send + 'static>(
    stream: R,
    sender: Arc<dyn CommandSender>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(stream).lines().map_while(|l| l.ok()) {
            sender.send_message(&line);
        }
    })
}

fn reap(child: &mut Child, command: &str, timeout: Duration) {
    match child.wait_timeout(timeout) {
        Ok(Some(status)) if !status.success() => {
            debug!("'{}' exited with {}", command, status);
        }
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!("'{}' timed out after {}s, killing", command, timeout.as_secs());
            let _ = child.kill();
            let _ = child.wait();
        }
        Err(e) => warn!("Failed to wait for '{}': {}", command, e),
    }
}

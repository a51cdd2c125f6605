use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use holoboard_core::admin::{AdminCommand, USAGE};
use holoboard_core::Engine;
use tracing::debug;

use crate::shutdown::ShutdownSignal;

/// What the console should do with one input line
#[derive(Debug, PartialEq)]
enum Action {
    Quit,
    Help,
    Nothing,
    Run(AdminCommand),
    Invalid(String),
}

fn interpret(line: &str) -> Action {
    match line.trim().to_ascii_lowercase().as_str() {
        "" => Action::Nothing,
        "quit" | "exit" | "stop" => Action::Quit,
        "help" | "?" => Action::Help,
        _ => match AdminCommand::parse(line) {
            Ok(command) => Action::Run(command),
            Err(e) => Action::Invalid(e.to_string()),
        },
    }
}

/// Spawn a thread that reads admin commands from stdin.
///
/// `quit`, `exit` or `stop` trigger shutdown. End of input stops the console
/// but leaves the engine running.
pub fn spawn(engine: Arc<Engine>, shutdown: Arc<ShutdownSignal>) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("Console started");
        let stdin = io::stdin();
        for line in stdin.lock().lines().map_while(|l| l.ok()) {
            if shutdown.is_shutdown() {
                break;
            }
            match interpret(&line) {
                Action::Quit => {
                    shutdown.trigger();
                    break;
                }
                Action::Help => println!("{USAGE}\nquit"),
                Action::Nothing => {}
                Action::Run(command) => match command.execute(&engine) {
                    Ok(reply) => println!("{reply}"),
                    Err(e) => eprintln!("{e}"),
                },
                Action::Invalid(message) => eprintln!("{message}"),
            }
        }
        debug!("Console stopped");
    })
}

//! Keyboard input: a blocking reader thread that turns key presses into
//! session commands.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::sync::mpsc;
use tracer_client::{Command, Direction};

const INPUT_POLL_TIMEOUT: Duration = Duration::from_millis(25); // shutdown responsiveness
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

pub struct KeyReader {
    stop: Arc<AtomicBool>,
    join: Option<tokio::task::JoinHandle<()>>,
}

impl KeyReader {
    /// Start reading keys; commands go to `tx`.
    pub fn spawn(tx: mpsc::Sender<Command>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop2 = stop.clone();
        let join = tokio::task::spawn_blocking(move || input_loop(&stop2, &tx));
        Self {
            stop,
            join: Some(join),
        }
    }

    pub async fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, join).await;
        }
    }
}

impl Drop for KeyReader {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

fn input_loop(stop: &AtomicBool, tx: &mpsc::Sender<Command>) {
    while !stop.load(Ordering::Acquire) {
        match event::poll(INPUT_POLL_TIMEOUT) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) => {
                    let Some(command) = command_for_key(key) else {
                        continue;
                    };
                    // Bounded queue: wait for room rather than dropping keys.
                    if tx.blocking_send(command).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Reading terminal input failed: {e}");
                    let _ = tx.blocking_send(Command::Quit);
                    break;
                }
            },
            Ok(false) => {}
            Err(e) => {
                tracing::warn!("Polling terminal input failed: {e}");
                let _ = tx.blocking_send(Command::Quit);
                break;
            }
        }
    }
}

pub fn command_for_key(key: KeyEvent) -> Option<Command> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(Command::Quit);
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
        KeyCode::Char(' ') => Some(Command::ToggleActive),
        KeyCode::Char(c) => Direction::from_key(c).map(Command::Move),
        KeyCode::Up => Some(Command::Move(Direction::Up)),
        KeyCode::Down => Some(Command::Move(Direction::Down)),
        KeyCode::Left => Some(Command::Move(Direction::Left)),
        KeyCode::Right => Some(Command::Move(Direction::Right)),
        _ => None,
    }
}

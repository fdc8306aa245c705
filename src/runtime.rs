use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};
use tracing::debug;

use crate::app::{Action, App};
use crate::source::QuestionSource;

/// Input seen by the quiz loop
#[derive(Clone, Debug)]
pub enum QuizEvent {
    Key(KeyEvent),
    Resize,
    /// Nothing arrived within one tick
    Tick,
    /// The input side hung up
    Closed,
}

/// Why [`Runner::run`] returned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    Quit,
    InputClosed,
}

/// Source of terminal events (keyboard, resize)
pub trait QuizEventSource: Send + 'static {
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError>;
}

/// Reads crossterm events on a background thread and forwards key presses
pub struct CrosstermEventSource {
    rx: Receiver<QuizEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let evt = match event::read() {
                // Windows reports releases as well as presses
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => QuizEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => QuizEvent::Resize,
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(evt).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-fed event source for headless runs
pub struct TestEventSource {
    rx: Receiver<QuizEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<QuizEvent>) -> Self {
        Self { rx }
    }
}

impl QuizEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Feeds events into an [`App`] and asks for a redraw after each one
pub struct Runner<E: QuizEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: QuizEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Waits at most one tick for the next event
    pub fn step(&self) -> QuizEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => QuizEvent::Tick,
            Err(RecvTimeoutError::Disconnected) => QuizEvent::Closed,
        }
    }

    /// Runs until the player quits or input ends.
    ///
    /// `redraw` is called once up front, after every handled event, and one
    /// extra time before a fetch so the loading screen is visible while the
    /// question source blocks.
    pub fn run<S, F>(&self, app: &mut App<S>, mut redraw: F) -> io::Result<Exit>
    where
        S: QuestionSource,
        F: FnMut(&App<S>) -> io::Result<()>,
    {
        redraw(app)?;

        loop {
            match self.step() {
                QuizEvent::Tick => continue,
                QuizEvent::Closed => {
                    debug!("input closed");
                    return Ok(Exit::InputClosed);
                }
                QuizEvent::Resize => {}
                QuizEvent::Key(key) => match app.on_key(key) {
                    Action::Quit => return Ok(Exit::Quit),
                    Action::Fetch => {
                        redraw(app)?;
                        app.fetch();
                    }
                    Action::Continue => {}
                },
            }

            redraw(app)?;
        }
    }
}

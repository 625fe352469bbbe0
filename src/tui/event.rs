//! Event handling for the dashboard.
//!
//! A separate thread polls the terminal for input and emits a tick at a
//! fixed rate, however much input arrives in between.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Dashboard events.
#[derive(Debug)]
pub enum Event {
    /// Time to collect and redraw.
    Tick,
    /// Keyboard input.
    Key(KeyEvent),
    /// Terminal resized; redraw only.
    Resize,
}

/// Event source backed by a polling thread.
pub struct EventHandler {
    rx: Receiver<Event>,
    /// Kept alive to prevent channel closure.
    _tx: Sender<Event>,
}

/// Fixed-rate tick schedule independent of how much input arrives.
#[derive(Debug)]
pub struct TickTimer {
    rate: Duration,
    last: Instant,
}

impl TickTimer {
    pub fn new(rate: Duration) -> Self {
        Self {
            rate,
            last: Instant::now(),
        }
    }

    /// Time left until the next tick is due.
    pub fn remaining(&self) -> Duration {
        self.rate.saturating_sub(self.last.elapsed())
    }

    /// True once per elapsed period; restarts the period when it fires.
    pub fn fire_if_due(&mut self) -> bool {
        if self.last.elapsed() >= self.rate {
            self.last = Instant::now();
            return true;
        }
        false
    }
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let event_tx = tx.clone();

        thread::spawn(move || {
            let mut timer = TickTimer::new(tick_rate);
            loop {
                // Input only shortens the wait, never postpones the tick
                if event::poll(timer.remaining()).unwrap_or(false) {
                    let event = match event::read() {
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            Some(Event::Key(key))
                        }
                        Ok(CrosstermEvent::Resize(_, _)) => Some(Event::Resize),
                        _ => None,
                    };
                    if let Some(event) = event {
                        if event_tx.send(event).is_err() {
                            break;
                        }
                    }
                }
                if timer.fire_if_due() && event_tx.send(Event::Tick).is_err() {
                    break;
                }
            }
        });

        Self { rx, _tx: tx }
    }

    /// Blocks until the next event.
    pub fn next(&self) -> Result<Event, mpsc::RecvError> {
        self.rx.recv()
    }
}

/// `q`, `Esc` and `Ctrl+C` quit.
pub fn is_quit(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum GameEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<GameEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                // Windows reports releases too
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    if tx.send(GameEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(GameEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "terminal event read failed");
                    break;
                }
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

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
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

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<GameEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: EventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> GameEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => GameEvent::Tick,
        }
    }
}

/// What a key press means to a typing session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    /// Text for the engine; Enter arrives as the newline sentinel
    Type(String),
    /// Navigation keys (arrows, Tab) left to the front-end
    Control(KeyCode),
}

/// Classify a key press. Ctrl/Alt chords other than Ctrl-C are dropped.
pub fn key_action(key: &KeyEvent) -> Option<KeyAction> {
    let chord = key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);
    match key.code {
        KeyCode::Esc => Some(KeyAction::Quit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyAction::Quit)
        }
        _ if chord => None,
        KeyCode::Char(c) => Some(KeyAction::Type(c.to_string())),
        KeyCode::Enter => Some(KeyAction::Type("\n".to_string())),
        code @ (KeyCode::Tab | KeyCode::Left | KeyCode::Right) => Some(KeyAction::Control(code)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn queued_keys_come_before_ticks() {
        let (tx, rx) = mpsc::channel();
        tx.send(GameEvent::Key(press(KeyCode::Char('f'), KeyModifiers::NONE)))
            .unwrap();
        tx.send(GameEvent::Key(press(KeyCode::Char('j'), KeyModifiers::NONE)))
            .unwrap();
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(1)),
        );

        let typed = (0..3)
            .map(|_| match runner.step() {
                GameEvent::Key(key) => key_action(&key),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(
            typed,
            vec![
                Some(KeyAction::Type("f".into())),
                Some(KeyAction::Type("j".into())),
                None,
            ]
        );
    }

    #[test]
    fn closed_source_keeps_ticking() {
        let (tx, rx) = mpsc::channel::<GameEvent>();
        drop(tx);
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(1)),
        );
        assert!(matches!(runner.step(), GameEvent::Tick));
    }

    #[test]
    fn typed_text_keeps_case_and_maps_enter() {
        assert_eq!(
            key_action(&press(KeyCode::Char('ø'), KeyModifiers::NONE)),
            Some(KeyAction::Type("ø".into()))
        );
        assert_eq!(
            key_action(&press(KeyCode::Char('P'), KeyModifiers::SHIFT)),
            Some(KeyAction::Type("P".into()))
        );
        assert_eq!(
            key_action(&press(KeyCode::Enter, KeyModifiers::NONE)),
            Some(KeyAction::Type("\n".into()))
        );
    }

    #[test]
    fn quit_and_chords() {
        assert_eq!(
            key_action(&press(KeyCode::Esc, KeyModifiers::NONE)),
            Some(KeyAction::Quit)
        );
        assert_eq!(
            key_action(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyAction::Quit)
        );
        assert_eq!(key_action(&press(KeyCode::Char('x'), KeyModifiers::ALT)), None);
        assert_eq!(key_action(&press(KeyCode::Backspace, KeyModifiers::NONE)), None);
    }

    #[test]
    fn navigation_is_left_to_the_front_end() {
        for code in [KeyCode::Tab, KeyCode::Left, KeyCode::Right] {
            assert_eq!(
                key_action(&press(code, KeyModifiers::NONE)),
                Some(KeyAction::Control(code))
            );
        }
    }
}

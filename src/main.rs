mod ui;

use std::{
    cell::{Cell, RefCell},
    error::Error,
    io::{self, stdin},
    rc::Rc,
    time::Duration,
};

use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use touchmaster::{
    app_dirs::AppDirs,
    catalog::CurriculumCatalog,
    config::{Config, ConfigStore, FileConfigStore},
    error::{StoreError, TouchError},
    history::{HistoryDb, LessonResult},
    logging,
    runtime::{key_action, CrosstermEventSource, FixedTicker, GameEvent, KeyAction, Runner},
    EngineEvent, MemoryStore, Mode, ProgressStore, SqliteStore, TypingEngine,
};

const TICK_RATE_MS: u64 = 100;
const SHAKE_TICKS: u8 = 3;
const HISTORY_LIMIT: usize = 20;

/// touch-typing tutor with lessons, story themes and coin rewards
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A touch-typing tutor: work through the training course or a themed story, earn a coin for every correct key and bonus coins for speed and accuracy."
)]
pub struct Cli {
    /// lesson sequence to play (defaults to the last one used)
    #[clap(short = 'm', long, value_enum)]
    mode: Option<Mode>,

    /// story theme: cyber, candy, matrix or rainbow
    #[clap(short = 't', long)]
    theme: Option<String>,

    /// hide the on-screen keyboard hint
    #[clap(long)]
    no_keyboard: bool,

    /// keep coins and progress in memory only
    #[clap(long)]
    ephemeral: bool,

    /// print recently completed lessons and exit
    #[clap(long)]
    history: bool,

    /// forget all recorded lesson results and exit
    #[clap(long, conflicts_with = "history")]
    clear_history: bool,
}

impl Cli {
    /// Fold command line overrides into the saved configuration
    fn apply_to(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(theme) = &self.theme {
            config.theme = theme.clone();
        }
        if self.no_keyboard {
            config.show_keyboard = false;
        }
    }
}

/// What the main loop should do after a key press
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Continue,
    ThemeChanged(String),
    Quit,
}

pub struct App {
    pub engine: TypingEngine<Box<dyn ProgressStore>>,
    pub show_keyboard: bool,
    shake: Rc<Cell<u8>>,
    personal_best: Rc<Cell<Option<u32>>>,
}

impl App {
    pub fn new(mut engine: TypingEngine<Box<dyn ProgressStore>>, show_keyboard: bool) -> Self {
        let shake = Rc::new(Cell::new(0));
        let pulse = shake.clone();
        engine.subscribe(move |event, _| {
            if let EngineEvent::KeyRejected { .. } = event {
                pulse.set(SHAKE_TICKS);
            }
        });

        Self {
            engine,
            show_keyboard,
            shake,
            personal_best: Rc::new(Cell::new(None)),
        }
    }

    /// Record completed lessons and track the best speed on the finished lesson
    pub fn attach_history(&mut self, history: HistoryDb) {
        record_history(&mut self.engine, history, self.personal_best.clone());
    }

    /// Best recorded speed for the lesson just finished
    pub fn personal_best(&self) -> Option<u32> {
        self.personal_best.get()
    }

    pub fn is_shaking(&self) -> bool {
        self.shake.get() > 0
    }

    pub fn on_tick(&mut self) {
        self.shake.set(self.shake.get().saturating_sub(1));
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Flow {
        let Some(action) = key_action(&key) else {
            return Flow::Continue;
        };

        match action {
            KeyAction::Quit => return Flow::Quit,
            KeyAction::Control(KeyCode::Tab) if self.engine.mode() == Mode::Story => {
                let next = CurriculumCatalog::global().next_theme_key(self.engine.theme_key());
                self.engine.set_active_theme(next);
                return Flow::ThemeChanged(next.to_string());
            }
            KeyAction::Control(KeyCode::Left) => self.engine.reset(),
            KeyAction::Control(KeyCode::Right) => self.engine.advance_to_next_lesson(),
            KeyAction::Control(_) => {}
            KeyAction::Type(text) if self.engine.is_completed() => match text.as_str() {
                "n" | "\n" => self.engine.advance_to_next_lesson(),
                "r" => self.engine.reset(),
                _ => {}
            },
            KeyAction::Type(text) => self.engine.submit_keystroke(&text),
        }

        Flow::Continue
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(log_path) = AppDirs::log_path() {
        if let Err(e) = logging::init_file_logging(&log_path) {
            eprintln!("warning: {e}");
        }
    }

    if cli.history {
        return Ok(print_history()?);
    }
    if cli.clear_history {
        return Ok(clear_history()?);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply_to(&mut config);

    let store: Box<dyn ProgressStore> = if cli.ephemeral {
        Box::new(MemoryStore::new())
    } else {
        match SqliteStore::open_default() {
            Ok(store) => Box::new(store),
            Err(e) => {
                tracing::warn!(error = %e, "progress store unavailable, progress will not be saved");
                Box::new(MemoryStore::new())
            }
        }
    };

    let engine = TypingEngine::new(config.mode, &config.theme, store);
    remember_session(&mut config, &engine);
    if let Err(e) = config_store.save(&config) {
        tracing::warn!(error = %e, "failed to save config");
    }

    let mut app = App::new(engine, config.show_keyboard);
    if !cli.ephemeral {
        if let Some(history) = open_history() {
            app.attach_history(history);
        }
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &config_store, &mut config);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    result
}

/// Store what the engine actually resolved, so unknown themes are not saved
fn remember_session<S: ProgressStore>(config: &mut Config, engine: &TypingEngine<S>) {
    config.mode = engine.mode();
    config.theme = engine.theme_key().to_string();
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    config_store: &FileConfigStore,
    config: &mut Config,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        match runner.step() {
            GameEvent::Tick => app.on_tick(),
            GameEvent::Resize => {}
            GameEvent::Key(key) => match app.handle_key(key) {
                Flow::Continue => {}
                Flow::ThemeChanged(theme) => {
                    config.theme = theme;
                    if let Err(e) = config_store.save(config) {
                        tracing::warn!(error = %e, "failed to save config");
                    }
                }
                Flow::Quit => break,
            },
        }
    }

    Ok(())
}

fn open_history() -> Option<HistoryDb> {
    let path = AppDirs::db_path()?;
    match HistoryDb::open(&path) {
        Ok(db) => Some(db),
        Err(e) => {
            tracing::warn!(error = %e, "results history unavailable");
            None
        }
    }
}

/// Log every completed lesson to the history table
fn record_history<S: ProgressStore>(
    engine: &mut TypingEngine<S>,
    history: HistoryDb,
    personal_best: Rc<Cell<Option<u32>>>,
) {
    let mode = engine.mode();
    let theme = Rc::new(RefCell::new(engine.theme_key().to_string()));

    engine.subscribe(move |event, state| match event {
        EngineEvent::ThemeChanged { theme: key } => {
            *theme.borrow_mut() = key.clone();
        }
        EngineEvent::LessonCompleted {
            lesson_id,
            stats,
            elapsed,
        } => {
            let result = LessonResult {
                mode,
                theme: (mode == Mode::Story).then(|| theme.borrow().clone()),
                lesson_id: *lesson_id,
                stats: *stats,
                keystrokes: state.total_keystrokes,
                elapsed: *elapsed,
                timestamp: Local::now(),
            };
            if let Err(e) = history.record(&result) {
                tracing::warn!(error = %e, "failed to record lesson result");
            }
            let best = history.best_speed(mode, *lesson_id).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to read best speed");
                None
            });
            personal_best.set(best);
        }
        _ => {}
    });
}

fn print_history() -> Result<(), TouchError> {
    let Some(history) = open_history() else {
        println!("no history yet");
        return Ok(());
    };

    let results = history.recent(HISTORY_LIMIT).map_err(StoreError::from)?;
    if results.is_empty() {
        println!("no history yet");
        return Ok(());
    }

    for r in results {
        println!(
            "{}  {:<8} {:<8} lesson {:>2}  {:>3} wpm  {:>3}% acc  +{} bonus",
            r.timestamp.format("%Y-%m-%d %H:%M"),
            r.mode,
            r.theme.as_deref().unwrap_or("-"),
            r.lesson_id,
            r.stats.speed,
            r.stats.accuracy,
            r.stats.total_bonus(),
        );
    }

    Ok(())
}

fn clear_history() -> Result<(), TouchError> {
    let path = AppDirs::db_path().ok_or(StoreError::NoStateDir)?;
    if !path.exists() {
        println!("no history yet");
        return Ok(());
    }
    let history = HistoryDb::open(&path).map_err(StoreError::from)?;
    history.clear().map_err(StoreError::from)?;
    println!("history cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn new_app(mode: Mode) -> App {
        let store: Box<dyn ProgressStore> = Box::new(MemoryStore::new());
        App::new(TypingEngine::new(mode, "cyber", store), true)
    }

    fn press(app: &mut App, code: KeyCode) -> Flow {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn cli_overrides_config() {
        let cli = Cli::parse_from(["touchmaster", "--mode", "story", "-t", "matrix", "--no-keyboard"]);
        let mut config = Config::default();
        cli.apply_to(&mut config);
        assert_eq!(config.mode, Mode::Story);
        assert_eq!(config.theme, "matrix");
        assert!(!config.show_keyboard);
    }

    #[test]
    fn cli_without_flags_keeps_config() {
        let cli = Cli::parse_from(["touchmaster"]);
        let mut config = Config {
            mode: Mode::Story,
            theme: "candy".into(),
            show_keyboard: true,
        };
        cli.apply_to(&mut config);
        assert_eq!(config.mode, Mode::Story);
        assert_eq!(config.theme, "candy");
    }

    #[test]
    fn escape_and_ctrl_c_quit() {
        let mut app = new_app(Mode::Training);
        assert_eq!(press(&mut app, KeyCode::Esc), Flow::Quit);
        assert_eq!(
            app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Flow::Quit
        );
    }

    #[test]
    fn typing_forwards_to_engine() {
        let mut app = new_app(Mode::Training);
        assert_eq!(press(&mut app, KeyCode::Char('f')), Flow::Continue);
        assert_eq!(app.engine.cursor(), 1);
        press(&mut app, KeyCode::Char('x'));
        assert!(app.is_shaking());
        for _ in 0..SHAKE_TICKS {
            app.on_tick();
        }
        assert!(!app.is_shaking());
    }

    #[test]
    fn completed_lesson_accepts_next_and_retry() {
        let mut app = new_app(Mode::Story);
        for c in "init protocol zero".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        assert!(app.engine.is_completed());

        press(&mut app, KeyCode::Char('r'));
        assert!(!app.engine.is_completed());
        assert_eq!(app.engine.lesson_index(), 0);

        for c in "init protocol zero".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.engine.lesson_index(), 1);
        assert_eq!(app.engine.cursor(), 0);
    }

    #[test]
    fn tab_cycles_story_theme() {
        let mut app = new_app(Mode::Story);
        assert_eq!(
            press(&mut app, KeyCode::Tab),
            Flow::ThemeChanged("candy".to_string())
        );
        assert_eq!(app.engine.theme_key(), "candy");

        let mut training = new_app(Mode::Training);
        assert_eq!(press(&mut training, KeyCode::Tab), Flow::Continue);
    }

    #[test]
    fn arrows_restart_and_skip() {
        let mut app = new_app(Mode::Training);
        press(&mut app, KeyCode::Char('f'));
        press(&mut app, KeyCode::Left);
        assert_eq!(app.engine.cursor(), 0);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.engine.lesson_index(), 1);
    }

    #[test]
    fn history_records_completed_lessons() {
        let store: Box<dyn ProgressStore> = Box::new(MemoryStore::new());
        let mut app = App::new(TypingEngine::new(Mode::Story, "rainbow", store), true);
        let db_dir = tempfile::tempdir().unwrap();
        let path = db_dir.path().join("progress.db");
        app.attach_history(HistoryDb::open(&path).unwrap());
        assert_eq!(app.personal_best(), None);

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.engine.theme_key(), "cyber");
        app.engine.set_active_theme("matrix");
        for c in "våkn opp neo".chars() {
            press(&mut app, KeyCode::Char(c));
        }

        let recent = HistoryDb::open(&path).unwrap().recent(5).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].theme.as_deref(), Some("matrix"));
        assert_eq!(recent[0].lesson_id, 1);
        assert_eq!(recent[0].keystrokes, 12);
        assert_eq!(app.personal_best(), Some(recent[0].stats.speed));
    }

    #[test]
    fn unknown_theme_is_not_remembered() {
        let cli = Cli::parse_from(["touchmaster", "-m", "story", "-t", "sepia"]);
        let mut config = Config::default();
        cli.apply_to(&mut config);
        assert_eq!(config.theme, "sepia");

        let engine = TypingEngine::new(config.mode, &config.theme, MemoryStore::new());
        remember_session(&mut config, &engine);
        assert_eq!(config.theme, "cyber");
        assert_eq!(config.mode, Mode::Story);
    }

    #[test]
    fn history_flags_are_exclusive() {
        assert!(Cli::try_parse_from(["touchmaster", "--clear-history"]).is_ok());
        assert!(Cli::try_parse_from(["touchmaster", "--history", "--clear-history"]).is_err());
    }
}

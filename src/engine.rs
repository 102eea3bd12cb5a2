use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use crate::catalog::{CurriculumCatalog, DEFAULT_THEME};
use crate::lesson::{Lesson, Mode};
use crate::session::SessionState;
use crate::stats::{elapsed_between, LessonStats};
use crate::store::{lesson_index_key, ProgressStore, COINS_KEY};

/// Source of wall-clock time for speed scoring
pub trait Clock {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<SystemTime>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(SystemTime::UNIX_EPOCH)
    }

    pub fn starting_at(start: SystemTime) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        self.now.get()
    }
}

/// Notification emitted after every state change
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    KeyAccepted { ch: char },
    /// The error pulse: the last keystroke did not match
    KeyRejected { expected: char, got: String },
    LessonCompleted {
        lesson_id: u32,
        stats: LessonStats,
        elapsed: Duration,
    },
    LessonChanged { index: usize },
    AttemptReset,
    ThemeChanged { theme: String },
}

type Listener = Box<dyn FnMut(&EngineEvent, &SessionState)>;

/// Drives one typing session: cursor, validation, scoring, coins and progress
pub struct TypingEngine<S: ProgressStore, C: Clock = SystemClock> {
    mode: Mode,
    theme_key: String,
    lessons: Vec<Lesson>,
    state: SessionState,
    store: S,
    clock: C,
    listeners: Vec<Listener>,
}

impl<S: ProgressStore> TypingEngine<S, SystemClock> {
    pub fn new(mode: Mode, theme_key: &str, store: S) -> Self {
        Self::with_clock(mode, theme_key, store, SystemClock)
    }
}

impl<S: ProgressStore, C: Clock> TypingEngine<S, C> {
    pub fn with_clock(mode: Mode, theme_key: &str, store: S, clock: C) -> Self {
        let catalog = CurriculumCatalog::global();
        let theme_key = resolve_theme(theme_key);
        let lessons = match mode {
            Mode::Training => catalog.training_lessons().to_vec(),
            Mode::Story => catalog.story_lessons(&theme_key).to_vec(),
        };
        Self::with_curriculum(mode, &theme_key, lessons, store, clock)
    }

    /// Engine over an explicit lesson list. An empty list falls back to the catalog.
    pub fn with_curriculum(
        mode: Mode,
        theme_key: &str,
        lessons: Vec<Lesson>,
        store: S,
        clock: C,
    ) -> Self {
        let theme_key = resolve_theme(theme_key);
        let lessons = if lessons.is_empty() {
            tracing::warn!(%mode, "empty curriculum supplied, using the catalog");
            let catalog = CurriculumCatalog::global();
            match mode {
                Mode::Training => catalog.training_lessons().to_vec(),
                Mode::Story => catalog.story_lessons(&theme_key).to_vec(),
            }
        } else {
            lessons
        };

        let stored_index = store.get(&lesson_index_key(mode)).unwrap_or(0);
        let coins = store.get(COINS_KEY).unwrap_or(0).max(0) as u64;

        let mut engine = Self {
            mode,
            theme_key,
            lessons,
            state: SessionState::new(0, coins),
            store,
            clock,
            listeners: Vec::new(),
        };

        match usize::try_from(stored_index) {
            Ok(idx) if idx < engine.lessons.len() => engine.state.lesson_index = idx,
            _ => {
                tracing::info!(%mode, stored_index, "stored lesson index out of range, starting over");
                engine.persist_lesson_index();
            }
        }

        tracing::debug!(
            %mode,
            theme = %engine.theme_key,
            lesson_index = engine.state.lesson_index,
            coins = engine.state.coins,
            "typing engine ready"
        );
        engine
    }

    /// Register an observer called after every mutating operation
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&EngineEvent, &SessionState) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn theme_key(&self) -> &str {
        &self.theme_key
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    pub fn lesson_count(&self) -> usize {
        self.lessons.len()
    }

    pub fn lesson_index(&self) -> usize {
        self.state.lesson_index
    }

    pub fn current_lesson(&self) -> &Lesson {
        self.lessons
            .get(self.state.lesson_index)
            .unwrap_or(&self.lessons[0])
    }

    pub fn target_text(&self) -> &str {
        &self.current_lesson().text
    }

    /// The character to type next, `None` once the lesson is completed
    pub fn next_expected_char(&self) -> Option<char> {
        if self.state.is_completed {
            return None;
        }
        self.current_lesson().char_at(self.state.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.state.cursor
    }

    pub fn is_completed(&self) -> bool {
        self.state.is_completed
    }

    pub fn error_pulse(&self) -> bool {
        self.state.error_pulse
    }

    pub fn coins(&self) -> u64 {
        self.state.coins
    }

    pub fn total_keystrokes(&self) -> u32 {
        self.state.total_keystrokes
    }

    pub fn stats(&self) -> LessonStats {
        self.state.stats
    }

    pub fn speed_score(&self) -> u32 {
        self.state.stats.speed
    }

    pub fn accuracy_score(&self) -> u32 {
        self.state.stats.accuracy
    }

    pub fn bonus_from_speed(&self) -> u32 {
        self.state.stats.speed_bonus
    }

    pub fn bonus_from_accuracy(&self) -> u32 {
        self.state.stats.accuracy_bonus
    }

    /// (typed, total) characters of the current lesson
    pub fn progress(&self) -> (usize, usize) {
        (self.state.cursor, self.current_lesson().len())
    }

    pub fn typed_text(&self) -> &str {
        let text = self.target_text();
        &text[..byte_offset(text, self.state.cursor)]
    }

    pub fn remaining_text(&self) -> &str {
        let text = self.target_text();
        &text[byte_offset(text, self.state.cursor)..]
    }

    /// Time since the first keystroke of this attempt
    pub fn elapsed(&self) -> Duration {
        self.state
            .started_at
            .map(|start| elapsed_between(start, self.clock.now()))
            .unwrap_or_default()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Feed one keystroke. Ignored once the lesson is completed.
    pub fn submit_keystroke(&mut self, key: &str) {
        if self.state.is_completed || key.is_empty() {
            return;
        }
        let Some(expected) = self.current_lesson().char_at(self.state.cursor) else {
            return;
        };

        if self.state.started_at.is_none() {
            self.state.started_at = Some(self.clock.now());
        }
        self.state.total_keystrokes += 1;

        if keys_match(key, expected) {
            self.state.coins += 1;
            self.persist_coins();
            self.state.cursor += 1;
            self.notify(EngineEvent::KeyAccepted { ch: expected });

            if self.state.cursor == self.current_lesson().len() {
                self.complete();
            }
        } else {
            self.state.error_pulse = !self.state.error_pulse;
            self.notify(EngineEvent::KeyRejected {
                expected,
                got: key.to_string(),
            });
        }
    }

    /// Move to the following lesson, wrapping to the first after the last
    pub fn advance_to_next_lesson(&mut self) {
        self.state.lesson_index = (self.state.lesson_index + 1) % self.lessons.len();
        self.persist_lesson_index();
        self.state.reset_attempt();
        self.notify(EngineEvent::LessonChanged {
            index: self.state.lesson_index,
        });
    }

    /// Restart the current lesson
    pub fn reset(&mut self) {
        self.state.reset_attempt();
        self.notify(EngineEvent::AttemptReset);
    }

    /// Switch story theme. Unknown keys resolve to the default theme; training ignores it.
    pub fn set_active_theme(&mut self, theme_key: &str) {
        if self.mode != Mode::Story {
            tracing::debug!(theme_key, "theme switch ignored outside story mode");
            return;
        }

        let resolved = resolve_theme(theme_key);
        let changed = resolved != self.theme_key;
        self.lessons = CurriculumCatalog::global()
            .story_lessons(&resolved)
            .to_vec();
        self.theme_key = resolved;

        if self.state.lesson_index >= self.lessons.len() {
            self.state.lesson_index = 0;
            self.persist_lesson_index();
            self.state.reset_attempt();
        } else if changed {
            // the lesson text under the cursor is different now
            self.state.reset_attempt();
        }

        self.notify(EngineEvent::ThemeChanged {
            theme: self.theme_key.clone(),
        });
    }

    fn complete(&mut self) {
        let elapsed = self.elapsed();
        if self.state.started_at.is_some() {
            let stats = LessonStats::compute(
                self.current_lesson().len(),
                self.state.total_keystrokes,
                elapsed,
            );
            self.state.stats = stats;
            self.state.coins += u64::from(stats.total_bonus());
            self.persist_coins();
        }
        self.state.is_completed = true;

        tracing::info!(
            mode = %self.mode,
            lesson = self.current_lesson().id,
            speed = self.state.stats.speed,
            accuracy = self.state.stats.accuracy,
            bonus = self.state.stats.total_bonus(),
            "lesson completed"
        );
        self.notify(EngineEvent::LessonCompleted {
            lesson_id: self.current_lesson().id,
            stats: self.state.stats,
            elapsed,
        });
    }

    fn persist_coins(&mut self) {
        let value = i64::try_from(self.state.coins).unwrap_or(i64::MAX);
        if let Err(e) = self.store.set(COINS_KEY, value) {
            tracing::warn!(error = %e, "failed to persist coins");
        }
    }

    fn persist_lesson_index(&mut self) {
        let key = lesson_index_key(self.mode);
        let value = self.state.lesson_index as i64;
        if let Err(e) = self.store.set(&key, value) {
            tracing::warn!(key = %key, error = %e, "failed to persist lesson index");
        }
    }

    fn notify(&mut self, event: EngineEvent) {
        for listener in self.listeners.iter_mut() {
            listener(&event, &self.state);
        }
    }
}

impl<S: ProgressStore + fmt::Debug, C: Clock + fmt::Debug> fmt::Debug for TypingEngine<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypingEngine")
            .field("mode", &self.mode)
            .field("theme_key", &self.theme_key)
            .field("state", &self.state)
            .field("store", &self.store)
            .field("clock", &self.clock)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn resolve_theme(theme_key: &str) -> String {
    if CurriculumCatalog::global().is_known_theme(theme_key) {
        theme_key.to_string()
    } else {
        DEFAULT_THEME.to_string()
    }
}

/// Case-insensitive comparison of a keystroke against the expected character
fn keys_match(key: &str, expected: char) -> bool {
    if key == "\n" && expected == '\n' {
        return true;
    }
    key.chars()
        .flat_map(char::to_lowercase)
        .eq(expected.to_lowercase())
}

fn byte_offset(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

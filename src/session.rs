use std::time::SystemTime;

use crate::stats::LessonStats;

/// Observable state of a typing session, mutated only by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub lesson_index: usize,
    pub cursor: usize,
    pub is_completed: bool,
    /// Flipped on every rejected keystroke; carries no other meaning
    pub error_pulse: bool,
    pub coins: u64,
    // Attempt
    pub started_at: Option<SystemTime>,
    pub total_keystrokes: u32,
    // Results
    pub stats: LessonStats,
}

impl SessionState {
    pub fn new(lesson_index: usize, coins: u64) -> Self {
        Self {
            lesson_index,
            coins,
            ..Self::default()
        }
    }

    /// Back to the start of the current lesson. Coins and lesson index are kept.
    pub fn reset_attempt(&mut self) {
        self.cursor = 0;
        self.is_completed = false;
        self.started_at = None;
        self.total_keystrokes = 0;
        self.stats = LessonStats::default();
    }

    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            lesson_index: 0,
            cursor: 0,
            is_completed: false,
            error_pulse: false,
            coins: 0,
            started_at: None,
            total_keystrokes: 0,
            stats: LessonStats::default(),
        }
    }
}

use std::time::{Duration, SystemTime};

/// Characters counted as one word when deriving speed
pub const CHARS_PER_WORD: f64 = 5.0;

/// Performance figures for a completed lesson attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonStats {
    pub speed: u32,
    pub accuracy: u32,
    pub speed_bonus: u32,
    pub accuracy_bonus: u32,
}

impl Default for LessonStats {
    fn default() -> Self {
        Self {
            speed: 0,
            accuracy: 100,
            speed_bonus: 0,
            accuracy_bonus: 0,
        }
    }
}

impl LessonStats {
    pub fn compute(target_len: usize, total_keystrokes: u32, elapsed: Duration) -> Self {
        let speed = speed_score(target_len, elapsed);
        let accuracy = accuracy_score(target_len, total_keystrokes);
        Self {
            speed,
            accuracy,
            speed_bonus: speed_bonus(speed),
            accuracy_bonus: accuracy_bonus(accuracy),
        }
    }

    pub fn total_bonus(&self) -> u32 {
        self.speed_bonus + self.accuracy_bonus
    }
}

/// Words per minute where a word is `CHARS_PER_WORD` characters.
/// Zero elapsed time leaves the score at 0.
pub fn speed_score(target_len: usize, elapsed: Duration) -> u32 {
    let minutes = elapsed.as_secs_f64() / 60.0;
    if minutes > 0.0 {
        let words = target_len as f64 / CHARS_PER_WORD;
        (words / minutes).round() as u32
    } else {
        0
    }
}

/// Target length over every keystroke made, as a percentage.
/// A corrected miss still costs accuracy.
pub fn accuracy_score(target_len: usize, total_keystrokes: u32) -> u32 {
    if total_keystrokes > 0 {
        ((target_len as f64 / total_keystrokes as f64) * 100.0).round() as u32
    } else {
        100
    }
}

pub fn speed_bonus(speed: u32) -> u32 {
    match speed {
        s if s > 60 => 30,
        s if s > 40 => 20,
        s if s > 20 => 10,
        _ => 0,
    }
}

pub fn accuracy_bonus(accuracy: u32) -> u32 {
    match accuracy {
        100 => 50,
        a if a >= 95 => 25,
        a if a >= 90 => 10,
        _ => 0,
    }
}

/// Time between two instants, zero if the clock went backwards
pub fn elapsed_between(start: SystemTime, end: SystemTime) -> Duration {
    end.duration_since(start).unwrap_or_default()
}

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One unit of practice text
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Lesson {
    pub id: u32,
    pub title: String,
    pub text: String,
}

impl Lesson {
    pub fn new(id: u32, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            text: text.into(),
        }
    }

    /// Length of the target text in Unicode scalar values
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn char_at(&self, idx: usize) -> Option<char> {
        self.text.chars().nth(idx)
    }
}

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    ValueEnum,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    Training,
    Story,
}

impl Mode {
    /// Stable name used in persisted keys and the results history
    pub fn storage_name(&self) -> &'static str {
        match self {
            Mode::Training => "training",
            Mode::Story => "story",
        }
    }
}

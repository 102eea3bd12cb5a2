use include_dir::{include_dir, Dir};
use serde::Deserialize;
use serde_json::from_str;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::lesson::Lesson;

static CURRICULA_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/curricula");

/// Story theme used when a requested key is not registered
pub const DEFAULT_THEME: &str = "cyber";

/// Story themes in display order
pub const THEME_KEYS: [&str; 4] = ["cyber", "candy", "matrix", "rainbow"];

const TRAINING: &str = "training";

#[derive(Deserialize, Clone, Debug)]
struct CurriculumFile {
    name: String,
    lessons: Vec<Lesson>,
}

/// Registry of every lesson sequence shipped with the game
#[derive(Debug)]
pub struct CurriculumCatalog {
    training: Vec<Lesson>,
    stories: HashMap<String, Vec<Lesson>>,
}

static CATALOG: OnceLock<CurriculumCatalog> = OnceLock::new();

impl CurriculumCatalog {
    /// The embedded catalog, parsed on first use
    pub fn global() -> &'static CurriculumCatalog {
        CATALOG.get_or_init(Self::load_embedded)
    }

    fn load_embedded() -> Self {
        let training = read_curriculum(TRAINING).lessons;
        let stories = THEME_KEYS
            .iter()
            .map(|key| (key.to_string(), read_curriculum(key).lessons))
            .collect();

        let catalog = Self { training, stories };
        tracing::debug!(
            training = catalog.training.len(),
            stories = catalog.stories.len(),
            "curriculum catalog loaded"
        );
        catalog
    }

    pub fn training_lessons(&self) -> &[Lesson] {
        &self.training
    }

    /// Lessons for a story theme, falling back to the default theme for unknown keys
    pub fn story_lessons(&self, theme_key: &str) -> &[Lesson] {
        match self.stories.get(theme_key) {
            Some(lessons) => lessons,
            None => {
                tracing::debug!(theme_key, "unknown story theme, using {DEFAULT_THEME}");
                &self.stories[DEFAULT_THEME]
            }
        }
    }

    pub fn is_known_theme(&self, theme_key: &str) -> bool {
        self.stories.contains_key(theme_key)
    }

    /// Theme that follows `theme_key` in display order, wrapping around
    pub fn next_theme_key(&self, theme_key: &str) -> &'static str {
        let idx = THEME_KEYS
            .iter()
            .position(|k| *k == theme_key)
            .unwrap_or(0);
        THEME_KEYS[(idx + 1) % THEME_KEYS.len()]
    }
}

pub fn training_lessons() -> &'static [Lesson] {
    CurriculumCatalog::global().training_lessons()
}

pub fn story_lessons(theme_key: &str) -> &'static [Lesson] {
    CurriculumCatalog::global().story_lessons(theme_key)
}

fn read_curriculum(name: &str) -> CurriculumFile {
    let file = CURRICULA_DIR
        .get_file(format!("{name}.json"))
        .expect("Curriculum file not found");

    let file_as_str = file
        .contents_utf8()
        .expect("Unable to interpret curriculum as a string");

    let curriculum: CurriculumFile =
        from_str(file_as_str).expect("Unable to deserialize curriculum json");

    assert_eq!(curriculum.name, name, "curriculum name mismatch");
    assert!(
        !curriculum.lessons.is_empty(),
        "curriculum {name} has no lessons"
    );
    assert!(
        curriculum.lessons.iter().all(|l| !l.is_empty()),
        "curriculum {name} has an empty lesson"
    );

    curriculum
}

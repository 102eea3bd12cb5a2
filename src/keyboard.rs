//! Norwegian on-screen keyboard used to hint which key to press next.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Shift,
    Enter,
    Space,
}

impl Key {
    pub fn label(&self) -> String {
        match self {
            Key::Char(c) => c.to_string(),
            Key::Space => "SPACE".to_string(),
            Key::Enter => "ENTER".to_string(),
            Key::Shift => "SHIFT".to_string(),
        }
    }

    /// Width in regular key units
    pub fn width(&self) -> u16 {
        match self {
            Key::Space => 6,
            Key::Enter | Key::Shift => 2,
            Key::Char(_) => 1,
        }
    }
}

const TOP: &str = "QWERTYUIOPÅ";
const HOME: &str = "ASDFGHJKLØÆ";
const BOTTOM: &str = "ZXCVBNM,.";

pub fn layout() -> Vec<Vec<Key>> {
    let chars = |row: &str| row.chars().map(Key::Char).collect::<Vec<_>>();

    let mut bottom = vec![Key::Shift];
    bottom.extend(chars(BOTTOM));
    bottom.push(Key::Enter);

    vec![chars(TOP), chars(HOME), bottom, vec![Key::Space]]
}

/// Whether `key` should light up while `target` is the next character
pub fn is_key_active(key: Key, target: char) -> bool {
    match key {
        Key::Space => target == ' ',
        Key::Enter => target == '\n',
        Key::Shift => false,
        Key::Char(c) => c.to_uppercase().eq(target.to_uppercase()),
    }
}

/// The key to highlight for `target`, if the layout has one
pub fn active_key(target: char) -> Option<Key> {
    layout()
        .into_iter()
        .flatten()
        .find(|key| is_key_active(*key, target))
}

/// Uppercase targets need shift held
pub fn needs_shift(target: char) -> bool {
    target.is_uppercase()
}

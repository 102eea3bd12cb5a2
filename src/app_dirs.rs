use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "touchmaster";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/touchmaster`, or the platform data dir when HOME is unset
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("progress.db"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("touchmaster.log"))
    }

    pub fn config_path() -> PathBuf {
        if let Some(pd) = ProjectDirs::from("", "", APP_NAME) {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("touchmaster_config.json")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_in_the_state_dir() {
        if let Some(dir) = AppDirs::state_dir() {
            assert!(dir.ends_with(APP_NAME));
            assert_eq!(AppDirs::db_path().unwrap(), dir.join("progress.db"));
            assert_eq!(AppDirs::log_path().unwrap(), dir.join("touchmaster.log"));
        }
    }

    #[test]
    fn config_path_is_json() {
        assert_eq!(
            AppDirs::config_path().extension().and_then(|e| e.to_str()),
            Some("json")
        );
    }
}

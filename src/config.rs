use crate::db::SettingsRepository;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DB_FILE: &str = "armaguard.db";
pub const INSTALL_DIR: &str = "/opt/kg-proxy";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub db_path: PathBuf,
    pub busy_timeout: Duration,
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
}

impl ToolConfig {
    pub fn repository(&self) -> SettingsRepository {
        SettingsRepository::new(self.db_path.clone()).with_busy_timeout(self.busy_timeout)
    }
}

pub fn resolve_db_path(explicit: Option<&Path>, install_dir: &Path) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if install_dir.is_dir() {
        return install_dir.join(DEFAULT_DB_FILE);
    }
    PathBuf::from(DEFAULT_DB_FILE)
}

#[cfg(test)]
mod tests {
    use super::{resolve_db_path, DEFAULT_DB_FILE};
    use std::path::{Path, PathBuf};

    #[test]
    fn explicit_path_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolved = resolve_db_path(Some(Path::new("/tmp/custom.db")), dir.path());
        assert_eq!(resolved, PathBuf::from("/tmp/custom.db"));
    }

    #[test]
    fn install_dir_is_used_when_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(resolve_db_path(None, dir.path()), dir.path().join(DEFAULT_DB_FILE));
    }

    #[test]
    fn falls_back_to_working_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("not-installed");
        assert_eq!(resolve_db_path(None, &missing), PathBuf::from(DEFAULT_DB_FILE));
    }
}

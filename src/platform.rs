use std::path::PathBuf;

/// Store file kept in the home directory unless `--db` or the config says otherwise.
pub const STORE_FILE_NAME: &str = ".filebase.sqlite3";

pub fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

pub fn default_store_path() -> Option<PathBuf> {
    home_dir().map(|home| home.join(STORE_FILE_NAME))
}

/// `~/.config/filebase/config.toml` or the platform equivalent.
pub fn config_file_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "filebase")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

use directories::ProjectDirs;
use std::path::PathBuf;

/// Application directories following XDG spec
#[derive(Debug, Clone)]
pub struct Directories {
    /// Config directory (~/.config/placerank)
    pub config: PathBuf,

    /// Data directory (~/.local/share/placerank)
    pub data: PathBuf,

    /// Config file path
    pub config_file: PathBuf,

    /// Default history snapshot
    pub history_file: PathBuf,
}

impl Directories {
    /// Create a new `Directories` instance with standard XDG paths.
    ///
    /// Returns `None` when the platform has no home directory to anchor them.
    #[must_use]
    pub fn new() -> Option<Self> {
        let project = ProjectDirs::from("", "", "placerank")?;

        let config = project.config_dir().to_path_buf();
        let data = project.data_dir().to_path_buf();

        Some(Self {
            config_file: config.join("config.json"),
            history_file: data.join("history.json"),
            config,
            data,
        })
    }

    #[must_use]
    pub fn with_base(base: PathBuf) -> Self {
        Self {
            config_file: base.join("config.json"),
            history_file: base.join("history.json"),
            config: base.clone(),
            data: base,
        }
    }

    /// Ensure all directories exist.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    pub fn ensure_exists(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config)?;
        std::fs::create_dir_all(&self.data)?;
        Ok(())
    }
}

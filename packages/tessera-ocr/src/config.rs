use std::path::PathBuf;
use std::time::Duration;

/// Default engine binary, resolved through `PATH`.
pub const DEFAULT_COMMAND: &str = "tesseract";

/// Process-wide engine settings. Built once at startup and handed to
/// [`crate::Tesseract`]; nothing reads these from global state.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name or path of the engine binary.
    pub command: PathBuf,
    /// Directory for temporary input/output files. `None` uses the system
    /// temp directory.
    pub temp_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: PathBuf::from(DEFAULT_COMMAND),
            temp_dir: None,
        }
    }
}

impl EngineConfig {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            temp_dir: None,
        }
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub(crate) fn command_name(&self) -> String {
        self.command.display().to_string()
    }
}

/// Per-call knobs.
#[derive(Debug, Clone, Default)]
pub struct InvocationOptions {
    /// Language passed as `-l`, e.g. `eng` or `eng+deu`.
    pub lang: Option<String>,
    /// Extra command line flags, tokenized with shell quoting rules.
    pub config: String,
    /// Niceness adjustment; `0` runs the engine without `nice`.
    pub nice: i32,
    /// Wall-clock budget; zero means unbounded.
    pub timeout: Duration,
}

impl InvocationOptions {
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = config.into();
        self
    }

    pub fn with_nice(mut self, nice: i32) -> Self {
        self.nice = nice;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Copy of these options with `extra` placed in front of the user config.
    pub(crate) fn prepend_config(&self, extra: &str) -> Self {
        let mut opts = self.clone();
        opts.config = format!("{} {}", extra, self.config.trim());
        opts
    }

    /// Copy of these options with `extra` placed after the user config.
    pub(crate) fn append_config(&self, extra: &str) -> Self {
        let mut opts = self.clone();
        opts.config = format!("{} {}", self.config.trim(), extra);
        opts
    }

    /// Copy of these options with `before` and `after` placed around the
    /// user config.
    pub(crate) fn wrap_config(&self, before: &str, after: &str) -> Self {
        self.prepend_config(before).append_config(after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command() {
        let config = EngineConfig::default();
        assert_eq!(config.command, PathBuf::from("tesseract"));
        assert!(config.temp_dir.is_none());
    }

    #[test]
    fn test_prepend_and_append_config() {
        let opts = InvocationOptions::default().with_config("  --psm 6 ");
        assert_eq!(
            opts.prepend_config("-c tessedit_create_tsv=1").config,
            "-c tessedit_create_tsv=1 --psm 6"
        );
        assert_eq!(opts.append_config("makebox").config, "--psm 6 makebox");
    }

    #[test]
    fn test_wrap_config() {
        let opts = InvocationOptions::default().with_config("--psm 6 quiet");
        assert_eq!(
            opts.wrap_config("-c tessedit_create_boxfile=1", "batch.nochop makebox")
                .config,
            "-c tessedit_create_boxfile=1 --psm 6 quiet batch.nochop makebox"
        );
    }
}

//! Engine version detection, version-gated capabilities and language listing.

use std::ffi::OsString;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::command::split_config;
use crate::config::EngineConfig;
use crate::engine::{OcrError, Result};
use crate::runner::{join_errors, run_query};

/// Oldest engine release the wrapper supports; also the first with TSV output.
pub const MIN_VERSION: EngineVersion = EngineVersion::new(3, 5, 0);
/// First engine release with ALTO XML output.
pub const ALTO_VERSION: EngineVersion = EngineVersion::new(4, 1, 0);

static VERSION_PATTERN: OnceLock<Regex> = OnceLock::new();
static LANG_PATTERN: OnceLock<Regex> = OnceLock::new();

fn version_pattern() -> &'static Regex {
    VERSION_PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("version pattern is valid")
    })
}

fn lang_pattern() -> &'static Regex {
    LANG_PATTERN.get_or_init(|| Regex::new(r"^[a-z_]+$").expect("language pattern is valid"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EngineVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl EngineVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses the banner printed by `--version`, e.g.
    /// `tesseract 5.3.0\n leptonica-1.82.0 ...` or `tesseract 3.05.02`.
    pub fn parse(banner: &str) -> Option<Self> {
        let token = banner
            .trim_start_matches(|c: char| !c.is_ascii_digit())
            .split_whitespace()
            .next()?;
        let token = token.split('-').next()?;

        let caps = version_pattern().captures(token)?;
        let part = |i: usize| -> Option<u32> {
            caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
        };
        Some(Self::new(part(1)?, part(2)?, part(3)?))
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Features gated on the detected engine version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineCapabilities {
    pub version: EngineVersion,
}

impl EngineCapabilities {
    pub fn new(version: EngineVersion) -> Self {
        Self { version }
    }

    pub fn supports_tsv(&self) -> bool {
        self.version >= MIN_VERSION
    }

    pub fn supports_alto(&self) -> bool {
        self.version >= ALTO_VERSION
    }

    pub fn require_tsv(&self) -> Result<()> {
        if self.supports_tsv() {
            return Ok(());
        }
        Err(OcrError::FeatureNotSupported {
            feature: "TSV",
            required: "3.05",
        })
    }

    pub fn require_alto(&self) -> Result<()> {
        if self.supports_alto() {
            return Ok(());
        }
        Err(OcrError::FeatureNotSupported {
            feature: "ALTO",
            required: "4.1.0",
        })
    }
}

/// Asks the engine for its version. An unparseable banner or a release older
/// than [`MIN_VERSION`] is reported as [`OcrError::InvalidVersion`].
pub fn query_version(config: &EngineConfig) -> Result<EngineVersion> {
    let args = [config.command.clone().into_os_string(), "--version".into()];
    let (status, output) = run_query(&args)?;
    if status != 0 {
        return Err(OcrError::EngineError {
            status,
            message: join_errors(&output),
        });
    }

    let banner = String::from_utf8_lossy(&output);
    match EngineVersion::parse(&banner) {
        Some(version) if version >= MIN_VERSION => {
            log::debug!("detected tesseract {}", version);
            Ok(version)
        }
        _ => Err(OcrError::InvalidVersion(banner.trim().to_string())),
    }
}

/// Lists the installed languages. `extra` is appended to the command line,
/// e.g. `--tessdata-dir /opt/tessdata`.
pub fn query_languages(config: &EngineConfig, extra: &str) -> Result<Vec<String>> {
    let mut args: Vec<OsString> = vec![config.command.clone().into_os_string(), "--list-langs".into()];
    if !extra.is_empty() {
        args.extend(split_config(extra)?.into_iter().map(OsString::from));
    }

    let (status, output) = run_query(&args)?;
    // 3.x exits with 1 after listing
    if status != 0 && status != 1 {
        return Err(OcrError::EngineNotFound(config.command_name()));
    }

    Ok(parse_languages(&String::from_utf8_lossy(&output)))
}

/// Keeps the lines of a `--list-langs` listing that are language codes.
pub fn parse_languages(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| lang_pattern().is_match(line))
        .map(str::to_string)
        .collect()
}

use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::InvocationOptions;
use crate::engine::{OcrError, Result};

/// Output files the engine can produce, named by their file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    Txt,
    Box,
    Osd,
    Tsv,
    /// ALTO XML, written as `.xml`.
    Alto,
    Hocr,
    Pdf,
}

impl Extension {
    pub fn as_str(self) -> &'static str {
        match self {
            Extension::Txt => "txt",
            Extension::Box => "box",
            Extension::Osd => "osd",
            Extension::Tsv => "tsv",
            Extension::Alto => "xml",
            Extension::Hocr => "hocr",
            Extension::Pdf => "pdf",
        }
    }

    /// The engine picks these up from `-c` config variables; passing them as
    /// config file names would fail.
    pub fn is_implicit(self) -> bool {
        matches!(
            self,
            Extension::Box | Extension::Osd | Extension::Tsv | Extension::Alto
        )
    }

    /// Formats that are always read back as raw bytes.
    pub fn is_binary(self) -> bool {
        matches!(self, Extension::Pdf | Extension::Hocr)
    }

    /// The `-c` config variable that enables this output.
    pub fn config_var(self) -> Option<&'static str> {
        match self {
            Extension::Box => Some("tessedit_create_boxfile=1"),
            Extension::Alto => Some("tessedit_create_alto=1"),
            Extension::Hocr => Some("tessedit_create_hocr=1"),
            Extension::Tsv => Some("tessedit_create_tsv=1"),
            Extension::Txt | Extension::Osd | Extension::Pdf => None,
        }
    }

    /// Engine config files this output needs besides its config variable.
    pub fn config_files(self) -> &'static [&'static str] {
        match self {
            Extension::Box => &["batch.nochop", "makebox"],
            _ => &[],
        }
    }
}

/// Flags that make the engine produce `extensions`, split around the user
/// config: config variables go before it and config file names after it.
/// The engine stops reading options at the first config file name, so a
/// user config ending in one must not swallow the variables.
pub fn implicit_config(extensions: &[Extension]) -> (String, String) {
    let vars = extensions
        .iter()
        .filter_map(|ext| ext.config_var())
        .map(|var| format!("-c {}", var))
        .collect::<Vec<_>>()
        .join(" ");
    let files = extensions
        .iter()
        .flat_map(|ext| ext.config_files().iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    (vars, files)
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Extension {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "txt" => Ok(Extension::Txt),
            "box" => Ok(Extension::Box),
            "osd" => Ok(Extension::Osd),
            "tsv" => Ok(Extension::Tsv),
            "xml" | "alto" => Ok(Extension::Alto),
            "hocr" => Ok(Extension::Hocr),
            "pdf" => Ok(Extension::Pdf),
            other => Err(OcrError::InvalidInput(format!(
                "unsupported extension: {}",
                other
            ))),
        }
    }
}

/// Everything needed to launch one engine run.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub command: &'a Path,
    pub input: &'a Path,
    pub output_base: &'a Path,
    pub extensions: &'a [Extension],
    pub options: &'a InvocationOptions,
}

impl Invocation<'_> {
    /// Builds the argument vector. The first element is the program to run.
    pub fn to_args(&self) -> Result<Vec<OsString>> {
        let mut args: Vec<OsString> = Vec::new();

        if cfg!(not(windows)) && self.options.nice != 0 {
            args.push("nice".into());
            args.push("-n".into());
            args.push(self.options.nice.to_string().into());
        }

        args.push(self.command.into());
        args.push(self.input.into());
        args.push(self.output_base.into());

        if let Some(lang) = &self.options.lang {
            args.push("-l".into());
            args.push(lang.into());
        }

        if !self.options.config.is_empty() {
            args.extend(split_config(&self.options.config)?.into_iter().map(OsString::from));
        }

        args.extend(
            self.extensions
                .iter()
                .filter(|ext| !ext.is_implicit())
                .map(|ext| OsString::from(ext.as_str())),
        );

        Ok(args)
    }
}

/// Splits user supplied flags the way the platform shell would.
pub fn split_config(config: &str) -> Result<Vec<String>> {
    if cfg!(windows) {
        split_non_posix(config)
    } else {
        shlex::split(config)
            .ok_or_else(|| OcrError::InvalidConfig(format!("unbalanced quotes in {:?}", config)))
    }
}

/// Windows style splitting: whitespace separates tokens, double and single
/// quotes group text and are kept in the token, backslashes are literal.
fn split_non_posix(config: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;

    for c in config.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err(OcrError::InvalidConfig(format!(
            "unbalanced quotes in {:?}",
            config
        )));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

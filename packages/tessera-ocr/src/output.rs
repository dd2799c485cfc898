use std::fs;
use std::io;
use std::path::Path;

use crate::engine::{OcrError, Result};
use crate::osd::Osd;
use crate::table::Table;

/// Shape the caller wants the engine output in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    Bytes,
    Dict,
    #[default]
    String,
}

/// Raw contents of one output file.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutput {
    Bytes(Vec<u8>),
    Text(String),
}

impl RawOutput {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            RawOutput::Bytes(bytes) => bytes,
            RawOutput::Text(text) => text.into_bytes(),
        }
    }

    pub fn into_text(self) -> Result<String> {
        match self {
            RawOutput::Text(text) => Ok(text),
            RawOutput::Bytes(bytes) => decode(bytes),
        }
    }
}

/// Result of an OCR call, tagged by the requested [`OutputType`].
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Bytes(Vec<u8>),
    String(String),
    Dict(Dict),
}

/// Structured form of an output.
#[derive(Debug, Clone, PartialEq)]
pub enum Dict {
    /// Plain text under the `text` key.
    Text(String),
    Table(Table),
    Osd(Osd),
}

impl Output {
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Output::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Output::String(text) => Some(text),
            Output::Dict(Dict::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn into_table(self) -> Option<Table> {
        match self {
            Output::Dict(Dict::Table(table)) => Some(table),
            _ => None,
        }
    }

    pub fn into_osd(self) -> Option<Osd> {
        match self {
            Output::Dict(Dict::Osd(osd)) => Some(osd),
            _ => None,
        }
    }
}

/// Reads an output file written by the engine.
pub fn read_output(path: &Path, return_bytes: bool) -> Result<RawOutput> {
    if return_bytes {
        return read_file(path).map(RawOutput::Bytes);
    }
    read_text(path).map(RawOutput::Text)
}

/// Reads an output file as UTF-8 text.
pub fn read_text(path: &Path) -> Result<String> {
    decode(read_file(path)?)
}

fn decode(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => OcrError::OutputMissing {
            path: path.to_path_buf(),
        },
        _ => OcrError::Io(e),
    })
}

//! # tessera-ocr
//!
//! Runs the Tesseract command line engine as a subprocess and parses what it
//! writes back.
//!
//! ```ignore
//! use tessera_ocr::{EngineConfig, InvocationOptions, OcrInput, OutputType, Tesseract};
//!
//! let tesseract = Tesseract::new(EngineConfig::default());
//! let input = OcrInput::FilePath("scan.png".into());
//! let opts = InvocationOptions::default().with_lang("eng");
//!
//! let text = tesseract.image_to_string(&input, &opts, OutputType::String)?;
//! let words = tesseract.image_to_data(&input, &opts, OutputType::Dict)?;
//! ```

pub mod command;
pub mod config;
pub mod engine;
pub mod image_input;
pub mod osd;
pub mod output;
pub mod region;
pub mod runner;
pub mod table;
pub mod tesseract;
pub mod version;

pub use command::Extension;
pub use config::{EngineConfig, InvocationOptions};
pub use engine::{OcrEngine, OcrError, OcrInput, OcrOutput, Result};
pub use osd::Osd;
pub use output::{Dict, Output, OutputType, RawOutput};
pub use region::{BoundingBox, TextRegion};
pub use table::{Cell, Table};
pub use tesseract::Tesseract;
pub use version::{EngineCapabilities, EngineVersion};

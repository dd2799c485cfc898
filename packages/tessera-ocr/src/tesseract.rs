//! The public entry point: one method per kind of engine output.

use std::io;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::command::{implicit_config, Extension, Invocation};
use crate::config::{EngineConfig, InvocationOptions};
use crate::engine::{OcrEngine, OcrError, OcrInput, OcrOutput, Result};
use crate::image_input::TempArtifacts;
use crate::osd::Osd;
use crate::output::{read_output, Dict, Output, OutputType, RawOutput};
use crate::region::{BoundingBox, TextRegion};
use crate::runner::run_engine;
use crate::table::{records, Cell, Table};
use crate::version::{query_languages, query_version, EngineCapabilities, EngineVersion};

/// Language used for orientation and script detection when none is given.
pub const OSD_LANG: &str = "osd";

/// Handle to the engine binary.
///
/// Cheap to clone; clones share the cached version information.
#[derive(Debug, Clone)]
pub struct Tesseract {
    config: Arc<EngineConfig>,
    capabilities: Arc<OnceLock<EngineCapabilities>>,
    options: InvocationOptions,
}

impl Default for Tesseract {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Tesseract {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
            capabilities: Arc::new(OnceLock::new()),
            options: InvocationOptions::default(),
        }
    }

    /// Options used by [`OcrEngine::recognize`].
    pub fn with_options(mut self, options: InvocationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Version-gated features. The engine is queried on first use only.
    pub fn capabilities(&self) -> Result<EngineCapabilities> {
        if let Some(capabilities) = self.capabilities.get() {
            return Ok(*capabilities);
        }
        let detected = EngineCapabilities::new(query_version(&self.config)?);
        Ok(*self.capabilities.get_or_init(|| detected))
    }

    pub fn version(&self) -> Result<EngineVersion> {
        Ok(self.capabilities()?.version)
    }

    /// Installed languages. `extra` is passed through to the engine.
    pub fn languages(&self, extra: &str) -> Result<Vec<String>> {
        query_languages(&self.config, extra)
    }

    /// Recognized text.
    pub fn image_to_string(
        &self,
        input: &OcrInput,
        opts: &InvocationOptions,
        output_type: OutputType,
    ) -> Result<Output> {
        let ext = Extension::Txt;
        Ok(match output_type {
            OutputType::Bytes => Output::Bytes(self.run_bytes(input, ext, opts)?),
            OutputType::Dict => Output::Dict(Dict::Text(self.run_text(input, ext, opts)?)),
            OutputType::String => Output::String(self.run_text(input, ext, opts)?),
        })
    }

    /// Recognized characters with their box boundaries.
    pub fn image_to_boxes(
        &self,
        input: &OcrInput,
        opts: &InvocationOptions,
        output_type: OutputType,
    ) -> Result<Output> {
        let ext = Extension::Box;
        let opts = with_outputs(opts, &[ext]);
        Ok(match output_type {
            OutputType::Bytes => Output::Bytes(self.run_bytes(input, ext, &opts)?),
            OutputType::Dict => Output::Dict(Dict::Table(Table::parse_boxes(
                &self.run_text(input, ext, &opts)?,
            ))),
            OutputType::String => Output::String(self.run_text(input, ext, &opts)?),
        })
    }

    /// Word level TSV data: boxes, confidences and layout levels.
    pub fn image_to_data(
        &self,
        input: &OcrInput,
        opts: &InvocationOptions,
        output_type: OutputType,
    ) -> Result<Output> {
        self.capabilities()?.require_tsv()?;

        let ext = Extension::Tsv;
        let opts = with_outputs(opts, &[ext]);
        Ok(match output_type {
            OutputType::Bytes => Output::Bytes(self.run_bytes(input, ext, &opts)?),
            OutputType::Dict => Output::Dict(Dict::Table(Table::parse_tsv(
                &self.run_text(input, ext, &opts)?,
            ))),
            OutputType::String => Output::String(self.run_text(input, ext, &opts)?),
        })
    }

    /// Orientation and script detection. Runs with `--psm 0` and the `osd`
    /// language unless another language is given.
    pub fn image_to_osd(
        &self,
        input: &OcrInput,
        opts: &InvocationOptions,
        output_type: OutputType,
    ) -> Result<Output> {
        let ext = Extension::Osd;
        let mut opts = opts.prepend_config("--psm 0");
        if opts.lang.is_none() {
            opts.lang = Some(OSD_LANG.to_string());
        }
        Ok(match output_type {
            OutputType::Bytes => Output::Bytes(self.run_bytes(input, ext, &opts)?),
            OutputType::Dict => Output::Dict(Dict::Osd(Osd::parse(&self.run_text(input, ext, &opts)?))),
            OutputType::String => Output::String(self.run_text(input, ext, &opts)?),
        })
    }

    /// A searchable PDF or an hOCR document, as raw bytes.
    pub fn image_to_pdf_or_hocr(
        &self,
        input: &OcrInput,
        opts: &InvocationOptions,
        extension: Extension,
    ) -> Result<Vec<u8>> {
        let opts = match extension {
            Extension::Pdf => opts.clone(),
            Extension::Hocr => with_outputs(opts, &[extension]),
            other => {
                return Err(OcrError::InvalidInput(format!(
                    "unsupported extension: {}",
                    other
                )))
            }
        };
        self.run_bytes(input, extension, &opts)
    }

    /// ALTO XML, as raw bytes.
    pub fn image_to_alto_xml(&self, input: &OcrInput, opts: &InvocationOptions) -> Result<Vec<u8>> {
        self.capabilities()?.require_alto()?;

        let ext = Extension::Alto;
        let opts = with_outputs(opts, &[ext]);
        self.run_bytes(input, ext, &opts)
    }

    /// Produces several outputs from a single engine run, in the order of
    /// `extensions`. PDF and hOCR are always returned as bytes.
    pub fn run_multiple(
        &self,
        input: &OcrInput,
        extensions: &[Extension],
        opts: &InvocationOptions,
        return_bytes: bool,
    ) -> Result<Vec<RawOutput>> {
        if extensions.contains(&Extension::Tsv) {
            self.capabilities()?.require_tsv()?;
        }
        if extensions.contains(&Extension::Alto) {
            self.capabilities()?.require_alto()?;
        }

        let opts = with_outputs(opts, extensions);
        self.run(input, extensions, &opts, return_bytes)
    }

    /// Runs the blocking OCR pipeline once: text plus word regions.
    pub fn recognize_blocking(&self, input: &OcrInput, opts: &InvocationOptions) -> Result<OcrOutput> {
        let mut outputs = self
            .run_multiple(input, &[Extension::Txt, Extension::Tsv], opts, false)?
            .into_iter();
        let (Some(text), Some(tsv)) = (outputs.next(), outputs.next()) else {
            return Err(OcrError::InvalidInput("engine produced too few outputs".to_string()));
        };

        Ok(OcrOutput {
            text: text.into_text()?,
            regions: regions_from_tsv(&tsv.into_text()?),
        })
    }

    fn run_text(&self, input: &OcrInput, ext: Extension, opts: &InvocationOptions) -> Result<String> {
        self.run_one(input, ext, opts, false)?.into_text()
    }

    fn run_bytes(&self, input: &OcrInput, ext: Extension, opts: &InvocationOptions) -> Result<Vec<u8>> {
        Ok(self.run_one(input, ext, opts, true)?.into_bytes())
    }

    fn run_one(
        &self,
        input: &OcrInput,
        ext: Extension,
        opts: &InvocationOptions,
        return_bytes: bool,
    ) -> Result<RawOutput> {
        self.run(input, &[ext], opts, return_bytes)?
            .pop()
            .ok_or_else(|| OcrError::InvalidInput("no output requested".to_string()))
    }

    /// Temp files, then the engine process, then the outputs. The temp files
    /// are removed on every path out of here.
    fn run(
        &self,
        input: &OcrInput,
        extensions: &[Extension],
        opts: &InvocationOptions,
        return_bytes: bool,
    ) -> Result<Vec<RawOutput>> {
        let artifacts = TempArtifacts::create(input, self.config.temp_dir.as_deref())?;

        let args = Invocation {
            command: &self.config.command,
            input: artifacts.input(),
            output_base: artifacts.base(),
            extensions,
            options: opts,
        }
        .to_args()?;
        run_engine(&args, false, opts.timeout)?;

        let outputs = extensions
            .iter()
            .map(|ext| {
                read_output(
                    &artifacts.output(ext.as_str()),
                    return_bytes || ext.is_binary(),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        artifacts.release()?;
        Ok(outputs)
    }
}

/// Options extended with the flags that make the engine write `extensions`.
fn with_outputs(opts: &InvocationOptions, extensions: &[Extension]) -> InvocationOptions {
    let (vars, files) = implicit_config(extensions);
    opts.wrap_config(&vars, &files)
}

#[async_trait]
impl OcrEngine for Tesseract {
    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput> {
        let engine = self.clone();
        let input = input.clone();
        tokio::task::spawn_blocking(move || engine.recognize_blocking(&input, &engine.options))
            .await
            .map_err(|e| OcrError::Io(io::Error::other(e)))?
    }
}

/// Word regions from the engine's TSV output. Rows without text or with a
/// negative confidence (layout rows) are skipped, as are rows shorter than
/// the header.
pub fn regions_from_tsv(tsv: &str) -> Vec<TextRegion> {
    records(tsv, "\t")
        .iter()
        .filter_map(|record| {
            let raw = |name: &str| {
                record
                    .iter()
                    .find(|(column, _)| *column == name)
                    .map(|(_, value)| *value)
            };
            let int = |name: &str| raw(name).and_then(|value| Cell::coerce(value).as_int());

            let text = raw("text")?.trim();
            if text.is_empty() {
                return None;
            }
            let confidence = int("conf");
            if confidence.is_some_and(|conf| conf < 0) {
                return None;
            }

            let bounding_box = match (int("left"), int("top"), int("width"), int("height")) {
                (Some(x), Some(y), Some(width), Some(height)) => Some(BoundingBox {
                    x: x as f32,
                    y: y as f32,
                    width: width as f32,
                    height: height as f32,
                }),
                _ => None,
            };

            Some(TextRegion {
                text: text.to_string(),
                bounding_box,
                confidence: confidence.map(|conf| conf as f32),
            })
        })
        .collect()
}

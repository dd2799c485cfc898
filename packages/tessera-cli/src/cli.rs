//! Command line arguments backing the `tessera` binary.
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
  name = "tessera",
  about = "Run the Tesseract OCR engine on an image and print what it recognized",
  version
)]
pub struct Args {
  /// Image file to recognize
  #[arg(required_unless_present_any = ["list_langs", "engine_version"])]
  pub input_file: Option<PathBuf>,

  /// Recognition language, e.g. `eng` or `eng+deu`
  #[arg(long, short = 'l')]
  pub lang: Option<String>,

  /// Extra flags handed to the engine, e.g. "--psm 6"
  #[arg(long, short = 'c', default_value = "", allow_hyphen_values = true)]
  pub config: String,

  /// Seconds before the engine is killed; 0 waits forever
  #[arg(long, default_value_t = 0)]
  pub timeout: u64,

  /// Niceness adjustment for the engine process
  #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
  pub nice: i32,

  /// Kind of output to produce
  #[arg(long, value_enum, default_value_t = Mode::Text)]
  pub mode: Mode,

  /// Print parsed output as JSON (text, data, boxes and osd modes)
  #[arg(long)]
  pub json: bool,

  /// Engine binary to run
  #[arg(long, env = "TESSERACT_CMD", default_value = "tesseract")]
  pub tesseract_cmd: PathBuf,

  /// List the installed languages and exit
  #[arg(long)]
  pub list_langs: bool,

  /// Print the engine version and exit
  #[arg(long)]
  pub engine_version: bool,

  /// More log output; repeat for debug logs
  #[arg(long, short = 'v', action = ArgAction::Count)]
  pub verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
  /// Plain text
  Text,
  /// Word level TSV data
  Data,
  /// Character boxes
  Boxes,
  /// Orientation and script detection
  Osd,
  /// hOCR markup
  Hocr,
  /// ALTO XML
  Alto,
  /// Searchable PDF
  Pdf,
}

impl Args {
  pub fn log_level(&self) -> &'static str {
    match self.verbose {
      0 => "warn",
      1 => "info",
      _ => "debug",
    }
  }
}

mod cli;

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Mode};
use tessera_ocr::{
  Dict, EngineConfig, Extension, InvocationOptions, OcrInput, Output, OutputType, Tesseract,
};

fn main() -> ExitCode {
  let args = Args::parse();

  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()))
    .format_timestamp(None)
    .init();

  match run(&args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("Error: {:#}", e);
      ExitCode::FAILURE
    }
  }
}

fn run(args: &Args) -> Result<()> {
  let tesseract = Tesseract::new(EngineConfig::new(&args.tesseract_cmd));

  if args.engine_version {
    println!("tesseract {}", tesseract.version()?);
    return Ok(());
  }

  if args.list_langs {
    for lang in tesseract.languages(&args.config)? {
      println!("{}", lang);
    }
    return Ok(());
  }

  let path = args.input_file.as_deref().context("no input file given")?;
  let input = open_image(path)?;

  let opts = InvocationOptions {
    lang: args.lang.clone(),
    config: args.config.clone(),
    nice: args.nice,
    timeout: Duration::from_secs(args.timeout),
  };
  let output_type = if args.json {
    OutputType::Dict
  } else {
    OutputType::String
  };
  log::debug!("running {:?} on {}", args.mode, path.display());

  let output = match args.mode {
    Mode::Text => tesseract.image_to_string(&input, &opts, output_type)?,
    Mode::Data => tesseract.image_to_data(&input, &opts, output_type)?,
    Mode::Boxes => tesseract.image_to_boxes(&input, &opts, output_type)?,
    Mode::Osd => tesseract.image_to_osd(&input, &opts, output_type)?,
    Mode::Hocr => Output::Bytes(tesseract.image_to_pdf_or_hocr(&input, &opts, Extension::Hocr)?),
    Mode::Pdf => Output::Bytes(tesseract.image_to_pdf_or_hocr(&input, &opts, Extension::Pdf)?),
    Mode::Alto => Output::Bytes(tesseract.image_to_alto_xml(&input, &opts)?),
  };

  print_output(output)
}

fn open_image(path: &Path) -> Result<OcrInput> {
  let reader = image::ImageReader::open(path)
    .and_then(|reader| reader.with_guessed_format())
    .with_context(|| format!("cannot open {}", path.display()))?;
  let format = reader.format();
  let image = reader
    .decode()
    .with_context(|| format!("cannot decode {}", path.display()))?;

  Ok(OcrInput::Image { image, format })
}

fn print_output(output: Output) -> Result<()> {
  let mut stdout = io::stdout().lock();
  match output {
    Output::Bytes(bytes) => stdout.write_all(&bytes)?,
    Output::String(text) => writeln!(stdout, "{}", text)?,
    Output::Dict(Dict::Text(text)) => {
      writeln!(stdout, "{}", serde_json::json!({ "text": text }))?
    }
    Output::Dict(Dict::Table(table)) => {
      writeln!(stdout, "{}", serde_json::to_string_pretty(&table)?)?
    }
    Output::Dict(Dict::Osd(osd)) => writeln!(stdout, "{}", serde_json::to_string_pretty(&osd)?)?,
  }
  stdout.flush()?;
  Ok(())
}

// pdf-ai-colorize - overlay AI-likelihood colors onto the text of a PDF
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use pdf_ai_colorize::config::{FileConfig, Settings};
use pdf_ai_colorize::pipeline::{self, check_inputs, PipelineOptions};
use pdf_ai_colorize::{DetectorKind, Scorer, TextUnit};

#[derive(Parser, Debug)]
#[command(author, version, about = "Colorize PDF text by AI-generation likelihood")]
struct Args {
    /// Input PDF file
    input: PathBuf,
    /// Output PDF file
    output: PathBuf,
    /// Model name or directory holding model.onnx and tokenizer.json [default: gpt2]
    #[arg(long)]
    model: Option<String>,
    /// Detection method [default: simple]
    #[arg(long, value_enum)]
    detector: Option<DetectorKind>,
    /// Granularity of extracted text [default: line]
    #[arg(long, value_enum)]
    unit_type: Option<TextUnit>,
    /// Merge up to N adjacent text boxes; 1 disables merging [default: 5]
    #[arg(long)]
    merge_boxes: Option<usize>,
    /// Overlay fill opacity between 0.0 and 1.0 [default: 0.3]
    #[arg(long)]
    opacity: Option<f32>,
    /// Also write <output-stem>_legend.pdf
    #[arg(long)]
    create_legend: bool,
    /// Segments shorter than this are left unscored [default: 10]
    #[arg(long)]
    min_text_length: Option<usize>,
    /// TOML file with defaults for the options above
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write per-segment scores as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Args {
    /// CLI flags over the config file over built-in defaults.
    fn settings(&self) -> Result<Settings> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let mut settings = Settings::from_file(file);

        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(detector) = self.detector {
            settings.detector = detector;
        }
        if let Some(unit) = self.unit_type {
            settings.unit_type = unit;
        }
        if let Some(n) = self.merge_boxes {
            settings.merge_boxes = n;
        }
        if let Some(opacity) = self.opacity {
            settings.opacity = opacity;
        }
        if let Some(n) = self.min_text_length {
            settings.min_text_length = n;
        }
        settings.create_legend |= self.create_legend;

        settings.validate()?;
        Ok(settings)
    }
}

fn log_color_guide() {
    log::info!("Color guide:");
    log::info!("  Green  = likely human-written");
    log::info!("  Yellow = mixed or uncertain");
    log::info!("  Red    = likely AI-generated");
}

fn run(args: Args) -> Result<()> {
    let settings = args.settings()?;

    log::info!("PDF AI Colorizer");
    log::info!("Input:    {}", args.input.display());
    log::info!("Output:   {}", args.output.display());
    log::info!("Model:    {}", settings.model);
    log::info!("Detector: {:?}", settings.detector);

    check_inputs(&args.input, settings.opacity)?;

    log::info!("Loading language model '{}'...", settings.model);
    let mut scorer = Scorer::from_model_name(&settings.model, settings.detector, settings.min_text_length)?;

    let options = PipelineOptions::from_settings(&settings, args.report.clone());
    let summary = pipeline::run(&args.input, &args.output, &options, &mut scorer)?;

    log::info!("Done! Colorized PDF saved to {}", args.output.display());
    if let Some(legend) = &summary.legend {
        log::info!("Legend saved to {}", legend.display());
    }
    log_color_guide();
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

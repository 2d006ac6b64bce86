use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use chromextract::io::chromatogram_writer::{SerializationFormat, SerializingChromatogramWriter};
use chromextract::io::spectrum_reader::SpectrumReader;
use chromextract::models::request::{
    AcquisitionMethod, ChromExtractor, ChromatogramGroup, IsolationScheme,
};
use chromextract::{
    ChromatogramGenerator, ChromatogramRequest, ChromextractError, GenerationSummary,
    NumpressCodec,
};

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressIterator, ProgressStyle};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::info;
use tracing::subscriber::set_global_default;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Emit bunyan-formatted JSON logs.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// The path to the json file with the chromatogram request.
    #[arg(short, long)]
    request_path: PathBuf,

    /// The path to the ndjson file with the spectra.
    #[arg(short, long)]
    spectra_path: PathBuf,

    /// The path to the output file.
    #[arg(short, long)]
    output_path: PathBuf,

    /// The format to use for the output
    #[arg(short, long, default_value_t, value_enum)]
    format: SerializationFormat,
}

#[derive(Parser, Debug)]
struct WriteTemplateArgs {
    /// The path to the output files.
    #[arg(short, long)]
    output_path: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract chromatograms from a spectrum stream.
    Extract(ExtractArgs),
    /// Write a template request and spectrum file.
    WriteTemplate(WriteTemplateArgs),
}

fn init_logging(json_logs: bool) -> Result<(), ChromextractError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let res = if json_logs {
        let formatting_layer = BunyanFormattingLayer::new("chromextract".into(), std::io::stderr);
        let subscriber = Registry::default()
            .with(env_filter)
            .with(JsonStorageLayer)
            .with(formatting_layer);
        set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(env_filter).with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE),
        );
        set_global_default(subscriber)
    };
    res.map_err(ChromextractError::custom)
}

fn main() -> Result<(), ChromextractError> {
    let args = Args::parse();
    init_logging(args.json_logs)?;

    match args.command {
        Some(Commands::Extract(args)) => main_extract(args)?,
        Some(Commands::WriteTemplate(args)) => main_write_template(args)?,
        None => {
            println!("No command provided");
        }
    }
    Ok(())
}

fn template_request() -> ChromatogramRequest {
    let mut request = ChromatogramRequest::new(0.01, AcquisitionMethod::Dia);
    request.isolation_scheme = Some(IsolationScheme {
        precursor_filter: Some(2.0),
        ..Default::default()
    });
    for i in 0..3 {
        let precursor_mz = 500.0 + (i as f64 * 50.0);
        let mut group = ChromatogramGroup::new(precursor_mz)
            .with_transition(precursor_mz + 100.0, 0.02)
            .with_transition(precursor_mz + 200.0, 0.02);
        group.modified_sequence = Some(format!("PEPTIDE{}K", i));
        group.mass_errors = i == 0;
        if i == 2 {
            group.extractor = ChromExtractor::BasePeak;
        }
        request.chromatogram_groups.push(group);
    }
    request
}

fn template_spectra(request: &ChromatogramRequest) -> Vec<serde_json::Value> {
    let mut out = Vec::new();
    for cycle in 0..5 {
        let rt = 1.0 + cycle as f64 * 0.05;
        let ms1_mzs: Vec<f64> = request
            .chromatogram_groups
            .iter()
            .map(|g| g.precursor_mz)
            .collect();
        let ms1_intensities: Vec<f64> = ms1_mzs.iter().map(|_| 1e5 * (cycle + 1) as f64).collect();
        out.push(serde_json::json!({
            "ms_level": 1,
            "retention_time": rt,
            "mzs": ms1_mzs,
            "intensities": ms1_intensities,
        }));
        for group in request.chromatogram_groups.iter() {
            let mzs: Vec<f64> = group.transitions.iter().map(|t| t.product_mz).collect();
            let intensities: Vec<f64> = mzs.iter().map(|_| 1e3 * (cycle + 1) as f64).collect();
            out.push(serde_json::json!({
                "ms_level": 2,
                "retention_time": rt,
                "precursors": [{
                    "isolation_mz": group.precursor_mz,
                    "lower_offset": 1.0,
                    "upper_offset": 1.0,
                }],
                "mzs": {
                    "accession": NumpressCodec::Linear.accession(),
                    "data": NumpressCodec::Linear.encode(&mzs),
                },
                "intensities": {
                    "accession": NumpressCodec::Slof.accession(),
                    "data": NumpressCodec::Slof.encode(&intensities),
                },
            }));
        }
    }
    out
}

fn main_write_template(args: WriteTemplateArgs) -> Result<(), ChromextractError> {
    let output_path = args.output_path;
    let request = template_request();
    let spectra = template_spectra(&request);

    let request_json = serde_json::to_string_pretty(&request)?;
    let mut spectra_ndjson = String::new();
    for spectrum in spectra.iter() {
        spectra_ndjson.push_str(&serde_json::to_string(spectrum)?);
        spectra_ndjson.push('\n');
    }

    std::fs::create_dir_all(&output_path)?;
    println!("Writing to {}", output_path.display());
    let request_path = output_path.join("request.json");
    let spectra_path = output_path.join("spectra.ndjson");
    std::fs::write(&request_path, request_json)?;
    std::fs::write(&spectra_path, spectra_ndjson)?;
    println!(
        "use as `chromextract extract --output-path 'chromatograms.json' --request-path {:#?} --spectra-path {:#?}`",
        request_path, spectra_path,
    );
    Ok(())
}

#[derive(Tabled)]
struct SummaryRow {
    counter: &'static str,
    value: usize,
}

fn summary_table(summary: &GenerationSummary) -> String {
    let rows = [
        ("spectra seen", summary.spectra_seen),
        ("skipped (no peaks)", summary.skipped_empty),
        ("skipped (no retention time)", summary.skipped_missing_time),
        ("skipped (outside time window)", summary.skipped_out_of_window),
        ("ms1 spectra", summary.ms1_spectra),
        ("msn spectra", summary.msn_spectra),
        ("msn spectra without groups", summary.msn_unmatched),
        ("points accumulated", summary.points_accumulated),
        ("groups written", summary.groups_written),
    ]
    .map(|(counter, value)| SummaryRow { counter, value });
    Table::new(rows).with(Style::modern()).to_string()
}

#[derive(Tabled)]
struct GroupRow {
    group: usize,
    precursor_mz: f64,
    sequence: String,
    transitions: usize,
    points: usize,
}

fn group_table(request: &ChromatogramRequest, summary: &GenerationSummary) -> String {
    let rows = request
        .chromatogram_groups
        .iter()
        .zip(summary.points_per_group.iter())
        .enumerate()
        .map(|(i, (group, points))| GroupRow {
            group: i,
            precursor_mz: group.precursor_mz,
            sequence: group.modified_sequence.clone().unwrap_or_default(),
            transitions: group.transitions.len(),
            points: *points,
        });
    Table::new(rows).with(Style::modern()).to_string()
}

fn main_extract(args: ExtractArgs) -> Result<(), ChromextractError> {
    let request: ChromatogramRequest =
        serde_json::from_str(&std::fs::read_to_string(&args.request_path)?)?;
    info!(
        "Loaded request with {} chromatogram groups from {}",
        request.chromatogram_groups.len(),
        args.request_path.display()
    );
    let mut generator = ChromatogramGenerator::new(request)?;

    let reader = SpectrumReader::new(BufReader::new(File::open(&args.spectra_path)?));
    if let Some(parent) = args.output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = SerializingChromatogramWriter::new(
        BufWriter::new(File::create(&args.output_path)?),
        args.format,
    );

    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {pos} spectra ({per_sec})",
    )
    .map_err(ChromextractError::custom)?;
    let progress = ProgressBar::new_spinner().with_style(style);
    let summary = generator.generate(reader.progress_with(progress), &mut writer)?;

    println!("{}", group_table(generator.request(), &summary));
    println!("{}", summary_table(&summary));
    println!("Wrote {}", args.output_path.display());
    Ok(())
}

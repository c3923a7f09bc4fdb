//! bubblegrid CLI — grade bubble-sheet scans against an answer key.

use bubblegrid::{
    encode_png, sample_layout, to_gray, AnswerKey, BatchStrategy, BubbleLayout, DetectionResult,
    GradeConfig, Grader, LengthPolicy, ScoreRecord, SheetInput, SummaryRow,
};
use clap::{Args, Parser, Subcommand};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "bubblegrid")]
#[command(about = "Detect filled answer bubbles on scanned sheets and score them against a key")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade one or more sheet images.
    Grade(CliGradeArgs),

    /// Print per-bubble darkness values for a single image.
    Sample {
        /// Path to the input image.
        #[arg(long)]
        image: PathBuf,

        #[command(flatten)]
        layout: CliLayoutArgs,
    },

    /// Print the bubble layout summary.
    LayoutInfo {
        #[command(flatten)]
        layout: CliLayoutArgs,

        /// Write the layout as explicit-rectangle JSON.
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args, Default)]
struct CliLayoutArgs {
    /// Layout JSON (`bubblegrid.layout.v1`). Uses the built-in 10x4 layout when omitted.
    #[arg(long)]
    layout: Option<PathBuf>,
}

impl CliLayoutArgs {
    fn load(&self) -> CliResult<BubbleLayout> {
        match &self.layout {
            Some(path) => BubbleLayout::from_json_file(path).map_err(|e| -> CliError {
                format!("failed to load layout {}: {}", path.display(), e).into()
            }),
            None => Ok(BubbleLayout::default()),
        }
    }
}

#[derive(Debug, Clone, Args)]
struct CliGradeArgs {
    /// Answer key text file: one option label per line.
    #[arg(long)]
    key: PathBuf,

    /// Sheet images to grade.
    #[arg(required = true)]
    sheets: Vec<PathBuf>,

    #[command(flatten)]
    layout: CliLayoutArgs,

    /// Grading config JSON; CLI flags override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to write the results (JSON).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Directory for annotated sheet images (PNG).
    #[arg(long)]
    annotate_dir: Option<PathBuf>,

    /// Report a question blank when its darkest bubble mean exceeds this (0-255).
    #[arg(long)]
    blank_threshold: Option<f64>,

    /// Flag a question ambiguous when the runner-up is within this margin (0-255).
    #[arg(long)]
    ambiguity_margin: Option<f64>,

    /// Fail sheets whose question count differs from the key instead of truncating.
    #[arg(long)]
    strict_length: bool,

    /// Grade sheets one at a time on the main thread.
    #[arg(long)]
    sequential: bool,
}

impl CliGradeArgs {
    fn to_config(&self) -> CliResult<GradeConfig> {
        let mut config = match &self.config {
            Some(path) => GradeConfig::from_json_file(path).map_err(|e| -> CliError {
                format!("failed to load config {}: {}", path.display(), e).into()
            })?,
            None => GradeConfig::default(),
        };

        if self.blank_threshold.is_some() {
            config.resolve.blank_threshold = self.blank_threshold;
        }
        if self.ambiguity_margin.is_some() {
            config.resolve.ambiguity_margin = self.ambiguity_margin;
        }
        if self.strict_length {
            config.length_policy = LengthPolicy::Strict;
        }
        if self.sequential {
            config.batch = BatchStrategy::Sequential;
        }
        config.annotate.enable = self.annotate_dir.is_some();

        Ok(config)
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Grade(args) => run_grade(&args),
        Commands::Sample { image, layout } => run_sample(&image, &layout),
        Commands::LayoutInfo { layout, export } => run_layout_info(&layout, export.as_deref()),
    }
}

// ── layout-info ───────────────────────────────────────────────────────

fn run_layout_info(layout_args: &CliLayoutArgs, export: Option<&Path>) -> CliResult<()> {
    let layout = layout_args.load()?;
    let [w, h] = layout.required_size();

    println!("bubblegrid layout");
    println!("  name:           {}", layout.name);
    println!("  questions:      {}", layout.n_questions());
    println!("  options:        {}", layout.options().joined());
    println!("  min sheet size: {}x{} px", w, h);

    if let Some(first) = layout.questions().first() {
        println!("  question {}:     {}", first.id, format_bubbles(&first.bubbles));
    }
    if let Some(last) = layout.questions().last() {
        println!("  question {}:    {}", last.id, format_bubbles(&last.bubbles));
    }

    if let Some(path) = export {
        std::fs::write(path, layout.to_json_string()?)?;
        tracing::info!("Layout written to {}", path.display());
    }

    Ok(())
}

fn format_bubbles(bubbles: &[bubblegrid::BubbleRect]) -> String {
    bubbles
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

// ── sample ────────────────────────────────────────────────────────────

fn run_sample(image: &Path, layout_args: &CliLayoutArgs) -> CliResult<()> {
    let layout = layout_args.load()?;
    tracing::info!("Loading image: {}", image.display());

    let img = image::open(image).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", image.display(), e).into()
    })?;
    let gray = to_gray(&img);
    let (w, h) = gray.dimensions();
    tracing::info!("Image size: {}x{}", w, h);

    let samples = sample_layout(&gray, &layout).map_err(|v| -> CliError {
        format!(
            "question {} option {} bubble {} lies outside the {}x{} image",
            v.question, v.option, v.rect, v.image_size[0], v.image_size[1]
        )
        .into()
    })?;

    println!("{}", serde_json::to_string_pretty(&samples)?);
    Ok(())
}

// ── grade ─────────────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
struct SheetDetail<'a> {
    detection: &'a DetectionResult,
    score: &'a ScoreRecord,
}

#[derive(Debug, serde::Serialize)]
struct GradeReport<'a> {
    layout: &'a str,
    key: &'a AnswerKey,
    rows: Vec<SummaryRow>,
    sheets: Vec<SheetDetail<'a>>,
}

fn run_grade(args: &CliGradeArgs) -> CliResult<()> {
    let layout = args.layout.load()?;
    let config = args.to_config()?;

    // Any key problem stops here, before a single sheet is read.
    let key_bytes = std::fs::read(&args.key).map_err(|e| -> CliError {
        format!("Failed to read answer key {}: {}", args.key.display(), e).into()
    })?;
    let key = AnswerKey::from_bytes(&key_bytes).map_err(|e| -> CliError {
        format!("Invalid answer key {}: {}", args.key.display(), e).into()
    })?;
    tracing::info!("Answer key loaded with {} questions", key.len());
    let grader = Grader::new(layout, key, config)?;

    // Unreadable files become failure rows; readable ones go to the batch.
    let mut inputs = Vec::new();
    let mut read_failures = Vec::new();
    let names = sheet_names(&args.sheets);
    for (idx, (path, sheet)) in args.sheets.iter().zip(names).enumerate() {
        match std::fs::read(path) {
            Ok(bytes) => inputs.push(SheetInput::new(sheet, bytes)),
            Err(e) => {
                tracing::warn!("Failed to read sheet {}: {}", path.display(), e);
                read_failures.push((
                    idx,
                    SummaryRow {
                        sheet,
                        detected: String::new(),
                        score: String::new(),
                        error: Some(format!("cannot read file: {}", e)),
                    },
                ));
            }
        }
    }

    let report = grader.grade_batch(&inputs);
    let mut rows = report.summary_rows();
    for (idx, row) in read_failures {
        rows.insert(idx, row);
    }

    print_table(&rows);

    if let Some(dir) = &args.annotate_dir {
        std::fs::create_dir_all(dir)?;
        for graded in report.graded() {
            let Some(overlay) = &graded.annotated else {
                continue;
            };
            let path = dir.join(annotated_name(&graded.detection.sheet));
            std::fs::write(&path, encode_png(overlay)?)?;
            tracing::info!("Annotated sheet written to {}", path.display());
        }
    }

    if let Some(out) = &args.out {
        let out_report = GradeReport {
            layout: &grader.layout().name,
            key: grader.key(),
            rows,
            sheets: report
                .graded()
                .map(|g| SheetDetail {
                    detection: &g.detection,
                    score: &g.score,
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&out_report)?;
        std::fs::write(out, &json)?;
        tracing::info!("Results written to {}", out.display());
    }

    Ok(())
}

/// Display names for the input sheets, one per path.
///
/// Names are file names. When two inputs share a file stem (`a/s1.png` and
/// `b/s1.png`, or `s1.png` and `s1.jpg`) the later one gets a `-<n>` suffix
/// so rows and annotated outputs stay distinct.
fn sheet_names(paths: &[PathBuf]) -> Vec<String> {
    let mut used = HashSet::new();
    paths
        .iter()
        .enumerate()
        .map(|(idx, path)| {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let ext = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            let mut candidate = stem.clone();
            let mut n = idx + 1;
            while !used.insert(candidate.clone()) {
                candidate = format!("{}-{}", stem, n);
                n += 1;
            }
            format!("{}{}", candidate, ext)
        })
        .collect()
}

fn annotated_name(sheet: &str) -> String {
    let stem = Path::new(sheet)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| sheet.to_string());
    format!("{}_annotated.png", stem)
}

fn print_table(rows: &[SummaryRow]) {
    let w_sheet = rows
        .iter()
        .map(|r| r.sheet.len())
        .chain(std::iter::once("Sheet".len()))
        .max()
        .unwrap_or(0);
    let w_detected = rows
        .iter()
        .map(|r| r.detected.len())
        .chain(std::iter::once("Detected".len()))
        .max()
        .unwrap_or(0);

    println!("{:<w_sheet$}  {:<w_detected$}  Score", "Sheet", "Detected");
    for row in rows {
        match &row.error {
            None => println!(
                "{:<w_sheet$}  {:<w_detected$}  {}",
                row.sheet, row.detected, row.score
            ),
            Some(err) => println!("{:<w_sheet$}  FAILED: {}", row.sheet, err),
        }
    }
}

//! PDF Editor CLI - merge PDFs, reorder pages, and overlay images or text.

mod plan;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_editor_core::{
    AppConfig, FontSource, ImageKind, MediaKind, PdfDocument, Point, Rect, RgbColor, TextStyle,
    font_source_for, merge_pdfs, overlay_image, overlay_text, pdf::image_dimensions, reorder_pages,
};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use plan::{Plan, PlanRunner, to_index};

#[derive(Parser, Debug)]
#[command(name = "pdf-edit")]
#[command(author, version, about = "Merge PDFs and overlay images and text onto pages", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge PDFs in the given order
    Merge {
        /// Input PDF files (at least 2)
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Draw a PNG or JPEG image onto a page
    Image {
        input: PathBuf,
        image: PathBuf,

        #[command(flatten)]
        page: PageArg,

        /// Left edge in points (from the page's left side)
        #[arg(long)]
        x: f32,

        /// Bottom edge in points (from the page's bottom)
        #[arg(long)]
        y: f32,

        #[arg(long)]
        width: f32,

        /// Height in points (default: keep the image's aspect ratio)
        #[arg(long)]
        height: Option<f32>,

        #[command(flatten)]
        output: OutputArg,
    },

    /// Draw multi-line text onto a page
    Text {
        input: PathBuf,

        /// Text to draw; "\n" separates lines
        #[arg(long)]
        text: String,

        #[command(flatten)]
        page: PageArg,

        /// Baseline x of the first line, in points
        #[arg(long)]
        x: f32,

        /// Baseline y of the first line, in points
        #[arg(long)]
        y: f32,

        /// Font size in points (default from config)
        #[arg(long)]
        size: Option<f32>,

        /// Text color: black, red, blue, darkgreen or r,g,b
        #[arg(long, value_parser = parse_color_arg)]
        color: Option<RgbColor>,

        /// Font file name (default from config)
        #[arg(long)]
        font: Option<String>,

        /// Font directory or base URL
        #[arg(long, env = "PDF_EDITOR_FONT_BASE")]
        font_base: Option<String>,

        #[command(flatten)]
        output: OutputArg,
    },

    /// Rearrange pages (1-based, e.g. "3,1,2" or "2-4,1")
    Reorder {
        input: PathBuf,

        #[arg(long)]
        order: String,

        #[command(flatten)]
        output: OutputArg,
    },

    /// Print the page count of a PDF
    Info { input: PathBuf },

    /// Run an edit plan (TOML) against one editing session
    Run {
        plan: PathBuf,

        /// Output PDF file (overrides the plan's output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Font directory or base URL
        #[arg(long, env = "PDF_EDITOR_FONT_BASE")]
        font_base: Option<String>,
    },
}

#[derive(Args, Debug)]
struct PageArg {
    /// Page number (1-based)
    #[arg(long, default_value_t = 1)]
    page: usize,
}

#[derive(Args, Debug)]
struct OutputArg {
    /// Output PDF file (default: export name from config)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl OutputArg {
    fn path(&self, config: &AppConfig) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.output.export))
    }
}

fn parse_color_arg(value: &str) -> Result<RgbColor, String> {
    RgbColor::parse(value).ok_or_else(|| format!("invalid color '{value}' (use a name or r,g,b)"))
}

/// Parse a 1-based page order such as "3,1,2" or "2-4,1" into 0-based indices.
///
/// Order is kept and duplicates are allowed.
fn parse_page_order(order: &str) -> Result<Vec<usize>> {
    let mut result = Vec::new();

    for part in order.split(',') {
        let part = part.trim();
        if let Some((start, end)) = part.split_once('-') {
            let start: usize = start.trim().parse().context("Invalid page range start")?;
            let end: usize = end.trim().parse().context("Invalid page range end")?;
            if start > end {
                anyhow::bail!("Invalid page range {part}");
            }
            for p in start..=end {
                result.push(to_index(p, "page")?);
            }
        } else {
            let page: usize = part.parse().context("Invalid page number")?;
            result.push(to_index(page, "page")?);
        }
    }

    Ok(result)
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write output: {}", path.display()))?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!("Saved PDF to: {}", path.display());
    }
    Ok(())
}

fn fonts_for(config: &AppConfig, font_base: Option<String>) -> Result<std::sync::Arc<dyn FontSource>> {
    let mut fonts = config.fonts.clone();
    if let Some(base) = font_base {
        fonts.base_url = base;
    }
    font_source_for(&fonts).context("Failed to set up font source")
}

async fn run_plan(config: &AppConfig, path: &Path, output: Option<PathBuf>, font_base: Option<String>) -> Result<()> {
    let plan = Plan::from_file(path)?;
    let fonts = fonts_for(config, font_base)?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let output = output
        .or_else(|| plan.output.as_ref().map(|o| base_dir.join(o)))
        .unwrap_or_else(|| base_dir.join(&config.output.export));

    let mut runner = PlanRunner::new(config, fonts.as_ref(), &base_dir);

    let pb = ProgressBar::new(plan.steps.len() as u64);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    for (i, step) in plan.steps.iter().enumerate() {
        pb.set_message(step.action().label());

        match runner.run_step(step).await {
            Ok(notice) => pb.println(format!("Step {}: {notice}", i + 1)),
            Err(e) => {
                pb.abandon();
                let message = match e.downcast_ref::<pdf_editor_core::Error>() {
                    Some(core) => step.action().failure_message(core),
                    None => format!("Error {}: {e:#}", step.action().label()),
                };
                anyhow::bail!("Step {} failed. {message}", i + 1);
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message("done");

    let exported = runner.session.export_current().context("Plan produced no edits")?;
    write(&output, &exported.bytes)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = if let Some(config_path) = &cli.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    match cli.command {
        Command::Merge { inputs, output } => {
            let files = inputs.iter().map(|p| read(p)).collect::<Result<Vec<_>>>()?;
            info!("Merging {} files", files.len());
            let merged = merge_pdfs(&files).context("Failed to merge PDFs")?;
            write(&output, &merged)?;
        }

        Command::Image {
            input,
            image,
            page,
            x,
            y,
            width,
            height,
            output,
        } => {
            let kind: ImageKind = MediaKind::guess_from_name(&image.to_string_lossy()).image_kind()?;
            let image_bytes = read(&image)?;
            let rect = match height {
                Some(h) => Rect::new(x, y, width, h),
                None => Rect::scale_to_width(x, y, width, image_dimensions(&image_bytes, kind)?),
            };

            let out = overlay_image(&read(&input)?, &image_bytes, kind, to_index(page.page, "page")?, rect)
                .context("Failed to add image")?;
            write(&output.path(&config), &out)?;
        }

        Command::Text {
            input,
            text,
            page,
            x,
            y,
            size,
            color,
            font,
            font_base,
            output,
        } => {
            let mut style = TextStyle::from_config(&config);
            if let Some(size) = size {
                style.font_size = size;
            }
            if let Some(color) = color {
                style.color = color;
            }
            if let Some(font) = font {
                style.font = font;
            }

            let fonts = fonts_for(&config, font_base)?;
            let font = fonts.load(&style.font).await.context("Failed to load font")?;

            // Shells pass "\n" literally; treat it as a line break.
            let text = text.replace("\\n", "\n");
            let out = overlay_text(
                &read(&input)?,
                to_index(page.page, "page")?,
                &text,
                Point::new(x, y),
                &style,
                &font,
            )
            .context("Failed to add text")?;
            write(&output.path(&config), &out)?;
        }

        Command::Reorder { input, order, output } => {
            let order = parse_page_order(&order)?;
            let out = reorder_pages(&read(&input)?, &order).context("Failed to reorder pages")?;
            write(&output.path(&config), &out)?;
        }

        Command::Info { input } => {
            let doc = PdfDocument::load(&read(&input)?).context("Failed to load PDF")?;
            // CLI output is intentional
            #[allow(clippy::print_stdout)]
            {
                println!("{}: {} pages", input.display(), doc.page_count());
            }
        }

        Command::Run {
            plan,
            output,
            font_base,
        } => {
            run_plan(&config, &plan, output, font_base).await?;
        }
    }

    Ok(())
}

//! Edit plans: a TOML file listing session steps to run in order.
//!
//! ```toml
//! output = "out.pdf"
//!
//! [[steps]]
//! action = "add"
//! files = ["a.pdf", "b.pdf"]
//!
//! [[steps]]
//! action = "merge"
//!
//! [[steps]]
//! action = "image"
//! page = 3
//! file = "logo.png"
//! x = 10.0
//! y = 10.0
//! width = 100.0
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use pdf_editor_core::{
    Action, AppConfig, EditSession, FontSource, Notice, Point, Rect, RgbColor, SourceFile,
    TextStyle, pdf::image_dimensions,
};
use serde::Deserialize;

/// A parsed plan file.
#[derive(Debug, Deserialize)]
pub struct Plan {
    /// Where the exported document is written (relative to the plan file)
    pub output: Option<PathBuf>,

    pub steps: Vec<Step>,
}

/// One session operation. Page and file numbers are 1-based.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Step {
    Add {
        files: Vec<PathBuf>,
    },
    Remove {
        file: usize,
    },
    Select {
        file: usize,
    },
    Page {
        number: usize,
    },
    Merge,
    Reorder {
        order: Vec<usize>,
    },
    Image {
        page: Option<usize>,
        file: PathBuf,
        x: f32,
        y: f32,
        width: f32,
        height: Option<f32>,
    },
    Text {
        page: Option<usize>,
        text: String,
        x: f32,
        y: f32,
        size: Option<f32>,
        color: Option<String>,
        font: Option<String>,
    },
    Reset,
}

impl Step {
    pub const fn action(&self) -> Action {
        match self {
            Self::Add { .. } => Action::AddFiles,
            Self::Remove { .. } => Action::RemoveFile,
            Self::Select { .. } => Action::SelectFile,
            Self::Page { .. } => Action::ChangePage,
            Self::Merge => Action::Merge,
            Self::Reorder { .. } => Action::Reorder,
            Self::Image { .. } => Action::AddImage,
            Self::Text { .. } => Action::AddText,
            Self::Reset => Action::Reset,
        }
    }
}

impl Plan {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan {}", path.display()))?;
        let plan: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse plan {}", path.display()))?;

        if plan.steps.is_empty() {
            bail!("Plan {} has no steps", path.display());
        }
        Ok(plan)
    }
}

/// Runs plan steps against one session.
pub struct PlanRunner<'a> {
    pub session: EditSession,
    config: &'a AppConfig,
    fonts: &'a dyn FontSource,
    /// Directory relative paths in the plan are resolved against
    base_dir: PathBuf,
}

impl<'a> PlanRunner<'a> {
    pub fn new(config: &'a AppConfig, fonts: &'a dyn FontSource, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            session: EditSession::new(config.output.clone()),
            config,
            fonts,
            base_dir: base_dir.into(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn read_source(&self, path: &Path) -> Result<SourceFile> {
        let full = self.resolve(path);
        let bytes = std::fs::read(&full).with_context(|| format!("Failed to read {}", full.display()))?;
        let name = full
            .file_name()
            .map_or_else(|| full.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(SourceFile::from_name(name, bytes))
    }

    fn go_to_page(&mut self, page: Option<usize>) -> Result<()> {
        if let Some(number) = page {
            self.session.set_page_number(number)?;
        }
        Ok(())
    }

    pub async fn run_step(&mut self, step: &Step) -> Result<Notice> {
        let notice = match step {
            Step::Add { files } => {
                let sources = files
                    .iter()
                    .map(|f| self.read_source(f))
                    .collect::<Result<Vec<_>>>()?;
                self.session.add_files(sources)
            }
            Step::Remove { file } => self.session.remove_file(to_index(*file, "file")?)?,
            Step::Select { file } => self.session.select_active(to_index(*file, "file")?)?,
            Step::Page { number } => self.session.set_page_number(*number)?,
            Step::Merge => self.session.merge_all()?,
            Step::Reorder { order } => {
                let order = order
                    .iter()
                    .map(|&n| to_index(n, "page"))
                    .collect::<Result<Vec<_>>>()?;
                self.session.reorder_pages(&order)?
            }
            Step::Image {
                page,
                file,
                x,
                y,
                width,
                height,
            } => {
                self.go_to_page(*page)?;
                let image = self.read_source(file)?;
                let rect = match height {
                    Some(h) => Rect::new(*x, *y, *width, *h),
                    None => {
                        let kind = image.kind().image_kind()?;
                        Rect::scale_to_width(*x, *y, *width, image_dimensions(image.bytes(), kind)?)
                    }
                };
                self.session.request_image_overlay(image)?;
                self.session.confirm_image_overlay(rect)?
            }
            Step::Text {
                page,
                text,
                x,
                y,
                size,
                color,
                font,
            } => {
                self.go_to_page(*page)?;
                let mut style = TextStyle::from_config(self.config);
                if let Some(size) = size {
                    style.font_size = *size;
                }
                if let Some(color) = color {
                    style.color = parse_color(color)?;
                }
                if let Some(font) = font {
                    style.font.clone_from(font);
                }
                self.session.request_text_overlay(text.clone(), style)?;
                self.session
                    .confirm_text_overlay(Point::new(*x, *y), self.fonts)
                    .await?
            }
            // A plan is its own confirmation.
            Step::Reset => self.session.reset(&mut |_: &str| true),
        };
        Ok(notice)
    }
}

/// Convert a 1-based number to a 0-based index.
pub fn to_index(number: usize, what: &str) -> Result<usize> {
    number
        .checked_sub(1)
        .with_context(|| format!("{what} numbers start at 1, got {number}"))
}

pub fn parse_color(value: &str) -> Result<RgbColor> {
    RgbColor::parse(value)
        .with_context(|| format!("Invalid color '{value}' (use a name or r,g,b)"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan() {
        let plan: Plan = toml::from_str(
            r#"
            output = "out.pdf"

            [[steps]]
            action = "add"
            files = ["a.pdf", "b.pdf"]

            [[steps]]
            action = "merge"

            [[steps]]
            action = "text"
            page = 2
            text = "Draft"
            x = 72.0
            y = 720.0
            color = "255,0,0"
            "#,
        )
        .unwrap();

        assert_eq!(plan.steps.len(), 3);
        assert!(matches!(plan.steps[1], Step::Merge));
        assert!(matches!(
            &plan.steps[2],
            Step::Text { page: Some(2), size: None, .. }
        ));
        assert_eq!(plan.steps[2].action(), Action::AddText);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result: std::result::Result<Plan, _> = toml::from_str(
            r#"
            [[steps]]
            action = "rotate"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_to_index() {
        assert_eq!(to_index(1, "page").unwrap(), 0);
        assert!(to_index(0, "page").is_err());
    }
}

//! Word cloud layout and SVG output.
//!
//! Words are placed largest first. Each word starts at a seeded point near the
//! canvas center and walks an Archimedean spiral until its bounding box fits
//! inside the canvas without touching an earlier box. A word that finds no
//! spot shrinks a step and tries again; below the minimum font size it is left
//! out.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

use super::VizError;
use super::palette::spectral;
use crate::fs_policy::{DirectoryPolicy, write_artifact};

/// Approximate advance width of one glyph relative to the font size.
const GLYPH_WIDTH: f64 = 0.6;

/// Baseline offset from the top of a line box relative to the font size.
const ASCENT: f64 = 0.8;

/// Spiral step in radians.
const SPIRAL_STEP: f64 = 0.1;

/// Font size decrement after a failed spiral walk.
const FONT_STEP: u32 = 2;

/// Word cloud settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WordCloud {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Most words drawn.
    pub max_words: usize,
    /// Font size of the heaviest word.
    pub max_font_size: u32,
    /// Smallest font size tried before a word is dropped.
    pub min_font_size: u32,
    /// Probability of drawing a word horizontally.
    pub prefer_horizontal: f64,
    /// How strongly weight differences show in font size, in `[0, 1]`.
    pub relative_scaling: f64,
    /// Seed for positions, orientations and colors.
    pub seed: u64,
    /// Background fill.
    pub background: String,
}

impl Default for WordCloud {
    fn default() -> Self {
        Self {
            width: 400,
            height: 200,
            max_words: 50,
            max_font_size: 40,
            min_font_size: 4,
            prefer_horizontal: 0.9,
            relative_scaling: 0.5,
            seed: 42,
            background: "white".to_string(),
        }
    }
}

/// One placed word. Coordinates are the top-left corner of its box.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// The word.
    pub word: String,
    /// Font size in pixels.
    pub font_size: u32,
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Box width.
    pub width: f64,
    /// Box height.
    pub height: f64,
    /// Drawn rotated a quarter turn counterclockwise.
    pub vertical: bool,
    /// Fill color, `#rrggbb`.
    pub color: String,
}

impl Placement {
    fn overlaps(&self, other: &Placement) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// A finished layout.
#[derive(Debug, Clone, PartialEq)]
pub struct WordCloudLayout {
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
    /// Background fill.
    pub background: String,
    /// Placed words, heaviest first.
    pub placements: Vec<Placement>,
}

impl WordCloud {
    /// Checks that the settings can produce a layout.
    ///
    /// # Errors
    ///
    /// Returns [`VizError::InvalidSettings`] for an empty canvas, an inverted
    /// font range, or a probability outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), VizError> {
        let invalid = |reason: &str| {
            Err(VizError::InvalidSettings {
                reason: reason.to_string(),
            })
        };
        if self.width == 0 || self.height == 0 {
            return invalid("canvas must be at least 1x1");
        }
        if self.min_font_size == 0 || self.min_font_size > self.max_font_size {
            return invalid("font sizes must satisfy 1 <= min_font_size <= max_font_size");
        }
        if !(0.0..=1.0).contains(&self.prefer_horizontal) {
            return invalid("prefer_horizontal must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.relative_scaling) {
            return invalid("relative_scaling must be within [0, 1]");
        }
        Ok(())
    }

    /// Lays out `(word, weight)` pairs.
    ///
    /// Only the `max_words` heaviest words with positive weight are considered.
    ///
    /// # Errors
    ///
    /// Returns [`VizError::NoWords`] when no word has positive weight, or
    /// [`VizError::InvalidSettings`] from [`WordCloud::validate`].
    #[instrument(skip(self, words), fields(words = words.len()))]
    pub fn layout(&self, words: &[(String, f64)]) -> Result<WordCloudLayout, VizError> {
        self.validate()?;

        let mut ranked: Vec<&(String, f64)> = words
            .iter()
            .filter(|(word, weight)| !word.is_empty() && weight.is_finite() && *weight > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(self.max_words);
        let Some(heaviest) = ranked.first().map(|(_, weight)| *weight) else {
            return Err(VizError::NoWords);
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut placements: Vec<Placement> = Vec::with_capacity(ranked.len());

        for (word, weight) in ranked {
            let vertical = rng.r#gen::<f64>() >= self.prefer_horizontal;
            let color = spectral(rng.r#gen::<f64>());
            let start = (rng.r#gen::<f64>(), rng.r#gen::<f64>());
            let mut font_size = self.scaled_font_size(*weight / heaviest);

            loop {
                if let Some(mut placed) = self.find_spot(word, font_size, vertical, start, &placements)
                {
                    placed.color.clone_from(&color);
                    placements.push(placed);
                    break;
                }
                if font_size <= self.min_font_size {
                    debug!(word = %word, "no room left for word");
                    break;
                }
                font_size = font_size.saturating_sub(FONT_STEP).max(self.min_font_size);
            }
        }

        debug!(placed = placements.len(), "word cloud laid out");
        Ok(WordCloudLayout {
            width: self.width,
            height: self.height,
            background: self.background.clone(),
            placements,
        })
    }

    /// Lays out `words` and writes the SVG document to `path`.
    ///
    /// # Errors
    ///
    /// Returns layout errors from [`WordCloud::layout`] or [`VizError::Io`].
    pub fn write_svg(
        &self,
        words: &[(String, f64)],
        path: &Path,
        policy: DirectoryPolicy,
    ) -> Result<WordCloudLayout, VizError> {
        let layout = self.layout(words)?;
        let svg = layout.to_svg();
        write_artifact(path, policy, |out| out.write_all(svg.as_bytes()))
            .map_err(|e| VizError::io(path, e))?;
        Ok(layout)
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn scaled_font_size(&self, relative_weight: f64) -> u32 {
        let rs = self.relative_scaling;
        let size = f64::from(self.max_font_size) * (rs * relative_weight + (1.0 - rs));
        (size.round() as u32).clamp(self.min_font_size, self.max_font_size)
    }

    #[allow(clippy::cast_precision_loss)]
    fn find_spot(
        &self,
        word: &str,
        font_size: u32,
        vertical: bool,
        start: (f64, f64),
        placed: &[Placement],
    ) -> Option<Placement> {
        let size = f64::from(font_size);
        let length = word.chars().count() as f64 * GLYPH_WIDTH * size;
        let (width, height) = if vertical { (size, length) } else { (length, size) };
        let canvas_w = f64::from(self.width);
        let canvas_h = f64::from(self.height);
        if width > canvas_w || height > canvas_h {
            return None;
        }

        // Seeded start within the middle half of the free range.
        let free_w = canvas_w - width;
        let free_h = canvas_h - height;
        let x0 = free_w * (0.25 + 0.5 * start.0);
        let y0 = free_h * (0.25 + 0.5 * start.1);
        let aspect = canvas_h / canvas_w;
        let max_radius = canvas_w.hypot(canvas_h);

        let mut t = 0.0_f64;
        loop {
            let radius = t;
            if radius > max_radius {
                return None;
            }
            let x = x0 + radius * t.cos();
            let y = y0 + radius * aspect * t.sin();
            if (0.0..=free_w).contains(&x) && (0.0..=free_h).contains(&y) {
                let candidate = Placement {
                    word: word.to_string(),
                    font_size,
                    x,
                    y,
                    width,
                    height,
                    vertical,
                    color: String::new(),
                };
                if !placed.iter().any(|other| candidate.overlaps(other)) {
                    return Some(candidate);
                }
            }
            t += SPIRAL_STEP;
        }
    }
}

impl WordCloudLayout {
    /// Renders a standalone SVG document.
    #[must_use]
    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        let _ = writeln!(
            svg,
            r#"  <rect width="100%" height="100%" fill="{}"/>"#,
            escape_xml(&self.background)
        );
        for p in &self.placements {
            let size = f64::from(p.font_size);
            let (anchor_x, anchor_y, rotate) = if p.vertical {
                (p.x + ASCENT * size, p.y + p.height, " rotate(-90)")
            } else {
                (p.x, p.y + ASCENT * size, "")
            };
            let _ = writeln!(
                svg,
                r#"  <text transform="translate({anchor_x:.1},{anchor_y:.1}){rotate}" font-family="DejaVu Sans, Arial, sans-serif" font-size="{}" fill="{}">{}</text>"#,
                p.font_size,
                p.color,
                escape_xml(&p.word)
            );
        }
        svg.push_str("</svg>\n");
        svg
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

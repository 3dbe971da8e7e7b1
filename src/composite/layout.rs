//! Word wrapping and placement of the annotation box.

use crate::util::{Rect, clamp_to_range};

/// Measures rendered text. The Pango implementation lives in the Cairo
/// backend; tests use fixed-advance fonts.
pub trait TextMeasure {
    /// Width of `text` on a single line, in image pixels.
    fn text_width(&self, text: &str) -> f64;
    /// Distance between consecutive baselines, in image pixels.
    fn line_height(&self) -> f64;
}

/// Greedy word wrap constrained to `max_width`.
///
/// Explicit newlines start a new paragraph. Words wider than `max_width` are
/// split between characters.
pub fn wrap_text(text: &str, max_width: f64, measure: &dyn TextMeasure) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };

            if measure.text_width(&candidate) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if measure.text_width(word) <= max_width {
                current = word.to_string();
            } else {
                let mut pieces = split_long_word(word, max_width, measure);
                current = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            }
        }
        lines.push(current);
    }

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    while lines.first().is_some_and(|line| line.is_empty()) {
        lines.remove(0);
    }
    lines
}

fn split_long_word(word: &str, max_width: f64, measure: &dyn TextMeasure) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        current.push(ch);
        if measure.text_width(&current) > max_width && current.chars().count() > 1 {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Geometry inputs for placing the text box next to the marker.
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    pub anchor_x: f64,
    pub anchor_y: f64,
    /// Horizontal distance kept between the anchor and the box.
    pub offset: f64,
    /// Minimum distance kept from the image edges.
    pub margin: f64,
    pub image_width: f64,
    pub image_height: f64,
}

impl Placement {
    /// Horizontal space available beside the anchor on its wider side.
    pub fn side_space(&self) -> f64 {
        let right = self.image_width - (self.anchor_x + self.offset) - self.margin;
        let left = (self.anchor_x - self.offset) - self.margin;
        right.max(left).max(0.0)
    }

    /// Positions a `width` x `height` box to the right of the anchor, or to
    /// the left when the right side would overflow, vertically centred on the
    /// anchor and clamped inside the image.
    pub fn place(&self, width: f64, height: f64) -> Rect {
        let right_x = self.anchor_x + self.offset;
        let left_x = self.anchor_x - self.offset - width;
        let max_x = self.image_width - self.margin - width;

        let x = if right_x <= max_x {
            right_x
        } else if left_x >= self.margin {
            left_x
        } else {
            clamp_to_range(right_x, self.margin, max_x)
        };

        let y = clamp_to_range(
            self.anchor_y - height / 2.0,
            self.margin,
            self.image_height - self.margin - height,
        );

        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

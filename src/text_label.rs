use font_kit::{canvas::{Canvas, Format, RasterizationOptions}, font::Font, hinting::HintingOptions};
use log::debug;
use pathfinder_geometry::{transform2d::Transform2F, vector::{Vector2F, Vector2I}};

use crate::render_canvas::{CanvasRenderable, Color, RenderCanvas};

const SPACE_ADVANCE: u32 = 4;

pub struct TextLabel {
    position: Vector2I,
    size: Vector2I,
    font_canvas: Option<Canvas>,
    text: String,
    font: Font,
    font_size: f32,
    color: Color,
    requires_rerender: bool,
    // pixel advance of each char of `text`, filled while rasterizing
    advances: Vec<u32>
}

impl TextLabel {
    pub fn new(text: &str, font: Font, font_size: f32, color: Color, position: Vector2I, size: Vector2I) -> Self {
        Self {
            position,
            size,
            font_canvas: None,
            requires_rerender: true, // triggers the first render
            text: text.to_string(),
            font,
            font_size,
            color,
            advances: Vec::new()
        }
    }

    pub fn set_text(&mut self, text: &str) {
        if self.text == text {
            return;
        }
        self.text = text.to_string();
        self.requires_rerender = true;
    }

    pub fn set_position(&mut self, position: Vector2I) {
        self.position = position;
    }

    /// Width in pixels of the first `place` chars.
    pub fn find_cursor_length(&mut self, place: usize) -> u32 {
        self.rasterize_to_font_canvas();
        self.advances.iter().take(place).sum()
    }

    /// Width in pixels of the whole text.
    pub fn text_width(&mut self) -> u32 {
        self.rasterize_to_font_canvas();
        self.advances.iter().sum()
    }

    fn rasterize_to_font_canvas(&mut self) {
        if !self.requires_rerender {
            return;
        }
        self.requires_rerender = false;
        self.advances.clear();

        let mut canvas = Canvas::new(self.size, Format::A8);
        let mut transform: Transform2F = Transform2F::from_translation(Vector2F::new(0.0, self.size.y() as f32 / 1.5));
        for char in self.text.chars() {
            if char.is_whitespace() {
                // transform and move on
                transform = transform.translate(Vector2F::new(SPACE_ADVANCE as f32, 0.0));
                self.advances.push(SPACE_ADVANCE);
                continue;
            }

            let glyph_id = self.font.glyph_for_char(char).unwrap_or(0); // 0 is the unknown glyph
            // find the bounds so we can transform the next char correctly
            let bounds = match self.font.raster_bounds(glyph_id, self.font_size, transform, HintingOptions::None, RasterizationOptions::GrayscaleAa) {
                Ok(bounds) => bounds,
                Err(err) => {
                    debug!("No bounds for {char:?}: {err:?}");
                    self.advances.push(0);
                    continue;
                }
            };
            if let Err(err) = self.font.rasterize_glyph(&mut canvas, glyph_id, self.font_size, transform, HintingOptions::None, RasterizationOptions::GrayscaleAa) {
                debug!("Failed to rasterize {char:?}: {err:?}");
            }
            let advance = bounds.width().max(0) as u32 + 1;
            self.advances.push(advance);
            transform = transform.translate(Vector2F::new(advance as f32, 0.0));
        }
        self.font_canvas = Some(canvas);
    }
}
impl CanvasRenderable for TextLabel {
    fn draw(&mut self, canvas: &mut RenderCanvas) {
        self.rasterize_to_font_canvas();
        let Some(font_canvas) = self.font_canvas.as_ref() else {
            return;
        };

        for y in 0..self.size.y() {
            for x in 0..self.size.x() {
                let row = font_canvas.stride * y as usize;
                let pixel_index = row + (font_canvas.format.bytes_per_pixel() as usize * x as usize);
                let coverage = font_canvas.pixels[pixel_index];
                if coverage == 0 {
                    continue;
                }
                let alpha = (u32::from(coverage) * u32::from(self.color.a) / 255) as u8;
                let final_x = (x + self.position.x()) as u32;
                let final_y = (y + self.position.y()) as u32;
                canvas.blend_pixel(final_x, final_y, self.color.with_alpha(alpha));
            }
        }
    }
}

/// Shortens `text` to at most `max_chars` chars, marking the cut with an
/// ellipsis.
pub fn ellipsize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    short.push('…');
    short
}

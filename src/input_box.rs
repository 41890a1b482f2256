use font_kit::font::Font;
use pathfinder_geometry::vector::Vector2I;

use crate::{
    layout::Rect,
    render_canvas::{CanvasRenderable, Color, RenderCanvas},
    text_label::TextLabel,
};

const PADDING: i32 = 16;
const FONT_SIZE: f32 = 18.0;
const CURSOR_HEIGHT: u32 = 24;

/// Text of the search field plus a cursor, counted in chars.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct QueryText {
    text: String,
    cursor_pos: usize,
}
impl QueryText {
    pub fn text(&self) -> &str {
        &self.text
    }
    pub fn cursor_pos(&self) -> usize {
        self.cursor_pos
    }

    pub fn set_cursor_pos(&mut self, pos: usize) {
        self.cursor_pos = pos.min(self.text.chars().count());
    }
    pub fn advance_cursor(&mut self) {
        self.set_cursor_pos(self.cursor_pos + 1);
    }
    pub fn reel_cursor(&mut self) {
        self.set_cursor_pos(self.cursor_pos.saturating_sub(1));
    }
    pub fn cursor_home(&mut self) {
        self.cursor_pos = 0;
    }
    pub fn cursor_end(&mut self) {
        self.cursor_pos = self.text.chars().count();
    }

    /// Inserts `input` at the cursor; control characters are dropped.
    /// Returns whether the text changed.
    pub fn insert(&mut self, input: &str) -> bool {
        let mut changed = false;
        for ch in input.chars().filter(|ch| !ch.is_control()) {
            let byte_pos = self.byte_pos(self.cursor_pos);
            self.text.insert(byte_pos, ch);
            self.cursor_pos += 1;
            changed = true;
        }
        changed
    }

    /// Removes the char before the cursor.
    pub fn pop_at_cursor(&mut self) -> bool {
        if self.cursor_pos == 0 {
            return false;
        }
        let byte_pos = self.byte_pos(self.cursor_pos - 1);
        self.text.remove(byte_pos);
        self.cursor_pos -= 1;
        true
    }

    /// Removes the char after the cursor.
    pub fn delete_at_cursor(&mut self) -> bool {
        if self.cursor_pos >= self.text.chars().count() {
            return false;
        }
        let byte_pos = self.byte_pos(self.cursor_pos);
        self.text.remove(byte_pos);
        true
    }

    fn byte_pos(&self, char_pos: usize) -> usize {
        self.text.char_indices().nth(char_pos).map_or(self.text.len(), |(index, _)| index)
    }
}

pub struct InputBox {
    rect: Rect,
    query: QueryText,
    background: Color,
    cursor_color: Color,

    label: TextLabel,
    placeholder_label: TextLabel
}

impl InputBox {
    pub fn new(placeholder: &str, rect: Rect, font: Font, text_color: Color, background: Color) -> Self {
        let (position, size) = Self::label_geometry(rect);
        Self {
            rect,
            query: QueryText::default(),
            background,
            cursor_color: text_color,
            label: TextLabel::new("", font.clone(), FONT_SIZE, text_color, position, size),
            placeholder_label: TextLabel::new(placeholder, font, FONT_SIZE, text_color.with_alpha(text_color.a / 2), position, size)
        }
    }

    /// Applies `edit` to the query and returns the new text if it changed.
    pub fn edit(&mut self, edit: impl FnOnce(&mut QueryText) -> bool) -> Option<String> {
        let changed = edit(&mut self.query);
        if changed {
            self.label.set_text(self.query.text());
            Some(self.query.text().to_string())
        } else {
            None
        }
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
        let (position, _) = Self::label_geometry(rect);
        self.label.set_position(position);
        self.placeholder_label.set_position(position);
    }

    fn label_geometry(rect: Rect) -> (Vector2I, Vector2I) {
        let position = Vector2I::new(rect.x as i32 + PADDING, rect.y as i32 + (rect.height as i32 - 32) / 2);
        let size = Vector2I::new(rect.width as i32 - 2 * PADDING, 32);
        (position, size)
    }
}
impl CanvasRenderable for InputBox {
    fn draw(&mut self, canvas: &mut RenderCanvas) {
        canvas.fill_rect(self.rect, self.background);
        if self.query.text().is_empty() {
            self.placeholder_label.draw(canvas);
        } else {
            self.label.draw(canvas);
        }

        let cursor_x = self.rect.x + PADDING as u32 + self.label.find_cursor_length(self.query.cursor_pos());
        let cursor_y = self.rect.y + self.rect.height.saturating_sub(CURSOR_HEIGHT) / 2;
        canvas.fill_rect(Rect::new(cursor_x, cursor_y, 1, CURSOR_HEIGHT), self.cursor_color);
    }
}

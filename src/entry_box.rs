use std::rc::Rc;

use pathfinder_geometry::vector::Vector2I;

use crate::{
    icon::IconImage,
    launcher::LaunchableEntry,
    launcher_config::LauncherConfig,
    layout::{self, Rect},
    render_canvas::{CanvasRenderable, Color, RenderCanvas},
    text_label::{ellipsize, TextLabel},
};

const LABEL_MAX_CHARS: usize = 7;
const LABEL_HEIGHT: i32 = 20;
const ICON_TOP: u32 = 15;
const FONT_SIZE: f32 = 12.0;
const TOOLTIP_PADDING: u32 = 6;
const TOOLTIP_MAX_WIDTH: u32 = 480;

/// One application button: icon above an ellipsized name. While hovered the
/// full name is shown in a tooltip.
pub struct EntryBox {
    rect: Rect,
    icon: Rc<IconImage>,
    label: TextLabel,
    tooltip: TextLabel,
    tooltip_rect: Rect,
    hover_color: Color,
    tooltip_color: Color,
    pub hovered: bool
}

impl EntryBox {
    pub fn new(entry: &LaunchableEntry, rect: Rect, surface_size: (u32, u32), config: &LauncherConfig) -> Self {
        let mut label = TextLabel::new(
            &ellipsize(&entry.display_name, LABEL_MAX_CHARS),
            config.font.clone(),
            FONT_SIZE,
            config.text_color,
            Vector2I::default(),
            Vector2I::new(rect.width as i32, LABEL_HEIGHT)
        );
        // center the label under the icon
        let text_width = label.text_width().min(rect.width);
        let label_x = rect.x + (rect.width - text_width) / 2;
        let label_y = rect.y + rect.height - LABEL_HEIGHT as u32 - 8;
        label.set_position(Vector2I::new(label_x as i32, label_y as i32));

        let mut tooltip = TextLabel::new(
            &entry.display_name,
            config.font.clone(),
            FONT_SIZE,
            config.text_color,
            Vector2I::default(),
            Vector2I::new(TOOLTIP_MAX_WIDTH as i32, LABEL_HEIGHT)
        );
        let tooltip_width = tooltip.text_width().min(TOOLTIP_MAX_WIDTH) + 2 * TOOLTIP_PADDING;
        let tooltip_height = LABEL_HEIGHT as u32 + TOOLTIP_PADDING;
        let (surface_width, surface_height) = surface_size;
        let tooltip_rect = layout::tooltip_rect(rect, tooltip_width, tooltip_height, surface_width, surface_height);
        tooltip.set_position(Vector2I::new(
            (tooltip_rect.x + TOOLTIP_PADDING) as i32,
            (tooltip_rect.y + TOOLTIP_PADDING / 2) as i32
        ));

        Self {
            rect,
            icon: Rc::clone(&entry.icon),
            label,
            tooltip,
            tooltip_rect,
            hover_color: config.hover_color,
            tooltip_color: config.field_color,
            hovered: false
        }
    }

    /// Paints the full name next to the button. Drawn after every button so
    /// no neighbour covers it.
    pub fn draw_tooltip(&mut self, canvas: &mut RenderCanvas) {
        if !self.hovered {
            return;
        }
        canvas.fill_rect(self.tooltip_rect, self.tooltip_color);
        self.tooltip.draw(canvas);
    }
}

impl CanvasRenderable for EntryBox {
    fn draw(&mut self, canvas: &mut RenderCanvas) {
        if self.hovered {
            canvas.fill_rect(self.rect, self.hover_color);
        }
        let icon_x = self.rect.x + self.rect.width.saturating_sub(self.icon.width) / 2;
        canvas.draw_image(icon_x, self.rect.y + ICON_TOP, &self.icon);
        self.label.draw(canvas);
    }
}

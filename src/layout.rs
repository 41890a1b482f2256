//! Geometry of the overlay: a centered column holding the search field and,
//! below it, a centered row of application buttons.

pub const SEARCH_WIDTH: u32 = 700;
pub const SEARCH_HEIGHT: u32 = 50;
pub const SEARCH_MARGIN_BOTTOM: u32 = 25;
pub const BUTTON_WIDTH: u32 = 80;
pub const BUTTON_HEIGHT: u32 = 110;
pub const BUTTON_SPACING: u32 = 10;
pub const TOOLTIP_GAP: u32 = 6;

const COLUMN_HEIGHT: u32 = SEARCH_HEIGHT + SEARCH_MARGIN_BOTTOM + BUTTON_HEIGHT;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}
impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= f64::from(self.x)
            && y >= f64::from(self.y)
            && x < f64::from(self.x + self.width)
            && y < f64::from(self.y + self.height)
    }
}

fn column_top(surface_height: u32) -> u32 {
    surface_height.saturating_sub(COLUMN_HEIGHT) / 2
}

pub fn search_rect(surface_width: u32, surface_height: u32) -> Rect {
    Rect::new(
        surface_width.saturating_sub(SEARCH_WIDTH) / 2,
        column_top(surface_height),
        SEARCH_WIDTH,
        SEARCH_HEIGHT,
    )
}

pub fn entry_rects(count: usize, surface_width: u32, surface_height: u32) -> Vec<Rect> {
    let count = count as u32;
    if count == 0 {
        return Vec::new();
    }
    let row_width = count * BUTTON_WIDTH + (count - 1) * BUTTON_SPACING;
    let left = surface_width.saturating_sub(row_width) / 2;
    let top = column_top(surface_height) + SEARCH_HEIGHT + SEARCH_MARGIN_BOTTOM;

    (0..count)
        .map(|i| Rect::new(left + i * (BUTTON_WIDTH + BUTTON_SPACING), top, BUTTON_WIDTH, BUTTON_HEIGHT))
        .collect()
}

/// Index of the rect under the pointer, if any.
pub fn hit_test(rects: &[Rect], x: f64, y: f64) -> Option<usize> {
    rects.iter().position(|rect| rect.contains(x, y))
}

/// A `width` x `height` box centered under `anchor`, moved above it when it
/// would leave the bottom of the surface and kept inside the right edge.
pub fn tooltip_rect(anchor: Rect, width: u32, height: u32, surface_width: u32, surface_height: u32) -> Rect {
    let centered = (anchor.x + anchor.width / 2).saturating_sub(width / 2);
    let x = centered.min(surface_width.saturating_sub(width));
    let below = anchor.y + anchor.height + TOOLTIP_GAP;
    let y = if below + height <= surface_height {
        below
    } else {
        anchor.y.saturating_sub(height + TOOLTIP_GAP)
    };
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_field_is_centered() {
        let rect = search_rect(1920, 1080);
        assert_eq!(rect.x, (1920 - 700) / 2);
        assert_eq!(rect.y, (1080 - COLUMN_HEIGHT) / 2);
    }

    #[test]
    fn entries_sit_below_the_search_field_and_are_centered() {
        let rects = entry_rects(3, 1000, 1000);
        let search = search_rect(1000, 1000);
        let row_width = 3 * BUTTON_WIDTH + 2 * BUTTON_SPACING;

        assert_eq!(rects.len(), 3);
        assert_eq!(rects[0].x, (1000 - row_width) / 2);
        assert_eq!(rects[0].y, search.y + SEARCH_HEIGHT + SEARCH_MARGIN_BOTTOM);
        assert_eq!(rects[1].x - rects[0].x, BUTTON_WIDTH + BUTTON_SPACING);
        assert_eq!(rects[2].x + BUTTON_WIDTH - rects[0].x, row_width);
    }

    #[test]
    fn tiny_surfaces_do_not_underflow() {
        assert_eq!(search_rect(10, 10).x, 0);
        assert_eq!(entry_rects(8, 10, 10)[0].x, 0);
        assert!(entry_rects(0, 10, 10).is_empty());
    }

    #[test]
    fn hit_test_finds_the_button_under_the_pointer() {
        let rects = entry_rects(2, 1000, 1000);
        let second = rects[1];
        let x = f64::from(second.x) + 1.0;
        let y = f64::from(second.y) + 1.0;

        assert_eq!(hit_test(&rects, x, y), Some(1));
        // the gap between buttons belongs to nobody
        let gap = f64::from(rects[0].x + BUTTON_WIDTH) + 1.0;
        assert_eq!(hit_test(&rects, gap, y), None);
        assert_eq!(hit_test(&rects, 0.0, 0.0), None);
    }

    #[test]
    fn tooltip_is_centered_under_its_button() {
        let anchor = Rect::new(100, 200, BUTTON_WIDTH, BUTTON_HEIGHT);
        let tooltip = tooltip_rect(anchor, 120, 30, 1000, 1000);
        assert_eq!(tooltip, Rect::new(80, 200 + BUTTON_HEIGHT + TOOLTIP_GAP, 120, 30));
    }

    #[test]
    fn tooltip_stays_on_the_surface() {
        let anchor = Rect::new(450, 400, BUTTON_WIDTH, BUTTON_HEIGHT);
        let tooltip = tooltip_rect(anchor, 200, 30, 500, 520);
        // no room on the right or below
        assert_eq!(tooltip.x, 300);
        assert_eq!(tooltip.y, 400 - 30 - TOOLTIP_GAP);

        let left = tooltip_rect(Rect::new(0, 0, BUTTON_WIDTH, BUTTON_HEIGHT), 300, 30, 1000, 1000);
        assert_eq!(left.x, 0);
    }
}

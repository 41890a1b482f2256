use crate::{icon::IconImage, layout::Rect};

/// Straight (non-premultiplied) RGBA colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8
}
impl Color {
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r, g, b, a
        }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// ARGB8888 as wl_shm expects it, premultiplied by alpha.
    pub fn get_wayland_color(&self) -> u32 {
        let premultiply = |c: u8| (u32::from(c) * u32::from(self.a) + 127) / 255;
        (u32::from(self.a) << 24) | (premultiply(self.r) << 16) | (premultiply(self.g) << 8) | premultiply(self.b)
    }

    /// Composites `self` over `dst`.
    pub fn over(self, dst: Color) -> Color {
        match self.a {
            0 => return dst,
            255 => return self,
            _ => {}
        }
        let src_a = u32::from(self.a);
        let dst_a = u32::from(dst.a) * (255 - src_a) / 255;
        let out_a = src_a + dst_a;
        let mix = |s: u8, d: u8| ((u32::from(s) * src_a + u32::from(d) * dst_a) / out_a) as u8;
        Color {
            r: mix(self.r, dst.r),
            g: mix(self.g, dst.g),
            b: mix(self.b, dst.b),
            a: out_a as u8
        }
    }
}
impl From<[u8; 4]> for Color {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self::new(r, g, b, a)
    }
}

pub struct RenderCanvas {
    pixels: Vec<Color>,
    width: u32,
    height: u32
}
impl RenderCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![Color::TRANSPARENT; (width * height) as usize],
            width,
            height
        }
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[self.index_from_pixel(x, y)])
    }

    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = self.index_from_pixel(x, y);
        self.pixels[index] = color.over(self.pixels[index]);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let x_end = rect.x.saturating_add(rect.width).min(self.width);
        let y_end = rect.y.saturating_add(rect.height).min(self.height);
        for y in rect.y..y_end {
            for x in rect.x..x_end {
                self.blend_pixel(x, y, color);
            }
        }
    }

    pub fn draw_image(&mut self, x: u32, y: u32, image: &IconImage) {
        if image.width == 0 {
            return;
        }
        for (row, line) in image.pixels.chunks_exact(image.width as usize * 4).enumerate() {
            for (column, rgba) in line.chunks_exact(4).enumerate() {
                let color = Color::new(rgba[0], rgba[1], rgba[2], rgba[3]);
                self.blend_pixel(x + column as u32, y + row as u32, color);
            }
        }
    }

    pub fn wipe(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    pub fn fill_wayland_canvas(&self, canvas: &mut [u8]) {
        canvas.chunks_exact_mut(4)
            .zip(&self.pixels)
            .for_each(|(chunk, pixel)| chunk.copy_from_slice(&pixel.get_wayland_color().to_le_bytes()));
    }

    fn index_from_pixel(&self, x: u32, y: u32) -> usize {
        (x + self.width * y) as usize
    }
}

pub trait CanvasRenderable {
    fn draw(&mut self, canvas: &mut RenderCanvas);
}

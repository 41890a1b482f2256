//! Icon lookup and decoding.
//!
//! Icon references from desktop entries are either absolute file paths or
//! names in the freedesktop icon theme. Either way the result is decoded to a
//! straight-alpha RGBA bitmap the software canvas can blend.

use std::{
    fs,
    path::{Path, PathBuf},
};

use image::imageops::FilterType;
use resvg::{tiny_skia, usvg};

use crate::error::IconError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IconImage {
    pub width: u32,
    pub height: u32,
    /// RGBA, row major, not premultiplied.
    pub pixels: Vec<u8>,
}

pub trait IconResolver {
    fn has_icon(&self, name: &str) -> bool;
    fn resolve(&self, name_or_path: &str) -> Result<IconImage, IconError>;
}

pub struct ThemeIcons {
    theme: Option<String>,
    size: u16,
}
impl ThemeIcons {
    pub fn new(theme: Option<String>, size: u16) -> Self {
        Self { theme, size }
    }

    fn lookup(&self, name: &str) -> Option<PathBuf> {
        if name.starts_with('/') {
            let path = PathBuf::from(name);
            return path.is_file().then_some(path);
        }

        let mut builder = freedesktop_icons::lookup(theme_icon_name(name)).with_size(self.size).with_cache();
        if let Some(theme) = &self.theme {
            builder = builder.with_theme(theme);
        }
        builder.find()
    }
}
impl IconResolver for ThemeIcons {
    fn has_icon(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn resolve(&self, name_or_path: &str) -> Result<IconImage, IconError> {
        let path = self.lookup(name_or_path).ok_or_else(|| IconError::NotFound(name_or_path.to_string()))?;
        load_icon(&path, u32::from(self.size))
    }
}

/// `Icon=foo.png` names the themed icon `foo`.
fn theme_icon_name(name: &str) -> &str {
    [".png", ".svg", ".xpm"]
        .iter()
        .find_map(|ext| name.strip_suffix(ext))
        .filter(|stem| !stem.is_empty())
        .unwrap_or(name)
}

pub fn load_icon(path: &Path, size: u32) -> Result<IconImage, IconError> {
    let is_svg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg") || ext.eq_ignore_ascii_case("svgz"));

    if is_svg {
        render_svg(path, size)
    } else {
        decode_raster(path, size)
    }
}

fn decode_raster(path: &Path, size: u32) -> Result<IconImage, IconError> {
    let image = image::open(path).map_err(|source| IconError::Decode { path: path.to_path_buf(), source })?;
    let image = if image.width() > size || image.height() > size {
        image.resize(size, size, FilterType::Triangle)
    } else {
        image
    };
    let rgba = image.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(IconError::Empty(path.to_path_buf()));
    }

    Ok(IconImage {
        width: rgba.width(),
        height: rgba.height(),
        pixels: rgba.into_raw(),
    })
}

fn render_svg(path: &Path, size: u32) -> Result<IconImage, IconError> {
    let data = fs::read(path).map_err(|source| IconError::Io { path: path.to_path_buf(), source })?;
    let options = usvg::Options::default();
    let fontdb = usvg::fontdb::Database::new();
    let tree = usvg::Tree::from_data(&data, &options, &fontdb)
        .map_err(|source| IconError::Svg { path: path.to_path_buf(), source })?;

    let tree_size = tree.size();
    let longest = tree_size.width().max(tree_size.height());
    if longest <= 0.0 {
        return Err(IconError::Empty(path.to_path_buf()));
    }
    let scale = size as f32 / longest;
    let width = (tree_size.width() * scale).round() as u32;
    let height = (tree_size.height() * scale).round() as u32;

    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| IconError::Empty(path.to_path_buf()))?;
    resvg::render(&tree, tiny_skia::Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    let pixels = pixmap
        .pixels()
        .iter()
        .flat_map(|pixel| {
            let color = pixel.demultiply();
            [color.red(), color.green(), color.blue(), color.alpha()]
        })
        .collect();

    Ok(IconImage { width, height, pixels })
}

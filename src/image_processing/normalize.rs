use image::{DynamicImage, GrayAlphaImage, GrayImage, Rgb, RgbImage, Rgba, RgbaImage};

/// Background every transparent pixel is composited onto
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Color representation of a decoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Rgb,
    Rgba,
    Luma,
    LumaAlpha,
    Palette,
    PaletteAlpha,
}

impl ColorMode {
    pub fn has_alpha(&self) -> bool {
        matches!(
            self,
            ColorMode::Rgba | ColorMode::LumaAlpha | ColorMode::PaletteAlpha
        )
    }
}

/// Indexed image: one palette index per pixel, optional alpha per palette entry
#[derive(Debug, Clone, PartialEq)]
pub struct PalettedImage {
    width: u32,
    height: u32,
    indices: Vec<u8>,
    palette: Vec<Rgb<u8>>,
    alpha: Option<Vec<u8>>,
}

impl PalettedImage {
    /// Build an indexed image. Returns `None` when the index buffer does not
    /// match the dimensions or an index points past the palette.
    pub fn new(
        width: u32,
        height: u32,
        indices: Vec<u8>,
        palette: Vec<Rgb<u8>>,
        alpha: Option<Vec<u8>>,
    ) -> Option<Self> {
        if indices.len() != width as usize * height as usize {
            return None;
        }
        if indices.iter().any(|&i| i as usize >= palette.len()) {
            return None;
        }
        Some(Self {
            width,
            height,
            indices,
            palette,
            alpha,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Expand to RGBA; entries without an explicit alpha value are opaque
    pub fn to_rgba(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let index = self.indices[(y * self.width + x) as usize] as usize;
            let Rgb([r, g, b]) = self.palette[index];
            let a = self
                .alpha
                .as_ref()
                .and_then(|alpha| alpha.get(index).copied())
                .unwrap_or(255);
            Rgba([r, g, b, a])
        })
    }
}

/// A fully decoded image, tagged by its color representation
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedImage {
    Rgb(RgbImage),
    Rgba(RgbaImage),
    Luma(GrayImage),
    LumaAlpha(GrayAlphaImage),
    Palette(PalettedImage),
}

impl DecodedImage {
    pub fn color_mode(&self) -> ColorMode {
        match self {
            DecodedImage::Rgb(_) => ColorMode::Rgb,
            DecodedImage::Rgba(_) => ColorMode::Rgba,
            DecodedImage::Luma(_) => ColorMode::Luma,
            DecodedImage::LumaAlpha(_) => ColorMode::LumaAlpha,
            DecodedImage::Palette(p) if p.alpha.is_some() => ColorMode::PaletteAlpha,
            DecodedImage::Palette(_) => ColorMode::Palette,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            DecodedImage::Rgb(img) => img.dimensions(),
            DecodedImage::Rgba(img) => img.dimensions(),
            DecodedImage::Luma(img) => img.dimensions(),
            DecodedImage::LumaAlpha(img) => img.dimensions(),
            DecodedImage::Palette(img) => img.dimensions(),
        }
    }
}

impl From<DynamicImage> for DecodedImage {
    fn from(img: DynamicImage) -> Self {
        match img {
            DynamicImage::ImageRgb8(buf) => DecodedImage::Rgb(buf),
            DynamicImage::ImageRgba8(buf) => DecodedImage::Rgba(buf),
            DynamicImage::ImageLuma8(buf) => DecodedImage::Luma(buf),
            DynamicImage::ImageLumaA8(buf) => DecodedImage::LumaAlpha(buf),
            other => {
                let color = other.color();
                if color.has_alpha() {
                    DecodedImage::Rgba(other.to_rgba8())
                } else if color.has_color() {
                    DecodedImage::Rgb(other.to_rgb8())
                } else {
                    DecodedImage::Luma(other.to_luma8())
                }
            }
        }
    }
}

/// Convert any decoded image to opaque RGB suitable for PNG and JPEG.
///
/// Palette images are expanded to RGBA first, then anything carrying alpha
/// is composited onto white. Grayscale is replicated into the three
/// channels and RGB passes through untouched.
pub fn normalize(img: DecodedImage) -> RgbImage {
    match img {
        DecodedImage::Rgb(rgb) => rgb,
        DecodedImage::Rgba(rgba) => composite_on_white(&rgba),
        DecodedImage::LumaAlpha(la) => {
            let rgba = RgbaImage::from_fn(la.width(), la.height(), |x, y| {
                let [l, a] = la.get_pixel(x, y).0;
                Rgba([l, l, l, a])
            });
            composite_on_white(&rgba)
        }
        DecodedImage::Palette(paletted) => composite_on_white(&paletted.to_rgba()),
        DecodedImage::Luma(gray) => DynamicImage::ImageLuma8(gray).to_rgb8(),
    }
}

/// Blend `img` over a solid white canvas using its alpha channel as the mask
fn composite_on_white(img: &RgbaImage) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(img.width(), img.height(), BACKGROUND);
    for (x, y, pixel) in img.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let Rgb([br, bg, bb]) = BACKGROUND;
        canvas.put_pixel(
            x,
            y,
            Rgb([blend(r, br, a), blend(g, bg, a), blend(b, bb, a)]),
        );
    }
    canvas
}

#[inline]
fn blend(fg: u8, bg: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((fg as u32 * a + bg as u32 * (255 - a) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, LumaA};

    fn sample_rgb(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 40) as u8, (y * 60) as u8, ((x + y) * 25) as u8])
        })
    }

    fn sample_palette(alpha: Option<Vec<u8>>) -> PalettedImage {
        let palette = vec![Rgb([255, 0, 0]), Rgb([0, 255, 0]), Rgb([0, 0, 255])];
        let indices = vec![0, 1, 2, 1, 0, 2];
        PalettedImage::new(3, 2, indices, palette, alpha).unwrap()
    }

    fn all_modes() -> Vec<DecodedImage> {
        vec![
            DecodedImage::Rgb(sample_rgb(4, 3)),
            DecodedImage::Rgba(RgbaImage::from_fn(4, 3, |x, y| {
                Rgba([x as u8 * 50, y as u8 * 70, 10, (x * 60 + y * 10) as u8])
            })),
            DecodedImage::Luma(GrayImage::from_fn(4, 3, |x, y| Luma([(x * y * 20) as u8]))),
            DecodedImage::LumaAlpha(GrayAlphaImage::from_fn(4, 3, |x, _| {
                LumaA([90, (x * 80) as u8])
            })),
            DecodedImage::Palette(sample_palette(None)),
            DecodedImage::Palette(sample_palette(Some(vec![0, 128, 255]))),
        ]
    }

    #[test]
    fn test_color_mode_tags() {
        let modes: Vec<ColorMode> = all_modes().iter().map(|i| i.color_mode()).collect();
        assert_eq!(
            modes,
            vec![
                ColorMode::Rgb,
                ColorMode::Rgba,
                ColorMode::Luma,
                ColorMode::LumaAlpha,
                ColorMode::Palette,
                ColorMode::PaletteAlpha,
            ]
        );
        assert!(ColorMode::PaletteAlpha.has_alpha());
        assert!(!ColorMode::Palette.has_alpha());
    }

    #[test]
    fn test_normalize_keeps_dimensions_for_every_mode() {
        for img in all_modes() {
            let dims = img.dimensions();
            let mode = img.color_mode();
            let rgb = normalize(img);
            assert_eq!(rgb.dimensions(), dims, "dimensions changed for {:?}", mode);
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for img in all_modes() {
            let once = normalize(img);
            let twice = normalize(DecodedImage::Rgb(once.clone()));
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_fully_transparent_rgba_becomes_white() {
        let img = RgbaImage::from_pixel(5, 4, Rgba([12, 200, 40, 0]));
        let rgb = normalize(DecodedImage::Rgba(img));
        assert!(rgb.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn test_fully_opaque_rgba_keeps_colors() {
        let source = sample_rgb(5, 4);
        let rgba = RgbaImage::from_fn(5, 4, |x, y| {
            let Rgb([r, g, b]) = *source.get_pixel(x, y);
            Rgba([r, g, b, 255])
        });
        assert_eq!(normalize(DecodedImage::Rgba(rgba)), source);
    }

    #[test]
    fn test_half_alpha_blends_linearly() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let rgb = normalize(DecodedImage::Rgba(img));
        // 255 * 127 / 255 = 127
        assert_eq!(*rgb.get_pixel(0, 0), Rgb([127, 127, 127]));
    }

    #[test]
    fn test_grayscale_is_replicated() {
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([(x * 100) as u8]));
        let rgb = normalize(DecodedImage::Luma(gray));
        assert_eq!(*rgb.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*rgb.get_pixel(1, 0), Rgb([100, 100, 100]));
        assert_eq!(*rgb.get_pixel(2, 0), Rgb([200, 200, 200]));
    }

    #[test]
    fn test_transparent_grayscale_alpha_becomes_white() {
        let la = GrayAlphaImage::from_pixel(2, 2, LumaA([0, 0]));
        let rgb = normalize(DecodedImage::LumaAlpha(la));
        assert!(rgb.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn test_palette_without_alpha_expands_colors() {
        let rgb = normalize(DecodedImage::Palette(sample_palette(None)));
        assert_eq!(*rgb.get_pixel(0, 0), Rgb([255, 0, 0]));
        assert_eq!(*rgb.get_pixel(1, 0), Rgb([0, 255, 0]));
        assert_eq!(*rgb.get_pixel(2, 0), Rgb([0, 0, 255]));
    }

    #[test]
    fn test_palette_alpha_composites_onto_white() {
        let rgb = normalize(DecodedImage::Palette(sample_palette(Some(vec![0, 128, 255]))));
        // Index 0 is fully transparent red: white, not black.
        assert_eq!(*rgb.get_pixel(0, 0), Rgb([255, 255, 255]));
        // Index 2 is opaque blue.
        assert_eq!(*rgb.get_pixel(2, 0), Rgb([0, 0, 255]));
        // Index 1 is half-transparent green.
        assert_eq!(*rgb.get_pixel(1, 0), Rgb([127, 255, 127]));
    }

    #[test]
    fn test_paletted_image_rejects_bad_indices() {
        let palette = vec![Rgb([0, 0, 0])];
        assert!(PalettedImage::new(2, 1, vec![0, 1], palette.clone(), None).is_none());
        assert!(PalettedImage::new(2, 2, vec![0, 0], palette, None).is_none());
    }

    #[test]
    fn test_from_dynamic_image_maps_variants() {
        let rgb16 = DynamicImage::ImageRgb16(image::ImageBuffer::from_pixel(
            2,
            2,
            image::Rgb([65535u16, 0, 0]),
        ));
        assert_eq!(DecodedImage::from(rgb16).color_mode(), ColorMode::Rgb);

        let rgba16 = DynamicImage::ImageRgba16(image::ImageBuffer::from_pixel(
            2,
            2,
            image::Rgba([0u16, 0, 0, 0]),
        ));
        assert_eq!(DecodedImage::from(rgba16).color_mode(), ColorMode::Rgba);

        let luma16 = DynamicImage::ImageLuma16(image::ImageBuffer::from_pixel(
            2,
            2,
            image::Luma([1000u16]),
        ));
        assert_eq!(DecodedImage::from(luma16).color_mode(), ColorMode::Luma);

        let la8 = DynamicImage::ImageLumaA8(GrayAlphaImage::new(1, 1));
        assert_eq!(DecodedImage::from(la8).color_mode(), ColorMode::LumaAlpha);
    }
}

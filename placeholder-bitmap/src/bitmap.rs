use std::{fmt, str::FromStr, sync::Arc};

use byteorder::{ByteOrder, LittleEndian};

use crate::{
    counter::BitmapCounter,
    error::{Error, Result},
};

/// In-memory pixel layout of a [`Bitmap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum BitmapConfig {
    /// Alpha channel only, 1 byte per pixel.
    Alpha8,
    /// 5-6-5 RGB packed into a little-endian u16, no alpha.
    Rgb565,
    /// 4 bits per channel, RGBA nibbles packed into a little-endian u16.
    Argb4444,
    /// 8 bits per channel stored as R, G, B, A bytes.
    #[default]
    Argb8888,
}

impl BitmapConfig {
    /// Every configuration, smallest pixel first.
    pub const ALL: [BitmapConfig; 4] = [
        BitmapConfig::Alpha8,
        BitmapConfig::Rgb565,
        BitmapConfig::Argb4444,
        BitmapConfig::Argb8888,
    ];

    /// Storage size of one pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Alpha8 => 1,
            Self::Rgb565 | Self::Argb4444 => 2,
            Self::Argb8888 => 4,
        }
    }

    /// Whether pixels in this layout can carry transparency.
    pub const fn supports_alpha(self) -> bool {
        !matches!(self, Self::Rgb565)
    }

    /// Byte size of a `width` x `height` surface, or `None` on overflow.
    pub fn byte_count(self, width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(self.bytes_per_pixel())
    }

    fn encode(self, color: Color, out: &mut [u8]) {
        let (a, r, g, b) = (color.alpha(), color.red(), color.green(), color.blue());
        match self {
            Self::Alpha8 => out[0] = a,
            Self::Rgb565 => {
                let packed = ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3);
                LittleEndian::write_u16(out, packed);
            }
            Self::Argb4444 => {
                let packed = ((r as u16 >> 4) << 12)
                    | ((g as u16 >> 4) << 8)
                    | ((b as u16 >> 4) << 4)
                    | (a as u16 >> 4);
                LittleEndian::write_u16(out, packed);
            }
            Self::Argb8888 => out[..4].copy_from_slice(&[r, g, b, a]),
        }
    }

    fn decode(self, bytes: &[u8]) -> Color {
        match self {
            Self::Alpha8 => Color::from_argb(bytes[0], 0, 0, 0),
            Self::Rgb565 => {
                let packed = LittleEndian::read_u16(bytes);
                let r = ((packed >> 11) & 0x1F) as u8;
                let g = ((packed >> 5) & 0x3F) as u8;
                let b = (packed & 0x1F) as u8;
                Color::from_argb(
                    0xFF,
                    (r << 3) | (r >> 2),
                    (g << 2) | (g >> 4),
                    (b << 3) | (b >> 2),
                )
            }
            Self::Argb4444 => {
                let packed = LittleEndian::read_u16(bytes);
                let nibble = |shift: u16| ((packed >> shift) & 0xF) as u8 * 0x11;
                Color::from_argb(nibble(0), nibble(12), nibble(8), nibble(4))
            }
            Self::Argb8888 => Color::from_argb(bytes[3], bytes[0], bytes[1], bytes[2]),
        }
    }
}

impl FromStr for BitmapConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alpha8" | "alpha_8" => Ok(Self::Alpha8),
            "rgb565" | "rgb_565" => Ok(Self::Rgb565),
            "argb4444" | "argb_4444" => Ok(Self::Argb4444),
            "argb8888" | "argb_8888" => Ok(Self::Argb8888),
            other => Err(Error::InvalidConfig(format!(
                "unknown bitmap config `{other}` (expected alpha8, rgb565, argb4444 or argb8888)"
            ))),
        }
    }
}

/// A 32-bit ARGB color.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(pub u32);

impl Color {
    /// Fully transparent black; encodes to zero bytes in every configuration.
    pub const TRANSPARENT: Color = Color(0x0000_0000);
    /// Opaque black
    pub const BLACK: Color = Color(0xFF00_0000);
    /// Opaque white
    pub const WHITE: Color = Color(0xFFFF_FFFF);

    /// Packs four 8-bit channels.
    pub const fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Color(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Alpha channel
    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Red channel
    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Green channel
    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Blue channel
    pub const fn blue(self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Color(#{:08X})", self.0)
    }
}

/// A rectangle inside an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Region {
    /// Creates a region from its top-left corner and size.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole of a `width` x `height` image.
    pub const fn whole(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Checks that the region is non-empty and lies inside a `width` x `height` image.
    pub fn check_within(&self, width: u32, height: u32) -> Result<()> {
        let fits = |start: u32, len: u32, bound: u32| {
            len > 0 && start.checked_add(len).is_some_and(|end| end <= bound)
        };
        if fits(self.x, self.width, width) && fits(self.y, self.height, height) {
            Ok(())
        } else {
            Err(Error::InvalidRegion {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
            })
        }
    }
}

/// Returns a bitmap's bytes to its counter when dropped.
#[derive(Debug)]
struct CounterLease {
    counter: Arc<BitmapCounter>,
    bytes: usize,
}

impl Drop for CounterLease {
    fn drop(&mut self) {
        self.counter.decrease(self.bytes);
    }
}

/// A decoded, owned pixel surface accounted against a [`BitmapCounter`].
#[derive(Debug)]
pub struct Bitmap {
    width: u32,
    height: u32,
    config: BitmapConfig,
    has_alpha: bool,
    pixels: Vec<u8>,
    _lease: CounterLease,
}

impl Bitmap {
    /// Allocates a zeroed bitmap, reserving its bytes in `counter` first.
    pub fn allocate(
        counter: &Arc<BitmapCounter>,
        width: u32,
        height: u32,
        config: BitmapConfig,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions {
                width: width.into(),
                height: height.into(),
            });
        }
        let bytes = config
            .byte_count(width, height)
            .ok_or(Error::OutOfMemory { bytes: usize::MAX })?;

        counter.reserve(bytes)?;
        let lease = CounterLease {
            counter: Arc::clone(counter),
            bytes,
        };

        let mut pixels = Vec::new();
        // On failure the lease drops here and hands the reservation back.
        pixels
            .try_reserve_exact(bytes)
            .map_err(|_| Error::OutOfMemory { bytes })?;
        pixels.resize(bytes, 0);

        Ok(Self {
            width,
            height,
            config,
            has_alpha: config.supports_alpha(),
            pixels,
            _lease: lease,
        })
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout
    pub fn config(&self) -> BitmapConfig {
        self.config
    }

    /// Whether the pixels are treated as carrying alpha.
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Marks whether the pixels should be treated as carrying alpha.
    pub fn set_has_alpha(&mut self, has_alpha: bool) {
        self.has_alpha = has_alpha;
    }

    /// Size of the pixel storage in bytes.
    pub fn byte_count(&self) -> usize {
        self.pixels.len()
    }

    /// Bytes per row.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.config.bytes_per_pixel()
    }

    /// Raw pixel storage in the layout described by [`config`](Self::config).
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Fills the entire surface with `color`.
    pub fn erase_color(&mut self, color: Color) {
        let bpp = self.config.bytes_per_pixel();
        let mut encoded = [0u8; 4];
        self.config.encode(color, &mut encoded);
        for pixel in self.pixels.chunks_exact_mut(bpp) {
            pixel.copy_from_slice(&encoded[..bpp]);
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * self.config.bytes_per_pixel())
    }

    /// Reads the pixel at (`x`, `y`), or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let offset = self.offset(x, y)?;
        let bpp = self.config.bytes_per_pixel();
        Some(self.config.decode(&self.pixels[offset..offset + bpp]))
    }

    /// Writes the pixel at (`x`, `y`). Returns false outside the surface.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) -> bool {
        let Some(offset) = self.offset(x, y) else {
            return false;
        };
        let bpp = self.config.bytes_per_pixel();
        self.config
            .encode(color, &mut self.pixels[offset..offset + bpp]);
        true
    }

    /// Copies `region` of this bitmap into a new bitmap accounted against `counter`.
    pub fn copy_region(&self, counter: &Arc<BitmapCounter>, region: Region) -> Result<Bitmap> {
        region.check_within(self.width, self.height)?;
        let mut copy = Bitmap::allocate(counter, region.width, region.height, self.config)?;
        copy.has_alpha = self.has_alpha;

        let bpp = self.config.bytes_per_pixel();
        let src_row = self.row_bytes();
        let dst_row = copy.row_bytes();
        for row in 0..region.height as usize {
            let src = (region.y as usize + row) * src_row + region.x as usize * bpp;
            let dst = row * dst_row;
            copy.pixels[dst..dst + dst_row].copy_from_slice(&self.pixels[src..src + dst_row]);
        }
        Ok(copy)
    }
}

use crate::buffer::PooledByteBuffer;

/// Encoded image formats recognised by their leading bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ImageFormat {
    /// JFIF/EXIF JPEG
    Jpeg,
    /// Portable Network Graphics
    Png,
    /// GIF87a or GIF89a
    Gif,
    /// RIFF WebP container
    Webp,
    /// Windows bitmap
    Bmp,
    /// Not recognised
    #[default]
    Unknown,
}

impl ImageFormat {
    /// Guesses the format from magic bytes.
    pub fn detect(bytes: &[u8]) -> Self {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Self::Jpeg,
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Self::Png,
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Self::Gif,
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Self::Webp,
            [b'B', b'M', ..] => Self::Bmp,
            _ => Self::Unknown,
        }
    }
}

/// An encoded buffer tagged with its image format.
///
/// Borrows the buffer, so it can never outlive it.
#[derive(Debug)]
pub struct EncodedImage<'buf> {
    buffer: &'buf PooledByteBuffer,
    format: ImageFormat,
}

impl<'buf> EncodedImage<'buf> {
    /// Wraps `buffer` with an [`ImageFormat::Unknown`] tag.
    pub fn new(buffer: &'buf PooledByteBuffer) -> Self {
        Self {
            buffer,
            format: ImageFormat::Unknown,
        }
    }

    /// Tags the image with `format`.
    pub fn set_image_format(&mut self, format: ImageFormat) {
        self.format = format;
    }

    /// The current format tag.
    pub fn image_format(&self) -> ImageFormat {
        self.format
    }

    /// Replaces an `Unknown` tag with the format sniffed from the bytes.
    pub fn detect_image_format(&mut self) -> ImageFormat {
        if self.format == ImageFormat::Unknown {
            self.format = ImageFormat::detect(self.buffer.as_slice());
        }
        self.format
    }

    /// Size of the underlying buffer in bytes.
    pub fn size(&self) -> usize {
        self.buffer.size()
    }

    /// The encoded bytes.
    pub fn bytes(&self) -> &'buf [u8] {
        self.buffer.as_slice()
    }
}

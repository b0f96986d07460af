use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::bitmap::Bitmap;

/// Netpbm flavor written by [`PnmEncoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PnmFormat {
    /// Binary RGB (`P6`); alpha is dropped.
    Ppm,
    /// `P7` with `RGB_ALPHA` tuples.
    Pam,
}

/// PPM/PAM encoder
pub struct PnmEncoder<'bitmap> {
    bitmap: &'bitmap Bitmap,
    format: PnmFormat,
}

impl<'bitmap> PnmEncoder<'bitmap> {
    /// Supplies the encoder with a bitmap to encode.
    pub fn new(bitmap: &'bitmap Bitmap, format: PnmFormat) -> Self {
        Self { bitmap, format }
    }

    /// Writes the header and pixels to `out`.
    pub fn encode<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let (width, height) = (self.bitmap.width(), self.bitmap.height());
        match self.format {
            PnmFormat::Ppm => write!(out, "P6\n{width} {height}\n255\n")?,
            PnmFormat::Pam => write!(
                out,
                "P7\nWIDTH {width}\nHEIGHT {height}\nDEPTH 4\nMAXVAL 255\nTUPLTYPE RGB_ALPHA\nENDHDR\n"
            )?,
        }

        for y in 0..height {
            for x in 0..width {
                let Some(color) = self.bitmap.pixel(x, y) else {
                    continue;
                };
                out.write_all(&[color.red(), color.green(), color.blue()])?;
                if self.format == PnmFormat::Pam {
                    out.write_all(&[color.alpha()])?;
                }
            }
        }
        Ok(())
    }

    /// Encodes the bitmap and saves the result to a file at the given path.
    pub fn encode_to_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut file = BufWriter::new(File::create(path)?);
        self.encode(&mut file)?;
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        bitmap::{BitmapConfig, Color},
        counter::BitmapCounter,
    };

    #[test]
    fn writes_pam_with_alpha() {
        let counter = Arc::new(BitmapCounter::default());
        let mut bitmap = Bitmap::allocate(&counter, 2, 1, BitmapConfig::Argb8888).unwrap();
        bitmap.set_pixel(1, 0, Color::from_argb(0x80, 1, 2, 3));

        let mut out = Vec::new();
        PnmEncoder::new(&bitmap, PnmFormat::Pam)
            .encode(&mut out)
            .unwrap();
        let header = b"P7\nWIDTH 2\nHEIGHT 1\nDEPTH 4\nMAXVAL 255\nTUPLTYPE RGB_ALPHA\nENDHDR\n";
        assert_eq!(&out[..header.len()], header);
        assert_eq!(&out[header.len()..], &[0, 0, 0, 0, 1, 2, 3, 0x80]);
    }

    #[test]
    fn writes_ppm_without_alpha() {
        let counter = Arc::new(BitmapCounter::default());
        let mut bitmap = Bitmap::allocate(&counter, 1, 1, BitmapConfig::Argb8888).unwrap();
        bitmap.erase_color(Color::WHITE);

        let mut out = Vec::new();
        PnmEncoder::new(&bitmap, PnmFormat::Ppm)
            .encode(&mut out)
            .unwrap();
        assert_eq!(out, b"P6\n1 1\n255\n\xFF\xFF\xFF");
    }
}

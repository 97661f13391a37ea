//! Binary PPM (P6) raster I/O.
//!
//! P6 is the smallest lossless format every image tool can export, so it is
//! the on-disk format for captured charts. Only `maxval <= 255` is accepted;
//! pixels are expanded to opaque RGBA on read.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use chartsight_core::domain::{RasterImage, Rgb};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterIoError {
    #[error("raster I/O: {0}")]
    Io(#[from] io::Error),
    #[error("not a binary PPM (magic {0:?})")]
    BadMagic(String),
    #[error("malformed PPM header: {0}")]
    BadHeader(String),
    #[error("unsupported PPM maxval {0} (need 1..=255)")]
    UnsupportedMaxval(u32),
    #[error("PPM body truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// Read one P6 image from `reader`.
pub fn read_ppm<R: Read>(reader: R) -> Result<RasterImage, RasterIoError> {
    let mut bytes = Vec::new();
    BufReader::new(reader).read_to_end(&mut bytes)?;

    let mut header = HeaderCursor::new(&bytes);
    let magic = header.token()?;
    if magic != "P6" {
        return Err(RasterIoError::BadMagic(magic));
    }
    let width = header.number("width")?;
    let height = header.number("height")?;
    let maxval = header.number("maxval")?;
    if maxval == 0 || maxval > 255 {
        return Err(RasterIoError::UnsupportedMaxval(maxval));
    }
    // Exactly one whitespace byte separates the header from the body.
    let body = bytes.get(header.pos + 1..).unwrap_or_default();

    let count = (width as usize)
        .checked_mul(height as usize)
        .filter(|c| c.checked_mul(4).is_some())
        .ok_or_else(|| RasterIoError::BadHeader(format!("{width}x{height} is too large")))?;
    let expected = count * 3;
    if body.len() < expected {
        return Err(RasterIoError::Truncated {
            expected,
            actual: body.len(),
        });
    }

    let scale = |v: u8| -> u8 {
        if maxval == 255 {
            v
        } else {
            ((v as u32 * 255) / maxval).min(255) as u8
        }
    };
    let mut pixels = Vec::with_capacity(count * 4);
    for rgb in body[..expected].chunks_exact(3) {
        pixels.extend_from_slice(&[scale(rgb[0]), scale(rgb[1]), scale(rgb[2]), 255]);
    }
    Ok(RasterImage::new(width, height, pixels))
}

/// Write `image` as P6. Pixels missing from a short buffer are written black.
pub fn write_ppm<W: Write>(image: &RasterImage, writer: W) -> Result<(), RasterIoError> {
    let mut out = BufWriter::new(writer);
    write!(out, "P6\n{} {}\n255\n", image.width, image.height)?;
    let black = Rgb::new(0, 0, 0);
    for y in 0..image.height {
        for x in 0..image.width {
            let c = image.pixel(x, y).unwrap_or(black);
            out.write_all(&[c.r, c.g, c.b])?;
        }
    }
    out.flush()?;
    Ok(())
}

pub fn load_ppm(path: &Path) -> Result<RasterImage, RasterIoError> {
    read_ppm(File::open(path)?)
}

pub fn save_ppm(image: &RasterImage, path: &Path) -> Result<(), RasterIoError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_ppm(image, File::create(path)?)
}

// ─── Header parsing ─────────────────────────────────────────────────

struct HeaderCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> HeaderCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Skip whitespace and `#` comments, then read one token.
    fn token(&mut self) -> Result<String, RasterIoError> {
        loop {
            match self.bytes.get(self.pos) {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'#') => {
                    while let Some(&b) = self.bytes.get(self.pos) {
                        self.pos += 1;
                        if b == b'\n' {
                            break;
                        }
                    }
                }
                Some(_) => break,
                None => return Err(RasterIoError::BadHeader("unexpected end of header".into())),
            }
        }
        let start = self.pos;
        while let Some(b) = self.bytes.get(self.pos) {
            if b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        Ok(String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned())
    }

    fn number(&mut self, field: &str) -> Result<u32, RasterIoError> {
        let token = self.token()?;
        token
            .parse()
            .map_err(|_| RasterIoError::BadHeader(format!("{field} {token:?} is not a number")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> RasterImage {
        let mut image = RasterImage::filled(4, 3, Rgb::new(18, 30, 52));
        image.set_pixel(1, 1, Rgb::new(38, 166, 91));
        image.set_pixel(3, 2, Rgb::new(214, 48, 49));
        image
    }

    #[test]
    fn write_then_read_preserves_pixels() {
        let mut buf = Vec::new();
        write_ppm(&sample(), &mut buf).unwrap();
        assert!(buf.starts_with(b"P6\n4 3\n255\n"));
        assert_eq!(buf.len(), 11 + 4 * 3 * 3);
        assert_eq!(read_ppm(buf.as_slice()).unwrap(), sample());
    }

    #[test]
    fn header_comments_are_skipped() {
        let mut data = b"P6\n# exported\n1 1\n# depth\n255\n".to_vec();
        data.extend_from_slice(&[10, 20, 30]);
        let image = read_ppm(data.as_slice()).unwrap();
        assert_eq!(image.pixel(0, 0), Some(Rgb::new(10, 20, 30)));
    }

    #[test]
    fn low_maxval_is_rescaled() {
        let mut data = b"P6 1 1 15\n".to_vec();
        data.extend_from_slice(&[15, 0, 5]);
        let image = read_ppm(data.as_slice()).unwrap();
        assert_eq!(image.pixel(0, 0), Some(Rgb::new(255, 0, 85)));
    }

    #[test]
    fn ascii_ppm_is_rejected() {
        let err = read_ppm(b"P3\n1 1\n255\n0 0 0\n".as_slice()).unwrap_err();
        assert!(matches!(err, RasterIoError::BadMagic(m) if m == "P3"));
    }

    #[test]
    fn sixteen_bit_is_rejected() {
        let err = read_ppm(b"P6\n1 1\n65535\n".as_slice()).unwrap_err();
        assert!(matches!(err, RasterIoError::UnsupportedMaxval(65535)));
    }

    #[test]
    fn short_body_is_truncated() {
        let err = read_ppm(b"P6\n2 2\n255\n\x00\x01\x02".as_slice()).unwrap_err();
        assert!(matches!(
            err,
            RasterIoError::Truncated {
                expected: 12,
                actual: 3
            }
        ));
    }

    #[test]
    fn garbage_dimensions_are_bad_header() {
        let err = read_ppm(b"P6\nwide 2\n255\n".as_slice()).unwrap_err();
        assert!(matches!(err, RasterIoError::BadHeader(_)));
    }

    proptest::proptest! {
        #[test]
        fn arbitrary_bytes_never_panic(data in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..256)) {
            let _ = read_ppm(data.as_slice());
        }

        #[test]
        fn valid_header_with_any_body_decodes_or_truncates(
            w in 1u32..6,
            h in 1u32..6,
            body in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..120),
        ) {
            let mut data = format!("P6\n{w} {h}\n255\n").into_bytes();
            data.extend_from_slice(&body);
            match read_ppm(data.as_slice()) {
                Ok(image) => {
                    proptest::prop_assert!(body.len() >= (w * h * 3) as usize);
                    proptest::prop_assert_eq!(image.pixels.len(), (w * h * 4) as usize);
                }
                Err(RasterIoError::Truncated { expected, actual }) => {
                    proptest::prop_assert_eq!(expected, (w * h * 3) as usize);
                    proptest::prop_assert_eq!(actual, body.len());
                }
                Err(other) => proptest::prop_assert!(false, "unexpected error {}", other),
            }
        }
    }

    #[test]
    fn save_and_load_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/chart.ppm");
        save_ppm(&sample(), &path).unwrap();
        assert_eq!(load_ppm(&path).unwrap(), sample());
    }
}

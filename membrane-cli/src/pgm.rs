//! Portable graymap (PGM) rasters, ASCII `P2` and binary `P5`, 8-bit only.
//!
//! Files store pixels row by row (`y * width + x`); [`Pgm::to_raster`] and
//! [`Pgm::from_raster`] convert to and from the solver's layout.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use membrane_core::Raster;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PgmError {
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed PGM: {0}")]
    Format(String),
}

fn format_err(msg: impl Into<String>) -> PgmError {
    PgmError::Format(msg.into())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pgm {
    pub width: usize,
    pub height: usize,
    pub maxval: u8,
    /// Row-major samples, `height` rows of `width`.
    pub pixels: Vec<u8>,
}

impl Pgm {
    pub fn parse(bytes: &[u8]) -> Result<Pgm, PgmError> {
        let mut cur = Cursor { bytes, pos: 0 };

        let binary = match cur.token() {
            Some(b"P2") => false,
            Some(b"P5") => true,
            Some(other) => {
                return Err(format_err(format!(
                    "unknown magic {:?}, expected P2 or P5",
                    String::from_utf8_lossy(other)
                )));
            }
            None => return Err(format_err("empty file")),
        };

        let width = cur.number("width")? as usize;
        let height = cur.number("height")? as usize;
        let maxval = cur.number("maxval")?;
        if width == 0 || height == 0 {
            return Err(format_err(format!("zero dimension {width}x{height}")));
        }
        if maxval == 0 || maxval > 255 {
            return Err(format_err(format!(
                "maxval {maxval} unsupported, expected 1..=255"
            )));
        }
        let maxval = maxval as u8;
        let count = width
            .checked_mul(height)
            .ok_or_else(|| format_err("dimensions overflow"))?;

        let pixels = if binary {
            // exactly one whitespace byte separates the header from the data
            let start = cur.pos + 1;
            let data = start
                .checked_add(count)
                .and_then(|end| bytes.get(start..end))
                .ok_or_else(|| format_err(format!("expected {count} binary samples")))?;
            data.to_vec()
        } else {
            // every ASCII sample takes at least one byte
            if count > bytes.len() - cur.pos {
                return Err(format_err(format!(
                    "header announces {count} samples, file holds {} bytes of data",
                    bytes.len() - cur.pos
                )));
            }
            let mut out = Vec::with_capacity(count);
            for k in 0..count {
                let v = cur
                    .number("sample")
                    .map_err(|_| format_err(format!("sample {k} of {count} missing or invalid")))?;
                if v > u32::from(maxval) {
                    return Err(format_err(format!("sample {v} exceeds maxval {maxval}")));
                }
                out.push(v as u8);
            }
            out
        };

        if let Some(&bad) = pixels.iter().find(|&&v| v > maxval) {
            return Err(format_err(format!("sample {bad} exceeds maxval {maxval}")));
        }

        Ok(Pgm {
            width,
            height,
            maxval,
            pixels,
        })
    }

    /// Image pixel `(x, y)` becomes raster element `(x, y)`.
    pub fn to_raster(&self) -> membrane_core::Result<Raster<u8>> {
        Raster::from_fn(self.width, self.height, |i, j| self.pixels[j * self.width + i])
    }

    pub fn from_raster(raster: &Raster<u8>, maxval: u8) -> Pgm {
        let (w, h) = raster.shape();
        let mut pixels = vec![0u8; w * h];
        for ((i, j), &v) in raster.indexed() {
            pixels[j * w + i] = v;
        }
        Pgm {
            width: w,
            height: h,
            maxval,
            pixels,
        }
    }

    /// ASCII encoding with a creator comment, at most 16 samples per line.
    pub fn to_p2(&self) -> String {
        let mut s = String::with_capacity(self.pixels.len() * 4 + 64);
        let _ = writeln!(s, "P2");
        let _ = writeln!(s, "# Creator: membrane-cli {}", env!("CARGO_PKG_VERSION"));
        let _ = writeln!(s, "{} {}", self.width, self.height);
        let _ = writeln!(s, "{}", self.maxval);
        for row in self.pixels.chunks(self.width) {
            for line in row.chunks(16) {
                let text: Vec<String> = line.iter().map(|v| v.to_string()).collect();
                let _ = writeln!(s, "{}", text.join(" "));
            }
        }
        s
    }
}

pub fn read_raster(path: &Path) -> Result<Pgm, PgmError> {
    let bytes = fs::read(path).map_err(|source| PgmError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let pgm = Pgm::parse(&bytes).map_err(|e| match e {
        PgmError::Format(msg) => format_err(format!("{}: {msg}", path.display())),
        other => other,
    })?;
    log::debug!(
        "read {} ({}x{}, maxval {})",
        path.display(),
        pgm.width,
        pgm.height,
        pgm.maxval
    );
    Ok(pgm)
}

pub fn write_raster_u8(
    path: &Path,
    width: usize,
    height: usize,
    pixels: &[u8],
    maxval: u8,
) -> Result<(), PgmError> {
    if pixels.len() != width * height {
        return Err(format_err(format!(
            "{} samples for a {width}x{height} image",
            pixels.len()
        )));
    }
    let pgm = Pgm {
        width,
        height,
        maxval,
        pixels: pixels.to_vec(),
    };
    fs::write(path, pgm.to_p2()).map_err(|source| PgmError::Io {
        path: path.to_path_buf(),
        source,
    })
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn skip_blank(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == b'#' {
                while let Some(&c) = self.bytes.get(self.pos) {
                    self.pos += 1;
                    if c == b'\n' {
                        break;
                    }
                }
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn token(&mut self) -> Option<&'a [u8]> {
        self.skip_blank();
        let bytes = self.bytes;
        let start = self.pos;
        while let Some(&b) = bytes.get(self.pos) {
            if b.is_ascii_whitespace() || b == b'#' {
                break;
            }
            self.pos += 1;
        }
        if self.pos > start {
            Some(&bytes[start..self.pos])
        } else {
            None
        }
    }

    fn number(&mut self, what: &str) -> Result<u32, PgmError> {
        let tok = self
            .token()
            .ok_or_else(|| format_err(format!("missing {what}")))?;
        std::str::from_utf8(tok)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                format_err(format!(
                    "invalid {what} {:?}",
                    String::from_utf8_lossy(tok)
                ))
            })
    }
}

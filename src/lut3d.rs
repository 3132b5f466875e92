use crate::error::{GradeError, GradeResult};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Represents a 3D Look-Up Table (LUT).
///
/// The lattice is a cube of `size^3` RGB cells. Cell `(r, g, b)` is stored at
/// flat index `r + g * size + b * size * size`, which is the order `.cube`
/// files list their data in (red varies fastest). A parsed LUT is never
/// mutated, so one instance can be shared by reference across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3D {
    /// The size of one dimension of the LUT cube (e.g., 33 for a 33x33x33 LUT).
    size: usize,
    /// Cell values as read from the file. Nominally in `[0.0, 1.0]` but never clamped.
    data: Vec<[f32; 3]>,
    /// Value of the `TITLE` directive, if present.
    title: Option<String>,
}

impl Lut3D {
    /// Builds a lattice from cells already laid out in `.cube` order.
    ///
    /// # Errors
    ///
    /// Returns `MalformedLut` for a zero size or one whose cube overflows
    /// `usize`, and `LatticeSizeMismatch` when `data.len() != size^3`.
    pub fn from_cells(size: usize, data: Vec<[f32; 3]>) -> GradeResult<Self> {
        if size == 0 {
            return Err(GradeError::MalformedLut("LUT_3D_SIZE must be positive".into()));
        }
        let expected = size
            .checked_mul(size)
            .and_then(|s| s.checked_mul(size))
            .ok_or_else(|| {
                GradeError::MalformedLut(format!("LUT_3D_SIZE {} is too large", size))
            })?;
        if data.len() != expected {
            return Err(GradeError::LatticeSizeMismatch {
                expected,
                found: data.len(),
            });
        }
        Ok(Lut3D {
            size,
            data,
            title: None,
        })
    }

    /// Identity lattice: every cell holds its own normalized coordinates.
    ///
    /// Sizes below 2 are raised to 2, the smallest lattice with distinct
    /// corners. `cinegrade identity` writes it out as a neutral starting LUT.
    pub fn identity(size: usize) -> Self {
        let size = size.max(2);
        let f = (size - 1) as f32;
        let mut data = Vec::with_capacity(size * size * size);
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    data.push([r as f32 / f, g as f32 / f, b as f32 / f]);
                }
            }
        }
        Lut3D {
            size,
            data,
            title: None,
        }
    }

    /// Sets the `TITLE` written by [`Lut3D::write_cube`].
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Reads and parses a `.cube` file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the `.cube` file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, otherwise any error of [`Lut3D::parse_cube`].
    pub fn from_cube<P: AsRef<Path>>(path: P) -> GradeResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::parse_cube(&text)
    }

    /// Parses the text of a `.cube` file.
    ///
    /// The scan runs forward once. `LUT_3D_SIZE`, `TITLE`, comments and blank
    /// lines form the header; the first other line opens the data block, and
    /// the size must have been seen by then. Inside the data block every line
    /// with exactly three tokens is a cell, other lines are skipped.
    ///
    /// # Errors
    ///
    /// * `MalformedLut` - no usable `LUT_3D_SIZE` before the data, or a
    ///   three-token line that is not numeric.
    /// * `UnsupportedDomain` - a domain other than the unit cube.
    /// * `LatticeSizeMismatch` - the triplet count is not `size^3`.
    pub fn parse_cube(text: &str) -> GradeResult<Self> {
        let mut size: Option<usize> = None;
        let mut title = None;
        let mut data = Vec::new();
        let mut in_data = false;

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();

            if !in_data {
                if line.starts_with("LUT_3D_SIZE") {
                    size = Some(parse_size(line)?);
                    continue;
                } else if line.is_empty() || line.starts_with('#') {
                    continue;
                } else if line.starts_with("TITLE") {
                    title = Some(parse_title(line));
                    continue;
                }
                if size.is_none() {
                    return Err(GradeError::MalformedLut(
                        "LUT_3D_SIZE not found before data".into(),
                    ));
                }
                in_data = true;
            }

            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with(|c: char| c.is_ascii_alphabetic()) {
                check_keyword(line)?;
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != 3 {
                continue;
            }
            let mut rgb = [0.0f32; 3];
            for (slot, token) in rgb.iter_mut().zip(&tokens) {
                *slot = token.parse::<f32>().map_err(|_| {
                    GradeError::MalformedLut(format!(
                        "line {}: invalid value `{}`",
                        line_no + 1,
                        token
                    ))
                })?;
            }
            data.push(rgb);
        }

        let size = size.ok_or_else(|| GradeError::MalformedLut("LUT_3D_SIZE is missing".into()))?;
        let mut lut = Self::from_cells(size, data)?;
        lut.title = title;
        Ok(lut)
    }

    /// Writes the lattice in `.cube` format, red varying fastest.
    pub fn write_cube<W: Write>(&self, mut writer: W) -> GradeResult<()> {
        if let Some(title) = &self.title {
            writeln!(writer, "TITLE \"{}\"", title)?;
        }
        writeln!(writer, "LUT_3D_SIZE {}", self.size)?;
        writeln!(writer)?;
        for rgb in &self.data {
            writeln!(writer, "{:.6} {:.6} {:.6}", rgb[0], rgb[1], rgb[2])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Edge length `N` of the lattice.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// All cells in `.cube` order.
    pub fn cells(&self) -> &[[f32; 3]] {
        &self.data
    }

    /// Cell at lattice coordinates `(r, g, b)`, each in `0..size`.
    pub fn cell(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        self.data[r + g * self.size + b * self.size * self.size]
    }

    /// Maps an 8-bit RGB color through the lattice with trilinear interpolation.
    ///
    /// Blending runs along red, then green, then blue. The upper neighbour of
    /// each axis is clamped to `size - 1`, so inputs of 255 land exactly on the
    /// last cell. The result is left in the unit-float domain without clamping.
    pub fn sample(&self, rgb: [u8; 3]) -> [f32; 3] {
        let (r0, r1, rt) = self.axis(rgb[0]);
        let (g0, g1, gt) = self.axis(rgb[1]);
        let (b0, b1, bt) = self.axis(rgb[2]);

        let c00 = lerp(self.cell(r0, g0, b0), self.cell(r1, g0, b0), rt);
        let c01 = lerp(self.cell(r0, g0, b1), self.cell(r1, g0, b1), rt);
        let c10 = lerp(self.cell(r0, g1, b0), self.cell(r1, g1, b0), rt);
        let c11 = lerp(self.cell(r0, g1, b1), self.cell(r1, g1, b1), rt);

        let c0 = lerp(c00, c10, gt);
        let c1 = lerp(c01, c11, gt);

        lerp(c0, c1, bt)
    }

    /// Lower index, upper index and fraction for one channel.
    fn axis(&self, channel: u8) -> (usize, usize, f32) {
        let last = self.size - 1;
        let idx = channel as f32 / 255.0 * last as f32;
        let lo = (idx.floor() as usize).min(last);
        let hi = (lo + 1).min(last);
        (lo, hi, idx - lo as f32)
    }
}

/// Converts a unit-float channel to a byte: scale by 255, clamp, round.
pub fn unit_to_byte(value: f32) -> u8 {
    (value * 255.0).clamp(0.0, 255.0).round() as u8
}

fn lerp(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] * (1.0 - t) + b[0] * t,
        a[1] * (1.0 - t) + b[1] * t,
        a[2] * (1.0 - t) + b[2] * t,
    ]
}

fn parse_size(line: &str) -> GradeResult<usize> {
    let field = line.split_whitespace().last().unwrap_or_default();
    match field.parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(GradeError::MalformedLut(format!(
            "invalid LUT_3D_SIZE value `{}`",
            field
        ))),
    }
}

fn parse_title(line: &str) -> String {
    line.trim_start_matches("TITLE").trim().trim_matches('"').to_string()
}

/// Keyword lines inside the data block. Only the domain directives are
/// checked; anything else is metadata.
fn check_keyword(line: &str) -> GradeResult<()> {
    let mut parts = line.split_whitespace();
    let expected = match parts.next() {
        Some("DOMAIN_MIN") => [0.0; 3],
        Some("DOMAIN_MAX") => [1.0; 3],
        Some("LUT_3D_INPUT_RANGE") => {
            let range: Vec<f32> = parts.filter_map(|s| s.parse().ok()).collect();
            if range != [0.0, 1.0] {
                return Err(GradeError::UnsupportedDomain(line.to_string()));
            }
            return Ok(());
        }
        _ => return Ok(()),
    };
    let values: Vec<f32> = parts.filter_map(|s| s.parse().ok()).collect();
    if values != expected {
        return Err(GradeError::UnsupportedDomain(line.to_string()));
    }
    Ok(())
}

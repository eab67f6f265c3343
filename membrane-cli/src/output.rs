use std::io::{self, Write};

use membrane_core::Raster;

/// Writes one value per line in scientific notation, image row by image row,
/// with a blank line after each row.
pub fn write_wavefront<W: Write>(w: &mut W, u: &Raster<f64>) -> io::Result<()> {
    for j in 0..u.height() {
        for i in 0..u.width() {
            let v = u
                .get(i, j)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            writeln!(w, "{v:.6e}")?;
        }
        writeln!(w)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_blank_line_separated() {
        let u = Raster::from_fn(3, 3, |i, j| if (i, j) == (1, 1) { 0.0123456789 } else { 0.0 }).unwrap();
        let mut buf = Vec::new();
        write_wavefront(&mut buf, &u).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let rows: Vec<&str> = text.split("\n\n").filter(|r| !r.is_empty()).collect();
        assert_eq!(rows.len(), 3);
        let middle: Vec<&str> = rows[1].lines().collect();
        assert_eq!(middle, vec!["0.000000e0", "1.234568e-2", "0.000000e0"]);
    }
}

//! Console dumps of trial buffers
//!
//! Values print with six decimals, one matrix row per line.

use std::fmt::Write;

/// `[v0, v1, ...]` on one line.
pub fn format_vector(values: &[f32]) -> String {
    let mut out = String::with_capacity(values.len() * 12 + 2);
    out.push('[');
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{v:.6}");
    }
    out.push(']');
    out
}

/// `rows` lines of `cols` space-separated values. An inconsistent shape
/// produces a one-line note instead of panicking.
pub fn format_matrix(matrix: &[f32], rows: usize, cols: usize) -> String {
    if rows.checked_mul(cols) != Some(matrix.len()) {
        return format!("<matrix of {} elements does not match {rows}x{cols}>", matrix.len());
    }
    if cols == 0 {
        return "\n".repeat(rows);
    }

    let mut out = String::new();
    for row in matrix.chunks_exact(cols) {
        for (j, v) in row.iter().enumerate() {
            if j > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{v:10.6}");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_uses_six_decimals() {
        assert_eq!(format_vector(&[1.0, -0.5]), "[1.000000, -0.500000]");
        assert_eq!(format_vector(&[]), "[]");
    }

    #[test]
    fn matrix_one_row_per_line() {
        let out = format_matrix(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].split_whitespace().collect::<Vec<_>>(), ["1.000000", "2.000000", "3.000000"]);
        assert!(lines[1].ends_with("6.000000"));
    }

    #[test]
    fn matrix_shape_mismatch_is_reported() {
        assert!(format_matrix(&[1.0; 5], 2, 3).contains("does not match 2x3"));
    }
}

use matvec_common::{KernelError, MatvecShape, Result, Traversal};

/// Check every buffer length against the shape before any kernel touches memory.
pub(crate) fn check_buffers(
    matrix: &[f32],
    vec_mul: &[f32],
    vec_add: &[f32],
    res: &[f32],
    rows: usize,
    cols: usize,
    traversal: Traversal,
) -> Result<MatvecShape> {
    let shape = MatvecShape::new(rows, cols);

    let matrix_len = rows.checked_mul(cols).ok_or_else(|| {
        KernelError::invalid(format!("matrix dimensions {rows}x{cols} overflow usize"))
    })?;
    if matrix.len() != matrix_len {
        return Err(KernelError::invalid(format!(
            "matrix has {} elements, expected {} for {shape}",
            matrix.len(),
            matrix_len
        ))
        .into());
    }

    let input_len = shape.input_len(traversal);
    if vec_mul.len() != input_len {
        return Err(KernelError::invalid(format!(
            "vec_mul has {} elements, expected {input_len} for {shape} ({traversal})",
            vec_mul.len()
        ))
        .into());
    }

    let output_len = shape.output_len(traversal);
    if vec_add.len() != output_len {
        return Err(KernelError::invalid(format!(
            "vec_add has {} elements, expected {output_len} for {shape} ({traversal})",
            vec_add.len()
        ))
        .into());
    }
    if res.len() != output_len {
        return Err(KernelError::invalid(format!(
            "res has {} elements, expected {output_len} for {shape} ({traversal})",
            res.len()
        ))
        .into());
    }

    Ok(shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_row_major_buffers() {
        let shape = check_buffers(&[0.0; 6], &[0.0; 3], &[0.0; 2], &[0.0; 2], 2, 3, Traversal::RowMajor)
            .unwrap();
        assert_eq!(shape, MatvecShape::new(2, 3));
    }

    #[test]
    fn transposed_swaps_vector_lengths() {
        assert!(
            check_buffers(&[0.0; 6], &[0.0; 2], &[0.0; 3], &[0.0; 3], 2, 3, Traversal::Transposed)
                .is_ok()
        );
        assert!(
            check_buffers(&[0.0; 6], &[0.0; 3], &[0.0; 2], &[0.0; 2], 2, 3, Traversal::Transposed)
                .is_err()
        );
    }

    #[test]
    fn names_the_offending_buffer() {
        let err = check_buffers(&[0.0; 6], &[0.0; 3], &[0.0; 2], &[0.0; 5], 2, 3, Traversal::RowMajor)
            .unwrap_err();
        assert!(err.to_string().contains("res has 5 elements"));

        let err = check_buffers(&[0.0; 5], &[0.0; 3], &[0.0; 2], &[0.0; 2], 2, 3, Traversal::RowMajor)
            .unwrap_err();
        assert!(err.to_string().contains("matrix has 5 elements"));
    }
}

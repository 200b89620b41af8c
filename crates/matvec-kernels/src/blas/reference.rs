use super::{BlasOracle, Order, Transpose, check_sgemv_args};
use matvec_common::Result;

/// Pure-Rust `sgemv` following the CBLAS contract.
///
/// Dot products accumulate in `f64` and round once, so the result is at least
/// as accurate as any `f32` kernel and shares none of their summation orders.
/// `beta == 0` overwrites `y` without reading it, as CBLAS does.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceBlas;

impl BlasOracle for ReferenceBlas {
    fn name(&self) -> &'static str {
        "blas-reference"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn sgemv(
        &self,
        order: Order,
        trans: Transpose,
        m: usize,
        n: usize,
        alpha: f32,
        a: &[f32],
        lda: usize,
        x: &[f32],
        incx: usize,
        beta: f32,
        y: &mut [f32],
        incy: usize,
    ) -> Result<()> {
        check_sgemv_args(order, trans, m, n, a, lda, x, incx, y, incy)?;

        // A(i, j) for the logical m × n matrix
        let at = |i: usize, j: usize| -> f64 {
            match order {
                Order::RowMajor => a[i * lda + j] as f64,
                Order::ColMajor => a[j * lda + i] as f64,
            }
        };

        let (y_len, x_len) = match trans {
            Transpose::NoTrans => (m, n),
            Transpose::Trans => (n, m),
        };

        for k in 0..y_len {
            let mut dot = 0.0f64;
            for l in 0..x_len {
                let a_kl = match trans {
                    Transpose::NoTrans => at(k, l),
                    Transpose::Trans => at(l, k),
                };
                dot += a_kl * x[l * incx] as f64;
            }

            let yk = &mut y[k * incy];
            let scaled = if beta == 0.0 { 0.0 } else { beta as f64 * *yk as f64 };
            *yk = (alpha as f64 * dot + scaled) as f32;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A = [1 2 3; 4 5 6]
    const ROW_MAJOR: [f32; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    const COL_MAJOR: [f32; 6] = [1.0, 4.0, 2.0, 5.0, 3.0, 6.0];

    #[test]
    fn no_trans_row_and_col_major_agree() {
        let x = [1.0f32, 1.0, 1.0];
        let mut y_row = [0.0f32; 2];
        let mut y_col = [0.0f32; 2];

        ReferenceBlas
            .sgemv(Order::RowMajor, Transpose::NoTrans, 2, 3, 1.0, &ROW_MAJOR, 3, &x, 1, 0.0, &mut y_row, 1)
            .unwrap();
        ReferenceBlas
            .sgemv(Order::ColMajor, Transpose::NoTrans, 2, 3, 1.0, &COL_MAJOR, 2, &x, 1, 0.0, &mut y_col, 1)
            .unwrap();

        assert_eq!(y_row, [6.0, 15.0]);
        assert_eq!(y_col, y_row);
    }

    #[test]
    fn trans_reduces_columns() {
        let x = [1.0f32, 2.0];
        let mut y = [0.0f32; 3];
        ReferenceBlas
            .sgemv(Order::RowMajor, Transpose::Trans, 2, 3, 1.0, &ROW_MAJOR, 3, &x, 1, 0.0, &mut y, 1)
            .unwrap();
        assert_eq!(y, [9.0, 12.0, 15.0]);
    }

    #[test]
    fn alpha_and_beta_scale() {
        let x = [1.0f32, 1.0, 1.0];
        let mut y = [1.0f32, 2.0];
        ReferenceBlas
            .sgemv(Order::RowMajor, Transpose::NoTrans, 2, 3, 2.0, &ROW_MAJOR, 3, &x, 1, 3.0, &mut y, 1)
            .unwrap();
        assert_eq!(y, [2.0 * 6.0 + 3.0, 2.0 * 15.0 + 6.0]);
    }

    #[test]
    fn beta_zero_ignores_stale_nan() {
        let x = [1.0f32, 0.0, 0.0];
        let mut y = [f32::NAN, f32::NAN];
        ReferenceBlas
            .sgemv(Order::RowMajor, Transpose::NoTrans, 2, 3, 1.0, &ROW_MAJOR, 3, &x, 1, 0.0, &mut y, 1)
            .unwrap();
        assert_eq!(y, [1.0, 4.0]);
    }

    #[test]
    fn strided_vectors_and_padded_lda() {
        // 2 x 2 matrix stored with lda = 3 (one padding column)
        let a = [1.0f32, 2.0, -99.0, 3.0, 4.0, -99.0];
        let x = [1.0f32, -7.0, 1.0];
        let mut y = [0.0f32, -5.0, 0.0];
        ReferenceBlas
            .sgemv(Order::RowMajor, Transpose::NoTrans, 2, 2, 1.0, &a, 3, &x, 2, 0.0, &mut y, 2)
            .unwrap();
        assert_eq!(y, [3.0, -5.0, 7.0]);
    }
}

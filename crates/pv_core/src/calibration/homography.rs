//! Plane-to-plane homography estimation via DLT with Hartley normalization.

use nalgebra::{DMatrix, Matrix3, Vector3};

use crate::error::CalibrationError;

/// Project a 2D point through a 3x3 homography: H * [x, y, 1]^T -> [u, v].
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < 1e-15 {
        return [f64::NAN, f64::NAN];
    }
    [p[0] / p[2], p[1] / p[2]]
}

/// Compute a normalizing transform: translate centroid to origin, scale so
/// mean distance from origin is sqrt(2).
fn normalize_points(pts: &[[f64; 2]]) -> (Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let cx: f64 = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy: f64 = pts.iter().map(|p| p[1]).sum::<f64>() / n;

    let mean_dist: f64 = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-15 { std::f64::consts::SQRT_2 / mean_dist } else { 1.0 };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);

    let normalized: Vec<[f64; 2]> =
        pts.iter().map(|p| [s * (p[0] - cx), s * (p[1] - cy)]).collect();

    (t, normalized)
}

/// Signed twice-area of the triangle (a, b, c). Near zero means collinear.
fn triangle_area2(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Reject point sets where any three points are (near-)collinear.
///
/// Four correspondences determine a homography only when no three of them
/// lie on a line; a degenerate set produces an unusable solve.
pub fn check_non_degenerate(pts: &[[f64; 2]; 4]) -> Result<(), CalibrationError> {
    // Scale tolerance by the spread of the points so the check is unit-free.
    let spread = pts
        .iter()
        .flat_map(|p| pts.iter().map(move |q| ((p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2)).sqrt()))
        .fold(0.0f64, f64::max);
    let tol = (spread * spread) * 1e-6;

    for i in 0..4 {
        for j in (i + 1)..4 {
            for k in (j + 1)..4 {
                if triangle_area2(pts[i], pts[j], pts[k]).abs() <= tol {
                    return Err(CalibrationError::DegeneratePoints {
                        reason: format!("points {}, {}, {} are collinear", i, j, k),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Estimate the homography mapping `src` points onto `dst` points using the
/// Direct Linear Transform over exactly four correspondences.
pub fn estimate_homography(
    src: &[[f64; 2]; 4],
    dst: &[[f64; 2]; 4],
) -> Result<Matrix3<f64>, CalibrationError> {
    check_non_degenerate(src)?;
    check_non_degenerate(dst)?;

    // Hartley normalization keeps the solve well-conditioned.
    let (t_src, src_n) = normalize_points(src);
    let (t_dst, dst_n) = normalize_points(dst);

    // Build the 2n x 9 DLT matrix A.
    let n = src.len();
    let mut a = DMatrix::zeros(2 * n, 9);
    for i in 0..n {
        let (sx, sy) = (src_n[i][0], src_n[i][1]);
        let (dx, dy) = (dst_n[i][0], dst_n[i][1]);

        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    // The solution h is the eigenvector of A^T A with the smallest
    // eigenvalue. This avoids thin-SVD dimension issues.
    let ata = a.transpose() * &a;
    let eig = nalgebra::SymmetricEigen::new(ata);

    let mut min_idx = 0;
    let mut min_val = eig.eigenvalues[0].abs();
    for i in 1..9 {
        let v = eig.eigenvalues[i].abs();
        if v < min_val {
            min_val = v;
            min_idx = i;
        }
    }
    let h_vec: Vec<f64> = (0..9).map(|j| eig.eigenvectors[(j, min_idx)]).collect();
    #[rustfmt::skip]
    let h_norm = Matrix3::new(
        h_vec[0], h_vec[1], h_vec[2],
        h_vec[3], h_vec[4], h_vec[5],
        h_vec[6], h_vec[7], h_vec[8],
    );

    // Denormalize: H = T_dst^-1 * H_norm * T_src
    let t_dst_inv = t_dst.try_inverse().ok_or_else(|| {
        CalibrationError::EstimationFailure("normalization transform not invertible".into())
    })?;
    let h = t_dst_inv * h_norm * t_src;

    // Normalize so h[2][2] = 1 when possible.
    let scale = h[(2, 2)];
    if scale.abs() < 1e-15 {
        Ok(h)
    } else {
        Ok(h / scale)
    }
}

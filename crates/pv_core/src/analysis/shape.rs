//! Team shape metrics: centroid, spread, and convex-hull compactness.

use serde::{Deserialize, Serialize};

use crate::pitch::PitchPos;

/// Geometric summary of one team's occupied positions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TeamShape {
    /// Mean position (x, y) in meters
    pub centroid: PitchPos,
    /// Spread along the width axis (max y - min y) in meters
    pub width_m: f32,
    /// Spread along the length axis (max x - min x) in meters
    pub depth_m: f32,
    /// Area of the convex hull in square meters
    pub convex_hull_area_m2: f32,
}

/// Compute the shape summary for a set of positions.
///
/// Returns `None` for an empty set; a single position yields a degenerate
/// shape with zero spread.
pub fn team_shape(positions: &[PitchPos]) -> Option<TeamShape> {
    if positions.is_empty() {
        return None;
    }

    let n = positions.len() as f32;
    let (sum_x, sum_y) = positions
        .iter()
        .fold((0.0f32, 0.0f32), |acc, p| (acc.0 + p.0, acc.1 + p.1));

    let min_x = positions.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
    let max_x = positions.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
    let min_y = positions.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
    let max_y = positions.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);

    Some(TeamShape {
        centroid: (sum_x / n, sum_y / n),
        width_m: max_y - min_y,
        depth_m: max_x - min_x,
        convex_hull_area_m2: convex_hull_area(positions),
    })
}

/// Convex-hull area via Andrew's monotone chain and the shoelace formula.
pub fn convex_hull_area(points: &[PitchPos]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut pts: Vec<PitchPos> = points.to_vec();
    pts.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    });
    pts.dedup();
    if pts.len() < 3 {
        return 0.0;
    }

    let cross = |o: PitchPos, a: PitchPos, b: PitchPos| -> f64 {
        (a.0 as f64 - o.0 as f64) * (b.1 as f64 - o.1 as f64)
            - (a.1 as f64 - o.1 as f64) * (b.0 as f64 - o.0 as f64)
    };

    let mut lower: Vec<PitchPos> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<PitchPos> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    let hull = lower;
    if hull.len() < 3 {
        return 0.0;
    }

    // Shoelace
    let mut area2 = 0.0f64;
    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        area2 += a.0 as f64 * b.1 as f64 - b.0 as f64 * a.1 as f64;
    }
    (area2.abs() * 0.5) as f32
}

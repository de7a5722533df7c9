//! Spherical and planar geometry for portal positions.
//!
//! Everything here works on radians and unit-sphere coordinates; metric
//! distances only appear through [`EARTH_RADIUS_M`].

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters, used for walking distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic position in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn from_degrees(lat: f64, lng: f64) -> Self {
        Self { lat: lat.to_radians(), lng: lng.to_radians() }
    }
}

/// Unit-sphere coordinate of a geographic position.
pub fn latlng_to_xyz(p: LatLng) -> [f64; 3] {
    // The radius of the latitude line
    let r = p.lat.cos();
    [p.lng.cos() * r, p.lng.sin() * r, p.lat.sin()]
}

pub fn xyz_to_latlng(v: [f64; 3]) -> LatLng {
    LatLng { lat: v[2].asin(), lng: v[1].atan2(v[0]) }
}

/// Great-arc angle between two positions, in radians.
///
/// The atan2 form is stable for both tiny and near-antipodal separations.
pub fn great_arc_angle(a: LatLng, b: LatLng) -> f64 {
    let dlng = (a.lng - b.lng).abs();
    let (sin_a, cos_a) = a.lat.sin_cos();
    let (sin_b, cos_b) = b.lat.sin_cos();
    let (sin_d, cos_d) = dlng.sin_cos();

    let numer = ((cos_a * sin_d).powi(2)
        + (cos_b * sin_a - sin_b * cos_a * cos_d).powi(2))
    .sqrt();
    let denom = sin_b * sin_a + cos_b * cos_a * cos_d;
    numer.atan2(denom)
}

/// Surface distance between two positions in meters.
pub fn sphere_dist(a: LatLng, b: LatLng) -> f64 {
    EARTH_RADIUS_M * great_arc_angle(a, b)
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// True iff `p` lies strictly inside the spherical triangle `tri` (the small
/// one of the two a triple of points bounds). Border cases are not
/// guaranteed either way.
pub fn sphere_tri_contains(tri: [[f64; 3]; 3], p: [f64; 3]) -> bool {
    // One plane through the origin per side; p must be on the same side of
    // each plane as the opposite vertex.
    for i in 0..3 {
        let c = cross(tri[(i + 1) % 3], tri[(i + 2) % 3]);
        if dot(c, p) * dot(c, tri[i]) <= 0.0 {
            return false;
        }
    }
    true
}

/// Largest pairwise great-arc angle among `pts`, the validity probe for the
/// gnomonic projection (callers must reject inputs reaching pi/2).
pub fn max_pairwise_arc(pts: &[LatLng]) -> f64 {
    let mut worst = 0.0f64;
    for i in 0..pts.len() {
        for j in (i + 1)..pts.len() {
            worst = worst.max(great_arc_angle(pts[i], pts[j]));
        }
    }
    worst
}

/// Gnomonic projection of `pts` onto the plane tangent at the normalized
/// centroid of `xyz`, with the pole toward positive y.
///
/// Only valid when no two points are more than 90 degrees apart; `xyz` must
/// be the unit-sphere coordinates of `pts`.
pub fn gnomonic_projection(pts: &[LatLng], xyz: &[[f64; 3]]) -> Vec<[f64; 2]> {
    let mut base = [0.0f64; 3];
    for v in xyz {
        base[0] += v[0];
        base[1] += v[1];
        base[2] += v[2];
    }
    let norm = dot(base, base).sqrt();
    base = [base[0] / norm, base[1] / norm, base[2] / norm];
    let base_ll = xyz_to_latlng(base);

    // Spherical triangle base - point - pole: vertex angles A, B, C with the
    // matching lowercase letter the arc of the opposite side.
    pts.iter()
        .map(|p| {
            let a = std::f64::consts::FRAC_PI_2 - p.lat;
            let b = std::f64::consts::FRAC_PI_2 - base_ll.lat;
            let c = great_arc_angle(base_ll, *p);
            let big_c = base_ll.lng - p.lng;

            let sin_a = a.sin() * big_c.sin() / c.sin();
            let cos_a = (a.cos() - c.cos() * b.cos()) / (c.sin() * b.sin());

            // theta measures counter-clockwise from north; atan2 recovers
            // obtuse angles that arcsin alone would fold over
            let theta = sin_a.atan2(cos_a);
            let r = c.tan();
            [-theta.sin() * r, theta.cos() * r]
        })
        .collect()
}

/// Quarter turn counter-clockwise.
fn rotate_ccw(v: [f64; 2]) -> [f64; 2] {
    [-v[1], v[0]]
}

/// Index of a point strictly "left" of the directed boundary pair (a, b),
/// or None when the pair is already a hull edge.
fn between(a: usize, b: usize, pts: &[[f64; 2]]) -> Option<usize> {
    let diff = rotate_ccw([pts[a][0] - pts[b][0], pts[a][1] - pts[b][1]]);

    let mut best = 0;
    let mut best_ip = f64::NEG_INFINITY;
    for (i, p) in pts.iter().enumerate() {
        let ip = p[0] * diff[0] + p[1] * diff[1];
        if ip > best_ip {
            best_ip = ip;
            best = i;
        }
    }
    if best == a || best == b {
        None
    } else {
        Some(best)
    }
}

/// Indices of the points on the convex-hull boundary, in traversal order.
///
/// Planar points only; project spherical input first. Fewer than 3 distinct
/// points or fully collinear input is not supported.
pub fn convex_hull_boundary(pts: &[[f64; 2]]) -> Vec<usize> {
    let hix = (0..pts.len())
        .max_by(|&i, &j| pts[i][0].total_cmp(&pts[j][0]))
        .expect("hull of empty point set");
    let lox = (0..pts.len())
        .min_by(|&i, &j| pts[i][0].total_cmp(&pts[j][0]))
        .expect("hull of empty point set");

    // Successor map seeded with the two extreme points; refined by inserting
    // any point found outside a candidate edge.
    let mut succ = std::collections::HashMap::new();
    succ.insert(hix, lox);
    succ.insert(lox, hix);

    let mut boundary = Vec::new();
    let mut a = hix;
    let mut b = lox;
    let mut a_never_changed = true;

    while a != hix || a_never_changed {
        match between(a, b, pts) {
            None => {
                // (a, b) is a hull edge; advance to the next pair
                boundary.push(a);
                a = b;
                b = succ[&b];
                a_never_changed = false;
            }
            Some(c) => {
                succ.insert(a, c);
                succ.insert(c, b);
                b = c;
            }
        }
    }

    boundary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn xyz_round_trip() {
        let p = LatLng::from_degrees(52.37, 4.89);
        let q = xyz_to_latlng(latlng_to_xyz(p));
        assert!(close(p.lat, q.lat));
        assert!(close(p.lng, q.lng));
    }

    #[test]
    fn arc_angle_quarter_turn() {
        let a = LatLng::from_degrees(0.0, 0.0);
        let b = LatLng::from_degrees(0.0, 90.0);
        assert!(close(great_arc_angle(a, b), std::f64::consts::FRAC_PI_2));
    }

    #[test]
    fn arc_angle_small_separation_is_stable() {
        let a = LatLng::from_degrees(51.5007, -0.1245);
        let b = LatLng::from_degrees(51.5008, -0.1245);
        let angle = great_arc_angle(a, b);
        assert!(angle > 0.0);
        // one ten-thousandth of a degree of latitude is ~11m
        let d = EARTH_RADIUS_M * angle;
        assert!(d > 10.0 && d < 13.0, "got {}", d);
    }

    #[test]
    fn tri_contains_centroid_not_outside() {
        let tri = [
            latlng_to_xyz(LatLng::from_degrees(0.0, 0.0)),
            latlng_to_xyz(LatLng::from_degrees(1.0, 0.0)),
            latlng_to_xyz(LatLng::from_degrees(0.0, 1.0)),
        ];
        let inside = latlng_to_xyz(LatLng::from_degrees(0.3, 0.3));
        let outside = latlng_to_xyz(LatLng::from_degrees(2.0, 2.0));
        assert!(sphere_tri_contains(tri, inside));
        assert!(!sphere_tri_contains(tri, outside));
        // vertices are not strictly inside
        assert!(!sphere_tri_contains(tri, tri[0]));
    }

    #[test]
    fn gnomonic_keeps_centroid_near_origin() {
        let pts = vec![
            LatLng::from_degrees(52.0, 4.0),
            LatLng::from_degrees(52.1, 4.1),
            LatLng::from_degrees(52.0, 4.2),
            LatLng::from_degrees(51.9, 4.1),
        ];
        let xyz: Vec<_> = pts.iter().map(|&p| latlng_to_xyz(p)).collect();
        let xy = gnomonic_projection(&pts, &xyz);
        let cx: f64 = xy.iter().map(|p| p[0]).sum::<f64>() / xy.len() as f64;
        let cy: f64 = xy.iter().map(|p| p[1]).sum::<f64>() / xy.len() as f64;
        assert!(cx.abs() < 1e-3 && cy.abs() < 1e-3, "centroid ({}, {})", cx, cy);
    }

    #[test]
    fn gnomonic_preserves_north() {
        // A point due north of the rest should project to positive y.
        let pts = vec![
            LatLng::from_degrees(50.0, 10.0),
            LatLng::from_degrees(50.001, 10.0),
            LatLng::from_degrees(49.999, 10.0),
        ];
        let xyz: Vec<_> = pts.iter().map(|&p| latlng_to_xyz(p)).collect();
        let xy = gnomonic_projection(&pts, &xyz);
        assert!(xy[1][1] > xy[2][1]);
    }

    #[test]
    fn hull_of_square_with_interior_point() {
        let pts = vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
            [0.5, 0.5],
        ];
        let mut hull = convex_hull_boundary(&pts);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&4));
        // rotation-invariant comparison
        let min_pos = hull
            .iter()
            .position(|&i| i == *hull.iter().min().unwrap())
            .unwrap();
        hull.rotate_left(min_pos);
        // Traversal direction depends on the seed pair; accept either cycle.
        assert!(hull == vec![0, 1, 2, 3] || hull == vec![0, 3, 2, 1]);
    }

    #[test]
    fn hull_of_pentagon_is_all_points() {
        let pts: Vec<[f64; 2]> = (0..5)
            .map(|i| {
                let t = i as f64 * std::f64::consts::TAU / 5.0;
                [t.cos(), t.sin()]
            })
            .collect();
        let hull = convex_hull_boundary(&pts);
        assert_eq!(hull.len(), 5);
    }

    #[test]
    fn max_pairwise_arc_flags_wide_inputs() {
        let near = vec![
            LatLng::from_degrees(0.0, 0.0),
            LatLng::from_degrees(0.0, 1.0),
            LatLng::from_degrees(1.0, 0.0),
        ];
        assert!(max_pairwise_arc(&near) < std::f64::consts::FRAC_PI_2);

        let wide = vec![
            LatLng::from_degrees(0.0, 0.0),
            LatLng::from_degrees(0.0, 120.0),
        ];
        assert!(max_pairwise_arc(&wide) > std::f64::consts::FRAC_PI_2);
    }
}

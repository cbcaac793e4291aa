//! Bézier approximation of elliptical arcs.
//!
//! Angles grow counterclockwise in user space. Every arc is split into
//! segments of at most 90 degrees, each drawn as one cubic curve.

use crate::utils::Point;
use std::f64::consts::PI;

/// One cubic segment: start point, two control points, end point.
pub type BezierSegment = [Point; 4];

/// Segments of the arc of the ellipse inscribed in the box `(x1, y1)`-`(x2, y2)`,
/// starting at `start_angle` degrees and sweeping `extent` degrees.
pub fn bezier_arc(x1: f64, y1: f64, x2: f64, y2: f64, start_angle: f64, extent: f64) -> Vec<BezierSegment> {
    let (x1, x2) = if x1 > x2 { (x2, x1) } else { (x1, x2) };
    let (y1, y2) = if y2 > y1 { (y2, y1) } else { (y1, y2) };
    let (nfrag, frag) = if extent.abs() <= 90.0 {
        (1, extent)
    } else {
        let n = (extent.abs() / 90.0).ceil() as usize;
        (n, extent / n as f64)
    };
    if frag == 0.0 {
        return Vec::new();
    }
    let xcen = (x1 + x2) / 2.0;
    let ycen = (y1 + y2) / 2.0;
    let rx = (x2 - x1) / 2.0;
    // y1 >= y2 here, so ry <= 0 and the arc runs counterclockwise
    let ry = (y2 - y1) / 2.0;
    let half = frag * PI / 360.0;
    let kappa = (4.0 / 3.0 * (1.0 - half.cos()) / half.sin()).abs();
    let sign = frag.signum();

    (0..nfrag)
        .map(|i| {
            let theta0 = (start_angle + i as f64 * frag).to_radians();
            let theta1 = (start_angle + (i + 1) as f64 * frag).to_radians();
            let (sin0, cos0) = theta0.sin_cos();
            let (sin1, cos1) = theta1.sin_cos();
            let k = kappa * sign;
            [
                (xcen + rx * cos0, ycen - ry * sin0),
                (xcen + rx * (cos0 - k * sin0), ycen - ry * (sin0 + k * cos0)),
                (xcen + rx * (cos1 + k * sin1), ycen - ry * (sin1 - k * cos1)),
                (xcen + rx * cos1, ycen - ry * sin1),
            ]
        })
        .collect()
}

/// Segments of an SVG-style arc from `start` to `end`.
///
/// `rotation` is the x-axis rotation of the ellipse in degrees. Returns `None`
/// when a radius is zero and the arc degrades to a straight line; an arc whose
/// end points coincide has no segments.
pub fn endpoint_arc(
    start: Point,
    (rx, ry): (f64, f64),
    rotation: f64,
    large_arc: bool,
    sweep: bool,
    end: Point,
) -> Option<Vec<BezierSegment>> {
    if start == end {
        return Some(Vec::new());
    }
    let (mut rx, mut ry) = (rx.abs(), ry.abs());
    if rx == 0.0 || ry == 0.0 {
        return None;
    }
    let (sin_phi, cos_phi) = rotation.to_radians().sin_cos();
    let dx = (start.0 - end.0) / 2.0;
    let dy = (start.1 - end.1) / 2.0;
    let x1p = cos_phi * dx + sin_phi * dy;
    let y1p = -sin_phi * dx + cos_phi * dy;

    // scale radii up when they cannot reach the end point
    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        rx *= lambda.sqrt();
        ry *= lambda.sqrt();
    }

    let num = rx * rx * ry * ry - rx * rx * y1p * y1p - ry * ry * x1p * x1p;
    let den = rx * rx * y1p * y1p + ry * ry * x1p * x1p;
    let mut coef = (num / den).max(0.0).sqrt();
    if large_arc == sweep {
        coef = -coef;
    }
    let cxp = coef * rx * y1p / ry;
    let cyp = -coef * ry * x1p / rx;
    let cx = cos_phi * cxp - sin_phi * cyp + (start.0 + end.0) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (start.1 + end.1) / 2.0;

    let theta1 = ((y1p - cyp) / ry).atan2((x1p - cxp) / rx);
    let theta2 = ((-y1p - cyp) / ry).atan2((-x1p - cxp) / rx);
    let mut dtheta = theta2 - theta1;
    if !sweep && dtheta > 0.0 {
        dtheta -= 2.0 * PI;
    } else if sweep && dtheta < 0.0 {
        dtheta += 2.0 * PI;
    }

    let nseg = (dtheta.abs() / (PI / 2.0)).ceil().max(1.0) as usize;
    let step = dtheta / nseg as f64;
    let alpha = 4.0 / 3.0 * (step / 4.0).tan();
    let map = |ux: f64, uy: f64| -> Point {
        (
            cx + rx * cos_phi * ux - ry * sin_phi * uy,
            cy + rx * sin_phi * ux + ry * cos_phi * uy,
        )
    };

    let mut segments = Vec::with_capacity(nseg);
    for i in 0..nseg {
        let a = theta1 + i as f64 * step;
        let b = a + step;
        let (sin_a, cos_a) = a.sin_cos();
        let (sin_b, cos_b) = b.sin_cos();
        segments.push([
            map(cos_a, sin_a),
            map(cos_a - alpha * sin_a, sin_a + alpha * cos_a),
            map(cos_b + alpha * sin_b, sin_b - alpha * cos_b),
            map(cos_b, sin_b),
        ]);
    }
    // land exactly on the requested end point
    if let Some(last) = segments.last_mut() {
        last[3] = end;
    }
    Some(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn test_full_circle_has_four_segments() {
        let segments = bezier_arc(-1.0, -1.0, 1.0, 1.0, 0.0, 360.0);
        assert_eq!(segments.len(), 4);
        assert!(close(segments[0][0], (1.0, 0.0)));
        // counterclockwise: first quarter ends at the top
        assert!(close(segments[0][3], (0.0, 1.0)));
        assert!(close(segments[3][3], (1.0, 0.0)));
    }

    #[test]
    fn test_small_extent_is_one_segment() {
        let segments = bezier_arc(0.0, 0.0, 10.0, 10.0, 0.0, -45.0);
        assert_eq!(segments.len(), 1);
        let end = segments[0][3];
        let expected = (5.0 + 5.0 * (-45f64).to_radians().cos(), 5.0 + 5.0 * (-45f64).to_radians().sin());
        assert!(close(end, expected));
    }

    #[test]
    fn test_endpoint_arc_half_circle() {
        let segments = endpoint_arc((0.0, 0.0), (5.0, 5.0), 0.0, false, true, (10.0, 0.0)).unwrap();
        assert_eq!(segments.len(), 2);
        assert!(close(segments[0][0], (0.0, 0.0)));
        assert_eq!(segments[1][3], (10.0, 0.0));
        // sweep=true from the left end runs through the bottom in y-up terms
        assert!(close(segments[0][3], (5.0, -5.0)));
    }

    #[test]
    fn test_zero_radius_degrades_to_line() {
        assert!(endpoint_arc((0.0, 0.0), (0.0, 5.0), 0.0, false, true, (10.0, 0.0)).is_none());
    }
}

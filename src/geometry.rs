//! 2D geometry helpers shared by generation, path search and the simulation.

use bevy::prelude::*;

/// Where two road segments cross.
///
/// The factors are parametric positions along each segment: values in
/// `[0, 1]` fall within the segment, values outside describe where an
/// extension of the segment would meet the other one.
#[derive(Clone, Copy, Debug)]
pub struct Intersection {
    pub point: Vec2,
    /// Position of the crossing along the segment being tested.
    pub main_factor: f32,
    /// Position of the crossing along the other segment.
    pub other_factor: f32,
}

/// Intersect the line through `a_start..a_end` with the segment
/// `b_start..b_end`.
///
/// Returns `None` for parallel lines, or when the crossing falls outside
/// the other segment's extent. `main_factor` is left unclamped so callers
/// can detect near-miss crossings beyond the first segment's end.
pub fn find_intersect(a_start: Vec2, a_end: Vec2, b_start: Vec2, b_end: Vec2) -> Option<Intersection> {
    let r = a_end - a_start;
    let s = b_end - b_start;

    let denom = r.perp_dot(s);
    if denom.abs() < f32::EPSILON {
        return None;
    }

    let qp = b_start - a_start;
    let main_factor = qp.perp_dot(s) / denom;
    let other_factor = qp.perp_dot(r) / denom;

    if !(0.0..=1.0).contains(&other_factor) {
        return None;
    }

    Some(Intersection {
        point: a_start + r * main_factor,
        main_factor,
        other_factor,
    })
}

/// Smallest angle between two headings, ignoring direction of travel.
///
/// Headings are in degrees; the result is in `[0, 90]`.
pub fn min_angle_difference(h1: f32, h2: f32) -> f32 {
    let diff = (h1 - h2).abs() % 180.0;
    diff.min(180.0 - diff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_in_both_extents_yields_interior_factors() {
        let inter = find_intersect(
            Vec2::new(0.0, -10.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(-10.0, 0.0),
            Vec2::new(10.0, 0.0),
        )
        .expect("perpendicular segments must cross");

        assert!((inter.point - Vec2::ZERO).length() < 1e-5);
        assert!((inter.main_factor - 0.5).abs() < 1e-5);
        assert!((inter.other_factor - 0.5).abs() < 1e-5);
    }

    #[test]
    fn crossing_beyond_main_extent_reports_factor_above_one() {
        let inter = find_intersect(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(20.0, -5.0),
            Vec2::new(20.0, 5.0),
        )
        .expect("extension crossing expected");

        assert!((inter.main_factor - 2.0).abs() < 1e-5);
        assert!((inter.other_factor - 0.5).abs() < 1e-5);
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        let inter = find_intersect(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 5.0),
            Vec2::new(10.0, 5.0),
        );
        assert!(inter.is_none());
    }

    #[test]
    fn miss_outside_other_extent_is_rejected() {
        let inter = find_intersect(
            Vec2::new(0.0, -10.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(5.0, 0.0),
            Vec2::new(15.0, 0.0),
        );
        assert!(inter.is_none());
    }

    #[test]
    fn angle_difference_wraps_and_ignores_direction() {
        assert!((min_angle_difference(0.0, 90.0) - 90.0).abs() < 1e-5);
        assert!((min_angle_difference(0.0, 180.0)).abs() < 1e-5);
        assert!((min_angle_difference(350.0, 10.0) - 20.0).abs() < 1e-5);
        assert!((min_angle_difference(-15.0, 15.0) - 30.0).abs() < 1e-5);
    }
}

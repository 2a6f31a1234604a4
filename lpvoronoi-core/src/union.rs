//! Polygon boolean union as an injected capability.
//!
//! The grid sampling engine only needs "merge these polygons into one". The
//! default implementation delegates to `i_overlay`; any other boolean-ops
//! library can be plugged in through [`PolygonUnion`].

use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;

use crate::geometry::polygon_area;
use crate::{Polygon, Position, Result, VoronoiError};

pub trait PolygonUnion: Sync {
    /// Boolean OR of two simple polygons, as a single outer ring.
    fn union(&self, a: &[Position], b: &[Position]) -> Result<Polygon>;

    /// Union of many polygons. The default merges one polygon at a time.
    fn union_all(&self, polygons: &[Polygon]) -> Result<Polygon> {
        let (first, rest) = polygons
            .split_first()
            .ok_or_else(|| VoronoiError::UnionFailure("no polygons to union".into()))?;
        rest.iter()
            .try_fold(first.clone(), |acc, p| self.union(&acc, p))
    }
}

/// [`PolygonUnion`] backed by `i_overlay`
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayUnion;

impl OverlayUnion {
    pub fn new() -> Self {
        Self
    }

    fn to_contour(polygon: &[Position]) -> Vec<[f64; 2]> {
        polygon.iter().map(|p| [p.x, p.y]).collect()
    }

    /// Largest outer contour of the overlay result, counter-clockwise.
    fn largest_outer(shapes: Vec<Vec<Vec<[f64; 2]>>>) -> Result<Polygon> {
        let best = shapes
            .into_iter()
            .filter_map(|shape| shape.into_iter().next())
            .map(|contour| contour.into_iter().map(|[x, y]| Position::new(x, y)).collect::<Polygon>())
            .filter(|ring| ring.len() >= 3)
            .max_by(|a, b| polygon_area(a).abs().total_cmp(&polygon_area(b).abs()));

        let mut ring = best.ok_or_else(|| VoronoiError::UnionFailure("empty overlay result".into()))?;
        let area = polygon_area(&ring);
        if area.abs() < f64::EPSILON {
            return Err(VoronoiError::UnionFailure("degenerate overlay result".into()));
        }
        if area < 0.0 {
            ring.reverse();
        }
        Ok(ring)
    }
}

impl PolygonUnion for OverlayUnion {
    fn union(&self, a: &[Position], b: &[Position]) -> Result<Polygon> {
        let subject = vec![Self::to_contour(a)];
        let clip = vec![Self::to_contour(b)];
        let shapes = subject.overlay(&clip, OverlayRule::Union, FillRule::NonZero);
        Self::largest_outer(shapes)
    }

    /// All polygons go into one overlay as subject contours; the non-zero fill
    /// merges touching and overlapping pieces in a single pass.
    fn union_all(&self, polygons: &[Polygon]) -> Result<Polygon> {
        if polygons.is_empty() {
            return Err(VoronoiError::UnionFailure("no polygons to union".into()));
        }
        let subject: Vec<Vec<[f64; 2]>> = polygons.iter().map(|p| Self::to_contour(p)).collect();
        let clip: Vec<Vec<[f64; 2]>> = Vec::new();
        let shapes = subject.overlay(&clip, OverlayRule::Union, FillRule::NonZero);
        Self::largest_outer(shapes)
    }
}

//! Site, position and domain types.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{Result, VoronoiError};

/// 2D position
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared distance to another position
    pub fn dist_sq(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another position
    pub fn dist(&self, other: &Position) -> f64 {
        self.dist_sq(other).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A Voronoi site. Identity is `id`; two sites may share coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Site {
    pub id: i64,
    pub x: f64,
    pub y: f64,
}

impl Site {
    pub fn new(id: i64, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }

    pub fn pos(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Axis-aligned rectangular domain. `top < bottom`: y grows downward.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Bounds {
    pub fn new(left: f64, right: f64, top: f64, bottom: f64) -> Self {
        Self { left, right, top, bottom }
    }

    /// Bounds `[0, width] x [0, height]`
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, width, 0.0, height)
    }

    pub fn validate(&self) -> Result<()> {
        let finite = [self.left, self.right, self.top, self.bottom]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(VoronoiError::InvalidBounds(format!("non-finite edge in {:?}", self)));
        }
        if self.left >= self.right {
            return Err(VoronoiError::InvalidBounds(format!(
                "left ({}) must be less than right ({})",
                self.left, self.right
            )));
        }
        if self.top >= self.bottom {
            return Err(VoronoiError::InvalidBounds(format!(
                "top ({}) must be less than bottom ({})",
                self.top, self.bottom
            )));
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// The four corners, counter-clockwise in the `(x, y)` plane.
    pub fn corners(&self) -> Vec<Position> {
        vec![
            Position::new(self.left, self.top),
            Position::new(self.right, self.top),
            Position::new(self.right, self.bottom),
            Position::new(self.left, self.bottom),
        ]
    }

    pub fn contains(&self, p: &Position, eps: f64) -> bool {
        p.x >= self.left - eps
            && p.x <= self.right + eps
            && p.y >= self.top - eps
            && p.y <= self.bottom + eps
    }
}

/// Ordered collection of sites, used as the batch input of one computation.
#[derive(Debug, Clone, Default)]
pub struct SiteSet {
    pub sites: Vec<Site>,
}

impl SiteSet {
    pub fn new(sites: Vec<Site>) -> Self {
        Self { sites }
    }

    /// Sites numbered `0..n` from plain positions
    pub fn from_positions(positions: &[Position]) -> Self {
        let sites = positions
            .iter()
            .enumerate()
            .map(|(i, p)| Site::new(i as i64, p.x, p.y))
            .collect();
        Self::new(sites)
    }

    /// Create sites at uniformly random positions inside `bounds`.
    /// The same seed always yields the same sites.
    pub fn random(count: usize, bounds: &Bounds, seed: u64) -> Result<Self> {
        bounds.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let sites = (0..count)
            .map(|i| {
                Site::new(
                    i as i64,
                    rng.gen_range(bounds.left..bounds.right),
                    rng.gen_range(bounds.top..bounds.bottom),
                )
            })
            .collect();
        Ok(Self::new(sites))
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn as_slice(&self) -> &[Site] {
        &self.sites
    }

    /// Get positions (for plotting or nearest-site queries)
    pub fn positions(&self) -> Vec<Position> {
        self.sites.iter().map(|s| s.pos()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_validation() {
        assert!(Bounds::new(0.0, 10.0, 0.0, 5.0).validate().is_ok());
        assert!(matches!(
            Bounds::new(10.0, 10.0, 0.0, 5.0).validate(),
            Err(VoronoiError::InvalidBounds(_))
        ));
        assert!(matches!(
            Bounds::new(0.0, 10.0, 5.0, 1.0).validate(),
            Err(VoronoiError::InvalidBounds(_))
        ));
        assert!(Bounds::new(0.0, f64::NAN, 0.0, 1.0).validate().is_err());
    }

    #[test]
    fn test_corners_are_counter_clockwise() {
        let corners = Bounds::new(-1.0, 3.0, 2.0, 4.0).corners();
        assert_eq!(corners.len(), 4);
        let signed: f64 = (0..4)
            .map(|i| {
                let a = corners[i];
                let b = corners[(i + 1) % 4];
                a.x * b.y - b.x * a.y
            })
            .sum::<f64>()
            * 0.5;
        assert!((signed - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_random_is_seeded_and_inside() {
        let bounds = Bounds::new(-5.0, 5.0, 10.0, 20.0);
        let a = SiteSet::random(50, &bounds, 7).unwrap();
        let b = SiteSet::random(50, &bounds, 7).unwrap();
        let c = SiteSet::random(50, &bounds, 8).unwrap();
        assert_eq!(a.sites, b.sites);
        assert_ne!(a.sites, c.sites);
        for (i, site) in a.sites.iter().enumerate() {
            assert_eq!(site.id, i as i64);
            assert!(bounds.contains(&site.pos(), 0.0));
        }
    }

    #[test]
    fn test_random_rejects_invalid_bounds() {
        assert!(matches!(
            SiteSet::random(3, &Bounds::new(5.0, 1.0, 0.0, 1.0), 1),
            Err(VoronoiError::InvalidBounds(_))
        ));
        assert!(SiteSet::random(3, &Bounds::new(0.0, 1.0, 2.0, 2.0), 1).is_err());
        assert!(SiteSet::random(0, &Bounds::new(0.0, 1.0, f64::NAN, 2.0), 1).is_err());
    }
}

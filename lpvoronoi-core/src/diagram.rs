//! Diagram result types and the engine trait.

use std::collections::HashSet;

use crate::geometry::{point_in_polygon, polygon_area, polygon_centroid};
use crate::{Bounds, Metric, Polygon, Position, Result, Site, VoronoiError};

/// One site's region of the domain
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub site: Site,
    /// Simple polygon, consistently oriented, no closing duplicate vertex
    pub region: Polygon,
}

impl Cell {
    pub fn new(site: Site, region: Polygon) -> Self {
        Self { site, region }
    }

    /// Unsigned area of the region
    pub fn area(&self) -> f64 {
        polygon_area(&self.region).abs()
    }

    pub fn centroid(&self) -> Option<Position> {
        polygon_centroid(&self.region)
    }

    pub fn contains(&self, p: &Position) -> bool {
        point_in_polygon(p, &self.region)
    }
}

/// Result of one computation: cells in input-site order.
/// Sites that own no area have no cell.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagram {
    pub cells: Vec<Cell>,
}

impl Diagram {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// The whole domain as a single cell.
    pub(crate) fn single(site: Site, bounds: &Bounds) -> Self {
        Self::new(vec![Cell::new(site, bounds.corners())])
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cell> {
        self.cells.iter()
    }

    pub fn cell_for(&self, id: i64) -> Option<&Cell> {
        self.cells.iter().find(|c| c.site.id == id)
    }

    pub fn total_area(&self) -> f64 {
        self.cells.iter().map(Cell::area).sum()
    }
}

impl IntoIterator for Diagram {
    type Item = Cell;
    type IntoIter = std::vec::IntoIter<Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.into_iter()
    }
}

/// Input shared by every engine.
#[derive(Debug, Clone, Copy)]
pub struct DiagramInput<'a> {
    pub sites: &'a [Site],
    pub bounds: Bounds,
    pub metric: Metric,
    /// Grid side length for the approximate engines; `None` derives one from `bounds`.
    pub resolution: Option<u32>,
}

impl<'a> DiagramInput<'a> {
    pub fn new(sites: &'a [Site], bounds: Bounds) -> Self {
        Self {
            sites,
            bounds,
            metric: Metric::Euclidean,
            resolution: None,
        }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_resolution(mut self, resolution: Option<u32>) -> Self {
        self.resolution = resolution;
        self
    }

    /// Reject inputs that make the whole call meaningless.
    pub fn validate(&self) -> Result<()> {
        self.bounds.validate()?;
        self.metric.validate()?;
        if let Some(0) = self.resolution {
            return Err(VoronoiError::InvalidResolution(0));
        }
        let mut ids = HashSet::with_capacity(self.sites.len());
        for site in self.sites {
            if !site.pos().is_finite() {
                return Err(VoronoiError::InvalidSite {
                    id: site.id,
                    reason: format!("non-finite position ({}, {})", site.x, site.y),
                });
            }
            if !ids.insert(site.id) {
                return Err(VoronoiError::InvalidSite {
                    id: site.id,
                    reason: "duplicate id".into(),
                });
            }
        }
        Ok(())
    }
}

/// Trait for Voronoi computation engines
pub trait ComputeEngine {
    fn name(&self) -> &'static str;

    /// Compute the diagram for `input`. Each call owns all of its working buffers.
    fn compute(&mut self, input: &DiagramInput<'_>) -> Result<Diagram>;
}

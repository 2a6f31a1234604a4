//! Exact Euclidean Voronoi cells by iterative half-plane clipping.
//!
//! Every site starts from the bounding rectangle and is clipped by the
//! perpendicular bisector against every other site. Sites are independent,
//! so they are processed in parallel; the clips for one site are sequential.
//! Only `p = 2` has straight bisectors, so this engine rejects other metrics.

use log::debug;

use crate::diagram::{ComputeEngine, DiagramInput};
use crate::geometry::{clip_polygon_with_half_plane, HalfPlane};
use crate::parallel::map_range;
use crate::{Bounds, Cell, Diagram, Polygon, Result, Site, VoronoiError};

#[derive(Debug, Clone, Copy, Default)]
pub struct HalfPlaneEngine;

impl HalfPlaneEngine {
    pub fn new() -> Self {
        Self
    }

    /// Exact Euclidean diagram of `sites` clipped to `bounds`.
    pub fn compute_euclidean(&self, sites: &[Site], bounds: &Bounds) -> Result<Diagram> {
        bounds.validate()?;
        match sites {
            [] => return Ok(Diagram::default()),
            [only] => return Ok(Diagram::single(*only, bounds)),
            _ => {}
        }

        let corners = bounds.corners();
        let regions: Vec<Option<Polygon>> =
            map_range(sites.len(), |i| Self::clip_cell(i, sites, &corners));

        let cells: Vec<Cell> = sites
            .iter()
            .zip(regions)
            .filter_map(|(site, region)| region.map(|r| Cell::new(*site, r)))
            .collect();

        debug!(
            "half-plane: {} sites -> {} cells",
            sites.len(),
            cells.len()
        );
        Ok(Diagram::new(cells))
    }

    fn clip_cell(index: usize, sites: &[Site], corners: &[crate::Position]) -> Option<Polygon> {
        let s = sites[index].pos();
        let mut region = corners.to_vec();
        for (j, other) in sites.iter().enumerate() {
            if j == index {
                continue;
            }
            let plane = HalfPlane::bisector(&s, &other.pos());
            region = clip_polygon_with_half_plane(&region, &plane);
            if region.len() < 3 {
                // Nothing left to clip
                return None;
            }
        }
        Some(region)
    }
}

impl ComputeEngine for HalfPlaneEngine {
    fn name(&self) -> &'static str {
        "half-plane"
    }

    fn compute(&mut self, input: &DiagramInput<'_>) -> Result<Diagram> {
        input.validate()?;
        if !input.metric.is_euclidean() {
            return Err(VoronoiError::UnsupportedMetric {
                engine: self.name(),
                p: input.metric.p(),
            });
        }
        self.compute_euclidean(input.sites, &input.bounds)
    }
}

//! Brute-force Voronoi cells: classify grid cell centres by nearest site, then
//! union each site's grid rectangles into one polygon.
//!
//! O(resolution^2 * sites), with no flood machinery. Also the simplest
//! reference to check the other engines against.

use log::{debug, warn};

use crate::diagram::{ComputeEngine, DiagramInput};
use crate::geometry::polygon_area;
use crate::grid::{default_resolution, GridMapping};
use crate::parallel::map_range;
use crate::union::{OverlayUnion, PolygonUnion};
use crate::{Cell, Diagram, Metric, Polygon, Result, Site};

/// Grid sampling + union engine over an injected [`PolygonUnion`].
pub struct GridUnionEngine<U: PolygonUnion = OverlayUnion> {
    union: U,
}

impl Default for GridUnionEngine<OverlayUnion> {
    fn default() -> Self {
        Self::new(OverlayUnion::new())
    }
}

impl<U: PolygonUnion> GridUnionEngine<U> {
    pub fn new(union: U) -> Self {
        Self { union }
    }

    /// Index of the nearest site to the centre of cell `(i, j)`.
    /// Distances are in cell widths, like the flood engine; ties keep the lower index.
    #[inline]
    fn nearest(sites: &[(f64, f64)], metric: &Metric, aspect: f64, i: u32, j: u32) -> usize {
        let cx = i as f64 + 0.5;
        let cy = j as f64 + 0.5;
        let mut best = 0;
        let mut best_cost = f64::INFINITY;
        for (k, &(sx, sy)) in sites.iter().enumerate() {
            let c = metric.cost(sx - cx, (sy - cy) * aspect);
            if c < best_cost {
                best = k;
                best_cost = c;
            }
        }
        best
    }

    /// Owner index for every cell, row-major.
    pub fn classify(&self, mapping: &GridMapping, sites: &[Site], metric: &Metric) -> Vec<usize> {
        let res = mapping.resolution;
        let aspect = mapping.aspect();
        let grid_sites: Vec<(f64, f64)> = sites.iter().map(|s| mapping.to_grid(&s.pos())).collect();
        let rows: Vec<Vec<usize>> = map_range(res as usize, |j| {
            (0..res)
                .map(|i| Self::nearest(&grid_sites, metric, aspect, i, j as u32))
                .collect()
        });
        rows.into_iter().flatten().collect()
    }

    /// Same-owner runs of each row as world rectangles, grouped by owner.
    fn strips(mapping: &GridMapping, owners: &[usize], num_sites: usize) -> Vec<Vec<Polygon>> {
        let res = mapping.resolution as usize;
        let mut per_site: Vec<Vec<Polygon>> = vec![Vec::new(); num_sites];
        for (j, row) in owners.chunks(res).enumerate() {
            let mut start = 0;
            while start < res {
                let owner = row[start];
                let mut end = start + 1;
                while end < res && row[end] == owner {
                    end += 1;
                }
                per_site[owner].push(mapping.strip(start as u32, end as u32, j as u32));
                start = end;
            }
        }
        per_site
    }

    fn merge_site(&self, site: &Site, strips: &[Polygon]) -> Option<Polygon> {
        if strips.is_empty() {
            return None;
        }
        match self.union.union_all(strips) {
            Ok(region) if region.len() >= 3 => Some(region),
            outcome => {
                match outcome {
                    Err(e) => warn!("grid-union: site {}: {}; using largest rectangle", site.id, e),
                    Ok(_) => warn!("grid-union: site {}: degenerate union; using largest rectangle", site.id),
                }
                strips
                    .iter()
                    .max_by(|a, b| polygon_area(a).abs().total_cmp(&polygon_area(b).abs()))
                    .cloned()
            }
        }
    }
}

impl<U: PolygonUnion> ComputeEngine for GridUnionEngine<U> {
    fn name(&self) -> &'static str {
        "grid-union"
    }

    fn compute(&mut self, input: &DiagramInput<'_>) -> Result<Diagram> {
        input.validate()?;
        let sites = input.sites;
        match sites {
            [] => return Ok(Diagram::default()),
            [only] => return Ok(Diagram::single(*only, &input.bounds)),
            _ => {}
        }

        let resolution = input
            .resolution
            .unwrap_or_else(|| default_resolution(&input.bounds));
        let mapping = GridMapping::new(input.bounds, resolution)?;

        let owners = self.classify(&mapping, sites, &input.metric);
        let per_site = Self::strips(&mapping, &owners, sites.len());
        drop(owners);

        debug!(
            "grid-union: {} sites, {}x{} grid, {} strips, p = {}",
            sites.len(),
            resolution,
            resolution,
            per_site.iter().map(Vec::len).sum::<usize>(),
            input.metric
        );

        let regions: Vec<Option<Polygon>> =
            map_range(sites.len(), |k| self.merge_site(&sites[k], &per_site[k]));

        let cells = sites
            .iter()
            .zip(regions)
            .filter_map(|(site, region)| region.map(|r| Cell::new(*site, r)))
            .collect();
        Ok(Diagram::new(cells))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bounds, HalfPlaneEngine, Position, SiteSet, VoronoiError};

    fn nearest_site(sites: &[Site], metric: &Metric, p: &Position) -> Option<usize> {
        sites
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                metric
                    .distance(p, &a.pos())
                    .total_cmp(&metric.distance(p, &b.pos()))
            })
            .map(|(i, _)| i)
    }

    #[test]
    fn test_two_sites_vertical_split() {
        let bounds = Bounds::from_size(10.0, 10.0);
        let sites = [Site::new(0, 0.0, 5.0), Site::new(1, 7.0, 5.0)];
        let d = GridUnionEngine::default()
            .compute(&DiagramInput::new(&sites, bounds).with_resolution(Some(8)))
            .unwrap();
        assert_eq!(d.len(), 2);
        // Centres 0.625, 1.875, 3.125 fall left of x = 3.5
        assert!((d.cell_for(0).unwrap().area() - 37.5).abs() < 1e-6);
        assert!((d.total_area() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_areas_tile_the_domain() {
        let bounds = Bounds::new(-20.0, 20.0, 5.0, 35.0);
        let sites = SiteSet::random(15, &bounds, 77).unwrap();
        for metric in [Metric::Manhattan, Metric::Lp(1.5), Metric::Chebyshev] {
            let d = GridUnionEngine::default()
                .compute(
                    &DiagramInput::new(sites.as_slice(), bounds)
                        .with_metric(metric)
                        .with_resolution(Some(64)),
                )
                .unwrap();
            assert!((d.total_area() - bounds.area()).abs() < 1e-3, "p = {}", metric);
        }
    }

    #[test]
    fn test_classification_matches_nearest_site() {
        let bounds = Bounds::from_size(30.0, 30.0);
        let sites = SiteSet::random(9, &bounds, 13).unwrap();
        let engine = GridUnionEngine::default();
        let mapping = GridMapping::new(bounds, 30).unwrap();
        let metric = Metric::Lp(4.0);
        let owners = engine.classify(&mapping, sites.as_slice(), &metric);
        for j in (0..30).step_by(7) {
            for i in (0..30).step_by(5) {
                let c = mapping.cell_center(i, j);
                let truth = nearest_site(sites.as_slice(), &metric, &c).unwrap();
                let got = owners[(j * 30 + i) as usize];
                let d_truth = metric.distance(&c, &sites.sites[truth].pos());
                let d_got = metric.distance(&c, &sites.sites[got].pos());
                assert!((d_truth - d_got).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_close_to_exact_for_euclidean() {
        let bounds = Bounds::from_size(100.0, 100.0);
        let sites = SiteSet::random(5, &bounds, 8).unwrap();
        let exact = HalfPlaneEngine::new()
            .compute_euclidean(sites.as_slice(), &bounds)
            .unwrap();
        let approx = GridUnionEngine::default()
            .compute(&DiagramInput::new(sites.as_slice(), bounds).with_resolution(Some(200)))
            .unwrap();
        for cell in exact.iter() {
            let a = approx.cell_for(cell.site.id).unwrap();
            assert!((a.area() - cell.area()).abs() / cell.area() < 0.05);
        }
    }

    struct FailingUnion;

    impl PolygonUnion for FailingUnion {
        fn union(&self, _a: &[Position], _b: &[Position]) -> Result<Polygon> {
            Err(VoronoiError::UnionFailure("always fails".into()))
        }
    }

    #[test]
    fn test_union_failure_falls_back_to_largest_rectangle() {
        let bounds = Bounds::from_size(10.0, 10.0);
        let sites = [Site::new(0, 2.0, 5.0), Site::new(1, 8.0, 5.0)];
        let d = GridUnionEngine::new(FailingUnion)
            .compute(&DiagramInput::new(&sites, bounds).with_resolution(Some(10)))
            .unwrap();
        assert_eq!(d.len(), 2);
        // Every row is one 5x1 strip per site
        for cell in d.iter() {
            assert_eq!(cell.region.len(), 4);
            assert!((cell.area() - 5.0).abs() < 1e-9);
        }
    }
}

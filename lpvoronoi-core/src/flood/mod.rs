//! Approximate Voronoi cells for any Lp metric via the jump flooding algorithm.
//!
//! An [`OwnershipGrid`] of nearest-seed records is refined in rounds with
//! geometrically decreasing step sizes, followed by one extra `step = 1`
//! round (JFA+1). Each round reads one buffer and writes the other; how a round
//! is executed is up to the [`FloodBackend`].

mod cpu;
#[cfg(feature = "gpu")]
mod gpu;

pub use cpu::CpuFlood;
#[cfg(feature = "gpu")]
pub use gpu::GpuFlood;

use log::debug;

use crate::boundary::BoundaryExtractor;
use crate::diagram::{ComputeEngine, DiagramInput};
use crate::grid::{default_resolution, GridMapping, OwnershipGrid, SeedRecord};
use crate::{Diagram, Metric, Result};

/// Step sizes for every round: the smallest power of two `>= resolution`,
/// halved down to 1, then one more round at 1.
pub fn step_schedule(resolution: u32) -> Vec<u32> {
    let mut steps = Vec::new();
    let mut step = resolution.max(1).next_power_of_two();
    while step >= 1 {
        steps.push(step);
        step /= 2;
    }
    steps.push(1);
    steps
}

/// Lp cost between a cell centre and a stored seed, measured in cell widths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloodCost {
    pub metric: Metric,
    /// Cell height over cell width
    pub aspect: f64,
}

impl FloodCost {
    pub fn new(metric: Metric, aspect: f64) -> Self {
        Self { metric, aspect }
    }

    /// Cost of `record` seen from cell `(x, y)`; empty records cost +inf.
    #[inline]
    pub fn of(&self, x: u32, y: u32, record: &SeedRecord) -> f64 {
        if record.is_empty() {
            return f64::INFINITY;
        }
        let dx = record.x as f64 - (x as f64 + 0.5);
        let dy = (record.y as f64 - (y as f64 + 0.5)) * self.aspect;
        self.metric.cost(dx, dy)
    }
}

const OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// The per-cell update of one round: best of the cell itself and its 8
/// neighbours at distance `step`. Ties keep the earlier candidate.
#[inline]
pub(crate) fn best_candidate(
    current: &[SeedRecord],
    resolution: u32,
    x: u32,
    y: u32,
    step: u32,
    cost: &FloodCost,
) -> SeedRecord {
    let res = resolution as i64;
    let own = current[y as usize * resolution as usize + x as usize];
    let mut best = own;
    let mut best_cost = cost.of(x, y, &own);

    for (ox, oy) in OFFSETS {
        let nx = x as i64 + ox * step as i64;
        let ny = y as i64 + oy * step as i64;
        if nx < 0 || ny < 0 || nx >= res || ny >= res {
            continue;
        }
        let candidate = current[(ny * res + nx) as usize];
        let c = cost.of(x, y, &candidate);
        if c < best_cost {
            best = candidate;
            best_cost = c;
        }
    }
    best
}

/// Executes the flooding rounds over an ownership grid.
pub trait FloodBackend {
    fn name(&self) -> &'static str;

    /// Run one round per entry of `steps`, in order, and return the final grid.
    fn flood(&mut self, grid: OwnershipGrid, steps: &[u32], cost: &FloodCost)
        -> Result<OwnershipGrid>;
}

/// Jump flooding engine over a pluggable [`FloodBackend`].
pub struct JumpFloodEngine<B: FloodBackend = CpuFlood> {
    backend: B,
    extractor: BoundaryExtractor,
}

impl Default for JumpFloodEngine<CpuFlood> {
    fn default() -> Self {
        Self::new(CpuFlood::new())
    }
}

impl<B: FloodBackend> JumpFloodEngine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            extractor: BoundaryExtractor::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Flood the seeded grid and return the final ownership grid with its mapping.
    pub fn ownership(&mut self, input: &DiagramInput<'_>) -> Result<(OwnershipGrid, GridMapping)> {
        let resolution = input
            .resolution
            .unwrap_or_else(|| default_resolution(&input.bounds));
        let mapping = GridMapping::new(input.bounds, resolution)?;
        let cost = FloodCost::new(input.metric, mapping.aspect());
        let seeded = OwnershipGrid::seeded(&mapping, input.sites, &cost);
        let steps = step_schedule(resolution);

        debug!(
            "jump-flood[{}]: {} sites, {}x{} grid, {} rounds, p = {}",
            self.backend.name(),
            input.sites.len(),
            resolution,
            resolution,
            steps.len(),
            input.metric
        );

        let grid = self.backend.flood(seeded, &steps, &cost)?;
        Ok((grid, mapping))
    }
}

impl<B: FloodBackend> ComputeEngine for JumpFloodEngine<B> {
    fn name(&self) -> &'static str {
        "jump-flood"
    }

    fn compute(&mut self, input: &DiagramInput<'_>) -> Result<Diagram> {
        input.validate()?;
        match input.sites {
            [] => return Ok(Diagram::default()),
            [only] => return Ok(Diagram::single(*only, &input.bounds)),
            _ => {}
        }
        let (grid, mapping) = self.ownership(input)?;
        Ok(self.extractor.extract(&grid, &mapping, input.sites))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bounds, HalfPlaneEngine, Position, Site, SiteSet};

    #[test]
    fn test_step_schedule() {
        assert_eq!(step_schedule(8), vec![8, 4, 2, 1, 1]);
        assert_eq!(step_schedule(100), vec![128, 64, 32, 16, 8, 4, 2, 1, 1]);
        assert_eq!(step_schedule(1), vec![1, 1]);
    }

    #[test]
    fn test_empty_candidates_cost_infinity() {
        let cost = FloodCost::new(Metric::Euclidean, 1.0);
        assert_eq!(cost.of(0, 0, &SeedRecord::EMPTY), f64::INFINITY);
        let r = SeedRecord { x: 3.5, y: 4.5, index: 0 };
        assert!((cost.of(0, 0, &r) - 5.0).abs() < 1e-6);
        let tall = FloodCost::new(Metric::Manhattan, 2.0);
        assert!((tall.of(0, 0, &r) - 11.0).abs() < 1e-6);
    }

    #[test]
    fn test_every_cell_gets_an_owner() {
        let bounds = Bounds::from_size(50.0, 30.0);
        let sites = SiteSet::random(20, &bounds, 9).unwrap();
        let input = DiagramInput::new(sites.as_slice(), bounds).with_resolution(Some(64));
        let mut engine = JumpFloodEngine::default();
        let (grid, _) = engine.ownership(&input).unwrap();
        assert!(grid.records.iter().all(|r| !r.is_empty()));
    }

    #[test]
    fn test_ownership_matches_brute_force_for_euclidean() {
        let bounds = Bounds::from_size(64.0, 64.0);
        let sites = SiteSet::random(12, &bounds, 21).unwrap();
        let input = DiagramInput::new(sites.as_slice(), bounds).with_resolution(Some(64));
        let (grid, mapping) = JumpFloodEngine::default().ownership(&input).unwrap();

        let mut wrong = 0;
        for y in 0..64 {
            for x in 0..64 {
                let c = mapping.cell_center(x, y);
                let truth = sites
                    .sites
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| c.dist(&a.pos()).total_cmp(&c.dist(&b.pos())))
                    .map(|(i, _)| i as i32)
                    .unwrap();
                let owner = grid.get(x, y).index;
                if owner != truth {
                    let got = c.dist(&sites.sites[owner as usize].pos());
                    let best = c.dist(&sites.sites[truth as usize].pos());
                    // JFA+1 may only disagree on near-ties
                    if got - best > 1e-3 {
                        wrong += 1;
                    }
                }
            }
        }
        assert!(wrong <= 4, "{} cells assigned to a clearly farther seed", wrong);
    }

    #[test]
    fn test_single_and_empty_inputs() {
        let bounds = Bounds::new(1.0, 3.0, -2.0, 5.0);
        let mut engine = JumpFloodEngine::default();
        let empty = engine.compute(&DiagramInput::new(&[], bounds)).unwrap();
        assert!(empty.is_empty());

        let one = [Site::new(7, 2.0, 0.0)];
        for metric in [Metric::Manhattan, Metric::Lp(3.0), Metric::Chebyshev] {
            let d = engine
                .compute(&DiagramInput::new(&one, bounds).with_metric(metric))
                .unwrap();
            assert_eq!(d.len(), 1);
            assert_eq!(d.cells[0].region, bounds.corners());
        }
    }

    #[test]
    fn test_areas_close_to_exact() {
        let bounds = Bounds::from_size(100.0, 100.0);
        let sites = SiteSet::random(6, &bounds, 2).unwrap();
        let exact = HalfPlaneEngine::new()
            .compute_euclidean(sites.as_slice(), &bounds)
            .unwrap();
        let approx = JumpFloodEngine::default()
            .compute(&DiagramInput::new(sites.as_slice(), bounds).with_resolution(Some(512)))
            .unwrap();
        assert_eq!(approx.len(), exact.len());
        for cell in exact.iter() {
            let a = approx.cell_for(cell.site.id).unwrap();
            let rel = (a.area() - cell.area()).abs() / cell.area();
            assert!(rel < 0.08, "site {}: {} vs {}", cell.site.id, a.area(), cell.area());
            let centre: Position = cell.centroid().unwrap();
            assert!(a.contains(&centre));
        }
    }

    #[test]
    fn test_clamped_outlier_does_not_evict_corner_site() {
        let bounds = Bounds::from_size(100.0, 100.0);
        // The last site clamps onto cell (0, 0), which the first already holds
        let sites = [
            Site::new(0, 0.5, 0.5),
            Site::new(1, 50.0, 50.0),
            Site::new(2, -1000.0, -1000.0),
        ];
        let exact = HalfPlaneEngine::new().compute_euclidean(&sites, &bounds).unwrap();
        let d = JumpFloodEngine::default()
            .compute(&DiagramInput::new(&sites, bounds).with_resolution(Some(64)))
            .unwrap();

        assert!(d.cell_for(2).is_none());
        let corner = d.cell_for(0).expect("corner site lost its cell");
        let expected = exact.cell_for(0).unwrap().area();
        assert!((corner.area() - expected).abs() / expected < 0.2, "{} vs {}", corner.area(), expected);
        assert!(corner.contains(&Position::new(10.0, 10.0)));
        assert!(!d.cell_for(1).unwrap().contains(&Position::new(10.0, 10.0)));
    }
}

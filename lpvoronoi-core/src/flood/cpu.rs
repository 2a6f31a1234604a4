//! CPU flood backend: serial loop or Rayon parallel-for over grid rows.

use log::trace;

use super::{best_candidate, FloodBackend, FloodCost};
use crate::grid::OwnershipGrid;
use crate::parallel::{for_each_row, for_each_row_serial};
use crate::{Result, VoronoiError};

/// CPU backend for jump flooding
pub struct CpuFlood {
    /// Number of threads to use (0 = Rayon default)
    pub num_threads: usize,
    /// Spread each round over the thread pool
    pub parallel: bool,
}

impl CpuFlood {
    pub fn new() -> Self {
        Self { num_threads: 0, parallel: cfg!(feature = "parallel") }
    }

    pub fn with_threads(num_threads: usize) -> Self {
        Self { num_threads, parallel: cfg!(feature = "parallel") }
    }

    /// Single-threaded rounds (reference path for comparison and benchmarking)
    pub fn serial() -> Self {
        Self { num_threads: 0, parallel: false }
    }

    fn run_rounds(&self, mut grid: OwnershipGrid, steps: &[u32], cost: &FloodCost) -> OwnershipGrid {
        let res = grid.resolution;
        let width = res as usize;
        let mut next = grid.records.clone();

        for (round, &step) in steps.iter().enumerate() {
            let current = &grid.records;
            let update = |y: usize, row: &mut [crate::SeedRecord]| {
                for (x, out) in row.iter_mut().enumerate() {
                    *out = best_candidate(current, res, x as u32, y as u32, step, cost);
                }
            };
            if self.parallel {
                for_each_row(&mut next, width, update);
            } else {
                for_each_row_serial(&mut next, width, update);
            }
            std::mem::swap(&mut grid.records, &mut next);
            trace!("cpu flood round {} (step {}) done", round, step);
        }
        grid
    }
}

impl Default for CpuFlood {
    fn default() -> Self {
        Self::new()
    }
}

impl FloodBackend for CpuFlood {
    fn name(&self) -> &'static str {
        if self.parallel {
            "cpu-parallel"
        } else {
            "cpu-serial"
        }
    }

    fn flood(
        &mut self,
        grid: OwnershipGrid,
        steps: &[u32],
        cost: &FloodCost,
    ) -> Result<OwnershipGrid> {
        if grid.records.is_empty() {
            return Err(VoronoiError::InvalidResolution(grid.resolution));
        }

        #[cfg(feature = "parallel")]
        {
            if self.parallel && self.num_threads > 0 {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(self.num_threads)
                    .build()
                    .map_err(|e| VoronoiError::ComputeUnavailable(format!("thread pool: {}", e)))?;
                return Ok(pool.install(|| self.run_rounds(grid, steps, cost)));
            }
        }

        Ok(self.run_rounds(grid, steps, cost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::DiagramInput;
    use crate::{Bounds, JumpFloodEngine, Metric, SiteSet};

    /// Parallel and serial rounds must produce identical grids.
    #[test]
    fn test_parallel_matches_serial() {
        let bounds = Bounds::new(0.0, 120.0, 0.0, 80.0);
        let sites = SiteSet::random(30, &bounds, 42).unwrap();
        for metric in [Metric::Manhattan, Metric::Euclidean, Metric::Lp(3.0), Metric::Chebyshev] {
            let input = DiagramInput::new(sites.as_slice(), bounds)
                .with_metric(metric)
                .with_resolution(Some(96));
            let (par, _) = JumpFloodEngine::new(CpuFlood::new()).ownership(&input).unwrap();
            let (ser, _) = JumpFloodEngine::new(CpuFlood::serial()).ownership(&input).unwrap();
            assert_eq!(par.records, ser.records, "mismatch for p = {}", metric);
        }
    }

    #[test]
    fn test_explicit_thread_count() {
        let bounds = Bounds::from_size(10.0, 10.0);
        let sites = SiteSet::random(5, &bounds, 1).unwrap();
        let input = DiagramInput::new(sites.as_slice(), bounds).with_resolution(Some(32));
        let (a, _) = JumpFloodEngine::new(CpuFlood::with_threads(2)).ownership(&input).unwrap();
        let (b, _) = JumpFloodEngine::new(CpuFlood::serial()).ownership(&input).unwrap();
        assert_eq!(a.records, b.records);
    }
}

//! Ownership grid -> one convex polygon per site.
//!
//! Voronoi cells under any Lp norm with `p >= 1` are convex, so the hull of a
//! site's boundary cell centres is an inscribed approximation of its cell that
//! converges as the grid gets finer.

use log::debug;

use crate::geometry::convex_hull;
use crate::grid::{GridMapping, OwnershipGrid};
use crate::parallel::map_range;
use crate::{Cell, Diagram, Position, Site};

#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryExtractor;

impl BoundaryExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Whether `(x, y)` is owned and touches the grid edge or a differently
    /// owned 4-neighbour.
    pub fn is_boundary(grid: &OwnershipGrid, x: u32, y: u32) -> bool {
        let owner = grid.get(x, y).index;
        if owner < 0 {
            return false;
        }
        let last = grid.resolution - 1;
        if x == 0 || y == 0 || x == last || y == last {
            return true;
        }
        grid.get(x - 1, y).index != owner
            || grid.get(x + 1, y).index != owner
            || grid.get(x, y - 1).index != owner
            || grid.get(x, y + 1).index != owner
    }

    /// Boundary cell centres in world coordinates, grouped by owner index.
    pub fn boundary_points(
        &self,
        grid: &OwnershipGrid,
        mapping: &GridMapping,
        num_sites: usize,
    ) -> Vec<Vec<Position>> {
        let res = grid.resolution;
        let rows: Vec<Vec<(usize, Position)>> = map_range(res as usize, |y| {
            let y = y as u32;
            (0..res)
                .filter(|&x| Self::is_boundary(grid, x, y))
                .map(|x| (grid.get(x, y).index as usize, mapping.cell_center(x, y)))
                .collect()
        });

        let mut per_site = vec![Vec::new(); num_sites];
        for (owner, p) in rows.into_iter().flatten() {
            if let Some(points) = per_site.get_mut(owner) {
                points.push(p);
            }
        }
        per_site
    }

    /// Hull each site's boundary points. Sites owning no cells, or only a
    /// degenerate (collinear) set, produce no cell.
    pub fn extract(&self, grid: &OwnershipGrid, mapping: &GridMapping, sites: &[Site]) -> Diagram {
        let per_site = self.boundary_points(grid, mapping, sites.len());
        let hulls: Vec<Vec<Position>> = map_range(per_site.len(), |i| convex_hull(&per_site[i]));

        let cells: Vec<Cell> = sites
            .iter()
            .zip(hulls)
            .filter(|(_, hull)| hull.len() >= 3)
            .map(|(site, hull)| Cell::new(*site, hull))
            .collect();

        debug!("boundary: {} sites -> {} cells", sites.len(), cells.len());
        Diagram::new(cells)
    }
}

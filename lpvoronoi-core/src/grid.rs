//! World <-> grid mapping and the ownership grid shared by the approximate engines.
//!
//! Grid column `i` spans `[left + i*cell_w, left + (i+1)*cell_w)` and grid row `j`
//! spans `[top + j*cell_h, top + (j+1)*cell_h)`. Row 0 lies at `top`; since
//! `top < bottom` no vertical flip is applied. Cell centres sit at `(i + 0.5, j + 0.5)`.

use crate::flood::FloodCost;
use crate::{Bounds, Position, Result, Site, VoronoiError};

pub const MIN_DEFAULT_RESOLUTION: u32 = 512;
pub const MAX_DEFAULT_RESOLUTION: u32 = 2048;

/// Resolution derived from the domain extent, clamped to `[512, 2048]`.
pub fn default_resolution(bounds: &Bounds) -> u32 {
    let extent = bounds.width().max(bounds.height()).ceil();
    if extent.is_nan() {
        return MIN_DEFAULT_RESOLUTION;
    }
    (extent.min(MAX_DEFAULT_RESOLUTION as f64) as u32)
        .clamp(MIN_DEFAULT_RESOLUTION, MAX_DEFAULT_RESOLUTION)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMapping {
    pub bounds: Bounds,
    pub resolution: u32,
    pub cell_w: f64,
    pub cell_h: f64,
}

impl GridMapping {
    pub fn new(bounds: Bounds, resolution: u32) -> Result<Self> {
        bounds.validate()?;
        if resolution == 0 {
            return Err(VoronoiError::InvalidResolution(resolution));
        }
        Ok(Self {
            bounds,
            resolution,
            cell_w: bounds.width() / resolution as f64,
            cell_h: bounds.height() / resolution as f64,
        })
    }

    /// Continuous grid coordinates of a world position.
    pub fn to_grid(&self, p: &Position) -> (f64, f64) {
        (
            (p.x - self.bounds.left) / self.cell_w,
            (p.y - self.bounds.top) / self.cell_h,
        )
    }

    pub fn to_world(&self, gx: f64, gy: f64) -> Position {
        Position::new(
            self.bounds.left + gx * self.cell_w,
            self.bounds.top + gy * self.cell_h,
        )
    }

    /// The grid cell holding `p`, clamped onto the grid.
    pub fn cell_of(&self, p: &Position) -> (u32, u32) {
        let (gx, gy) = self.to_grid(p);
        let max = (self.resolution - 1) as f64;
        (gx.floor().clamp(0.0, max) as u32, gy.floor().clamp(0.0, max) as u32)
    }

    pub fn cell_center(&self, i: u32, j: u32) -> Position {
        self.to_world(i as f64 + 0.5, j as f64 + 0.5)
    }

    /// World rectangle of cell `(i0..i1, j)` as a counter-clockwise ring.
    pub fn strip(&self, i0: u32, i1: u32, j: u32) -> Vec<Position> {
        let x0 = self.bounds.left + i0 as f64 * self.cell_w;
        let x1 = self.bounds.left + i1 as f64 * self.cell_w;
        let y0 = self.bounds.top + j as f64 * self.cell_h;
        let y1 = self.bounds.top + (j + 1) as f64 * self.cell_h;
        vec![
            Position::new(x0, y0),
            Position::new(x1, y0),
            Position::new(x1, y1),
            Position::new(x0, y1),
        ]
    }

    /// Cell height over cell width. Approximate engines measure distances in
    /// cell widths, so a grid delta `dy` becomes `dy * aspect`.
    pub fn aspect(&self) -> f64 {
        self.cell_h / self.cell_w
    }

    pub fn cell_count(&self) -> usize {
        self.resolution as usize * self.resolution as usize
    }
}

/// One ownership-grid entry: the nearest seed found so far.
/// `index == -1` means no owner yet.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "gpu", derive(bytemuck::Pod, bytemuck::Zeroable))]
pub struct SeedRecord {
    /// Seed position in continuous grid coordinates
    pub x: f32,
    pub y: f32,
    pub index: i32,
}

impl SeedRecord {
    pub const EMPTY: SeedRecord = SeedRecord { x: 0.0, y: 0.0, index: -1 };

    pub fn is_empty(&self) -> bool {
        self.index < 0
    }
}

/// `resolution x resolution` records, row-major. Transient: built, flooded,
/// extracted, dropped within one call.
#[derive(Debug, Clone)]
pub struct OwnershipGrid {
    pub resolution: u32,
    pub records: Vec<SeedRecord>,
}

impl OwnershipGrid {
    pub fn empty(resolution: u32) -> Self {
        let n = resolution as usize * resolution as usize;
        Self {
            resolution,
            records: vec![SeedRecord::EMPTY; n],
        }
    }

    /// Each site claims the single cell containing its (clamped) position.
    /// When several sites land in one cell, the one nearest the cell centre
    /// under `cost` keeps it; ties keep the earlier site.
    pub fn seeded(mapping: &GridMapping, sites: &[Site], cost: &FloodCost) -> Self {
        let mut grid = Self::empty(mapping.resolution);
        for (i, site) in sites.iter().enumerate() {
            let (gx, gy) = mapping.to_grid(&site.pos());
            let (cx, cy) = mapping.cell_of(&site.pos());
            let record = SeedRecord {
                x: gx as f32,
                y: gy as f32,
                index: i as i32,
            };
            let idx = grid.index(cx, cy);
            if cost.of(cx, cy, &record) < cost.of(cx, cy, &grid.records[idx]) {
                grid.records[idx] = record;
            }
        }
        grid
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.resolution as usize + x as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> &SeedRecord {
        &self.records[self.index(x, y)]
    }

    /// Owner site index per cell, `-1` for unowned
    pub fn owners(&self) -> Vec<i32> {
        self.records.iter().map(|r| r.index).collect()
    }
}

//! Core Lp Voronoi diagram computation library.
//!
//! Three engines share one input/output contract:
//!
//! - [`HalfPlaneEngine`]: exact Euclidean cells by iterative half-plane clipping.
//! - [`JumpFloodEngine`]: approximate cells for any Lp metric via jump flooding,
//!   executed by a [`FloodBackend`] (serial/Rayon CPU, or wgpu with the `gpu` feature).
//! - [`GridUnionEngine`]: brute-force grid classification followed by a polygon
//!   union per site.
//!
//! [`Controller`] picks one of them from the requested metric and exactness.

mod boundary;
mod controller;
mod diagram;
mod flood;
mod geometry;
mod grid;
mod half_plane;
mod metric;
mod parallel;
mod sampling;
mod site;
mod union;

pub use boundary::BoundaryExtractor;
pub use controller::{Controller, EngineChoice, EngineKind, FloodDevice};
pub use diagram::{Cell, ComputeEngine, Diagram, DiagramInput};
pub use flood::{step_schedule, CpuFlood, FloodBackend, FloodCost, JumpFloodEngine};
pub use geometry::{
    clip_polygon_with_half_plane, convex_hull, line_intersection, point_in_half_plane,
    point_in_polygon, polygon_area, polygon_centroid, segment_intersection, HalfPlane, Polygon,
    HALF_PLANE_EPSILON,
};
pub use grid::{default_resolution, GridMapping, OwnershipGrid, SeedRecord};
pub use half_plane::HalfPlaneEngine;
pub use metric::Metric;
pub use sampling::GridUnionEngine;
pub use site::{Bounds, Position, Site, SiteSet};
pub use union::{OverlayUnion, PolygonUnion};

#[cfg(feature = "gpu")]
pub use flood::GpuFlood;

/// Error type for Voronoi operations
#[derive(Debug, thiserror::Error)]
pub enum VoronoiError {
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("Invalid metric: p = {0} (expected 1 <= p <= inf)")]
    InvalidMetric(f64),

    #[error("Invalid resolution: {0}")]
    InvalidResolution(u32),

    #[error("Invalid site {id}: {reason}")]
    InvalidSite { id: i64, reason: String },

    #[error("Engine {engine} does not support metric p = {p}")]
    UnsupportedMetric { engine: &'static str, p: f64 },

    #[error("Compute backend unavailable: {0}")]
    ComputeUnavailable(String),

    #[error("Polygon union failed: {0}")]
    UnionFailure(String),

    #[cfg(feature = "gpu")]
    #[error("GPU error: {0}")]
    Gpu(String),
}

pub type Result<T> = std::result::Result<T, VoronoiError>;

//! End-to-end tests verifying deterministic diagram output.
//!
//! The same seed must give the same sites, and every engine must give the
//! same cells for the same input, run after run.

use lpvoronoi_core::{
    Bounds, ComputeEngine, CpuFlood, DiagramInput, GridUnionEngine, HalfPlaneEngine,
    JumpFloodEngine, Metric, SiteSet,
};

#[cfg(feature = "gpu")]
use lpvoronoi_core::GpuFlood;

fn bounds() -> Bounds {
    Bounds::new(-50.0, 150.0, 10.0, 130.0)
}

#[test]
fn test_seeded_sites_are_reproducible() {
    let a = SiteSet::random(100, &bounds(), 42).unwrap();
    let b = SiteSet::random(100, &bounds(), 42).unwrap();
    let c = SiteSet::random(100, &bounds(), 43).unwrap();
    assert_eq!(a.sites, b.sites);
    assert_ne!(a.sites, c.sites);
    assert!(a.positions().iter().all(|p| bounds().contains(p, 0.0)));
}

#[test]
fn test_half_plane_deterministic() {
    let sites = SiteSet::random(60, &bounds(), 7).unwrap();
    let engine = HalfPlaneEngine::new();
    let first = engine.compute_euclidean(sites.as_slice(), &bounds()).unwrap();
    for _ in 0..3 {
        let again = engine.compute_euclidean(sites.as_slice(), &bounds()).unwrap();
        assert_eq!(first, again);
    }
}

#[test]
fn test_jump_flood_deterministic_across_runs_and_threads() {
    let sites = SiteSet::random(40, &bounds(), 11).unwrap();
    for metric in [Metric::Manhattan, Metric::Lp(1.5), Metric::Chebyshev] {
        let input = DiagramInput::new(sites.as_slice(), bounds())
            .with_metric(metric)
            .with_resolution(Some(128));
        let first = JumpFloodEngine::default().compute(&input).unwrap();
        let again = JumpFloodEngine::default().compute(&input).unwrap();
        let serial = JumpFloodEngine::new(CpuFlood::serial()).compute(&input).unwrap();
        let threaded = JumpFloodEngine::new(CpuFlood::with_threads(3)).compute(&input).unwrap();
        assert_eq!(first, again, "p = {}", metric);
        assert_eq!(first, serial, "p = {}", metric);
        assert_eq!(first, threaded, "p = {}", metric);
    }
}

#[test]
fn test_grid_union_deterministic() {
    let sites = SiteSet::random(25, &bounds(), 3).unwrap();
    let input = DiagramInput::new(sites.as_slice(), bounds())
        .with_metric(Metric::Lp(3.0))
        .with_resolution(Some(96));
    let first = GridUnionEngine::default().compute(&input).unwrap();
    let again = GridUnionEngine::default().compute(&input).unwrap();
    assert_eq!(first, again);
}

/// GPU and CPU rounds run the same update; only float rounding on exact
/// ties may differ.
#[cfg(feature = "gpu")]
#[test]
fn test_gpu_matches_cpu_ownership() {
    let mut gpu_engine = match GpuFlood::new() {
        Ok(gpu) => JumpFloodEngine::new(gpu),
        Err(e) => {
            eprintln!("Skipping GPU test: {}", e);
            return;
        }
    };
    let sites = SiteSet::random(50, &bounds(), 5).unwrap();
    for metric in [Metric::Euclidean, Metric::Lp(3.0), Metric::Chebyshev] {
        let input = DiagramInput::new(sites.as_slice(), bounds())
            .with_metric(metric)
            .with_resolution(Some(256));
        let (cpu_grid, _) = JumpFloodEngine::default().ownership(&input).unwrap();
        let (gpu_grid, _) = gpu_engine.ownership(&input).unwrap();
        let differing = cpu_grid
            .owners()
            .iter()
            .zip(gpu_grid.owners())
            .filter(|(a, b)| **a != *b)
            .count();
        assert!(
            differing * 100 <= cpu_grid.records.len(),
            "p = {}: {} of {} cells differ",
            metric,
            differing,
            cpu_grid.records.len()
        );
    }
}

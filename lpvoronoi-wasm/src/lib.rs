//! WASM bindings for lpvoronoi-core.
//!
//! Exposes a stateful `DiagramEngine` that holds the sites and domain, plus a
//! one-shot `compute_diagram`, both returning flat typed arrays for efficient
//! JS interop.

use wasm_bindgen::prelude::*;
use lpvoronoi_core::{
    Bounds, Controller, Diagram, DiagramInput, EngineChoice, FloodDevice, Metric, Site, SiteSet,
};

#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// JS numbers to a metric. `Infinity` selects Chebyshev.
fn metric_from_js(p: f64) -> Result<Metric, JsError> {
    Metric::from_p(p).map_err(|e| JsError::new(&e.to_string()))
}

/// `0` means "derive from the domain"
fn resolution_from_js(resolution: u32) -> Option<u32> {
    (resolution > 0).then_some(resolution)
}

/// Flat [x0,y0, x1,y1, ...] positions to sites numbered by position.
fn sites_from_flat(positions: &[f64]) -> Vec<Site> {
    positions
        .chunks_exact(2)
        .enumerate()
        .map(|(i, xy)| Site::new(i as i64, xy[0], xy[1]))
        .collect()
}

/// Result of one diagram computation.
/// Cell `k` has id `ids[k]` and vertices `vertices[2*offsets[k] .. 2*offsets[k+1]]`.
#[wasm_bindgen]
pub struct DiagramFrame {
    ids: Vec<f64>,
    offsets: Vec<u32>,
    vertices: Vec<f64>,
    engine: String,
    elapsed_ms: f64,
}

#[wasm_bindgen]
impl DiagramFrame {
    /// Site id per cell (length = num_cells)
    #[wasm_bindgen(getter)]
    pub fn ids(&self) -> Vec<f64> {
        self.ids.clone()
    }

    /// Vertex offset per cell (length = num_cells + 1)
    #[wasm_bindgen(getter)]
    pub fn offsets(&self) -> Vec<u32> {
        self.offsets.clone()
    }

    /// Flat [x0,y0, x1,y1, ...] vertices of every cell, back to back
    #[wasm_bindgen(getter)]
    pub fn vertices(&self) -> Vec<f64> {
        self.vertices.clone()
    }

    /// Name of the engine that produced this frame
    #[wasm_bindgen(getter)]
    pub fn engine(&self) -> String {
        self.engine.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    #[wasm_bindgen(getter)]
    pub fn cell_count(&self) -> usize {
        self.ids.len()
    }
}

impl DiagramFrame {
    fn from_diagram(diagram: &Diagram, engine: &str, elapsed_ms: f64) -> Self {
        let mut offsets = Vec::with_capacity(diagram.len() + 1);
        let mut vertices = Vec::new();
        offsets.push(0);
        for cell in diagram.iter() {
            vertices.extend(cell.region.iter().flat_map(|p| [p.x, p.y]));
            offsets.push((vertices.len() / 2) as u32);
        }
        Self {
            // JS numbers hold ids exactly up to 2^53
            ids: diagram.iter().map(|c| c.site.id as f64).collect(),
            offsets,
            vertices,
            engine: engine.to_string(),
            elapsed_ms,
        }
    }
}

fn run(
    controller: &mut Controller,
    input: &DiagramInput<'_>,
    exact: bool,
) -> Result<DiagramFrame, JsError> {
    let start = js_sys::Date::now();
    let diagram = controller
        .compute(input, exact)
        .map_err(|e| JsError::new(&e.to_string()))?;
    let engine = controller.last_engine().map_or("unknown", |k| k.name());
    Ok(DiagramFrame::from_diagram(&diagram, engine, js_sys::Date::now() - start))
}

fn parse_engine(engine: &str) -> Result<EngineChoice, JsError> {
    engine.parse().map_err(|e: String| JsError::new(&e))
}

/// Compute one diagram from flat [x0,y0, x1,y1, ...] positions.
///
/// `p` may be `Infinity` for Chebyshev; `resolution = 0` derives one from the domain.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn compute_diagram(
    positions: &[f64],
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
    p: f64,
    resolution: u32,
    exact: bool,
) -> Result<DiagramFrame, JsError> {
    let sites = sites_from_flat(positions);
    let input = DiagramInput::new(&sites, Bounds::new(left, right, top, bottom))
        .with_metric(metric_from_js(p)?)
        .with_resolution(resolution_from_js(resolution));
    run(&mut Controller::new(), &input, exact)
}

/// Stateful diagram engine.
/// Holds the domain, sites and options between computations.
#[wasm_bindgen]
pub struct DiagramEngine {
    controller: Controller,
    bounds: Bounds,
    sites: SiteSet,
    metric: Metric,
    resolution: Option<u32>,
    exact: bool,
}

#[wasm_bindgen]
impl DiagramEngine {
    /// Create an engine over `[0, width] x [0, height]` with no sites.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            // No threads and no GPU in the browser build
            controller: Controller::new().with_device(FloodDevice::Cpu),
            bounds: Bounds::from_size(width, height),
            sites: SiteSet::default(),
            metric: Metric::Euclidean,
            resolution: None,
            exact: false,
        }
    }

    /// Rejects empty, inverted or non-finite bounds.
    pub fn set_bounds(&mut self, left: f64, right: f64, top: f64, bottom: f64) -> Result<(), JsError> {
        let bounds = Bounds::new(left, right, top, bottom);
        bounds.validate().map_err(|e| JsError::new(&e.to_string()))?;
        self.bounds = bounds;
        Ok(())
    }

    /// Lp exponent; `Infinity` selects Chebyshev.
    pub fn set_metric(&mut self, p: f64) -> Result<(), JsError> {
        self.metric = metric_from_js(p)?;
        Ok(())
    }

    pub fn set_resolution(&mut self, resolution: u32) {
        self.resolution = resolution_from_js(resolution);
    }

    pub fn set_exact(&mut self, exact: bool) {
        self.exact = exact;
    }

    /// `auto`, `half-plane`, `jump-flood` or `grid-union`
    pub fn set_engine(&mut self, engine: &str) -> Result<(), JsError> {
        let choice = parse_engine(engine)?;
        self.controller = Controller::new()
            .with_engine(choice)
            .with_device(self.controller.device());
        Ok(())
    }

    /// Replace the sites with flat [x0,y0, x1,y1, ...] positions.
    pub fn set_sites(&mut self, positions: &[f64]) {
        self.sites = SiteSet::new(sites_from_flat(positions));
    }

    /// Replace the sites with `count` seeded random positions inside the domain.
    pub fn set_random_sites(&mut self, count: usize, seed: u32) -> Result<(), JsError> {
        self.sites = SiteSet::random(count, &self.bounds, seed as u64)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(())
    }

    /// Run the diagram computation on the current sites.
    pub fn compute(&mut self) -> Result<DiagramFrame, JsError> {
        let input = DiagramInput::new(self.sites.as_slice(), self.bounds)
            .with_metric(self.metric)
            .with_resolution(self.resolution);
        run(&mut self.controller, &input, self.exact)
    }

    /// Get current site positions as flat [x0,y0, x1,y1, ...].
    pub fn get_positions(&self) -> Vec<f64> {
        self.sites.positions().iter().flat_map(|p| [p.x, p.y]).collect()
    }

    /// Get current site count.
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }
}

//! Engine dispatch.

use log::{debug, warn};

use crate::diagram::{ComputeEngine, DiagramInput};
use crate::flood::{CpuFlood, JumpFloodEngine};
use crate::half_plane::HalfPlaneEngine;
use crate::sampling::GridUnionEngine;
use crate::{Diagram, Metric, Result, VoronoiError};

#[cfg(feature = "gpu")]
use crate::flood::GpuFlood;

/// The engine that actually ran a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EngineKind {
    HalfPlane,
    JumpFlood,
    GridUnion,
}

impl EngineKind {
    pub fn name(&self) -> &'static str {
        match self {
            EngineKind::HalfPlane => "half-plane",
            EngineKind::JumpFlood => "jump-flood",
            EngineKind::GridUnion => "grid-union",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Requested engine. `Auto` picks from metric and exactness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum EngineChoice {
    #[default]
    Auto,
    HalfPlane,
    JumpFlood,
    GridUnion,
}

impl std::str::FromStr for EngineChoice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(EngineChoice::Auto),
            "half-plane" | "halfplane" | "exact" => Ok(EngineChoice::HalfPlane),
            "jump-flood" | "jumpflood" | "jfa" => Ok(EngineChoice::JumpFlood),
            "grid-union" | "gridunion" | "grid" => Ok(EngineChoice::GridUnion),
            other => Err(format!("unknown engine '{}'", other)),
        }
    }
}

/// Where jump flooding rounds execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloodDevice {
    /// Serial or Rayon CPU rounds
    #[default]
    Cpu,
    /// wgpu compute dispatch; needs the `gpu` feature and an adapter
    Gpu,
    /// No flood backend; approximate requests go to grid sampling
    None,
}

/// Routes each request to one engine and falls back to grid sampling when the
/// flood backend cannot be acquired.
pub struct Controller {
    choice: EngineChoice,
    device: FloodDevice,
    half_plane: HalfPlaneEngine,
    cpu_flood: JumpFloodEngine<CpuFlood>,
    grid_union: GridUnionEngine,
    /// Created on first use; only pipeline state survives between calls
    #[cfg(feature = "gpu")]
    gpu_flood: Option<JumpFloodEngine<GpuFlood>>,
    last_engine: Option<EngineKind>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        Self {
            choice: EngineChoice::Auto,
            device: FloodDevice::Cpu,
            half_plane: HalfPlaneEngine::new(),
            cpu_flood: JumpFloodEngine::default(),
            grid_union: GridUnionEngine::default(),
            #[cfg(feature = "gpu")]
            gpu_flood: None,
            last_engine: None,
        }
    }

    pub fn with_engine(mut self, choice: EngineChoice) -> Self {
        self.choice = choice;
        self
    }

    pub fn with_device(mut self, device: FloodDevice) -> Self {
        self.device = device;
        self
    }

    /// CPU flood thread count (0 = Rayon default)
    pub fn with_cpu_threads(mut self, num_threads: usize) -> Self {
        self.cpu_flood = JumpFloodEngine::new(CpuFlood::with_threads(num_threads));
        self
    }

    pub fn choice(&self) -> EngineChoice {
        self.choice
    }

    pub fn device(&self) -> FloodDevice {
        self.device
    }

    /// Engine used by the most recent successful or failed `compute`.
    pub fn last_engine(&self) -> Option<EngineKind> {
        self.last_engine
    }

    /// The engine a request would be routed to, before any fallback.
    pub fn select(&self, metric: &Metric, exact: bool) -> EngineKind {
        match self.choice {
            EngineChoice::HalfPlane => EngineKind::HalfPlane,
            EngineChoice::JumpFlood => EngineKind::JumpFlood,
            EngineChoice::GridUnion => EngineKind::GridUnion,
            EngineChoice::Auto => {
                if exact && metric.is_euclidean() {
                    EngineKind::HalfPlane
                } else if self.device == FloodDevice::None {
                    EngineKind::GridUnion
                } else {
                    EngineKind::JumpFlood
                }
            }
        }
    }

    pub fn compute(&mut self, input: &DiagramInput<'_>, exact: bool) -> Result<Diagram> {
        input.validate()?;
        let kind = self.select(&input.metric, exact);
        debug!(
            "controller: {} sites, p = {}, exact = {} -> {}",
            input.sites.len(),
            input.metric,
            exact,
            kind
        );

        self.last_engine = Some(kind);
        match self.run(kind, input) {
            Err(VoronoiError::ComputeUnavailable(reason)) if kind == EngineKind::JumpFlood => {
                warn!("flood backend unavailable ({}), falling back to grid-union", reason);
                self.last_engine = Some(EngineKind::GridUnion);
                self.grid_union.compute(input)
            }
            other => other,
        }
    }

    fn run(&mut self, kind: EngineKind, input: &DiagramInput<'_>) -> Result<Diagram> {
        match kind {
            EngineKind::HalfPlane => self.half_plane.compute(input),
            EngineKind::GridUnion => self.grid_union.compute(input),
            EngineKind::JumpFlood => match self.device {
                FloodDevice::Cpu => self.cpu_flood.compute(input),
                FloodDevice::Gpu => self.run_gpu_flood(input),
                FloodDevice::None => Err(VoronoiError::ComputeUnavailable(
                    "no flood device configured".into(),
                )),
            },
        }
    }

    #[cfg(feature = "gpu")]
    fn run_gpu_flood(&mut self, input: &DiagramInput<'_>) -> Result<Diagram> {
        let engine = match self.gpu_flood.take() {
            Some(engine) => engine,
            None => JumpFloodEngine::new(GpuFlood::new()?),
        };
        self.gpu_flood.insert(engine).compute(input)
    }

    #[cfg(not(feature = "gpu"))]
    fn run_gpu_flood(&mut self, _input: &DiagramInput<'_>) -> Result<Diagram> {
        Err(VoronoiError::ComputeUnavailable(
            "built without the `gpu` feature".into(),
        ))
    }
}

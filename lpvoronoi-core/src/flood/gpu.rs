//! GPU flood backend using wgpu compute shaders.
//!
//! Two storage buffers hold the ping-pong grids. Every round is its own compute
//! pass reading one buffer and writing the other; all passes are recorded into
//! a single command encoder, so round k+1 only starts after round k retired.
//! One blocking readback after the last round returns the ownership grid.

use bytemuck::{Pod, Zeroable};
use log::{debug, trace};
use wgpu::util::DeviceExt;

use super::{FloodBackend, FloodCost};
use crate::grid::{OwnershipGrid, SeedRecord};
use crate::{Metric, Result, VoronoiError};

const WORKGROUP_SIZE: u32 = 16;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RoundParams {
    resolution: u32,
    step: u32,
    metric_kind: u32,
    _pad0: u32,
    p: f32,
    aspect: f32,
    _pad1: f32,
    _pad2: f32,
}

fn metric_kind(metric: &Metric) -> (u32, f32) {
    match *metric {
        Metric::Manhattan => (0, 1.0),
        Metric::Euclidean => (1, 2.0),
        Metric::Lp(p) => (2, p as f32),
        Metric::Chebyshev => (3, 0.0),
    }
}

/// GPU backend running each flood round as a compute dispatch
pub struct GpuFlood {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl GpuFlood {
    /// Acquire an adapter and build the flood pipeline.
    ///
    /// Fails with [`VoronoiError::ComputeUnavailable`] when no adapter or device
    /// can be obtained.
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::default();

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| VoronoiError::ComputeUnavailable("No suitable GPU adapter found".into()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Jump Flood GPU"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| VoronoiError::ComputeUnavailable(format!("Failed to create device: {}", e)))?;

        debug!("gpu flood: using adapter {:?}", adapter.get_info().name);

        let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Jump Flood Bind Group Layout"),
            entries: &[
                // 0: Round parameters
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // 1: Current grid (read)
                storage(1, true),
                // 2: Next grid (write)
                storage(2, false),
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Jump Flood Shader"),
            source: wgpu::ShaderSource::Wgsl(FLOOD_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Jump Flood Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Jump Flood Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
        })
    }
}

const FLOOD_SHADER: &str = r#"
struct Params {
    resolution: u32,
    step: u32,
    metric_kind: u32,
    _pad0: u32,
    p: f32,
    aspect: f32,
    _pad1: f32,
    _pad2: f32,
}

struct Seed {
    x: f32,
    y: f32,
    index: i32,
}

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read> src_grid: array<Seed>;
@group(0) @binding(2) var<storage, read_write> dst_grid: array<Seed>;

const INF: f32 = 3.402823e+38;

fn lp_cost(d: vec2<f32>) -> f32 {
    let a = abs(d);
    let m = max(a.x, a.y);
    if (params.metric_kind == 0u) {
        return a.x + a.y;
    }
    if (params.metric_kind == 1u) {
        return sqrt(d.x * d.x + d.y * d.y);
    }
    if (params.metric_kind == 3u) {
        return m;
    }
    if (m < 1e-3) {
        return 0.0;
    }
    let n = a / m;
    return m * pow(pow(n.x, params.p) + pow(n.y, params.p), 1.0 / params.p);
}

fn cost_of(seed: Seed, center: vec2<f32>) -> f32 {
    if (seed.index < 0) {
        return INF;
    }
    let d = vec2<f32>(seed.x - center.x, (seed.y - center.y) * params.aspect);
    return lp_cost(d);
}

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let x = global_id.x;
    let y = global_id.y;
    let res = params.resolution;
    if (x >= res || y >= res) {
        return;
    }

    let center = vec2<f32>(f32(x) + 0.5, f32(y) + 0.5);
    let idx = y * res + x;
    var best = src_grid[idx];
    var best_cost = cost_of(best, center);
    let step = i32(params.step);

    for (var oy: i32 = -1; oy <= 1; oy = oy + 1) {
        for (var ox: i32 = -1; ox <= 1; ox = ox + 1) {
            if (ox == 0 && oy == 0) {
                continue;
            }
            let nx = i32(x) + ox * step;
            let ny = i32(y) + oy * step;
            if (nx < 0 || ny < 0 || nx >= i32(res) || ny >= i32(res)) {
                continue;
            }
            let candidate = src_grid[u32(ny) * res + u32(nx)];
            let c = cost_of(candidate, center);
            if (c < best_cost) {
                best = candidate;
                best_cost = c;
            }
        }
    }

    dst_grid[idx] = best;
}
"#;

impl FloodBackend for GpuFlood {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn flood(
        &mut self,
        grid: OwnershipGrid,
        steps: &[u32],
        cost: &FloodCost,
    ) -> Result<OwnershipGrid> {
        let res = grid.resolution;
        let buffer_size = std::mem::size_of_val(grid.records.as_slice()) as u64;
        let (kind, p) = metric_kind(&cost.metric);

        // Ping-pong buffers: A starts with the seeds, B is scratch
        let buffers = [
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Flood Buffer A"),
                contents: bytemuck::cast_slice(&grid.records),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            }),
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Flood Buffer B"),
                size: buffer_size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            }),
        ];

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Flood Staging Buffer"),
            size: buffer_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Flood Encoder"),
        });

        let workgroups = res.div_ceil(WORKGROUP_SIZE);
        let mut src = 0usize;
        for (round, &step) in steps.iter().enumerate() {
            let dst = 1 - src;
            let params = RoundParams {
                resolution: res,
                step,
                metric_kind: kind,
                _pad0: 0,
                p,
                aspect: cost.aspect as f32,
                _pad1: 0.0,
                _pad2: 0.0,
            };
            let params_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Flood Round Params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Flood Round Bind Group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: buffers[src].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: buffers[dst].as_entire_binding(),
                    },
                ],
            });

            {
                let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Flood Round Pass"),
                    timestamp_writes: None,
                });
                compute_pass.set_pipeline(&self.pipeline);
                compute_pass.set_bind_group(0, &bind_group, &[]);
                compute_pass.dispatch_workgroups(workgroups, workgroups, 1);
            }
            trace!("gpu flood: recorded round {} (step {})", round, step);
            src = dst;
        }

        // After the last swap `src` holds the final grid
        encoder.copy_buffer_to_buffer(&buffers[src], 0, &staging_buffer, 0, buffer_size);
        self.queue.submit(std::iter::once(encoder.finish()));

        // Read back results: the single blocking wait of the pipeline
        let buffer_slice = staging_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            // Receiver outlives the poll below
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| VoronoiError::Gpu(format!("Buffer map callback dropped: {}", e)))?
            .map_err(|e| VoronoiError::Gpu(format!("Buffer map failed: {:?}", e)))?;

        let data = buffer_slice.get_mapped_range();
        let records: Vec<SeedRecord> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging_buffer.unmap();

        Ok(OwnershipGrid { resolution: res, records })
    }
}

//! Lp Voronoi diagram CLI
//!
//! Computes one diagram and writes it as YAML or as a PNG preview, or times
//! every engine over a resolution sweep.
//!
//! ## YAML spec file
//!
//! ```yaml
//! bounds: { left: 0, right: 800, top: 0, bottom: 600 }
//! metric: 3          # any p >= 1, or .inf / inf for Chebyshev
//! resolution: 512    # optional; derived from bounds when absent
//! exact: false
//! engine: auto       # auto | half-plane | jump-flood | grid-union
//! sites:
//!   - { id: 0, x: 120, y: 80 }
//!   - { id: 1, x: 600, y: 420 }
//! random: { count: 50, seed: 7 }   # used when `sites` is absent
//! ```
//!
//! Run with: `lpvoronoi --spec diagram.yaml -o cells.yaml`
//!
//! ## Inline
//!
//!   lpvoronoi --random 200 --seed 3 --bounds 0,800,0,600 --metric inf \
//!     --format png -o cells.png
//!
//! ## Benchmark
//!
//!   lpvoronoi --benchmark --random 500 --bench-resolutions 128,256,512
//!
//! Press Ctrl+C during a benchmark to stop after the current run and print
//! the results collected so far.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use lpvoronoi_core::{
    Bounds, Controller, Diagram, DiagramInput, EngineChoice, FloodDevice, Metric,
    Position, Site, SiteSet,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Yaml,
    Png,
}

/// `p` as either a number (`.inf` allowed) or a name such as `inf` or `manhattan`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum MetricValue {
    P(f64),
    Name(String),
}

impl MetricValue {
    fn to_metric(&self) -> anyhow::Result<Metric> {
        match self {
            MetricValue::P(p) => Ok(Metric::from_p(*p)?),
            MetricValue::Name(s) => s.parse().map_err(|e: String| anyhow::anyhow!(e)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RandomSpec {
    count: usize,
    #[serde(default)]
    seed: u64,
}

/// YAML spec file format
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DiagramSpec {
    bounds: Option<Bounds>,
    metric: Option<MetricValue>,
    resolution: Option<u32>,
    exact: Option<bool>,
    engine: Option<String>,
    sites: Option<Vec<Site>>,
    random: Option<RandomSpec>,
}

fn load_spec(path: &PathBuf) -> anyhow::Result<DiagramSpec> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read spec file: {:?}", path))?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse spec file: {:?}", path))
}

/// Parse `left,right,top,bottom`
fn parse_bounds(s: &str) -> Result<Bounds, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("invalid bound '{}': {}", v, e)))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        &[left, right, top, bottom] => Ok(Bounds::new(left, right, top, bottom)),
        _ => Err(format!("expected left,right,top,bottom but got '{}'", s)),
    }
}

/// Parse a comma-separated list of resolutions
fn parse_resolutions(s: &str) -> anyhow::Result<Vec<u32>> {
    s.split(',')
        .map(|v| v.trim().parse::<u32>().with_context(|| format!("invalid resolution '{}'", v)))
        .collect()
}

#[derive(Parser, Debug)]
#[command(name = "lpvoronoi")]
#[command(about = "Compute Voronoi diagrams under any Lp metric", long_about = None)]
struct Args {
    /// YAML spec file (sites, bounds, metric, resolution, engine)
    #[arg(long)]
    spec: Option<PathBuf>,

    /// Output file path (stdout for YAML when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "yaml")]
    format: OutputFormat,

    /// Generate this many random sites instead of reading them from the spec
    #[arg(long)]
    random: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Domain as left,right,top,bottom
    #[arg(long, value_parser = parse_bounds)]
    bounds: Option<Bounds>,

    /// Lp exponent: a number >= 1, or inf for Chebyshev
    #[arg(short, long)]
    metric: Option<Metric>,

    /// Grid side length for the approximate engines
    #[arg(short, long)]
    resolution: Option<u32>,

    /// Request exact cells (honored for p = 2)
    #[arg(long)]
    exact: bool,

    /// Engine: auto | half-plane | jump-flood | grid-union
    #[arg(long)]
    engine: Option<EngineChoice>,

    /// Run jump flooding on the GPU (if available)
    #[arg(long)]
    gpu: bool,

    /// Disable jump flooding; approximate requests use grid sampling
    #[arg(long, conflicts_with = "gpu")]
    no_flood: bool,

    /// CPU flood threads (0 = Rayon default)
    #[arg(long, default_value = "0")]
    threads: usize,

    /// Longest side of the PNG preview in pixels
    #[arg(long, default_value = "800")]
    image_size: u32,

    /// Draw site positions as dots on the PNG preview
    #[arg(long)]
    show_sites: bool,

    /// Time every engine over a resolution sweep
    #[arg(long)]
    benchmark: bool,

    /// Resolutions to sweep in benchmark mode
    #[arg(long, default_value = "128,256,512")]
    bench_resolutions: String,

    /// Timed runs per engine and resolution
    #[arg(long, default_value = "3")]
    bench_runs: usize,
}

/// Everything one computation needs, after merging the spec file and CLI flags.
struct Request {
    sites: SiteSet,
    bounds: Bounds,
    metric: Metric,
    resolution: Option<u32>,
    exact: bool,
    engine: EngineChoice,
}

/// CLI args take precedence over spec values.
fn resolve_request(args: &Args, spec: Option<DiagramSpec>) -> anyhow::Result<Request> {
    let spec = spec.unwrap_or_default();

    let bounds = args
        .bounds
        .or(spec.bounds)
        .unwrap_or_else(|| Bounds::from_size(800.0, 600.0));
    bounds.validate()?;

    let metric = match (args.metric, &spec.metric) {
        (Some(m), _) => m,
        (None, Some(v)) => v.to_metric()?,
        (None, None) => Metric::Euclidean,
    };

    let engine = match (args.engine, &spec.engine) {
        (Some(e), _) => e,
        (None, Some(s)) => s.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        (None, None) => EngineChoice::Auto,
    };

    let sites = match (args.random, spec.sites, spec.random) {
        (Some(count), _, _) => SiteSet::random(count, &bounds, args.seed)?,
        (None, Some(sites), _) => SiteSet::new(sites),
        (None, None, Some(r)) => SiteSet::random(r.count, &bounds, r.seed)?,
        (None, None, None) => anyhow::bail!("no sites: use --random N or a spec file with `sites`"),
    };

    Ok(Request {
        sites,
        bounds,
        metric,
        resolution: args.resolution.or(spec.resolution),
        exact: args.exact || spec.exact.unwrap_or(false),
        engine,
    })
}

fn build_controller(args: &Args, engine: EngineChoice) -> Controller {
    let device = if args.no_flood {
        FloodDevice::None
    } else if args.gpu {
        FloodDevice::Gpu
    } else {
        FloodDevice::Cpu
    };
    Controller::new()
        .with_engine(engine)
        .with_device(device)
        .with_cpu_threads(args.threads)
}

/// YAML output document
#[derive(Serialize)]
struct DiagramOutput<'a> {
    engine: &'static str,
    metric: String,
    bounds: Bounds,
    resolution: Option<u32>,
    elapsed_ms: f64,
    #[serde(flatten)]
    diagram: &'a Diagram,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let spec = args.spec.as_ref().map(load_spec).transpose()?;
    let request = resolve_request(&args, spec)?;

    if args.benchmark {
        return run_benchmark(&request, &args);
    }

    let mut controller = build_controller(&args, request.engine);
    let input = DiagramInput::new(request.sites.as_slice(), request.bounds)
        .with_metric(request.metric)
        .with_resolution(request.resolution);

    let start = Instant::now();
    let diagram = controller
        .compute(&input, request.exact)
        .context("diagram computation failed")?;
    let elapsed = start.elapsed();
    let engine = controller.last_engine().map_or("unknown", |k| k.name());
    info!(
        "{} sites -> {} cells via {} in {:.1} ms",
        request.sites.len(),
        diagram.len(),
        engine,
        elapsed.as_secs_f64() * 1000.0
    );

    match args.format {
        OutputFormat::Yaml => {
            let doc = DiagramOutput {
                engine,
                metric: request.metric.to_string(),
                bounds: request.bounds,
                resolution: request.resolution,
                elapsed_ms: elapsed.as_secs_f64() * 1000.0,
                diagram: &diagram,
            };
            let yaml = serde_yaml::to_string(&doc)?;
            match &args.output {
                Some(path) => std::fs::write(path, yaml)
                    .with_context(|| format!("failed to write {:?}", path))?,
                None => print!("{}", yaml),
            }
        }
        OutputFormat::Png => {
            let output = args
                .output
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Output path required for PNG (use -o/--output)"))?;
            let sites = args.show_sites.then(|| request.sites.positions());
            let image = render_preview(&diagram, &request.bounds, args.image_size, sites.as_deref());
            image.save(output)?;
            println!("Preview saved to: {:?}", output);
        }
    }

    Ok(())
}

/// Stable colour for a site id
fn cell_color(id: i64) -> image::Rgb<u8> {
    let mut h = (id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h ^= h >> 29;
    h = h.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h ^= h >> 32;
    // Keep channels away from black so site dots stay visible
    image::Rgb([
        64 + (h & 0xbf) as u8,
        64 + ((h >> 8) & 0xbf) as u8,
        64 + ((h >> 16) & 0xbf) as u8,
    ])
}

/// Fill every cell polygon into an image whose longest side is `size` pixels.
/// Pixels covered by no cell stay white.
fn render_preview(
    diagram: &Diagram,
    bounds: &Bounds,
    size: u32,
    sites: Option<&[Position]>,
) -> image::RgbImage {
    let scale = size.max(1) as f64 / bounds.width().max(bounds.height());
    let width = ((bounds.width() * scale).round() as u32).max(1);
    let height = ((bounds.height() * scale).round() as u32).max(1);
    let mut image = image::RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));

    let to_pixel = |p: &Position| ((p.x - bounds.left) * scale, (p.y - bounds.top) * scale);

    for cell in diagram.iter() {
        let color = cell_color(cell.site.id);
        let (mut x0, mut y0, mut x1, mut y1) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for p in &cell.region {
            let (px, py) = to_pixel(p);
            x0 = x0.min(px);
            y0 = y0.min(py);
            x1 = x1.max(px);
            y1 = y1.max(py);
        }
        let (px0, py0) = (x0.floor().max(0.0) as u32, y0.floor().max(0.0) as u32);
        let (px1, py1) = (
            (x1.ceil() as u32).min(width),
            (y1.ceil() as u32).min(height),
        );
        for py in py0..py1 {
            for px in px0..px1 {
                let world = Position::new(
                    bounds.left + (px as f64 + 0.5) / scale,
                    bounds.top + (py as f64 + 0.5) / scale,
                );
                if cell.contains(&world) {
                    image.put_pixel(px, py, color);
                }
            }
        }
    }

    if let Some(sites) = sites {
        draw_sites(&mut image, sites, bounds, scale);
    }
    image
}

/// Draw 3x3 black dots at each site position
fn draw_sites(image: &mut image::RgbImage, sites: &[Position], bounds: &Bounds, scale: f64) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    for site in sites {
        let cx = ((site.x - bounds.left) * scale) as i32;
        let cy = ((site.y - bounds.top) * scale) as i32;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let px = cx + dx;
                let py = cy + dy;
                if px >= 0 && px < w && py >= 0 && py < h {
                    image.put_pixel(px as u32, py as u32, image::Rgb([0, 0, 0]));
                }
            }
        }
    }
}

/// One benchmark row
struct BenchResult {
    engine: &'static str,
    resolution: u32,
    mean: Duration,
    /// Summed |area - exact area| over cells, relative to the domain (p = 2 only)
    area_error: Option<f64>,
}

/// Time every engine over the resolution sweep.
fn run_benchmark(request: &Request, args: &Args) -> anyhow::Result<()> {
    let resolutions = parse_resolutions(&args.bench_resolutions)?;
    let runs = args.bench_runs.max(1);

    // Set up SIGINT handler
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || {
            interrupted.store(true, Ordering::SeqCst);
        })
        .context("failed to set Ctrl-C handler")?;
    }

    let mut engines = vec![("grid-union", EngineChoice::GridUnion, FloodDevice::Cpu)];
    engines.push(("jump-flood/cpu", EngineChoice::JumpFlood, FloodDevice::Cpu));
    if args.gpu {
        engines.push(("jump-flood/gpu", EngineChoice::JumpFlood, FloodDevice::Gpu));
    }

    println!("\n=== Lp Voronoi Benchmark ===");
    println!("Sites: {}", request.sites.len());
    println!("Metric: p = {}", request.metric);
    println!("Bounds: {:?}", request.bounds);
    println!("Runs: {}", runs);
    println!();

    let exact = if request.metric.is_euclidean() {
        Some(
            lpvoronoi_core::HalfPlaneEngine::new()
                .compute_euclidean(request.sites.as_slice(), &request.bounds)?,
        )
    } else {
        None
    };

    let total = (resolutions.len() * engines.len() * runs) as u64;
    let progress = ProgressBar::new(total);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut results: Vec<BenchResult> = Vec::new();
    'sweep: for &resolution in &resolutions {
        for &(name, choice, device) in &engines {
            progress.set_message(format!("{} @ {}", name, resolution));
            let mut controller = Controller::new()
                .with_engine(choice)
                .with_device(device)
                .with_cpu_threads(args.threads);
            let input = DiagramInput::new(request.sites.as_slice(), request.bounds)
                .with_metric(request.metric)
                .with_resolution(Some(resolution));

            let mut elapsed = Duration::ZERO;
            let mut last = None;
            for _ in 0..runs {
                if interrupted.load(Ordering::Relaxed) {
                    progress.abandon_with_message("Interrupted");
                    break 'sweep;
                }
                let start = Instant::now();
                last = Some(controller.compute(&input, false)?);
                elapsed += start.elapsed();
                progress.inc(1);
            }
            debug!("{} @ {} ran as {:?}", name, resolution, controller.last_engine());

            let area_error = match (&exact, &last) {
                (Some(exact), Some(approx)) => Some(area_error(exact, approx, &request.bounds)),
                _ => None,
            };
            results.push(BenchResult {
                engine: name,
                resolution,
                mean: elapsed / runs as u32,
                area_error,
            });
        }
    }

    if !interrupted.load(Ordering::Relaxed) {
        progress.finish_with_message("Benchmark complete");
    }

    if let Some(exact) = &exact {
        let mut controller = Controller::new().with_engine(EngineChoice::HalfPlane);
        let input = DiagramInput::new(request.sites.as_slice(), request.bounds);
        let start = Instant::now();
        controller.compute(&input, true)?;
        println!(
            "\nhalf-plane (exact): {:.2} ms, {} cells",
            start.elapsed().as_secs_f64() * 1000.0,
            exact.len()
        );
    }

    print_results(&results);
    Ok(())
}

/// Summed per-cell absolute area difference, relative to the domain area.
fn area_error(exact: &Diagram, approx: &Diagram, bounds: &Bounds) -> f64 {
    let err: f64 = exact
        .iter()
        .map(|cell| {
            let approx_area = approx.cell_for(cell.site.id).map_or(0.0, |c| c.area());
            (cell.area() - approx_area).abs()
        })
        .sum();
    err / bounds.area()
}

fn print_results(results: &[BenchResult]) {
    if results.is_empty() {
        println!("No results collected.");
        return;
    }
    println!();
    println!("{:>16} {:>6} {:>10} {:>10}", "engine", "res", "mean_ms", "area_err");
    for r in results {
        let err = r
            .area_error
            .map_or_else(|| "-".to_string(), |e| format!("{:.4}", e));
        println!(
            "{:>16} {:>6} {:>10.2} {:>10}",
            r.engine,
            r.resolution,
            r.mean.as_secs_f64() * 1000.0,
            err
        );
    }
}

#[macro_use]
extern crate log;

mod app;

use app::*;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use raycast_api::*;
use raycast_core::geometry::*;
use raycast_core::pbrt::*;
use raycast_core::stats::stats_accumulator;
use raycast_core::{print_stats, report_stats};
use raycast_shapes::{PLYMesh, TriangleHit, TriangleMesh};
use std::sync::{Arc, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

fn main() {
    // Initialize `env_logger`.
    env_logger::init();

    let options = Options::parse();
    if let Err(e) = run(&options) {
        error!("{e}");
        std::process::exit(1);
    }
}

/// Result of casting one ray through both paths.
struct CastResult {
    hits: usize,
    matched: bool,
    indexed: Duration,
    linear: Duration,
}

fn run(options: &Options) -> Result<(), String> {
    let mesh = Arc::new(load_mesh(options).map_err(|e| e.to_string())?);
    info!(
        "Mesh has {} triangles, {} vertices",
        mesh.num_triangles(),
        mesh.num_vertices()
    );

    let indexed = Geometry::from_shared(Arc::clone(&mesh));
    let linear = Geometry::from_shared(Arc::clone(&mesh));

    let start = Instant::now();
    let tree = indexed.compute_bounds_tree(options.bvh_options());
    let build_time = start.elapsed();

    let rays = random_rays(&mesh.world_bound(), options);

    let progress = create_progress_reporter(options.rays as u64, options.quiet);
    progress.set_message("Casting rays");

    let mut results: Vec<Option<CastResult>> = (0..rays.len()).map(|_| None).collect();
    let n_threads = options.threads();
    let errors = thread::scope(|scope| {
        let (tx_collector, rx_collector) = crossbeam_channel::bounded::<(usize, CastResult)>(n_threads);
        let (tx_worker, rx_worker) = crossbeam_channel::bounded::<usize>(n_threads);

        // Spawn collector thread.
        let results = results.as_mut_slice();
        scope.spawn(move || {
            for (i, result) in rx_collector.iter() {
                results[i] = Some(result);
            }
        });

        // Spawn worker threads.
        let workers: Vec<_> = (0..n_threads)
            .map(|_| {
                let rx_worker = rx_worker.clone();
                let tx_collector = tx_collector.clone();
                let (indexed, linear, rays, progress) = (&indexed, &linear, &rays, &progress);
                scope.spawn(move || -> Result<(), String> {
                    for i in rx_worker.iter() {
                        let result = cast(indexed, linear, &rays[i]).map_err(|e| e.to_string())?;
                        if tx_collector.send((i, result)).is_err() {
                            break;
                        }
                        progress.inc(1);
                    }

                    // Report per thread statistics.
                    report_stats!();
                    Ok(())
                })
            })
            .collect();
        drop(rx_worker); // Drop extra since we've cloned one for each worker.
        drop(tx_collector);

        // Send work.
        for i in 0..rays.len() {
            if tx_worker.send(i).is_err() {
                break;
            }
        }
        drop(tx_worker);

        workers
            .into_iter()
            .filter_map(|w| match w.join() {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(_) => Some("worker thread panicked".to_string()),
            })
            .collect::<Vec<_>>()
    });
    progress.finish_with_message("Casting complete");

    if let Some(e) = errors.into_iter().next() {
        return Err(e);
    }

    let results: Vec<CastResult> = results.into_iter().flatten().collect();
    let mismatches = results.iter().filter(|r| !r.matched).count();
    let total_hits: usize = results.iter().map(|r| r.hits).sum();
    let indexed_time: Duration = results.iter().map(|r| r.indexed).sum();
    let linear_time: Duration = results.iter().map(|r| r.linear).sum();

    report_stats!();
    if !options.quiet {
        println!(
            "BVH: {} nodes, depth {}, split {}, built in {:.3?}",
            tree.nodes().len(),
            tree.depth(),
            tree.options().split_method,
            build_time
        );
        println!(
            "{} rays, {} hits, {} mismatches",
            results.len(),
            total_hits,
            mismatches
        );
        println!(
            "Indexed: {:.3?}, linear: {:.3?}, speedup {:.1}x",
            indexed_time,
            linear_time,
            linear_time.as_secs_f64() / indexed_time.as_secs_f64().max(f64::EPSILON)
        );
        print_tree_stats();
    }

    if options.stats {
        print_stats!();
    }

    if mismatches > 0 {
        return Err(format!("{mismatches} rays differ between indexed and linear paths"));
    }
    Ok(())
}

/// Print memory use, leaf occupancy and traversal cost of the BVH from the
/// accumulated statistics.
fn print_tree_stats() {
    let accum = stats_accumulator()
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(bytes) = accum.memory_counter("Memory/BVH tree") {
        println!("BVH memory: {:.2} kB", bytes as f64 / 1024.0);
    }
    let leaves = accum.counter("BVH/Leaf nodes").unwrap_or(0);
    if let Some(avg) = accum
        .int_distribution("BVH/Triangles per leaf node")
        .and_then(|d| d.average())
    {
        println!("{leaves} leaves, {avg:.2} triangles per leaf");
    }
    if let Some((visited, rays)) = accum.ratio("BVH/Nodes visited per ray") {
        if rays > 0 {
            println!("{:.2} nodes visited per ray", visited as f64 / rays as f64);
        }
    }
}

/// Load the PLY file given on the command line or generate a procedural mesh.
fn load_mesh(options: &Options) -> raycast_core::Result<TriangleMesh> {
    if let Some(path) = &options.path {
        return PLYMesh::load(path);
    }

    let detail = options.detail;
    match options.shape {
        Shape::Icosphere => TriangleMesh::icosphere(1.0, detail),
        Shape::UvSphere => {
            let segments = 4 * (detail as usize + 1);
            TriangleMesh::uv_sphere(1.0, 2 * segments, segments)
        }
        Shape::Torus => {
            let segments = 10 * (detail as usize + 1);
            TriangleMesh::torus(1.0, 0.4, segments, 4 * segments)
        }
        Shape::Cuboid => TriangleMesh::cuboid(1.0, 2.0, 3.0),
    }
}

/// Generate rays that start on a sphere around the mesh and point at random
/// points inside its bounds.
///
/// * `bounds`  - Mesh bounds.
/// * `options` - Ray count, seed, side and query mode.
fn random_rays(bounds: &Bounds3f, options: &Options) -> Vec<Raycaster> {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let (center, radius) = if bounds.is_empty() {
        (Point3f::ZERO, 1.0)
    } else {
        (bounds.centroid(), max(bounds.diagonal().length(), 1e-3))
    };

    (0..options.rays)
        .map(|_| {
            let z: Float = rng.gen_range(-1.0..1.0);
            let phi: Float = rng.gen_range(0.0..TWO_PI);
            let r = (1.0 - z * z).max(0.0).sqrt();
            let o = center + Vector3f::new(r * phi.cos(), r * phi.sin(), z) * (2.0 * radius);

            let target = if bounds.is_empty() {
                center
            } else {
                Point3f::new(
                    lerp(rng.gen_range(0.0..=1.0), bounds.p_min.x, bounds.p_max.x),
                    lerp(rng.gen_range(0.0..=1.0), bounds.p_min.y, bounds.p_max.y),
                    lerp(rng.gen_range(0.0..=1.0), bounds.p_min.z, bounds.p_max.z),
                )
            };

            Raycaster::new(o, target - o)
                .with_side(options.side)
                .with_first_hit_only(options.first_hit_only)
        })
        .collect()
}

/// Cast one ray through the bounds tree and by scanning all triangles.
///
/// * `indexed`   - Geometry with a bounds tree attached.
/// * `linear`    - Geometry without a bounds tree.
/// * `raycaster` - The ray.
fn cast(
    indexed: &Geometry,
    linear: &Geometry,
    raycaster: &Raycaster,
) -> raycast_core::Result<CastResult> {
    let start = Instant::now();
    let indexed_hits = indexed.raycast(raycaster)?;
    let indexed_time = start.elapsed();

    let start = Instant::now();
    let linear_hits = linear.raycast(raycaster)?;
    let linear_time = start.elapsed();

    let matched = hit_set(&indexed_hits) == hit_set(&linear_hits);
    if !matched {
        warn!(
            "Ray {:?} has {} indexed and {} linear hits",
            raycaster.ray,
            indexed_hits.len(),
            linear_hits.len()
        );
    }

    Ok(CastResult {
        hits: indexed_hits.len(),
        matched,
        indexed: indexed_time,
        linear: linear_time,
    })
}

/// Returns the triangles and distances of hits in a canonical order.
fn hit_set(hits: &[TriangleHit]) -> Vec<(usize, Float)> {
    let mut set: Vec<(usize, Float)> = hits.iter().map(|h| (h.triangle, h.t)).collect();
    set.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
    set
}

/// Create a progress bar.
///
/// * `len`    - Number of steps.
/// * `hidden` - Don't draw the progress bar.
fn create_progress_reporter(len: u64, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new(len);
    match ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
    ) {
        Ok(style) => progress.set_style(style.progress_chars("##-")),
        Err(e) => warn!("Invalid progress bar template: {e}"),
    }
    progress
}

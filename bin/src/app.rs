//! Command line options

use clap::Parser;
use raycast_accelerators::{BVHOptions, SplitMethod};
use raycast_shapes::Side;
use std::fmt;
use std::str::FromStr;

/// Procedural meshes that can be generated instead of loading a file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    Icosphere,
    UvSphere,
    Torus,
    Cuboid,
}

impl FromStr for Shape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "icosphere" => Ok(Self::Icosphere),
            "uvsphere" | "sphere" => Ok(Self::UvSphere),
            "torus" => Ok(Self::Torus),
            "box" | "cuboid" => Ok(Self::Cuboid),
            _ => Err(format!("unknown shape '{s}'")),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Icosphere => write!(f, "icosphere"),
            Self::UvSphere => write!(f, "uvsphere"),
            Self::Torus => write!(f, "torus"),
            Self::Cuboid => write!(f, "box"),
        }
    }
}

/// System wide options.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Casts random rays into a mesh with and without a BVH and compares the hits.", long_about = None)]
pub struct Options {
    /// Path to a PLY file. A procedural mesh is generated when omitted.
    #[arg(help = "PLY file to load")]
    pub path: Option<String>,

    /// Procedural mesh.
    #[arg(
        long,
        short = 's',
        value_name = "SHAPE",
        default_value_t = Shape::Torus,
        help = "Procedural mesh to generate: icosphere, uvsphere, torus or box."
    )]
    pub shape: Shape,

    /// Subdivision level or segment count of the procedural mesh.
    #[arg(
        long,
        short = 'd',
        value_name = "NUM",
        default_value_t = 3,
        help = "Level of detail of the procedural mesh."
    )]
    pub detail: u32,

    /// Number of rays to cast.
    #[arg(
        long,
        short = 'n',
        value_name = "NUM",
        default_value_t = 10000,
        help = "Number of random rays to cast."
    )]
    pub rays: usize,

    /// Number of threads used to cast rays.
    #[arg(
        long = "nthreads",
        short = 't',
        value_name = "NUM",
        default_value_t = 1,
        help = "Use specified number of threads for casting rays."
    )]
    n_threads: usize,

    /// BVH split method.
    #[arg(
        long = "splitmethod",
        value_name = "METHOD",
        default_value = "middle",
        help = "BVH split method: middle, equal or sah."
    )]
    pub split_method: String,

    /// Maximum triangles per BVH leaf.
    #[arg(
        long = "maxleaftriangles",
        value_name = "NUM",
        default_value_t = 10,
        help = "Maximum number of triangles in a BVH leaf."
    )]
    pub max_leaf_triangles: usize,

    /// Maximum BVH depth.
    #[arg(
        long = "maxdepth",
        value_name = "NUM",
        default_value_t = 40,
        help = "Maximum depth of the BVH."
    )]
    pub max_depth: usize,

    /// Faces that can be hit.
    #[arg(
        long,
        value_name = "SIDE",
        default_value_t = Side::Double,
        help = "Faces that can be hit: front, back or double."
    )]
    pub side: Side,

    /// Only report the closest hit.
    #[arg(long = "first", help = "Only compare the closest hit of each ray.")]
    pub first_hit_only: bool,

    /// Seed for the random rays.
    #[arg(long, value_name = "NUM", default_value_t = 0, help = "Seed for the random rays.")]
    pub seed: u64,

    /// Print statistics.
    #[arg(long, help = "Print intersection statistics.")]
    pub stats: bool,

    /// Suppress all text output other than error messages.
    #[arg(long, help = "Suppress all text output other than error messages.")]
    pub quiet: bool,
}

impl Options {
    /// Returns the number of threads to use.
    pub fn threads(&self) -> usize {
        let max_threads = num_cpus::get();
        match self.n_threads {
            0 => {
                warn!("Invalid nthreads");
                1
            }
            n if n > max_threads => {
                warn!("Num threads > max logical CPUs {}", max_threads);
                max_threads
            }
            n => n,
        }
    }

    /// Returns the BVH build options.
    pub fn bvh_options(&self) -> BVHOptions {
        BVHOptions {
            max_leaf_triangles: self.max_leaf_triangles,
            max_depth: self.max_depth,
            split_method: self.split_method.parse::<SplitMethod>().unwrap_or_default(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

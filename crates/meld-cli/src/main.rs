//! meld-ico
//!
//! Generates icosphere surfaces and builds, inspects or clears their
//! cached geometry.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use meld_icosphere::{Cache, CachePolicy, EdgeMode, IcoSpheres, IcosphereConfig, MAX_LEVEL};
use meld_mesh::Encoding;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "meld-ico", version, about = "Icosphere geometry for the MELD graph classifier")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write ico1..icoN surfaces by subdividing an icosahedron
    Generate {
        /// Output directory
        #[arg(long)]
        out: PathBuf,

        /// Finest level to write
        #[arg(long, default_value_t = MAX_LEVEL)]
        max_level: u8,

        /// GIFTI encoding: ASCII, Base64Binary or GZipBase64Binary
        #[arg(long, default_value = "GZipBase64Binary")]
        encoding: Encoding,
    },

    /// Build every level, populating the cache
    Warm(RegistryArgs),

    /// Build every level and print its statistics
    Inspect(RegistryArgs),

    /// Remove cached artifacts for the configured levels
    ClearCache(RegistryArgs),
}

/// Overrides on top of the `MELD_*` environment.
#[derive(Args, Debug)]
struct RegistryArgs {
    /// Directory holding ico{L}.surf.gii
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Cache directory (defaults to --dir)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    #[arg(long)]
    max_level: Option<u8>,

    /// exact or pseudo
    #[arg(long)]
    distance_type: Option<EdgeMode>,

    /// trust, verify or off
    #[arg(long)]
    cache: Option<CachePolicy>,

    /// Build levels one after another
    #[arg(long)]
    sequential: bool,
}

impl RegistryArgs {
    fn into_config(self) -> Result<IcosphereConfig, Box<dyn std::error::Error>> {
        let mut config = IcosphereConfig::try_from_env()?;
        if let Some(dir) = self.dir {
            config.icosphere_dir = dir;
        }
        if let Some(dir) = self.cache_dir {
            config.cache_dir = Some(dir);
        }
        if let Some(level) = self.max_level {
            config.max_level = level;
        }
        if let Some(mode) = self.distance_type {
            config.distance_type = mode;
        }
        if let Some(policy) = self.cache {
            config.cache_policy = policy;
        }
        if self.sequential {
            config.parallel = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meld_ico=info,meld_icosphere=info,meld_mesh=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            out,
            max_level,
            encoding,
        } => generate(out, max_level, encoding),
        Commands::Warm(args) => {
            let ico = IcoSpheres::new(args.into_config()?)?;
            info!(levels = ico.levels().len(), "Cache warm");
            Ok(())
        }
        Commands::Inspect(args) => inspect(args.into_config()?),
        Commands::ClearCache(args) => clear_cache(args.into_config()?),
    }
}

fn generate(out: PathBuf, max_level: u8, encoding: Encoding) -> Result<(), Box<dyn std::error::Error>> {
    IcosphereConfig::new(&out).with_max_level(max_level).validate()?;
    std::fs::create_dir_all(&out)?;

    let mut surface = meld_mesh::icosahedron();
    for level in 1..=max_level {
        surface = meld_mesh::icosahedron::subdivide(&surface);
        let path = out.join(meld_mesh::surface_file_name(level));
        meld_mesh::write_surface(&path, &surface, encoding)?;
        info!(
            level,
            vertices = surface.vertex_count(),
            path = %path.display(),
            "Wrote icosphere"
        );
    }
    Ok(())
}

fn inspect(config: IcosphereConfig) -> Result<(), Box<dyn std::error::Error>> {
    let ico = IcoSpheres::new(config)?;
    println!(
        "{:>5} {:>8} {:>8} {:>9} {:>7} {:>10}",
        "level", "vertices", "faces", "edges", "degree", "adj nnz"
    );
    for level in ico.levels() {
        let degrees = level
            .neighbours
            .degree_range()
            .map(|(lo, hi)| format!("{}-{}", lo, hi))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>5} {:>8} {:>8} {:>9} {:>7} {:>10}",
            level.level,
            level.vertex_count(),
            level.faces.len(),
            level.edge_count(),
            degrees,
            level.adj_mat.nnz()
        );
    }
    Ok(())
}

fn clear_cache(config: IcosphereConfig) -> Result<(), Box<dyn std::error::Error>> {
    let cache = Cache::on_disk(config.cache_dir(), config.cache_policy);
    for level in config.levels() {
        cache.clear_level(level)?;
    }
    info!(dir = %config.cache_dir().display(), max_level = config.max_level, "Cache cleared");
    Ok(())
}

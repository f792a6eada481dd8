//! Eagerly built set of icosphere levels.

use std::collections::BTreeMap;
use std::time::Instant;

use rayon::prelude::*;
use tracing::info;

use crate::cache::Cache;
use crate::config::IcosphereConfig;
use crate::edges::{Edge, EdgeAttr, EdgeMode};
use crate::error::{Error, Result};
use crate::level::IcosphereLevel;

/// Every configured level, built up front and then shared read-only.
///
/// Construction is all-or-nothing: if any level fails to load or has a
/// degenerate vertex, no registry is returned.
#[derive(Debug)]
pub struct IcoSpheres {
    config: IcosphereConfig,
    cache: Cache,
    levels: BTreeMap<u8, IcosphereLevel>,
}

impl IcoSpheres {
    /// Build levels `1..=config.max_level` with the on-disk cache.
    pub fn new(config: IcosphereConfig) -> Result<Self> {
        config.validate()?;
        let cache = Cache::on_disk(config.cache_dir(), config.cache_policy);
        Self::with_cache(config, cache)
    }

    /// Build with an explicit cache, ignoring `config.cache_dir` and
    /// `config.cache_policy`.
    pub fn with_cache(config: IcosphereConfig, cache: Cache) -> Result<Self> {
        config.validate()?;
        let started = Instant::now();
        info!(
            dir = %config.icosphere_dir.display(),
            max_level = config.max_level,
            parallel = config.parallel,
            cache = %cache.policy(),
            "Building icospheres"
        );

        let levels: Vec<u8> = config.levels().collect();
        let build = |level: u8| IcosphereLevel::load(level, &config.surface_path(level), &cache);
        let built: Vec<IcosphereLevel> = if config.parallel {
            levels.into_par_iter().map(build).collect::<Result<_>>()?
        } else {
            levels.into_iter().map(build).collect::<Result<_>>()?
        };

        let levels: BTreeMap<u8, IcosphereLevel> = built.into_iter().map(|l| (l.level, l)).collect();
        info!(
            levels = levels.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Icospheres ready"
        );

        Ok(Self { config, cache, levels })
    }

    pub fn config(&self) -> &IcosphereConfig {
        &self.config
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Full bundle for `level`.
    pub fn level(&self, level: u8) -> Result<&IcosphereLevel> {
        self.levels.get(&level).ok_or(Error::UnknownLevel(level))
    }

    /// Built levels, coarsest first.
    pub fn levels(&self) -> impl ExactSizeIterator<Item = &IcosphereLevel> + '_ {
        self.levels.values()
    }

    pub fn edges(&self, level: u8) -> Result<&[Edge]> {
        Ok(&self.level(level)?.edges)
    }

    /// Edge attributes of `level` in `mode`, aligned with [`IcoSpheres::edges`].
    pub fn edge_vectors(&self, level: u8, mode: EdgeMode) -> Result<&[EdgeAttr]> {
        Ok(self.level(level)?.edge_vectors(mode))
    }

    /// Edge attributes in the configured `distance_type`.
    pub fn default_edge_vectors(&self, level: u8) -> Result<&[EdgeAttr]> {
        self.edge_vectors(level, self.config.distance_type)
    }
}

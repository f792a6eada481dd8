//! Registry configuration.

use std::path::PathBuf;

use crate::cache::CachePolicy;
use crate::edges::EdgeMode;
use crate::error::{Error, Result};

/// Finest icosphere level the classifier uses.
pub const MAX_LEVEL: u8 = 7;

/// Where icospheres live and how their derived data is built and cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcosphereConfig {
    /// Directory holding `ico{L}.surf.gii`.
    pub icosphere_dir: PathBuf,

    /// Directory for cache artifacts; `None` means `icosphere_dir`.
    pub cache_dir: Option<PathBuf>,

    /// Levels `1..=max_level` are built.
    pub max_level: u8,

    /// Edge descriptor returned by `default_edge_vectors`.
    pub distance_type: EdgeMode,

    /// Cache validity policy.
    pub cache_policy: CachePolicy,

    /// Build levels concurrently on the rayon pool.
    pub parallel: bool,
}

impl Default for IcosphereConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl IcosphereConfig {
    /// Defaults, with no environment lookups.
    pub fn new(icosphere_dir: impl Into<PathBuf>) -> Self {
        Self {
            icosphere_dir: icosphere_dir.into(),
            cache_dir: None,
            max_level: MAX_LEVEL,
            distance_type: EdgeMode::Exact,
            cache_policy: CachePolicy::TrustIfPresent,
            parallel: true,
        }
    }

    /// Create config from environment variables with sensible defaults.
    ///
    /// Each variable is read on its own: one that does not parse is
    /// reported and keeps its default, the others still apply.
    pub fn from_env() -> Self {
        let (config, errors) = Self::from_lookup(|name| std::env::var(name).ok());
        for e in errors {
            tracing::warn!("Ignoring icosphere setting: {}", e);
        }
        config
    }

    /// Like [`IcosphereConfig::from_env`], failing on the first bad value.
    pub fn try_from_env() -> Result<Self> {
        let (config, errors) = Self::from_lookup(|name| std::env::var(name).ok());
        match errors.into_iter().next() {
            Some(e) => Err(e),
            None => Ok(config),
        }
    }

    /// Read settings through `lookup`, collecting one error per bad variable.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> (Self, Vec<Error>) {
        let mut config = Self::new(lookup("MELD_ICOSPHERE_DIR").map(PathBuf::from).unwrap_or_else(default_dir));
        let mut errors = Vec::new();
        let invalid = |name: &str, value: &str| Error::InvalidConfig(format!("{}={:?}", name, value));

        if let Some(dir) = lookup("MELD_ICOSPHERE_CACHE_DIR") {
            config.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = lookup("MELD_ICOSPHERE_MAX_LEVEL") {
            match level.trim().parse::<u8>() {
                Ok(l) if (1..=MAX_LEVEL).contains(&l) => config.max_level = l,
                _ => errors.push(invalid("MELD_ICOSPHERE_MAX_LEVEL", &level)),
            }
        }
        if let Some(mode) = lookup("MELD_DISTANCE_TYPE") {
            match mode.parse() {
                Ok(m) => config.distance_type = m,
                Err(e) => errors.push(Error::InvalidConfig(format!("MELD_DISTANCE_TYPE: {}", e))),
            }
        }
        if let Some(policy) = lookup("MELD_ICOSPHERE_CACHE") {
            match policy.parse() {
                Ok(p) => config.cache_policy = p,
                Err(e) => errors.push(Error::InvalidConfig(format!("MELD_ICOSPHERE_CACHE: {}", e))),
            }
        }
        if let Some(parallel) = lookup("MELD_ICOSPHERE_PARALLEL") {
            match parse_bool(&parallel) {
                Some(p) => config.parallel = p,
                None => errors.push(invalid("MELD_ICOSPHERE_PARALLEL", &parallel)),
            }
        }

        (config, errors)
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_max_level(mut self, max_level: u8) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn with_distance_type(mut self, mode: EdgeMode) -> Self {
        self.distance_type = mode;
        self
    }

    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Effective cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| self.icosphere_dir.clone())
    }

    /// Path of the surface file for `level`.
    pub fn surface_path(&self, level: u8) -> PathBuf {
        self.icosphere_dir.join(meld_mesh::surface_file_name(level))
    }

    /// Levels the registry builds, coarsest first.
    pub fn levels(&self) -> impl Iterator<Item = u8> {
        1..=self.max_level
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_LEVEL).contains(&self.max_level) {
            return Err(Error::InvalidConfig(format!(
                "max_level must be within 1..={}, got {}",
                MAX_LEVEL, self.max_level
            )));
        }
        Ok(())
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from("../data/icospheres/")
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::Level;

use versio_cache::GraphOptions;
use versio_types::DEFAULT_BRANCH;

use crate::error::{VersioError, VersioResult};

/// Settings for a [`DocumentRepository`](crate::DocumentRepository).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersioConfig {
    /// Writer discriminator stamped into every revision this process creates.
    pub writer_id: u64,
    pub default_branch: String,
    pub log_level: String,
    pub cache: CacheConfig,
}

impl Default for VersioConfig {
    fn default() -> Self {
        Self {
            writer_id: 0,
            default_branch: DEFAULT_BRANCH.to_string(),
            log_level: "info".to_string(),
            cache: CacheConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Upper bound on cached documents; unbounded if absent.
    pub max_entries: Option<usize>,
    /// Compaction of cached graphs; never compacts if absent.
    pub compaction: Option<CompactionConfig>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionConfig {
    /// Non-head versions kept besides heads and merge bases.
    pub keep_newest: usize,
    /// Compact once a graph holds more versions than this.
    pub trigger_size: usize,
}

impl VersioConfig {
    pub fn from_toml_str(content: &str) -> VersioResult<Self> {
        toml::from_str(content)
            .map_err(|e| VersioError::Config(format!("failed to parse config: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> VersioResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VersioError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> VersioResult<String> {
        toml::to_string(self)
            .map_err(|e| VersioError::Config(format!("failed to write config: {e}")))
    }

    /// The configured log level.
    pub fn level(&self) -> VersioResult<Level> {
        self.log_level
            .parse()
            .map_err(|_| VersioError::Config(format!("unknown log level: {}", self.log_level)))
    }
}

impl CacheConfig {
    /// Compaction policy described by this configuration.
    pub fn graph_options<K, V, M>(&self) -> GraphOptions<K, V, M>
    where
        K: Ord + Clone + 'static,
        V: Clone + PartialEq + 'static,
        M: Clone + 'static,
    {
        match self.compaction {
            Some(c) => GraphOptions::keep_heads_and_newest(c.keep_newest, c.trigger_size),
            None => GraphOptions::keep_all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use versio_graph::VersionGraph;
    use versio_types::{Revision, Version};

    #[test]
    fn default_config() {
        let c = VersioConfig::default();
        assert_eq!(c.writer_id, 0);
        assert_eq!(c.default_branch, DEFAULT_BRANCH);
        assert_eq!(c.level().unwrap(), Level::INFO);
        assert!(c.cache.max_entries.is_none());
        assert!(c.cache.compaction.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = VersioConfig::from_toml_str(
            r#"
            writer_id = 42

            [cache]
            max_entries = 128

            [cache.compaction]
            keep_newest = 10
            trigger_size = 100
            "#,
        )
        .unwrap();

        assert_eq!(c.writer_id, 42);
        assert_eq!(c.default_branch, DEFAULT_BRANCH);
        assert_eq!(c.cache.max_entries, Some(128));
        assert_eq!(
            c.cache.compaction,
            Some(CompactionConfig {
                keep_newest: 10,
                trigger_size: 100
            })
        );
    }

    #[test]
    fn toml_text_parses_back() {
        let mut c = VersioConfig::default();
        c.log_level = "debug".into();
        c.cache.compaction = Some(CompactionConfig {
            keep_newest: 1,
            trigger_size: 2,
        });
        let text = c.to_toml_string().unwrap();
        assert_eq!(VersioConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = VersioConfig::from_toml_str("writer_id = \"one\"").unwrap_err();
        assert!(matches!(err, VersioError::Config(_)));
    }

    #[test]
    fn unknown_level_is_rejected() {
        let c = VersioConfig {
            log_level: "loud".into(),
            ..VersioConfig::default()
        };
        assert!(matches!(c.level(), Err(VersioError::Config(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_branch = \"main\"\nlog_level = \"warn\"").unwrap();

        let c = VersioConfig::from_file(file.path()).unwrap();
        assert_eq!(c.default_branch, "main");
        assert_eq!(c.level().unwrap(), Level::WARN);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = VersioConfig::from_file(dir.path().join("versio.toml")).unwrap_err();
        assert!(matches!(err, VersioError::Config(_)));
    }

    #[test]
    fn compaction_config_builds_policy() {
        let graph: VersionGraph<String, String> = VersionGraph::init((1..=3).map(|n| {
            let builder = Version::builder(Revision::new(n, 0));
            let builder = if n > 1 { builder.parent(Revision::new(n - 1, 0)) } else { builder };
            builder.build()
        }))
        .unwrap();

        let never = CacheConfig::default().graph_options::<String, String, ()>();
        assert!(!never.should_compact(&graph));

        let config = CacheConfig {
            max_entries: None,
            compaction: Some(CompactionConfig {
                keep_newest: 0,
                trigger_size: 2,
            }),
        };
        let options = config.graph_options::<String, String, ()>();
        assert!(options.should_compact(&graph));
        assert_eq!(options.apply(graph).unwrap().len(), 1);
    }
}

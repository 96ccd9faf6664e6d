// config.rs -- runtime configuration, read once at startup

use std::env;
use std::path::{Path, PathBuf};

use tokio::fs;

/// Description length limit when MAX_LONGDESC_LEN is unset.
pub const DEFAULT_MAX_LONGDESC_LEN: usize = 80;

const DEFAULT_PORTDIR: &str = "/usr/portage";

/// Process-lifetime configuration. Built once in main and passed by
/// reference; nothing here mutates after startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub portdir: PathBuf,
    pub max_longdesc_len: usize,
    pub verbose: bool,
    /// Reproduce the historical scripts' herd-names-under-"Maintainer:"
    /// fallback for packages without maintainers.
    pub legacy_herd_fallback: bool,
}

impl Config {
    /// PORTDIR from the environment, then make.conf, then the default;
    /// MAX_LONGDESC_LEN and VERBOSE from the environment.
    pub async fn new() -> Self {
        let portdir = match env::var("PORTDIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => portdir_from_make_conf(Path::new("/etc/portage/make.conf"))
                .await
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PORTDIR)),
        };

        let max_longdesc_len = env::var("MAX_LONGDESC_LEN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_LONGDESC_LEN);

        let verbose = env::var("VERBOSE").map(|v| v == "1").unwrap_or(false);

        Config {
            portdir,
            max_longdesc_len,
            verbose,
            legacy_herd_fallback: true,
        }
    }

    /// herds.xml location inside the tree.
    pub fn herds_xml_path(&self) -> PathBuf {
        self.portdir.join("metadata/herds/herds.xml")
    }

    /// Cache directory for fetched project-member documents.
    pub fn herds_cache_dir(&self) -> PathBuf {
        self.portdir.join("metadata/herds/cache")
    }
}

/// Pull PORTDIR out of make.conf, tolerating quotes and comments.
async fn portdir_from_make_conf(path: &Path) -> Option<PathBuf> {
    let content = fs::read_to_string(path).await.ok()?;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            if key == "PORTDIR" {
                let value = line[eq_pos + 1..].trim().trim_matches('"').trim_matches('\'');
                if !value.is_empty() {
                    return Some(PathBuf::from(value));
                }
            }
        }
    }
    None
}

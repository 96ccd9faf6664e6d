// herds.rs -- herds.xml registry lookup and project-member cache

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use log::warn;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::changelog::local_part;
use crate::exception::ProvenanceError;

/// One maintainer listed directly under a `<herd>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HerdMaintainer {
    pub email: String,
    pub role: Option<String>,
}

impl HerdMaintainer {
    /// Display handle: the email's local part, with the role appended
    /// as `handle(role)` in verbose mode.
    pub fn handle(&self, verbose: bool) -> String {
        let handle = local_part(&self.email);
        match (&self.role, verbose) {
            (Some(role), true) => format!("{}({})", handle, role),
            _ => handle.to_string(),
        }
    }
}

/// A named team of maintainers from the herd registry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Herd {
    pub name: String,
    pub maintainers: Vec<HerdMaintainer>,
    /// Paths of remote project-member documents, normally zero or one.
    pub maintaining_projects: Vec<String>,
}

impl Herd {
    pub fn member_handles(&self, verbose: bool) -> Vec<String> {
        self.maintainers.iter().map(|m| m.handle(verbose)).collect()
    }
}

/// Parsed herds.xml registry document.
#[derive(Debug, Default)]
pub struct HerdRegistry {
    herds: Vec<Herd>,
}

impl HerdRegistry {
    /// Load the registry from `path`. Absence is `NotFound`; an
    /// unparseable file is `MalformedDocument`.
    pub fn load(path: &Path) -> Result<Self, ProvenanceError> {
        if !path.exists() {
            return Err(ProvenanceError::not_found(format!(
                "herds.xml: {}",
                path.display()
            )));
        }
        let xml = fs::read_to_string(path)?;
        Self::parse(&xml)
    }

    pub fn parse(xml: &str) -> Result<Self, ProvenanceError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut herds = Vec::new();
        let mut current: Option<Herd> = None;
        let mut maint_email = String::new();
        let mut maint_role = String::new();
        let mut path: Vec<String> = Vec::new();

        loop {
            match reader.read_event() {
                Err(e) => {
                    return Err(ProvenanceError::malformed(format!("herds.xml: {}", e)));
                }
                Ok(Event::Eof) => {
                    // Missing end tags are not reported by the reader;
                    // anything still open here means truncation.
                    if !path.is_empty() || current.is_some() {
                        return Err(ProvenanceError::malformed(
                            "herds.xml: unclosed element at end of document".to_string(),
                        ));
                    }
                    break;
                }
                Ok(Event::Start(start)) => {
                    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                    match name.as_str() {
                        "herd" => current = Some(Herd::default()),
                        "maintainer" => {
                            maint_email.clear();
                            maint_role.clear();
                        }
                        _ => {}
                    }
                    path.push(name);
                }
                Ok(Event::Text(text)) => {
                    let chunk = text
                        .xml_content()
                        .map_err(|e| ProvenanceError::malformed(format!("herds.xml: {}", e)))?;
                    let herd = match current.as_mut() {
                        Some(h) => h,
                        None => continue,
                    };
                    let in_maintainer = path.iter().any(|n| n == "maintainer");
                    match path.last().map(String::as_str) {
                        Some("name") if !in_maintainer => herd.name.push_str(chunk.trim()),
                        Some("email") if in_maintainer => maint_email.push_str(chunk.trim()),
                        Some("role") if in_maintainer => maint_role.push_str(chunk.trim()),
                        Some("maintainingproject") => {
                            herd.maintaining_projects.push(chunk.trim().to_string())
                        }
                        _ => {}
                    }
                }
                Ok(Event::End(_)) => match path.pop().as_deref() {
                    Some("herd") => {
                        if let Some(herd) = current.take() {
                            herds.push(herd);
                        }
                    }
                    Some("maintainer") => {
                        if let Some(herd) = current.as_mut() {
                            if !maint_email.is_empty() {
                                herd.maintainers.push(HerdMaintainer {
                                    email: std::mem::take(&mut maint_email),
                                    role: if maint_role.is_empty() {
                                        None
                                    } else {
                                        Some(std::mem::take(&mut maint_role))
                                    },
                                });
                            }
                            maint_role.clear();
                        }
                    }
                    _ => {}
                },
                Ok(_) => {}
            }
        }

        Ok(HerdRegistry { herds })
    }

    /// All herd names in document order.
    pub fn herd_names(&self) -> Vec<&str> {
        self.herds.iter().map(|h| h.name.as_str()).collect()
    }

    pub fn find(&self, name: &str) -> Option<&Herd> {
        self.herds.iter().find(|h| h.name == name)
    }
}

/// Retrieves the raw bytes of a project-member document by its site
/// path. Network policy lives entirely behind this seam.
#[async_trait]
pub trait ProjectFetcher: Send + Sync {
    async fn fetch(&self, project_path: &str) -> Result<Vec<u8>, ProvenanceError>;
}

/// Time-based on-disk cache of fetched project-member documents, one
/// file per herd.
#[derive(Debug)]
pub struct ProjectCache {
    cache_dir: PathBuf,
    max_age: Duration,
}

impl ProjectCache {
    pub fn new(cache_dir: impl Into<PathBuf>, max_age: Duration) -> Self {
        ProjectCache {
            cache_dir: cache_dir.into(),
            max_age,
        }
    }

    fn cache_file(&self, herd: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.xml", herd))
    }

    /// Missing or older than `max_age`.
    fn is_stale(&self, path: &Path) -> bool {
        let mtime = match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(_) => return true,
        };
        match SystemTime::now().duration_since(mtime) {
            Ok(age) => age > self.max_age,
            // Clock went backwards; treat the file as fresh.
            Err(_) => false,
        }
    }

    /// Member handles of `herd`'s maintaining project, refetching
    /// through `fetcher` only when the cached document is stale. A
    /// failed fetch or an unparseable cached document removes the cache
    /// file so a stale copy is never kept around, then propagates.
    pub async fn project_members(
        &self,
        herd: &Herd,
        fetcher: &dyn ProjectFetcher,
    ) -> Result<Vec<String>, ProvenanceError> {
        let project_path = match herd.maintaining_projects.first() {
            Some(path) => path,
            None => return Ok(Vec::new()),
        };
        if herd.maintaining_projects.len() > 1 {
            warn!(
                "herd {} has {} maintainingprojects, using the first",
                herd.name,
                herd.maintaining_projects.len()
            );
        }

        let cache_file = self.cache_file(&herd.name);
        if self.is_stale(&cache_file) {
            fs::create_dir_all(&self.cache_dir)?;
            match fetcher.fetch(project_path).await {
                Ok(bytes) => fs::write(&cache_file, bytes)?,
                Err(e) => {
                    let _ = fs::remove_file(&cache_file);
                    return Err(e);
                }
            }
        }

        match self.read_members(&cache_file) {
            Ok(members) => Ok(members),
            Err(e) => {
                let _ = fs::remove_file(&cache_file);
                Err(e)
            }
        }
    }

    /// Member handles from the cache only, for callers with no fetcher
    /// configured. A missing cache document yields no members.
    pub fn cached_members(&self, herd: &Herd) -> Result<Vec<String>, ProvenanceError> {
        if herd.maintaining_projects.is_empty() {
            return Ok(Vec::new());
        }
        let cache_file = self.cache_file(&herd.name);
        if !cache_file.exists() {
            warn!(
                "no cached project members for herd {} and no fetcher configured",
                herd.name
            );
            return Ok(Vec::new());
        }
        self.read_members(&cache_file)
    }

    /// Parse `<dev>` element texts out of a cached project document.
    fn read_members(&self, path: &Path) -> Result<Vec<String>, ProvenanceError> {
        let xml = fs::read_to_string(path)?;
        let mut reader = Reader::from_str(&xml);
        reader.config_mut().trim_text(true);

        let mut members = Vec::new();
        let mut in_dev = false;
        loop {
            match reader.read_event() {
                Err(e) => {
                    return Err(ProvenanceError::malformed(format!(
                        "{}: {}",
                        path.display(),
                        e
                    )));
                }
                Ok(Event::Eof) => break,
                Ok(Event::Start(start)) => {
                    in_dev = start.name().as_ref() == b"dev";
                }
                Ok(Event::Text(text)) if in_dev => {
                    let chunk = text.xml_content().map_err(|e| {
                        ProvenanceError::malformed(format!("{}: {}", path.display(), e))
                    })?;
                    let member = chunk.trim();
                    if !member.is_empty() {
                        members.push(member.to_string());
                    }
                }
                Ok(Event::End(_)) => in_dev = false,
                Ok(_) => {}
            }
        }
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HERDS_XML: &str = r#"<?xml version="1.0"?>
<herds>
  <herd>
    <name>python</name>
    <email>python@gentoo.org</email>
    <description>Python packages</description>
    <maintainer>
      <email>dev1@gentoo.org</email>
      <role>lead</role>
    </maintainer>
    <maintainer>
      <email>dev2@gentoo.org</email>
    </maintainer>
  </herd>
  <herd>
    <name>kde</name>
    <maintainingproject>/proj/en/desktop/kde/kde-herd.xml</maintainingproject>
  </herd>
</herds>"#;

    const PROJECT_XML: &str = r#"<?xml version="1.0"?>
<project>
  <dev role="member">alice</dev>
  <dev>bob</dev>
</project>"#;

    struct StaticFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProjectFetcher for StaticFetcher {
        async fn fetch(&self, _project_path: &str) -> Result<Vec<u8>, ProvenanceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PROJECT_XML.as_bytes().to_vec())
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl ProjectFetcher for FailingFetcher {
        async fn fetch(&self, project_path: &str) -> Result<Vec<u8>, ProvenanceError> {
            Err(ProvenanceError::not_found(project_path.to_string()))
        }
    }

    #[test]
    fn test_parse_registry() {
        let registry = HerdRegistry::parse(HERDS_XML).unwrap();
        assert_eq!(registry.herd_names(), vec!["python", "kde"]);

        let python = registry.find("python").unwrap();
        assert_eq!(python.maintainers.len(), 2);
        assert_eq!(python.maintainers[0].email, "dev1@gentoo.org");
        assert_eq!(python.maintainers[0].role, Some("lead".to_string()));
        assert!(python.maintaining_projects.is_empty());

        let kde = registry.find("kde").unwrap();
        assert!(kde.maintainers.is_empty());
        assert_eq!(
            kde.maintaining_projects,
            vec!["/proj/en/desktop/kde/kde-herd.xml".to_string()]
        );
    }

    #[test]
    fn test_herd_alias_email_is_not_a_maintainer() {
        let registry = HerdRegistry::parse(HERDS_XML).unwrap();
        let python = registry.find("python").unwrap();
        assert!(
            python
                .maintainers
                .iter()
                .all(|m| m.email != "python@gentoo.org")
        );
    }

    #[test]
    fn test_member_handles() {
        let registry = HerdRegistry::parse(HERDS_XML).unwrap();
        let python = registry.find("python").unwrap();
        assert_eq!(python.member_handles(false), vec!["dev1", "dev2"]);
        assert_eq!(python.member_handles(true), vec!["dev1(lead)", "dev2"]);
    }

    #[test]
    fn test_unknown_herd() {
        let registry = HerdRegistry::parse(HERDS_XML).unwrap();
        assert!(registry.find("no-such-herd").is_none());
    }

    #[test]
    fn test_load_missing_registry() {
        let err = HerdRegistry::load(Path::new("/nonexistent/herds.xml")).unwrap_err();
        assert!(matches!(err, ProvenanceError::NotFound(_)));
    }

    #[test]
    fn test_parse_malformed_registry() {
        for truncated in [
            "<herds><herd>",
            "<herds><herd><name>python</name>",
            "<herds>",
        ] {
            let err = HerdRegistry::parse(truncated).unwrap_err();
            assert!(
                matches!(err, ProvenanceError::MalformedDocument(_)),
                "{:?}",
                truncated
            );
        }
    }

    #[tokio::test]
    async fn test_cache_fetches_once_while_fresh() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = ProjectCache::new(dir.path(), Duration::from_secs(3600));
        let registry = HerdRegistry::parse(HERDS_XML).unwrap();
        let kde = registry.find("kde").unwrap();

        let fetcher = StaticFetcher {
            calls: AtomicUsize::new(0),
        };
        let members = cache.project_members(kde, &fetcher).await.unwrap();
        assert_eq!(members, vec!["alice", "bob"]);

        // Second lookup is served from the fresh cache file.
        let members = cache.project_members(kde, &fetcher).await.unwrap();
        assert_eq!(members, vec!["alice", "bob"]);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_cache_is_refetched() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = ProjectCache::new(dir.path(), Duration::from_secs(0));
        let registry = HerdRegistry::parse(HERDS_XML).unwrap();
        let kde = registry.find("kde").unwrap();

        let fetcher = StaticFetcher {
            calls: AtomicUsize::new(0),
        };
        cache.project_members(kde, &fetcher).await.unwrap();
        cache.project_members(kde, &fetcher).await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_removes_cache_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = ProjectCache::new(dir.path(), Duration::from_secs(0));
        let registry = HerdRegistry::parse(HERDS_XML).unwrap();
        let kde = registry.find("kde").unwrap();

        let err = cache.project_members(kde, &FailingFetcher).await.unwrap_err();
        assert!(matches!(err, ProvenanceError::NotFound(_)));
        assert!(!dir.path().join("kde.xml").exists());
    }

    #[tokio::test]
    async fn test_herd_without_project_needs_no_fetch() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = ProjectCache::new(dir.path(), Duration::from_secs(0));
        let registry = HerdRegistry::parse(HERDS_XML).unwrap();
        let python = registry.find("python").unwrap();

        let members = cache.project_members(python, &FailingFetcher).await.unwrap();
        assert!(members.is_empty());
    }

    #[test]
    fn test_cached_members_without_fetcher() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = ProjectCache::new(dir.path(), Duration::from_secs(3600));
        let registry = HerdRegistry::parse(HERDS_XML).unwrap();
        let kde = registry.find("kde").unwrap();

        // No cache file yet.
        assert!(cache.cached_members(kde).unwrap().is_empty());

        fs::write(dir.path().join("kde.xml"), PROJECT_XML).unwrap();
        assert_eq!(cache.cached_members(kde).unwrap(), vec!["alice", "bob"]);
    }
}

// actions.rs -- report driver: per-package iteration and error isolation

use std::time::Duration;

use log::debug;
use tokio::fs;

use crate::changelog::{ChangelogAggregator, format_summary};
use crate::config::Config;
use crate::exception::ProvenanceError;
use crate::herds::{HerdRegistry, ProjectCache};
use crate::output::{self, ReportLine};
use crate::porttree::PortTree;
use crate::xml::metadata::{HerdEntry, PackageDescriptor};

// Cached project-member documents older than this are considered stale.
const HERDS_CACHE_MAX_AGE: Duration = Duration::from_secs(100);

/// Full per-package report: herd, maintainer and description from
/// metadata.xml, with the ChangeLog authorship summary standing in when
/// no metadata exists. One package's failure never stops the rest.
pub async fn action_metadata(packages: &[String], config: &Config) -> i32 {
    let tree = PortTree::new(&config.portdir);
    let aggregator = ChangelogAggregator::default();
    let mut failed = false;

    for pkg in packages {
        let location = match tree.resolve(pkg) {
            Ok(location) => location,
            Err(e) => {
                debug!("resolving {}: {}", pkg, e);
                println!("{}", output::error_line(&format!("'{}' does not exist", pkg)));
                failed = true;
                continue;
            }
        };

        let metadata_path = location.metadata_path();
        if metadata_path.exists() {
            let descriptor = match read_descriptor(&metadata_path).await {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    println!("{}", output::error_line(&format!("{}: {}", location.cp(), e)));
                    failed = true;
                    continue;
                }
            };
            let line = ReportLine::for_package(&location.cp()).with_descriptor(&descriptor, config);
            println!("{}", line.render());
        } else {
            // No metadata at all: flag the package and fall back to
            // ChangeLog authorship.
            let mut line = ReportLine::for_package(&location.cp());
            line.missing_metadata = true;
            match aggregator.aggregate_file(&location.changelog_path()) {
                Ok(ranked) => line.changelog = Some(format_summary(&ranked)),
                Err(e) => {
                    debug!("{}: {}", location.cp(), e);
                    failed = true;
                }
            }
            println!("{}", line.render());
        }
    }

    if failed { 1 } else { 0 }
}

/// Bare maintainer emails, herd names when there are none. Mirrors the
/// plain-text variant: no labels, space-joined, silent for packages
/// without metadata.
pub async fn action_maintainer(packages: &[String], config: &Config) -> i32 {
    let tree = PortTree::new(&config.portdir);
    let mut failed = false;

    for pkg in packages {
        let location = match tree.resolve(pkg) {
            Ok(location) => location,
            Err(_) => {
                failed = true;
                continue;
            }
        };
        let metadata_path = location.metadata_path();
        if !metadata_path.exists() {
            continue;
        }
        match read_descriptor(&metadata_path).await {
            Ok(descriptor) => {
                let emails: Vec<String> = descriptor
                    .maintainers
                    .iter()
                    .filter_map(|m| m.email.clone())
                    .collect();
                let text = if emails.is_empty() {
                    descriptor
                        .herds
                        .iter()
                        .filter_map(|h| match h {
                            HerdEntry::Named(name) => Some(name.clone()),
                            HerdEntry::Malformed => None,
                        })
                        .collect::<Vec<_>>()
                        .join(" ")
                } else {
                    emails.join(" ")
                };
                println!("{}", text);
            }
            Err(e) => {
                println!("{}", output::error_line(&format!("{}: {}", location.cp(), e)));
                failed = true;
            }
        }
    }

    if failed { 1 } else { 0 }
}

/// Ranked ChangeLog authorship summary per package.
pub async fn action_changelog(packages: &[String], config: &Config) -> i32 {
    let tree = PortTree::new(&config.portdir);
    let aggregator = ChangelogAggregator::default();
    let mut failed = false;

    for pkg in packages {
        let location = match tree.resolve(pkg) {
            Ok(location) => location,
            Err(e) => {
                debug!("resolving {}: {}", pkg, e);
                println!("{}", output::error_line(&format!("'{}' does not exist", pkg)));
                failed = true;
                continue;
            }
        };
        match aggregator.aggregate_file(&location.changelog_path()) {
            Ok(ranked) => {
                let mut line = ReportLine::for_package(&location.cp());
                line.changelog = Some(format_summary(&ranked));
                println!("{}", line.render());
            }
            Err(e) => {
                println!("{}", output::error_line(&format!("{}: {}", location.cp(), e)));
                failed = true;
            }
        }
    }

    if failed { 1 } else { 0 }
}

/// List all herds, or resolve one herd to its sorted member handles.
/// Project members come from the on-disk cache; no fetcher is wired up
/// in the CLI.
pub async fn action_herd(herd: Option<&str>, all: bool, config: &Config) -> i32 {
    let registry = match HerdRegistry::load(&config.herds_xml_path()) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("{}", output::error_line(&e.to_string()));
            return 1;
        }
    };

    if all {
        for name in registry.herd_names() {
            println!("{}", name);
        }
        return 0;
    }

    let name = match herd {
        Some(name) => name,
        None => {
            eprintln!("{}", output::error_line("no herd given"));
            return 1;
        }
    };
    let herd = match registry.find(name) {
        Some(herd) => herd,
        None => {
            eprintln!("{}", output::error_line("no such herd!"));
            return 1;
        }
    };

    let mut handles = herd.member_handles(config.verbose);
    let cache = ProjectCache::new(config.herds_cache_dir(), HERDS_CACHE_MAX_AGE);
    match cache.cached_members(herd) {
        Ok(members) => handles.extend(members),
        Err(e) => {
            eprintln!("{}", output::error_line(&e.to_string()));
            return 1;
        }
    }

    if handles.is_empty() {
        println!("herd doesn't exist or has no maintainers or herds.xml is out of date");
        return 1;
    }
    handles.sort();
    println!("{}", handles.join(", "));
    0
}

async fn read_descriptor(path: &std::path::Path) -> Result<PackageDescriptor, ProvenanceError> {
    let xml = fs::read_to_string(path).await?;
    PackageDescriptor::parse(&xml)
}

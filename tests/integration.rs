use std::fs;
use std::path::{Path, PathBuf};

use metadata_rs::actions;
use metadata_rs::changelog::{ChangelogAggregator, format_summary};
use metadata_rs::config::Config;
use metadata_rs::output::ReportLine;
use metadata_rs::porttree::PortTree;
use metadata_rs::xml::metadata::PackageDescriptor;

const HELLO_METADATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<pkgmetadata>
  <herd>shell-tools</herd>
  <maintainer>
    <email>a@gentoo.org</email>
    <description>lead</description>
  </maintainer>
  <longdescription>Prints a friendly
greeting on standard output.</longdescription>
</pkgmetadata>"#;

const OLD_CHANGELOG: &str = "\
*old-1.1 (02 Jan 2006)\n\
\n\
  02 Jan 2006; Dev One <dev1@gentoo.org> old-1.1.ebuild:\n\
  Version bump.\n\
\n\
*old-1.0 (01 Jan 2006)\n\
\n\
  01 Jan 2006; Dev One <dev1@gentoo.org> old-1.0.ebuild:\n\
  Initial import. Tested by Dev Two <dev2@gentoo.org>.\n";

const HERDS_XML: &str = r#"<herds>
  <herd>
    <name>shell-tools</name>
    <maintainer><email>b@gentoo.org</email><role>janitor</role></maintainer>
    <maintainer><email>a@gentoo.org</email></maintainer>
  </herd>
</herds>"#;

fn fixture_tree() -> tempfile::TempDir {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();

    let hello = root.join("app-misc/hello");
    fs::create_dir_all(&hello).unwrap();
    fs::write(hello.join("metadata.xml"), HELLO_METADATA).unwrap();

    let old = root.join("app-misc/old");
    fs::create_dir_all(&old).unwrap();
    fs::write(old.join("ChangeLog"), OLD_CHANGELOG).unwrap();

    let orphan = root.join("dev-python/orphan");
    fs::create_dir_all(&orphan).unwrap();
    fs::write(
        orphan.join("metadata.xml"),
        "<pkgmetadata><herd>python</herd></pkgmetadata>",
    )
    .unwrap();

    let herds_dir = root.join("metadata/herds");
    fs::create_dir_all(&herds_dir).unwrap();
    fs::write(herds_dir.join("herds.xml"), HERDS_XML).unwrap();

    dir
}

fn fixture_config(portdir: &Path) -> Config {
    Config {
        portdir: PathBuf::from(portdir),
        max_longdesc_len: 80,
        verbose: false,
        legacy_herd_fallback: true,
    }
}

#[tokio::test]
async fn test_metadata_report_succeeds_for_known_packages() {
    let tree = fixture_tree();
    let config = fixture_config(tree.path());

    let packages = vec![
        "app-misc/hello".to_string(),
        "app-misc/old".to_string(),
        "orphan".to_string(),
    ];
    let result = actions::action_metadata(&packages, &config).await;
    assert_eq!(result, 0);
}

#[tokio::test]
async fn test_unknown_package_fails_without_stopping_the_rest() {
    let tree = fixture_tree();
    let config = fixture_config(tree.path());

    let packages = vec!["no-such/package".to_string(), "app-misc/hello".to_string()];
    let result = actions::action_metadata(&packages, &config).await;
    assert_eq!(result, 1);
}

#[tokio::test]
async fn test_maintainer_and_changelog_actions() {
    let tree = fixture_tree();
    let config = fixture_config(tree.path());

    let packages = vec!["app-misc/hello".to_string()];
    assert_eq!(actions::action_maintainer(&packages, &config).await, 0);

    let packages = vec!["app-misc/old".to_string()];
    assert_eq!(actions::action_changelog(&packages, &config).await, 0);

    // hello has no ChangeLog, so the changelog report fails for it.
    let packages = vec!["app-misc/hello".to_string()];
    assert_eq!(actions::action_changelog(&packages, &config).await, 1);
}

#[tokio::test]
async fn test_herd_action() {
    let tree = fixture_tree();
    let config = fixture_config(tree.path());

    assert_eq!(actions::action_herd(None, true, &config).await, 0);
    assert_eq!(actions::action_herd(Some("shell-tools"), false, &config).await, 0);
    assert_eq!(actions::action_herd(Some("no-such-herd"), false, &config).await, 1);
}

#[test]
fn test_full_pipeline_produces_expected_report() {
    metadata_rs::output::nocolor();
    let tree = fixture_tree();
    let config = fixture_config(tree.path());
    let port_tree = PortTree::new(tree.path());

    // Package with metadata: descriptor drives the report.
    let location = port_tree.resolve("hello").unwrap();
    let xml = fs::read_to_string(location.metadata_path()).unwrap();
    let descriptor = PackageDescriptor::parse(&xml).unwrap();
    let line = ReportLine::for_package(&location.cp())
        .with_descriptor(&descriptor, &config)
        .render();
    assert_eq!(
        line,
        "Package: app-misc/hello Herd: shell-tools \
         Maintainer: a@gentoo.org (Maint-desc: lead) \
         Description: Prints a friendly greeting on standard output."
    );

    // Package without metadata: ChangeLog authorship fallback.
    let location = port_tree.resolve("old").unwrap();
    assert!(!location.metadata_path().exists());
    let aggregator = ChangelogAggregator::default();
    let ranked = aggregator.aggregate_file(&location.changelog_path()).unwrap();
    let mut line = ReportLine::for_package(&location.cp());
    line.missing_metadata = true;
    line.changelog = Some(format_summary(&ranked));
    assert_eq!(
        line.render(),
        "Package: app-misc/old Metadata: missing? candidate for tree removal \
         ChangeLog: 2 dev1, 1 dev2"
    );
}

// output.rs -- report line assembly and colored labels

use colored::Colorize;

use crate::config::Config;
use crate::xml::metadata::PackageDescriptor;

/// Marker printed when a package ships no metadata.xml at all.
pub const MISSING_METADATA: &str = "missing? candidate for tree removal";

/// Disable colored output process-wide.
pub fn nocolor() {
    colored::control::set_override(false);
}

fn label(text: &str) -> String {
    text.green().to_string()
}

pub fn error_line(text: &str) -> String {
    text.red().to_string()
}

/// The final human-readable summary for one package. Built per package
/// argument; packages never share state beyond the startup config.
#[derive(Debug, Default)]
pub struct ReportLine {
    pub package: String,
    pub herd: Option<String>,
    pub maintainer: Option<String>,
    pub description: Option<String>,
    pub changelog: Option<String>,
    pub missing_metadata: bool,
}

impl ReportLine {
    pub fn for_package(cp: &str) -> Self {
        ReportLine {
            package: cp.to_string(),
            ..Default::default()
        }
    }

    /// Fill the metadata sections from a parsed descriptor.
    pub fn with_descriptor(mut self, descriptor: &PackageDescriptor, config: &Config) -> Self {
        let herd = descriptor.herd_display();
        if !herd.is_empty() {
            self.herd = Some(herd);
        }
        let maintainer = descriptor.maintainer_display(config.legacy_herd_fallback);
        if !maintainer.is_empty() {
            self.maintainer = Some(maintainer);
        }
        self.description = descriptor.long_description(config.max_longdesc_len);
        self
    }

    pub fn render(&self) -> String {
        let mut out = format!("{}{}", label("Package: "), self.package);
        if self.missing_metadata {
            out.push(' ');
            out.push_str(&label("Metadata: "));
            out.push_str(MISSING_METADATA);
        }
        if let Some(herd) = &self.herd {
            out.push(' ');
            out.push_str(&label("Herd: "));
            out.push_str(herd);
        }
        if let Some(maintainer) = &self.maintainer {
            out.push(' ');
            out.push_str(&label("Maintainer: "));
            out.push_str(maintainer);
        }
        if let Some(description) = &self.description {
            out.push(' ');
            out.push_str(&label("Description: "));
            out.push_str(description);
        }
        if let Some(changelog) = &self.changelog {
            out.push(' ');
            out.push_str(&label("ChangeLog: "));
            out.push_str(changelog);
        }
        out
    }
}

// metadata.rs -- metadata.xml parsing and field resolution

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::exception::ProvenanceError;

/// Marker text for a herd element with no name. Kept in the report so
/// tree-quality problems stay visible instead of being dropped.
pub const BOGUS_HERD: &str = "bogus empty herd";
/// Marker text for a maintainer element with no email.
pub const BOGUS_MAINTAINER: &str = "bogus (empty?) maintainer";

/// Suffix appended when a long description is truncated.
pub const ELLIPSIS: &str = "...";

/// One `<herd>` element. An empty element is recorded, not dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HerdEntry {
    Named(String),
    Malformed,
}

impl HerdEntry {
    pub fn display(&self) -> &str {
        match self {
            HerdEntry::Named(name) => name,
            HerdEntry::Malformed => BOGUS_HERD,
        }
    }
}

/// One `<maintainer>` element. `email: None` means the element was
/// present but carried no email, a data-quality marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maintainer {
    pub email: Option<String>,
    pub description: Option<String>,
}

impl Maintainer {
    pub fn display(&self) -> String {
        match &self.email {
            Some(email) => match &self.description {
                Some(desc) => format!("{} (Maint-desc: {})", email, desc),
                None => email.clone(),
            },
            None => BOGUS_MAINTAINER.to_string(),
        }
    }
}

/// Parsed metadata.xml for one package. Immutable after parsing. A
/// descriptor with no herds and no maintainers is a valid, empty
/// descriptor; "file absent" and "file unparseable" are separate cases
/// handled by the caller and by `parse` respectively.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageDescriptor {
    pub herds: Vec<HerdEntry>,
    pub maintainers: Vec<Maintainer>,
    pub longdescription: Option<String>,
}

impl PackageDescriptor {
    /// Parse a metadata.xml document. Returns `MalformedDocument` when
    /// the text is not well-formed XML; missing or empty fields are not
    /// errors.
    pub fn parse(xml: &str) -> Result<Self, ProvenanceError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut descriptor = PackageDescriptor::default();

        // Element path from the document root down to the current node.
        let mut path: Vec<String> = Vec::new();
        let mut herd_text = String::new();
        let mut email_text = String::new();
        let mut desc_text = String::new();
        let mut long_text = String::new();
        let mut maint_email: Option<String> = None;
        let mut maint_desc: Option<String> = None;

        loop {
            match reader.read_event() {
                Err(e) => {
                    return Err(ProvenanceError::malformed(format!("metadata.xml: {}", e)));
                }
                Ok(Event::Eof) => {
                    // The reader does not flag missing end tags itself;
                    // an open element at EOF means a truncated document.
                    if !path.is_empty() {
                        return Err(ProvenanceError::malformed(format!(
                            "metadata.xml: unclosed <{}> at end of document",
                            path[path.len() - 1]
                        )));
                    }
                    break;
                }
                Ok(Event::Start(start)) => {
                    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                    match name.as_str() {
                        "herd" => herd_text.clear(),
                        "maintainer" => {
                            maint_email = None;
                            maint_desc = None;
                        }
                        "email" => email_text.clear(),
                        "description" => desc_text.clear(),
                        "longdescription" => long_text.clear(),
                        _ => {}
                    }
                    path.push(name);
                }
                Ok(Event::Empty(start)) => {
                    // Self-closing elements count as present-but-empty.
                    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                    match name.as_str() {
                        "herd" => descriptor.herds.push(HerdEntry::Malformed),
                        "maintainer" => descriptor.maintainers.push(Maintainer {
                            email: None,
                            description: None,
                        }),
                        _ => {}
                    }
                }
                Ok(Event::Text(text)) => {
                    let chunk = text
                        .xml_content()
                        .map_err(|e| ProvenanceError::malformed(format!("metadata.xml: {}", e)))?;
                    match path.last().map(String::as_str) {
                        Some("herd") => herd_text.push_str(&chunk),
                        Some("email") if Self::in_maintainer(&path) => {
                            email_text.push_str(&chunk)
                        }
                        Some("description") if Self::in_maintainer(&path) => {
                            desc_text.push_str(&chunk)
                        }
                        Some("longdescription") => long_text.push_str(&chunk),
                        _ => {}
                    }
                }
                Ok(Event::End(_)) => {
                    match path.pop().as_deref() {
                        Some("herd") => {
                            let name = herd_text.trim();
                            if name.is_empty() {
                                descriptor.herds.push(HerdEntry::Malformed);
                            } else {
                                descriptor.herds.push(HerdEntry::Named(name.to_string()));
                            }
                        }
                        Some("email") if Self::in_maintainer(&path) => {
                            let email = email_text.trim();
                            if !email.is_empty() {
                                maint_email = Some(email.to_string());
                            }
                            email_text.clear();
                        }
                        Some("description") if Self::in_maintainer(&path) => {
                            let desc = desc_text.trim();
                            if !desc.is_empty() {
                                maint_desc = Some(desc.to_string());
                            }
                            desc_text.clear();
                        }
                        Some("maintainer") => {
                            descriptor.maintainers.push(Maintainer {
                                email: maint_email.take(),
                                description: maint_desc.take(),
                            });
                        }
                        Some("longdescription") => {
                            let text = long_text.trim();
                            if !text.is_empty() {
                                descriptor.longdescription = Some(text.to_string());
                            }
                        }
                        _ => {}
                    }
                }
                Ok(_) => {}
            }
        }

        Ok(descriptor)
    }

    fn in_maintainer(path: &[String]) -> bool {
        path.iter().any(|name| name == "maintainer")
    }

    /// Present but carrying no herds, maintainers or description.
    pub fn is_empty(&self) -> bool {
        self.herds.is_empty() && self.maintainers.is_empty() && self.longdescription.is_none()
    }

    /// Herd names joined with ", ", malformed entries included as
    /// markers.
    pub fn herd_display(&self) -> String {
        self.herds
            .iter()
            .map(|h| h.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Maintainer text for the report. With maintainers present, each
    /// email followed by its description in parentheses. With none,
    /// the historical scripts showed the herd list under the
    /// "Maintainer:" label; `legacy_herd_fallback` keeps that behavior,
    /// false yields empty text instead.
    pub fn maintainer_display(&self, legacy_herd_fallback: bool) -> String {
        if self.maintainers.is_empty() {
            if legacy_herd_fallback {
                return self.herd_display();
            }
            return String::new();
        }
        self.maintainers
            .iter()
            .map(|m| m.display())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Long description with line breaks collapsed to spaces, truncated
    /// to `max_len` characters with an ellipsis when it does not fit.
    pub fn long_description(&self, max_len: usize) -> Option<String> {
        let text = self.longdescription.as_ref()?;
        let mut flat = text.replace('\n', " ");
        if flat.chars().count() > max_len {
            flat = flat.chars().take(max_len).collect();
            flat.push_str(ELLIPSIS);
        }
        Some(flat)
    }
}

//! Header and footer data for the personal homepage.
//!
//! The renderer reads two records: `headerData` (navigation links and call
//! to action buttons) and `footerData` (link groups, secondary links, social
//! links and the foot note). The built-in values live in [`builtin`]; a site
//! can override them with `.config/homepage.yaml` using the same shape.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::LazyLock;
use tracing::debug;

mod builtin;

/// Configuration directory name
const CONFIG_DIR: &str = ".config";
const CONFIG_FILE_YAML: &str = "homepage.yaml";

/// Errors raised while loading or validating site data
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The YAML file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The YAML did not match the expected shape.
    #[error("failed to parse site data: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Serializing the renderer export failed.
    #[error("failed to serialize site data: {0}")]
    Serialize(#[from] serde_json::Error),

    /// An entry broke one of the data invariants.
    #[error("invalid entry at {location}: {reason}")]
    Invalid { location: String, reason: String },
}

/// A label/target pair rendered as a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub text: String,
    pub href: String,
}

impl NavLink {
    pub fn new(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: href.into(),
        }
    }

    /// Classify the href, or `None` when it is not a supported link form
    pub fn target(&self) -> Option<LinkTarget<'_>> {
        LinkTarget::classify(&self.href)
    }
}

/// What a link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget<'a> {
    /// Absolute path on this site, possibly with a fragment (`/blog`, `/#about`)
    Path(&'a str),
    /// In-page anchor, without the leading `#`
    Anchor(&'a str),
    /// The bare `#` used by links that have nowhere to go yet
    Placeholder,
    /// `http(s)://`, `mailto:` or `tel:` URL
    External(&'a str),
}

impl<'a> LinkTarget<'a> {
    pub fn classify(href: &'a str) -> Option<Self> {
        if href == "#" {
            Some(Self::Placeholder)
        } else if let Some(id) = href.strip_prefix('#') {
            if id.chars().any(char::is_whitespace) {
                None
            } else {
                Some(Self::Anchor(id))
            }
        } else if href.starts_with('/') && !href.starts_with("//") {
            Some(Self::Path(href))
        } else if ["http://", "https://", "mailto:", "tel:"]
            .iter()
            .any(|scheme| href.starts_with(scheme) && href.len() > scheme.len())
        {
            Some(Self::External(href))
        } else {
            None
        }
    }

    /// Same-site links: paths and anchors (the placeholder goes nowhere)
    pub fn is_same_site(&self) -> bool {
        matches!(self, Self::Path(_) | Self::Anchor(_))
    }
}

/// `headerData`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderData {
    #[serde(default)]
    pub links: Vec<NavLink>,
    #[serde(default)]
    pub actions: Vec<NavLink>,
}

/// One titled column of footer links
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FooterLinkGroup {
    pub title: String,
    #[serde(default)]
    pub links: Vec<NavLink>,
}

/// Icon link to a social profile or feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
    pub aria_label: String,
    pub icon: String,
    pub href: String,
}

/// `footerData`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FooterData {
    #[serde(default)]
    pub links: Vec<FooterLinkGroup>,
    #[serde(default)]
    pub secondary_links: Vec<NavLink>,
    #[serde(default)]
    pub social_links: Vec<SocialLink>,
    #[serde(default)]
    pub foot_note: String,
}

/// Everything the renderer needs from this crate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteData {
    #[serde(rename = "headerData")]
    pub header: HeaderData,
    #[serde(rename = "footerData")]
    pub footer: FooterData,
}

static BUILTIN: LazyLock<SiteData> = LazyLock::new(builtin::site_data);

impl SiteData {
    /// The site data shipped with this crate
    pub fn builtin() -> &'static SiteData {
        &BUILTIN
    }

    /// Parse and validate site data from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let mut data: SiteData = serde_yaml::from_str(yaml)?;
        data.footer.foot_note = data.footer.foot_note.trim().to_string();
        data.validate()?;
        Ok(data)
    }

    /// Load site data from a YAML file
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        debug!(%path, "Loading site data");
        Self::from_yaml_str(&content)
    }

    /// Load `.config/homepage.yaml` from `start` or one of its ancestors,
    /// falling back to the built-in data when there is none.
    pub fn discover_from(start: &Utf8Path) -> Result<Self, ConfigError> {
        match find_config_file(start) {
            Some(path) => Self::load(&path),
            None => {
                debug!(%start, "No site data override found, using built-in data");
                Ok(Self::builtin().clone())
            }
        }
    }

    /// Check every entry against the link invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, link) in self.header.links.iter().enumerate() {
            check_link(&format!("headerData.links[{i}]"), link)?;
        }
        for (i, link) in self.header.actions.iter().enumerate() {
            check_link(&format!("headerData.actions[{i}]"), link)?;
        }
        for (g, group) in self.footer.links.iter().enumerate() {
            if group.title.trim().is_empty() {
                return Err(invalid(
                    format!("footerData.links[{g}]"),
                    "group title is empty",
                ));
            }
            for (i, link) in group.links.iter().enumerate() {
                check_link(&format!("footerData.links[{g}].links[{i}]"), link)?;
            }
        }
        for (i, link) in self.footer.secondary_links.iter().enumerate() {
            check_link(&format!("footerData.secondaryLinks[{i}]"), link)?;
        }
        for (i, social) in self.footer.social_links.iter().enumerate() {
            let location = format!("footerData.socialLinks[{i}]");
            if social.aria_label.trim().is_empty() {
                return Err(invalid(location, "ariaLabel is empty"));
            }
            if social.icon.trim().is_empty() {
                return Err(invalid(location, "icon is empty"));
            }
            if LinkTarget::classify(&social.href).is_none() {
                return Err(invalid(
                    location,
                    format!("unsupported href {:?}", social.href),
                ));
            }
        }
        Ok(())
    }

    /// The `{ headerData, footerData }` document handed to the renderer
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn check_link(location: &str, link: &NavLink) -> Result<(), ConfigError> {
    if link.text.trim().is_empty() {
        return Err(invalid(location, "text is empty"));
    }
    if link.target().is_none() {
        return Err(invalid(
            location,
            format!("unsupported href {:?}", link.href),
        ));
    }
    Ok(())
}

fn invalid(location: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        location: location.into(),
        reason: reason.into(),
    }
}

/// Search for `.config/homepage.yaml` walking up from `start`
pub fn find_config_file(start: &Utf8Path) -> Option<Utf8PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE_YAML))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_link_forms() {
        assert_eq!(LinkTarget::classify("/"), Some(LinkTarget::Path("/")));
        assert_eq!(
            LinkTarget::classify("/#about"),
            Some(LinkTarget::Path("/#about"))
        );
        assert_eq!(
            LinkTarget::classify("#projects"),
            Some(LinkTarget::Anchor("projects"))
        );
        assert_eq!(LinkTarget::classify("#"), Some(LinkTarget::Placeholder));
        assert_eq!(
            LinkTarget::classify("https://www.linkedin.com/"),
            Some(LinkTarget::External("https://www.linkedin.com/"))
        );
        assert_eq!(LinkTarget::classify(""), None);
        assert_eq!(LinkTarget::classify("blog"), None);
        assert_eq!(LinkTarget::classify("//cdn.example.com/x.js"), None);
        assert_eq!(LinkTarget::classify("https://"), None);
        assert_eq!(LinkTarget::classify("#two words"), None);
    }

    #[test]
    fn placeholder_is_not_same_site() {
        assert!(!LinkTarget::Placeholder.is_same_site());
        assert!(LinkTarget::Anchor("about").is_same_site());
        assert!(!LinkTarget::External("https://example.com").is_same_site());
    }

    #[test]
    fn builtin_data_is_valid() {
        SiteData::builtin().validate().unwrap();
    }

    #[test]
    fn builtin_header_matches_section_anchors() {
        let hrefs: Vec<_> = SiteData::builtin()
            .header
            .links
            .iter()
            .map(|l| l.href.as_str())
            .collect();
        assert_eq!(hrefs, ["/", "#about", "#projects", "#testimonials", "/blog"]);
    }

    #[test]
    fn yaml_uses_renderer_field_names() {
        let yaml = r#"
headerData:
  links:
    - { text: Home, href: / }
  actions: []
footerData:
  secondaryLinks:
    - { text: Terms, href: /terms }
  socialLinks:
    - { ariaLabel: RSS, icon: "tabler:rss", href: /rss.xml }
  footNote: |
    Made by me.
"#;
        let data = SiteData::from_yaml_str(yaml).unwrap();
        assert_eq!(data.header.links, vec![NavLink::new("Home", "/")]);
        assert_eq!(data.footer.social_links[0].aria_label, "RSS");
        assert_eq!(data.footer.foot_note, "Made by me.");
        assert!(data.footer.links.is_empty());
    }

    #[test]
    fn rejects_relative_href() {
        let yaml = r#"
headerData:
  links:
    - { text: Blog, href: blog }
footerData: {}
"#;
        let err = SiteData::from_yaml_str(yaml).unwrap_err();
        match err {
            ConfigError::Invalid { location, .. } => assert_eq!(location, "headerData.links[0]"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_empty_label() {
        let mut data = SiteData::builtin().clone();
        data.footer.secondary_links.push(NavLink::new("  ", "/x"));
        assert!(matches!(
            data.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn json_export_has_renderer_shape() {
        let json = SiteData::builtin().to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["headerData"]["links"].is_array());
        assert!(value["headerData"]["actions"].is_array());
        assert!(value["footerData"]["secondaryLinks"].is_array());
        assert_eq!(value["footerData"]["socialLinks"][1]["ariaLabel"], "RSS");
        assert!(value["footerData"]["footNote"].is_string());
    }
}

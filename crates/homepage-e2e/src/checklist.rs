//! What the scenarios check for
//!
//! Defaults describe the de-branded personal homepage. A site can adjust
//! them with `.config/homepage-e2e.yaml`, found by walking up from the
//! working directory, or point at a file explicitly.

use camino::{Utf8Path, Utf8PathBuf};
use homepage_config::SiteData;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use tracing::debug;

const CONFIG_DIR: &str = ".config";
const CHECKLIST_FILE: &str = "homepage-e2e.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ChecklistError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid title pattern {pattern:?}: {source}")]
    TitlePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Expectations shared by all scenarios
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "snake_case", deny_unknown_fields)]
pub struct Checklist {
    /// Regex the home page `<title>` must match
    pub title_pattern: String,

    /// Strings that must not appear in the first `main h1`
    pub forbidden_main_heading: Vec<String>,

    /// Strings that must not appear in any `h1`..`h6`
    pub forbidden_headings: Vec<String>,

    /// Phrases that must not appear in the hero (first `section`)
    pub forbidden_hero_phrases: Vec<String>,

    /// Section ids the home page must render
    pub required_sections: Vec<String>,

    /// Extra accepted labels per nav href (`#projects: [Portfolio]`)
    pub label_alternatives: BTreeMap<String, Vec<String>>,

    /// Routes that must answer 404
    pub disabled_routes: Vec<String>,

    pub blog_route: String,

    /// Case-insensitive words, at least one of which the blog main
    /// content must contain
    pub blog_markers: Vec<String>,
}

impl Default for Checklist {
    fn default() -> Self {
        Self {
            title_pattern: "HomePage|AstroWind".to_string(),
            forbidden_main_heading: strings(&["Sarah Johnson"]),
            forbidden_headings: strings(&["PERSONAL WEB DEMO", "Personal Web Demo"]),
            forbidden_hero_phrases: strings(&[
                "I'm a Graphic Designer passionate about crafting visual stories",
            ]),
            required_sections: strings(&["about", "projects", "testimonials"]),
            label_alternatives: BTreeMap::from([(
                "#projects".to_string(),
                strings(&["Portfolio"]),
            )]),
            disabled_routes: strings(&["/homes/saas", "/homes/startup", "/homes/mobile-app"]),
            blog_route: "/blog".to_string(),
            blog_markers: strings(&["blog", "post", "article"]),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl Checklist {
    pub fn load(path: &Utf8Path) -> Result<Self, ChecklistError> {
        let content = fs::read_to_string(path).map_err(|source| ChecklistError::Read {
            path: path.to_owned(),
            source,
        })?;
        let checklist: Checklist =
            serde_yaml::from_str(&content).map_err(|source| ChecklistError::Parse {
                path: path.to_owned(),
                source,
            })?;
        checklist.title_regex()?;
        debug!(%path, "Loaded checklist");
        Ok(checklist)
    }

    /// `.config/homepage-e2e.yaml` from `start` upwards, or the defaults
    pub fn discover_from(start: &Utf8Path) -> Result<Self, ChecklistError> {
        let found = start
            .ancestors()
            .map(|dir| dir.join(CONFIG_DIR).join(CHECKLIST_FILE))
            .find(|candidate| candidate.is_file());
        match found {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn title_regex(&self) -> Result<regex::Regex, ChecklistError> {
        regex::Regex::new(&self.title_pattern).map_err(|source| ChecklistError::TitlePattern {
            pattern: self.title_pattern.clone(),
            source,
        })
    }

    /// Labels accepted for a configured nav entry
    pub fn accepted_labels<'a>(&'a self, text: &'a str, href: &str) -> Vec<&'a str> {
        let mut labels = vec![text];
        if let Some(alternatives) = self.label_alternatives.get(href) {
            labels.extend(alternatives.iter().map(String::as_str));
        }
        labels
    }
}

/// Everything a scenario needs besides the site itself
#[derive(Debug, Clone)]
pub struct Expectations {
    pub site: SiteData,
    pub checklist: Checklist,
}

impl Default for Expectations {
    fn default() -> Self {
        Self {
            site: SiteData::builtin().clone(),
            checklist: Checklist::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_disabled_homes() {
        let checklist = Checklist::default();
        assert_eq!(
            checklist.disabled_routes,
            ["/homes/saas", "/homes/startup", "/homes/mobile-app"]
        );
        assert!(checklist.title_regex().unwrap().is_match("Markus Smet | HomePage"));
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let checklist: Checklist = serde_yaml::from_str(
            "disabled_routes: [/homes/saas]\nlabel_alternatives:\n  \"#about\": [Me]\n",
        )
        .unwrap();
        assert_eq!(checklist.disabled_routes, ["/homes/saas"]);
        assert_eq!(checklist.blog_route, "/blog");
        assert_eq!(checklist.accepted_labels("About", "#about"), ["About", "Me"]);
        assert_eq!(checklist.accepted_labels("Blog", "/blog"), ["Blog"]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<Checklist, _> = serde_yaml::from_str("blog_rout: /news\n");
        assert!(result.is_err());
    }

    #[test]
    fn bad_title_pattern_fails_to_load() {
        let dir = tempfile::Builder::new()
            .prefix("homepage-checklist-")
            .tempdir()
            .unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join(".config")).unwrap();
        fs::write(root.join(".config/homepage-e2e.yaml"), "title_pattern: \"(\"\n").unwrap();
        let err = Checklist::discover_from(&root.join(".config")).unwrap_err();
        assert!(matches!(err, ChecklistError::TitlePattern { .. }), "{err}");
    }
}

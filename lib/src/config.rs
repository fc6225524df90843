use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Chainable, ErrorKind, Result};

pub use toml::Table;

pub const CONFIG_FILE: &str = "quire.toml";

/// The three independent axes a build is parameterized over.
///
/// Conditional regions and macro gating are evaluated against these values;
/// they never change for the duration of a build.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BuildContext {
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub edition: Option<String>,
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "markdown".into()
}

fn default_content() -> PathBuf {
    "content".into()
}

impl Default for BuildContext {
    fn default() -> Self {
        BuildContext::new(default_format())
    }
}

impl BuildContext {
    pub fn new<F: Into<String>>(format: F) -> Self {
        BuildContext { preset: None, edition: None, format: format.into() }
    }

    pub fn with_preset<S: Into<String>>(mut self, preset: S) -> Self {
        self.preset = Some(preset.into());
        self
    }

    pub fn with_edition<S: Into<String>>(mut self, edition: S) -> Self {
        self.edition = Some(edition.into());
        self
    }

    pub fn preset(&self) -> Option<&str> {
        self.preset.as_deref()
    }

    pub fn edition(&self) -> Option<&str> {
        self.edition.as_deref()
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// `true` for formats that render one node per slide.
    pub fn is_slides(&self) -> bool {
        matches!(self.format(), "deckset" | "revealjs")
    }
}

/// One entry of the declarative book structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    pub slug: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub config: toml::Table,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new<S: Into<String>>(slug: S) -> Self {
        NodeSpec { slug: slug.into(), ..Default::default() }
    }

    pub fn tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    fn validate(&self, parent: &str) -> Result<()> {
        let slug = self.slug.as_str();
        if slug.is_empty() || slug.contains(['.', '/', '\\']) || slug.trim() != slug {
            return Err(error! {
                "invalid slug in structure definition",
                "slugs must be non-empty and may not contain '.', '/', or whitespace padding",
                "slug" => format!("{slug:?}"),
                "parent" => if parent.is_empty() { "<root>" } else { parent },
            }.with_kind(ErrorKind::Config));
        }

        let id = match parent {
            "" => slug.to_string(),
            parent => format!("{parent}.{slug}"),
        };

        self.children.iter().try_for_each(|child| child.validate(&id))
    }
}

/// The typed contents of a `quire.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub build: BuildContext,
    /// Directory holding node sources, relative to the config file.
    #[serde(default = "default_content")]
    pub content: PathBuf,
    /// Drop `<summary>`/`</summary>` marker lines from the output.
    #[serde(default)]
    pub strip_summary_tags: bool,
    /// Configuration every node starts from.
    #[serde(default)]
    pub defaults: toml::Table,
    #[serde(default)]
    pub structure: Vec<NodeSpec>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            build: BuildContext::default(),
            content: default_content(),
            strip_summary_tags: false,
            defaults: toml::Table::new(),
            structure: vec![],
        }
    }
}

impl Settings {
    /// Parses and validates settings from TOML source.
    pub fn parse(source: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(source)
            .chain_with(|| error!("invalid configuration"))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reads `path`, resolving `content` relative to the file's directory.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).chain_with(|| error! {
            "failed to read configuration",
            "path" => path.display(),
        })?;

        let mut settings = Settings::parse(&source).chain_with(|| error! {
            "failed to load configuration",
            "path" => path.display(),
        })?;

        if settings.content.is_relative() {
            let base = path.parent().unwrap_or(Path::new(""));
            settings.content = base.join(&settings.content);
        }

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.build.format.trim().is_empty() {
            return Err(error!("output format may not be empty").with_kind(ErrorKind::Config));
        }

        self.structure.iter().try_for_each(|spec| spec.validate(""))
    }
}

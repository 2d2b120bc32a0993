//! Formula manifest: one TOML file per release or fork of a tool.

use crate::constants;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formula {
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    pub version: String,
    pub url: String,
    pub sha256: String,
    /// Operator guidance printed after install.
    #[serde(default)]
    pub caveats: Option<String>,
    #[serde(default)]
    pub head: Option<HeadSpec>,
    #[serde(default)]
    pub depends_on: DependsOn,
    #[serde(default)]
    pub test: TestSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadSpec {
    pub url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependsOn {
    /// `"3.8"` pins major.minor; absent or `"latest"` accepts any Python 3.
    #[serde(default)]
    pub python: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    #[serde(default = "default_test_args")]
    pub args: Vec<String>,
    #[serde(default = "default_test_expect")]
    pub expect: String,
}

impl Default for TestSpec {
    fn default() -> Self {
        Self {
            args: default_test_args(),
            expect: default_test_expect(),
        }
    }
}

fn default_branch() -> String {
    constants::DEFAULT_HEAD_BRANCH.to_string()
}

fn default_test_args() -> Vec<String> {
    constants::DEFAULT_TEST_ARGS.iter().map(|s| s.to_string()).collect()
}

fn default_test_expect() -> String {
    constants::DEFAULT_TEST_EXPECT.to_string()
}

/// Immutable, checksummed source bundle for one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub version: String,
    pub url: String,
    pub sha256: String,
}

/// Python interpreter requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    AnyPython3,
    Python { major: u32, minor: u32 },
}

impl Requirement {
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let raw = match raw.map(str::trim) {
            None | Some("") | Some("latest") => return Ok(Self::AnyPython3),
            Some(r) => r,
        };
        let (major, minor) = raw
            .split_once('.')
            .with_context(|| format!("python requirement '{}' must be MAJOR.MINOR", raw))?;
        let major: u32 = major
            .parse()
            .with_context(|| format!("invalid python major version in '{}'", raw))?;
        let minor: u32 = minor
            .parse()
            .with_context(|| format!("invalid python minor version in '{}'", raw))?;
        if major != 3 {
            bail!("unsupported python requirement '{}': only Python 3 is supported", raw);
        }
        Ok(Self::Python { major, minor })
    }

    /// Whether an interpreter reporting `major.minor` satisfies this requirement.
    pub fn accepts(&self, major: u32, minor: u32) -> bool {
        match self {
            Self::AnyPython3 => major == 3,
            Self::Python {
                major: want_major,
                minor: want_minor,
            } => major == *want_major && minor == *want_minor,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnyPython3 => write!(f, "python3"),
            Self::Python { major, minor } => write!(f, "python@{}.{}", major, minor),
        }
    }
}

impl Formula {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("read formula {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("load formula {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut formula: Formula = toml::from_str(content).context("parse formula")?;
        formula.sha256 = formula.sha256.trim().to_ascii_lowercase();
        formula.validate()?;
        Ok(formula)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in self.string_fields() {
            if value.contains("{{") {
                bail!("formula field '{}' contains an unrendered placeholder", field);
            }
        }
        parse_tool_name(&self.name).map_err(|e| anyhow::anyhow!("formula name: {}", e))?;
        parse_path_component(&self.version)
            .map_err(|e| anyhow::anyhow!("formula version: {}", e))?;
        if self.url.trim().is_empty() {
            bail!("formula url is empty");
        }
        if self.sha256.len() != 64 || !self.sha256.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("formula sha256 must be 64 hex characters");
        }
        if self.test.expect.is_empty() {
            bail!("formula test.expect is empty");
        }
        Requirement::parse(self.depends_on.python.as_deref())?;
        Ok(())
    }

    fn string_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("name", self.name.as_str()),
            ("version", self.version.as_str()),
            ("url", self.url.as_str()),
            ("sha256", self.sha256.as_str()),
        ];
        if let Some(head) = &self.head {
            fields.push(("head.url", head.url.as_str()));
            fields.push(("head.branch", head.branch.as_str()));
        }
        if let Some(python) = &self.depends_on.python {
            fields.push(("depends_on.python", python.as_str()));
        }
        fields
    }

    pub fn artifact(&self) -> Artifact {
        Artifact {
            name: self.name.clone(),
            version: self.version.clone(),
            url: self.url.clone(),
            sha256: self.sha256.clone(),
        }
    }

    pub fn requirement(&self) -> Result<Requirement> {
        Requirement::parse(self.depends_on.python.as_deref())
    }
}

/// Tool names become directory and lock file names.
pub fn parse_tool_name(s: &str) -> Result<String, String> {
    parse_path_component(s)?;
    Ok(s.to_string())
}

/// A single directory name under the cellar: `[a-zA-Z0-9._-]`, not
/// starting with `.` (so never `.` or `..`).
pub fn parse_path_component(s: &str) -> Result<(), String> {
    if s.is_empty() {
        return Err("name cannot be empty".into());
    }
    if s.starts_with('.') {
        return Err("must not start with '.'".into());
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        return Err("only [a-zA-Z0-9._-] allowed".into());
    }
    Ok(())
}

//! Package-related type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Shared handle to engine-owned package metadata.
pub type PackageRef = Arc<Package>;

/// Package metadata as exposed by the engine for the duration of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub arch: Option<String>,
    /// Database the package came from; `None` for local files.
    #[serde(default)]
    pub repository: Option<String>,
    /// Basename of the package archive.
    #[serde(default)]
    pub filename: Option<String>,
    /// Basenames of binary patches that rebuild this package.
    #[serde(default)]
    pub deltas: Vec<String>,
    #[serde(default)]
    pub optdepends: Vec<Depend>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Package {
    /// Create package metadata with only a name and version
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            arch: None,
            repository: None,
            filename: None,
            deltas: Vec::new(),
            optdepends: Vec::new(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    #[must_use]
    pub fn with_delta(mut self, delta: impl Into<String>) -> Self {
        self.deltas.push(delta.into());
        self
    }

    #[must_use]
    pub fn with_optdepend(mut self, depend: Depend) -> Self {
        self.optdepends.push(depend);
        self
    }

    #[must_use]
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    #[must_use]
    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    /// Wrap into a shared reference
    #[must_use]
    pub fn into_ref(self) -> PackageRef {
        Arc::new(self)
    }

    /// Job-client identifier: `name;version;arch;data`
    #[must_use]
    pub fn package_id(&self) -> String {
        format!(
            "{};{};{};{}",
            self.name,
            self.version,
            self.arch.as_deref().unwrap_or(""),
            self.repository.as_deref().unwrap_or("local")
        )
    }

    /// Whether a downloaded file with `basename` belongs to this package.
    ///
    /// Delta basenames only count when delta downloads are enabled.
    #[must_use]
    pub fn has_basename(&self, basename: &str, use_delta: bool) -> bool {
        if self.filename.as_deref() == Some(basename) {
            return true;
        }

        use_delta && self.deltas.iter().any(|delta| delta == basename)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// Version comparison modifier of a dependency expression.
///
/// Declaration order is the engine's ordering and is used when sorting
/// dependency lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DepMod {
    #[default]
    Any,
    Eq,
    Ge,
    Le,
    Gt,
    Lt,
}

impl DepMod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "",
            Self::Eq => "=",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Lt => "<",
        }
    }
}

/// Dependency expression such as `python>=3.11: scripting support`
///
/// Field order matters: the derived ordering compares name, then modifier,
/// then version, then description.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Depend {
    pub name: String,
    pub modifier: DepMod,
    pub version: Option<String>,
    pub description: Option<String>,
}

impl Depend {
    /// Unversioned dependency on `name`
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifier: DepMod::Any,
            version: None,
            description: None,
        }
    }
}

impl fmt::Display for Depend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        match (&self.version, self.modifier) {
            (Some(version), modifier) if modifier != DepMod::Any => {
                write!(f, "{}{version}", modifier.as_str())?;
            }
            _ => {}
        }
        if let Some(description) = &self.description {
            write!(f, ": {description}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid dependency expression: {input}")]
pub struct DependParseError {
    pub input: String,
}

impl FromStr for Depend {
    type Err = DependParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (expr, description) = match s.split_once(": ") {
            Some((expr, desc)) => (expr, Some(desc.trim().to_string())),
            None => (s, None),
        };

        let (name, modifier, version) = match expr.find(['<', '>', '=']) {
            Some(pos) => {
                let (name, rest) = expr.split_at(pos);
                let (modifier, version) = [
                    (">=", DepMod::Ge),
                    ("<=", DepMod::Le),
                    ("=", DepMod::Eq),
                    (">", DepMod::Gt),
                    ("<", DepMod::Lt),
                ]
                .into_iter()
                .find_map(|(op, modifier)| rest.strip_prefix(op).map(|v| (modifier, v)))
                .ok_or_else(|| DependParseError {
                    input: s.to_string(),
                })?;
                (name, modifier, Some(version.trim().to_string()))
            }
            None => (expr, DepMod::Any, None),
        };

        let name = name.trim();
        if name.is_empty() || version.as_deref() == Some("") {
            return Err(DependParseError {
                input: s.to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            modifier,
            version,
            description,
        })
    }
}

impl TryFrom<String> for Depend {
    type Error = DependParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Depend> for String {
    fn from(depend: Depend) -> Self {
        depend.to_string()
    }
}

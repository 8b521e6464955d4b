use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Root package manifest structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Package name
    pub name: String,

    /// Package version
    #[serde(rename = "ver")]
    pub version: String,

    /// Files packed into the archive by `create`, in archive order
    #[serde(rename = "targets", default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,

    /// Pre-resolved dependencies fetched by `update`, in fetch order
    #[serde(rename = "packages", default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyRef>,
}

impl Manifest {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            files: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.files.push(path.into());
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.dependencies.push(DependencyRef::new(name, version));
        self
    }
}

/// A flat `(name, version)` reference to another package archive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyRef {
    pub name: String,

    #[serde(rename = "ver")]
    pub version: String,
}

impl DependencyRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for DependencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

// `"targets": null` is treated the same as an absent list
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

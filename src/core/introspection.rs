use crate::core::catalog::FunctionCatalog;
use crate::core::descriptor::Kind;
use crate::core::error::Result;
use crate::core::registration::Registration;
use serde::{Deserialize, Serialize};

/// Read-only description of one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInfo {
    pub name: String,
    pub kind: Kind,
    pub input_shape: String,
    pub output_shape: String,
}

impl FunctionInfo {
    fn describe(name: &str, registration: &Registration) -> Self {
        let descriptor = registration.descriptor();
        Self {
            name: name.to_string(),
            kind: descriptor.kind(),
            input_shape: descriptor.input_tag().to_string(),
            output_shape: descriptor.output_tag().to_string(),
        }
    }
}

impl FunctionCatalog {
    /// Every registered name with its kind and shapes, ordered by name and
    /// taken from a single read of the catalog.
    pub fn snapshot(&self) -> Vec<FunctionInfo> {
        let entries = self.read_entries();
        let mut infos: Vec<FunctionInfo> = entries
            .iter()
            .map(|(name, registration)| FunctionInfo::describe(name, registration))
            .collect();
        drop(entries);

        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Describes a plain name or a composed key without invoking anything.
    /// Empty names report the default they resolved to and composed keys
    /// report their canonical form.
    pub fn describe(&self, name: &str) -> Result<FunctionInfo> {
        let default;
        let name = match name.trim() {
            "" => {
                default = self.default_definition(&self.read_entries())?;
                default.as_str()
            }
            name => name,
        };

        let registration = self.lookup(name)?;
        let reported = if registration.is_composed() {
            registration.name()
        } else {
            name
        };
        Ok(FunctionInfo::describe(reported, &registration))
    }
}

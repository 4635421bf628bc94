use std::path::{Path, PathBuf};

use crate::error::PersistError;
use crate::store::set::TranslationSet;

/// Writes the flattened translation map to a YAML file.
#[derive(Debug, Clone)]
pub struct MapWriter {
    output_path: PathBuf,
}

impl MapWriter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Replaces the file with the current contents of `set`.
    ///
    /// The file is overwritten in place; a crash mid-write can leave it truncated.
    pub async fn persist(&self, set: &TranslationSet) -> Result<(), PersistError> {
        let yaml = render(set).map_err(|e| PersistError::Serialize {
            path: self.output_path.clone(),
            source: e,
        })?;

        if let Some(dir) = self.output_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| PersistError::CreateDirectory {
                    path: dir.to_path_buf(),
                    source: e,
                })?;
        }

        tokio::fs::write(&self.output_path, yaml)
            .await
            .map_err(|e| PersistError::WriteFile {
                path: self.output_path.clone(),
                source: e,
            })
    }
}

/// Renders the set as `from: to` lines.
pub fn render(set: &TranslationSet) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&set.to_map())
}

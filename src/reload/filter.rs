//! Which filesystem changes qualify for a reload.

use std::path::Path;

use crate::config::ReloadConfig;

/// Extension allow-list plus exclude patterns plus the temp-file heuristic.
#[derive(Debug, Clone)]
pub struct ReloadFilter {
    extensions: Vec<String>,
    exclude_patterns: Vec<String>,
}

impl ReloadFilter {
    pub fn new(extensions: Vec<String>, exclude_patterns: Vec<String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_string())
            .collect();
        Self {
            extensions,
            exclude_patterns,
        }
    }

    pub fn from_config(config: &ReloadConfig) -> Self {
        Self::new(config.extensions.clone(), config.exclude_patterns.clone())
    }

    /// True only if the extension is reloadable, no exclude pattern occurs in
    /// the name, and the name does not look like an editor temp/backup file.
    ///
    /// Exclude patterns are plain substrings; `*.log` matches the literal text.
    pub fn should_reload(&self, file_name: &str) -> bool {
        let reloadable = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext));

        let excluded = self
            .exclude_patterns
            .iter()
            .any(|pattern| file_name.contains(pattern.as_str()));

        reloadable && !excluded && !is_temp_file(file_name)
    }
}

/// Hidden files, `~` backups and `.tmp` files.
pub fn is_temp_file(file_name: &str) -> bool {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file_name);

    file_name.starts_with('.')
        || base.starts_with('.')
        || file_name.contains('~')
        || file_name.contains(".tmp")
}

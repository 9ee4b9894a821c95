use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration from twig.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project: ProjectInfo,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_true")]
    pub show_key_hints: bool,
    /// Title shown in a placeholder row until the user types
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    #[serde(default)]
    pub colors: HashMap<String, String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            show_key_hints: true,
            placeholder: default_placeholder(),
            colors: HashMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_placeholder() -> String {
    "Enter a title".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: ProjectConfig = toml::from_str("[project]\nname = \"home\"\n").unwrap();
        assert_eq!(config.project.name, "home");
        assert!(config.ui.show_key_hints);
        assert_eq!(config.ui.placeholder, "Enter a title");
        assert!(config.ui.colors.is_empty());
    }

    #[test]
    fn ui_overrides_are_read() {
        let config: ProjectConfig = toml::from_str(
            r##"
[project]
name = "x"

[ui]
show_key_hints = false
placeholder = "Type here"

[ui.colors]
highlight = "#FF0000"
"##,
        )
        .unwrap();
        assert!(!config.ui.show_key_hints);
        assert_eq!(config.ui.placeholder, "Type here");
        assert_eq!(config.ui.colors.get("highlight").unwrap(), "#FF0000");
    }

    #[test]
    fn missing_project_name_is_an_error() {
        assert!(toml::from_str::<ProjectConfig>("[ui]\n").is_err());
    }
}

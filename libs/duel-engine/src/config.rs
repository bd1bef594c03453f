// Language harness configuration for the grading engine
use crate::demux::MARKER;
use crate::error::EngineError;
use crate::Result;
use duel_common::types::ArgsFamily;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Placeholder in `append` replaced by a call expression
pub const VALUE_PLACEHOLDER: &str = "<VAL>";
/// Placeholder in `main_method` replaced by the generated test block
pub const TEST_CODE_PLACEHOLDER: &str = "<TESTCODE>";

const BUILTIN_LANGUAGES: &str = include_str!("../../../config/languages.json");

/// Text fragments spliced around user code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessTemplates {
    /// Declares the result accumulator
    pub init: String,
    /// Appends one result; contains `<VAL>`
    pub append: String,
    /// Prints the accumulator behind the result marker
    pub print: String,
    /// Entry point for class-based languages; contains `<TESTCODE>`
    #[serde(default)]
    pub main_method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub name: String,
    pub file_extension: String,
    pub args_family: ArgsFamily,
    /// Harness goes inside the submission's outermost class
    #[serde(default)]
    pub class_based: bool,
    pub harness: HarnessTemplates,
}

impl LanguageConfig {
    /// File name the harness is submitted under
    pub fn file_name(&self) -> String {
        format!("devduel{}", self.file_extension)
    }

    fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(EngineError::Configuration(format!(
                "Language '{}': {}",
                self.name, reason
            )))
        };

        if !self.harness.append.contains(VALUE_PLACEHOLDER) {
            return fail("append template is missing <VAL>");
        }
        if !self.harness.print.contains(MARKER) {
            return fail("print template never writes the result marker");
        }
        if self.class_based {
            match &self.harness.main_method {
                Some(main) if main.contains(TEST_CODE_PLACEHOLDER) => {}
                Some(_) => return fail("main_method template is missing <TESTCODE>"),
                None => return fail("class-based language has no main_method template"),
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguagesJson {
    languages: Vec<LanguageConfig>,
}

/// Language configuration manager.
/// The configured languages double as the runtime allow-list.
#[derive(Debug, Clone)]
pub struct LanguageConfigManager {
    configs: HashMap<String, LanguageConfig>,
}

impl LanguageConfigManager {
    /// Load language configurations from a languages.json file
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path).map_err(|e| {
            EngineError::Configuration(format!(
                "Failed to read {}: {}",
                config_path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// Configuration compiled into the binary from config/languages.json
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_LANGUAGES)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let languages_json: LanguagesJson = serde_json::from_str(content).map_err(|e| {
            EngineError::Configuration(format!("Failed to parse languages.json: {}", e))
        })?;

        let mut configs = HashMap::new();
        for lang in languages_json.languages {
            lang.validate()?;
            configs.insert(lang.name.to_lowercase(), lang);
        }

        if configs.is_empty() {
            return Err(EngineError::Configuration(
                "No languages configured in languages.json".to_string(),
            ));
        }

        Ok(Self { configs })
    }

    /// Get configuration for a specific language
    pub fn get_config(&self, language: &str) -> Result<&LanguageConfig> {
        self.configs.get(&language.to_lowercase()).ok_or_else(|| {
            EngineError::Configuration(format!("No harness template for language: {}", language))
        })
    }

    pub fn is_enabled(&self, language: &str) -> bool {
        self.configs.contains_key(&language.to_lowercase())
    }

    /// List all supported languages, sorted
    pub fn list_languages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.configs.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_config_loads() {
        let manager = LanguageConfigManager::builtin().unwrap();
        assert_eq!(manager.list_languages(), vec!["java", "javascript", "python"]);

        let java = manager.get_config("Java").unwrap();
        assert!(java.class_based);
        assert_eq!(java.args_family, ArgsFamily::Java);
        assert_eq!(java.file_name(), "devduel.java");
    }

    #[test]
    fn test_unknown_language_is_configuration_error() {
        let manager = LanguageConfigManager::builtin().unwrap();
        assert!(!manager.is_enabled("cobol"));
        assert!(matches!(
            manager.get_config("cobol"),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_templates_without_placeholders() {
        let json = r#"{"languages": [{
            "name": "ruby", "file_extension": ".rb", "args_family": "script",
            "harness": {"init": "r = []", "append": "r << 1", "print": "puts 'STORAGE=' + r.join('==SEP==')"}
        }]}"#;
        assert!(matches!(
            LanguageConfigManager::from_json(json),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_class_language_without_main() {
        let json = r#"{"languages": [{
            "name": "kotlin", "file_extension": ".kt", "args_family": "java", "class_based": true,
            "harness": {"init": "", "append": "r.add(<VAL>)", "print": "println(\"STORAGE=\")"}
        }]}"#;
        assert!(LanguageConfigManager::from_json(json).is_err());
    }

    #[test]
    fn test_empty_config_rejected() {
        assert!(LanguageConfigManager::from_json(r#"{"languages": []}"#).is_err());
        assert!(LanguageConfigManager::load(Path::new("does/not/exist.json")).is_err());
    }
}

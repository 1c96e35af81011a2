//! Code generation configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Internal names of the runtime support classes the generated code calls
/// into for dynamic casts, coercion and closure-shared variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeNames {
    /// Holder of `castToType`, `castToString`, `<kind>Unbox`, ...
    pub type_transformation: String,
    /// Holder of `asType(Object, Class)`.
    pub bytecode_adapter: String,
    /// Indirection cell class used for closure-shared locals.
    pub reference_class: String,
}

impl Default for RuntimeNames {
    fn default() -> Self {
        Self {
            type_transformation: "org/codehaus/groovy/runtime/typehandling/DefaultTypeTransformation"
                .to_string(),
            bytecode_adapter: "org/codehaus/groovy/runtime/ScriptBytecodeAdapter".to_string(),
            reference_class: "groovy/lang/Reference".to_string(),
        }
    }
}

/// Configuration for one code generation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    /// Log every emitted instruction at trace level
    pub trace_emission: bool,
    pub runtime: RuntimeNames,
}

impl CodegenConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("failed to serialize config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CodegenConfig::default();
        assert!(!config.trace_emission);
        assert_eq!(config.runtime.reference_class, "groovy/lang/Reference");
    }

    #[test]
    fn test_partial_toml() {
        let config = CodegenConfig::from_toml_str(
            r#"
trace_emission = true

[runtime]
reference_class = "my/rt/Cell"
"#,
        )
        .unwrap();
        assert!(config.trace_emission);
        assert_eq!(config.runtime.reference_class, "my/rt/Cell");
        assert_eq!(
            config.runtime.bytecode_adapter,
            RuntimeNames::default().bytecode_adapter
        );
    }

    #[test]
    fn test_round_trip_and_errors() {
        let config = CodegenConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(CodegenConfig::from_toml_str(&text).unwrap(), config);
        assert!(CodegenConfig::from_toml_str("trace_emission = 3").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opstack.toml");
        fs::write(&path, "trace_emission = true\n").unwrap();
        assert!(CodegenConfig::load(&path).unwrap().trace_emission);
        assert!(CodegenConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}

use anyhow::{Context, Result};
use kinetica_compile::CompileOptions;
use kinetica_core::{GravityDirection, System, globals};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};
use tracing::info;

/// Engine settings, usually loaded from `kinetica.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Compiler configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Gravity configuration
    #[serde(default)]
    pub dynamics: DynamicsConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,

    /// Initial symbol values, by name
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
}

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Share common subexpressions in compiled evaluators
    #[serde(default = "default_atomize")]
    pub atomize: bool,

    /// Compile evaluators to a native kernel
    #[serde(default)]
    pub native: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            atomize: default_atomize(),
            native: false,
        }
    }
}

/// Gravity configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicsConfig {
    /// Direction of gravity along the absolute z axis: "up" or "down"
    #[serde(default = "default_gravity", with = "direction")]
    pub gravity: GravityDirection,

    /// Value given to the gravity parameter `g`
    #[serde(default = "default_gravity_value")]
    pub gravity_value: f64,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            gravity_value: default_gravity_value(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_atomize() -> bool {
    true
}

fn default_gravity() -> GravityDirection {
    GravityDirection::Down
}

fn default_gravity_value() -> f64 {
    kinetica_core::DEFAULT_GRAVITY
}

fn default_filter() -> String {
    "info".to_string()
}

mod direction {
    use kinetica_core::GravityDirection;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(d: &GravityDirection, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(d.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<GravityDirection, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(D::Error::custom)
    }
}

impl Settings {
    /// Load settings from a file, auto-detecting TOML or JSON format
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            // TOML first, JSON as fallback
            _ => Self::from_toml(&content).or_else(|_| Self::from_json(&content)),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse config as TOML")
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("failed to parse config as JSON")
    }

    pub fn validate(&self) -> Result<()> {
        if self.log.filter.trim().is_empty() {
            anyhow::bail!("log.filter cannot be empty");
        }
        if !self.dynamics.gravity_value.is_finite() {
            anyhow::bail!(
                "dynamics.gravity_value must be finite, got {}",
                self.dynamics.gravity_value
            );
        }
        if let Some((name, value)) = self.values.iter().find(|(_, v)| !v.is_finite()) {
            anyhow::bail!("values.{name} must be finite, got {value}");
        }
        Ok(())
    }

    /// Installs the process-wide atomization state and gravity direction.
    pub fn apply(&self) {
        globals::set_atomization_state(self.engine.atomize);
        globals::set_gravity_direction(self.dynamics.gravity);
        info!(
            atomize = self.engine.atomize,
            gravity = %self.dynamics.gravity,
            "settings applied"
        );
    }

    /// Sets `g` and every symbol named in `[values]`.
    pub fn apply_values(&self, system: &mut System) -> Result<()> {
        system
            .set_value(system.gravity(), self.dynamics.gravity_value)
            .context("failed to set the gravity value")?;
        for (name, value) in &self.values {
            system
                .set_value(name.as_str(), *value)
                .with_context(|| format!("failed to set value of '{name}'"))?;
        }
        Ok(())
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            atomize: self.engine.atomize,
            native: self.engine.native,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[engine]
atomize = false
native = true

[dynamics]
gravity = "up"
gravity_value = 9.81

[log]
filter = "kinetica=debug"

[values]
l1 = 0.5
m1 = 2.0
"#;

        let settings = Settings::from_toml(toml).unwrap();
        assert!(!settings.engine.atomize);
        assert!(settings.engine.native);
        assert_eq!(settings.dynamics.gravity, GravityDirection::Up);
        assert_eq!(settings.dynamics.gravity_value, 9.81);
        assert_eq!(settings.log.filter, "kinetica=debug");
        assert_eq!(settings.values["m1"], 2.0);
        settings.validate().unwrap();
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "engine": { "native": true },
            "dynamics": { "gravity": "down" },
            "values": { "l1": 0.5 }
        }"#;

        let settings = Settings::from_json(json).unwrap();
        assert!(settings.engine.atomize);
        assert!(settings.engine.native);
        assert_eq!(settings.dynamics.gravity, GravityDirection::Down);
        assert_eq!(settings.dynamics.gravity_value, 9.8);
        assert_eq!(settings.values.len(), 1);
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.log.filter, "info");
        assert_eq!(
            settings.compile_options(),
            CompileOptions {
                atomize: true,
                native: false
            }
        );
    }

    #[test]
    fn test_validate() {
        let mut settings = Settings::default();
        settings.log.filter = " ".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.dynamics.gravity_value = f64::NAN;
        assert!(settings.validate().is_err());

        assert!(Settings::from_toml("[dynamics]\ngravity = \"sideways\"").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kinetica.conf");
        fs::write(&path, r#"{ "engine": { "atomize": false } }"#).unwrap();
        let settings = Settings::from_file(&path).unwrap();
        assert!(!settings.engine.atomize);

        let err = Settings::from_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn test_apply_values() {
        let mut sys = System::new();
        sys.new_parameter("l1", 1.0).unwrap();
        let toml = "[dynamics]\ngravity_value = 1.62\n[values]\nl1 = 0.25";
        let settings = Settings::from_toml(toml).unwrap();
        settings.apply_values(&mut sys).unwrap();
        assert_eq!(sys.get_value("l1").unwrap(), 0.25);
        assert_eq!(sys.get_value("g").unwrap(), 1.62);

        let unknown = Settings::from_toml("[values]\nnope = 1.0").unwrap();
        assert!(unknown.apply_values(&mut sys).is_err());
    }
}

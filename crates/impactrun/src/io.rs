//! Model and run-input files

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use color_eyre::eyre::WrapErr;
use impactrun_core::ImpactModelDefinition;
use impactrun_core::model::ParameterOverrides;
use serde::Serialize;
use serde::de::DeserializeOwned;

fn read_yaml<T: DeserializeOwned>(path: &Path, what: &str) -> color_eyre::Result<T> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {what} file {}", path.display()))?;
    let value = serde_saphyr::from_str(&content)
        .wrap_err_with(|| format!("failed to parse {what} file {}", path.display()))?;
    Ok(value)
}

/// Parse a model from YAML text
pub fn parse_model(yaml: &str) -> Result<ImpactModelDefinition, serde_saphyr::Error> {
    serde_saphyr::from_str(yaml)
}

/// Load a model definition from a YAML file
pub fn load_model(path: &Path) -> color_eyre::Result<ImpactModelDefinition> {
    let definition: ImpactModelDefinition = read_yaml(path, "model")?;
    tracing::debug!(
        path = %path.display(),
        parameters = definition.parameters.len(),
        "loaded model definition"
    );
    Ok(definition)
}

/// Load parameter overrides: a map of parameter name to a value or a list of values
pub fn load_overrides(path: &Path) -> color_eyre::Result<ParameterOverrides> {
    read_yaml(path, "overrides")
}

/// Load a per-indicator factor table used for normalisation or weighting
pub fn load_factors(path: &Path) -> color_eyre::Result<BTreeMap<String, f64>> {
    read_yaml(path, "factor")
}

/// Render a value as pretty-printed JSON
pub fn to_json<T: Serialize>(value: &T) -> color_eyre::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write content to a file atomically using write-then-rename pattern.
///
/// The content goes to a sibling temporary file first, so an interrupted
/// run never leaves a half-written output behind.
pub fn atomic_write(path: &Path, content: &str) -> std::io::Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use impactrun_core::ImpactModel;
    use impactrun_core::config::ParameterDefinition;
    use tempfile::tempdir;

    const LAPTOP_YAML: &str = r#"
metadata:
  version: "1.2"
parameters:
  - name: lifespan
    type: float
    default: 5.0
    min: 2.0
    max: 8.0
  - name: usage_location
    type: enum
    default: FR
    weights:
      FR: 1.0
      EU: 3.0
tree:
  name: laptop
  children:
    - name: manufacturing
      models:
        climate_change: "120 / lifespan"
    - name: use_phase
      amount: lifespan
      direct_impacts:
        climate_change: "Piecewise((8, usage_location_FR), (30, True))"
"#;

    #[test]
    fn test_parse_model() {
        let definition = parse_model(LAPTOP_YAML).unwrap();
        assert_eq!(definition.parameters.len(), 2);
        assert!(matches!(
            &definition.parameters[1],
            ParameterDefinition::Enum { name, .. } if name == "usage_location"
        ));

        let model = ImpactModel::from_definition(&definition).unwrap();
        let result = model.evaluate_default().unwrap();
        // 120 / 5 + 5 * 8
        assert_eq!(result.totals(), &[64.0]);
    }

    #[test]
    fn test_load_model_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("laptop.yaml");
        fs::write(&path, LAPTOP_YAML).unwrap();

        let definition = load_model(&path).unwrap();
        assert_eq!(definition, parse_model(LAPTOP_YAML).unwrap());
    }

    #[test]
    fn test_load_model_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_model(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("failed to read model file"));
    }

    #[test]
    fn test_load_overrides() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("overrides.yaml");
        fs::write(&path, "lifespan: [4.0, 8.0]\nusage_location: EU\n").unwrap();

        let overrides = load_overrides(&path).unwrap();
        let sets = overrides.expand().unwrap();
        assert_eq!(sets.len(), 2);

        let model = ImpactModel::from_definition(&parse_model(LAPTOP_YAML).unwrap()).unwrap();
        let scores = model.scores(&overrides).unwrap();
        assert_eq!(scores.get("climate_change").unwrap(), &[150.0, 255.0]);
    }

    #[test]
    fn test_atomic_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.json");

        atomic_write(&path, "{}").unwrap();
        atomic_write(&path, "[]").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        assert!(!path.with_extension("tmp").exists());
    }
}

//! Model manifest: a JSON file naming the reference tables of one epoch.
//!
//! ```json
//! {
//!   "fc0": 341.0,
//!   "sensing": { "invc0": "invC0.txt" },
//!   "digital": "D0.txt",
//!   "actuation_tst": "A_tst0.txt",
//!   "actuation_pu": "A_pu0.txt"
//! }
//! ```
//!
//! Relative paths resolve against the manifest's directory. All tables must
//! share one frequency column.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, CalError};
use crate::io::table::{TransferTable, read_transfer_table};
use crate::models::{CalibrationInputs, CalibrationModel};

/// Which form of the sensing function the manifest provides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensingSource {
    C0(PathBuf),
    Invc0(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Reference coupled-cavity pole (Hz).
    #[serde(default)]
    pub fc0: Option<f64>,
    pub sensing: SensingSource,
    pub digital: PathBuf,
    pub actuation_tst: PathBuf,
    pub actuation_pu: PathBuf,
}

/// The four tables a manifest points at, already loaded.
#[derive(Debug, Clone)]
pub struct ManifestTables {
    pub sensing: TransferTable,
    pub digital: TransferTable,
    pub actuation_tst: TransferTable,
    pub actuation_pu: TransferTable,
}

pub fn read_manifest(path: &Path) -> Result<ModelManifest, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open model manifest '{}': {e}", path.display())))?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid model manifest '{}': {e}", path.display())))
}

/// Read the manifest at `path`, its tables, and build the calibration model.
pub fn load_model(path: &Path) -> Result<CalibrationModel, AppError> {
    let manifest = read_manifest(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let resolve = |p: &Path| -> PathBuf {
        if p.is_absolute() { p.to_path_buf() } else { base.join(p) }
    };
    let sensing_path = match &manifest.sensing {
        SensingSource::C0(p) | SensingSource::Invc0(p) => resolve(p),
    };

    let tables = ManifestTables {
        sensing: read_transfer_table(&sensing_path)?,
        digital: read_transfer_table(&resolve(&manifest.digital))?,
        actuation_tst: read_transfer_table(&resolve(&manifest.actuation_tst))?,
        actuation_pu: read_transfer_table(&resolve(&manifest.actuation_pu))?,
    };

    let model = build_model(&manifest, tables)?;
    let (fmin, fmax) = model.frequency_range();
    info!(
        manifest = %path.display(),
        samples = model.len(),
        fmin,
        fmax,
        "loaded calibration model"
    );
    Ok(model)
}

/// Build the model from already-loaded tables.
pub fn build_model(manifest: &ModelManifest, tables: ManifestTables) -> Result<CalibrationModel, CalError> {
    let ManifestTables {
        sensing,
        digital,
        actuation_tst,
        actuation_pu,
    } = tables;

    for (name, table) in [
        ("digital", &digital),
        ("actuation_tst", &actuation_tst),
        ("actuation_pu", &actuation_pu),
    ] {
        if !sensing.same_grid(table) {
            return Err(CalError::invalid(format!(
                "Table `{name}` does not share the sensing table's frequency column ({} vs {} rows).",
                table.len(),
                sensing.len()
            )));
        }
    }

    let mut inputs = CalibrationInputs::new(sensing.freq)
        .with_digital(digital.values)
        .with_actuation(actuation_tst.values, actuation_pu.values);
    inputs = match manifest.sensing {
        SensingSource::C0(_) => inputs.with_c0(sensing.values),
        SensingSource::Invc0(_) => inputs.with_invc0(sensing.values),
    };
    if let Some(fc0) = manifest.fc0 {
        inputs = inputs.with_fc0(fc0);
    }

    CalibrationModel::new(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("calstrain-{}-{name}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn manifest_json_shape() {
        let json = r#"{
            "fc0": 341.0,
            "sensing": { "invc0": "invC0.txt" },
            "digital": "D0.txt",
            "actuation_tst": "A_tst0.txt",
            "actuation_pu": "A_pu0.txt"
        }"#;
        let m: ModelManifest = serde_json::from_str(json).unwrap();
        assert_eq!(m.fc0, Some(341.0));
        assert_eq!(m.sensing, SensingSource::Invc0(PathBuf::from("invC0.txt")));
    }

    #[test]
    fn loads_model_from_relative_tables() {
        let dir = scratch_dir("manifest-ok");
        fs::write(dir.join("C0.txt"), "0 1 0\n100 1 0\n1000 1 0\n").unwrap();
        fs::write(dir.join("D0.txt"), "0 1 0\n100 1 0\n1000 1 0\n").unwrap();
        fs::write(dir.join("A_tst.txt"), "0 0.5 0\n100 0.5 0\n1000 0.5 0\n").unwrap();
        fs::write(dir.join("A_pu.txt"), "0 0.5 0\n100 0.5 0\n1000 0.5 0\n").unwrap();
        fs::write(
            dir.join("model.json"),
            r#"{"fc0": 100.0, "sensing": {"c0": "C0.txt"}, "digital": "D0.txt",
                "actuation_tst": "A_tst.txt", "actuation_pu": "A_pu.txt"}"#,
        )
        .unwrap();

        let model = load_model(&dir.join("model.json")).unwrap();
        assert_eq!(model.len(), 3);
        assert_eq!(model.fc0(), Some(100.0));
        assert!(model.r0().iter().all(|z| (z.re - 2.0).abs() < 1e-15 && z.im == 0.0));
    }

    #[test]
    fn mismatched_frequency_columns_are_rejected() {
        let manifest = ModelManifest {
            fc0: None,
            sensing: SensingSource::C0(PathBuf::from("C0.txt")),
            digital: PathBuf::from("D0.txt"),
            actuation_tst: PathBuf::from("A_tst.txt"),
            actuation_pu: PathBuf::from("A_pu.txt"),
        };
        let grid_a = crate::io::table::parse_transfer_table("1 1 0\n2 1 0\n", "a").unwrap();
        let grid_b = crate::io::table::parse_transfer_table("1 1 0\n3 1 0\n", "b").unwrap();
        let tables = ManifestTables {
            sensing: grid_a.clone(),
            digital: grid_a.clone(),
            actuation_tst: grid_b,
            actuation_pu: grid_a,
        };
        let err = build_model(&manifest, tables).unwrap_err();
        assert!(err.to_string().contains("actuation_tst"), "{err}");
    }

    #[test]
    fn missing_manifest_is_exit_code_2() {
        let err = load_model(Path::new("/nonexistent/calstrain/model.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}

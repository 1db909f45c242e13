//! Test helpers that stage a dataset on disk and drive the CLI in-process.

use super::*;
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

const DATASET: &str = r#"[
    {"_id": 1, "name": "Malaga", "country": "ES", "coord": {"lon": -4.42, "lat": 36.72}},
    {"_id": 2, "name": "Madrid", "country": "ES", "coord": {"lon": -3.70, "lat": 40.42}},
    {"_id": 3, "name": "Praga", "country": "CZ", "coord": {"lon": 14.42, "lat": 50.09}},
    {"_id": 4, "name": "Montevideo", "country": "UY", "coord": {"lon": -56.16, "lat": -34.90}}
]"#;

/// A temporary directory holding a JSON dataset and a catalogue path.
pub(super) struct Workspace {
    _dir: TempDir,
    dataset: Utf8PathBuf,
    db: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        let dataset = root.join("cities.json");
        fs::write(&dataset, DATASET).expect("write dataset");
        Self {
            _dir: dir,
            dataset,
            db: root.join("state").join("cities.db"),
        }
    }

    pub(super) fn dataset(&self) -> &Utf8Path {
        &self.dataset
    }

    pub(super) fn db(&self) -> &Utf8Path {
        &self.db
    }

    /// Run `cities <args> --db <db>`, adding `--file <dataset>` to refreshes.
    pub(super) fn run(&self, args: &[&str]) -> Result<Value, CliError> {
        let mut invocation = vec!["cities".to_owned()];
        invocation.extend(args.iter().map(|arg| (*arg).to_owned()));
        invocation.extend([format!("--{ARG_DB}"), self.db.to_string()]);
        if args.first() == Some(&"refresh") {
            invocation.extend([format!("--{ARG_FILE}"), self.dataset.to_string()]);
        }
        let cli = Cli::try_parse_from(invocation)?;
        let mut out = Vec::new();
        execute(cli.command, &mut out)?;
        Ok(serde_json::from_slice(&out).expect("command output is JSON"))
    }
}

/// Names of the cities listed in a command's output.
pub(super) fn listed_names(output: &Value) -> Vec<String> {
    output["cities"]
        .as_array()
        .expect("cities array")
        .iter()
        .map(|city| city["name"].as_str().expect("city name").to_owned())
        .collect()
}

use crate::config::AppConfig;
use crate::types::EntryRecord;
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Loads the entry records dumped from the program backend. Format is chosen
/// by file extension, like the geometry loader picks shp vs geojson.
pub fn load_entries(config: &AppConfig) -> Result<Vec<EntryRecord>> {
    println!("Loading entries from {:?}...", config.input.entries);

    let extension = config
        .input
        .entries
        .extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Entries file has no extension"))?;

    let entries = match extension.as_str() {
        "json" => load_json_entries(&config.input.entries)?,
        "csv" => load_csv_entries(&config.input.entries)?,
        _ => return Err(anyhow!("Unsupported entries format: {}", extension)),
    };

    println!("Loaded {} entries", entries.len());
    Ok(entries)
}

fn load_json_entries(path: &Path) -> Result<Vec<EntryRecord>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open entries file: {:?}", path))?;
    let reader = BufReader::new(file);
    let value: serde_json::Value =
        serde_json::from_reader(reader).context("Failed to parse entries JSON")?;

    // The backend sometimes wraps the array in a response envelope.
    let array = match &value {
        serde_json::Value::Array(items) => items.as_slice(),
        serde_json::Value::Object(obj) => obj
            .get("entries")
            .or_else(|| obj.get("data"))
            .and_then(|v| v.as_array())
            .map(|v| v.as_slice())
            .ok_or_else(|| anyhow!("Entries JSON object has no 'entries' or 'data' array"))?,
        _ => return Err(anyhow!("Entries JSON must be an array or an envelope object")),
    };

    let mut entries = Vec::with_capacity(array.len());
    for (i, item) in array.iter().enumerate() {
        match serde_json::from_value::<EntryRecord>(item.clone()) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("Skipping malformed entry at index {}: {}", i, e);
            }
        }
    }

    Ok(entries)
}

fn load_csv_entries(path: &Path) -> Result<Vec<EntryRecord>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open entries file: {:?}", path))?;
    let mut rdr = ReaderBuilder::new().from_reader(file);

    let mut entries = Vec::new();
    for (i, result) in rdr.deserialize::<EntryRecord>().enumerate() {
        match result {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("Skipping malformed CSV row {}: {}", i + 1, e);
            }
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InstitutionType;

    #[test]
    fn parses_bare_json_array() {
        let file = tempfile_with(
            "json",
            r#"[
                {"lat": 34.0, "log": 71.5, "outOfSchoolChildren": 15, "schoolType": "School"},
                {"lat": "34.1", "log": "71.6", "outOfSchoolChildren": "7", "schoolType": "Madrasa"}
            ]"#,
        );
        let entries = load_json_entries(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].out_of_school_children, 7);
        assert_eq!(entries[1].school_type, InstitutionType::Madrasa);
    }

    #[test]
    fn unwraps_response_envelope() {
        let file = tempfile_with(
            "json",
            r#"{"success": true, "data": [{"lat": 34.0, "log": 71.5, "outOfSchoolChildren": 3}]}"#,
        );
        let entries = load_json_entries(file.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].out_of_school_children, 3);
    }

    #[test]
    fn parses_csv_rows_with_defaults() {
        let file = tempfile_with(
            "csv",
            "lat,log,outOfSchoolChildren,schoolType,district\n\
             34.0,71.5,12,School,Peshawar\n\
             abc,71.5,4,,\n",
        );
        let entries = load_csv_entries(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].district, "Peshawar");
        assert_eq!(entries[1].lat, None);
        assert_eq!(entries[1].district, "Unknown");
    }

    fn tempfile_with(ext: &str, content: &str) -> NamedTemp {
        let dir = std::env::temp_dir();
        let path = dir.join(format!(
            "oosc-data-test-{}-{}.{}",
            std::process::id(),
            content.len(),
            ext
        ));
        std::fs::write(&path, content).unwrap();
        NamedTemp { path }
    }

    struct NamedTemp {
        path: std::path::PathBuf,
    }

    impl NamedTemp {
        fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Drop for NamedTemp {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

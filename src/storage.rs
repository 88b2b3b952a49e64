use crate::models::TabularRecord;
use crate::scrapers::fincaraiz::CityReport;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Delimiter and encoding of an output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFormat {
    pub delimiter: u8,
    /// Prefix the file with a UTF-8 byte order mark so spreadsheet tools pick up the encoding
    pub bom: bool,
}

impl TableFormat {
    /// Search-result rows: plain comma-separated UTF-8
    pub const SUMMARY: TableFormat = TableFormat {
        delimiter: b',',
        bom: false,
    };

    /// Detailed rows: semicolon-separated UTF-8 with BOM
    pub const DETAIL: TableFormat = TableFormat {
        delimiter: b';',
        bom: true,
    };
}

/// Write `records` with a header row, replacing any existing file
pub fn write_records<R: TabularRecord>(
    path: &Path,
    records: &[R],
    format: TableFormat,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    let mut file =
        File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    if format.bom {
        file.write_all(UTF8_BOM)?;
    }

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(format.delimiter)
        .from_writer(file);

    wtr.write_record(R::HEADERS)?;
    for record in records {
        wtr.write_record(record.to_record())?;
    }
    wtr.flush()?;

    Ok(())
}

/// Strip a leading byte order mark, if any
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Pick `;` when the header line has more semicolons than commas
pub fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Read the `id` column of a previously written listing file
pub fn read_ids(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    ids_from_str(&text).with_context(|| format!("Failed to read ids from {:?}", path))
}

fn ids_from_str(text: &str) -> Result<Vec<String>> {
    let text = strip_bom(text);
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(text))
        .from_reader(text.as_bytes());

    let column = rdr
        .headers()?
        .iter()
        .position(|h| h.trim() == "id")
        .context("No `id` column in header")?;

    let mut ids = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(id) = record.get(column).map(str::trim).filter(|id| !id.is_empty()) {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

/// File name for a raw listing. The id comes from the API, so anything
/// outside `[A-Za-z0-9_-]` becomes `_` and the file always lands in its directory.
pub fn raw_file_name(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "_.json".to_string()
    } else {
        format!("{}.json", stem)
    }
}

/// Save the raw listing JSON as `<dir>/<id>.json`
pub async fn save_raw(dir: &Path, id: &str, listing: &serde_json::Value) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create directory: {:?}", dir))?;
    let filename = dir.join(raw_file_name(id));
    let json = serde_json::to_string_pretty(listing)?;
    tokio::fs::write(&filename, json)
        .await
        .with_context(|| format!("Failed to write {:?}", filename))?;
    Ok(filename)
}

/// Summary of one crawl run, written next to its output file
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub output: PathBuf,
    pub records: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cities: Vec<CityReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<usize>,
}

impl RunManifest {
    /// `<output>.manifest.json`
    pub fn path_for(output: &Path) -> PathBuf {
        let mut name = output.file_name().unwrap_or_default().to_os_string();
        name.push(".manifest.json");
        output.with_file_name(name)
    }

    pub async fn write(&self) -> Result<PathBuf> {
        let path = Self::path_for(&self.output);
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;
        Ok(path)
    }
}

/// Write test-split truth and predictions as `real,prediccion`
pub fn write_predictions(path: &Path, truth: &[f64], predictions: &[f64]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {:?}", path))?;
    wtr.write_record(["real", "prediccion"])?;
    for (real, predicted) in truth.iter().zip(predictions) {
        wtr.write_record([real.to_string(), predicted.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListingSummary, Location, LISTING_BASE_URL, NOT_AVAILABLE};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fincaraiz-scout-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn listing(id: &str, title: &str) -> ListingSummary {
        ListingSummary {
            id: id.to_string(),
            title: title.to_string(),
            description: "Con balcón; vista al parque".to_string(),
            address: NOT_AVAILABLE.to_string(),
            location: Location {
                city: "Bello".to_string(),
                state: "Antioquia".to_string(),
                neighbourhood: NOT_AVAILABLE.to_string(),
                latitude: None,
                longitude: None,
            },
            price: Some(1_800_000.0),
            currency: "COP".to_string(),
            bedrooms: Some(2),
            bathrooms: Some(1),
            garages: Some(0),
            area_m2: 55.0,
            images: vec![],
            url: LISTING_BASE_URL.to_string(),
        }
    }

    #[test]
    fn test_summary_file_is_comma_separated() {
        let dir = scratch_dir("summary");
        let path = dir.join("raw").join("propiedades.csv");

        write_records(&path, &[listing("1", "Apto"), listing("2", "Casa, grande")], TableFormat::SUMMARY)
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("id,titulo,descripcion,direccion,ciudad"));
        assert!(lines.next().unwrap().starts_with("1,Apto,"));
        assert!(text.contains("\"Casa, grande\""));
        assert!(!text.starts_with('\u{feff}'));

        assert_eq!(read_ids(&path).unwrap(), vec!["1", "2"]);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_detail_format_writes_bom_and_semicolons() {
        let dir = scratch_dir("detail");
        let path = dir.join("completas.csv");

        write_records(&path, &[listing("9", "Apto")], TableFormat::DETAIL).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes).unwrap();
        assert!(strip_bom(&text).starts_with("id;titulo;descripcion"));
        assert!(text.contains("\"Con balcón; vista al parque\""));

        assert_eq!(read_ids(&path).unwrap(), vec!["9"]);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_rewrite_truncates_previous_run() {
        let dir = scratch_dir("truncate");
        let path = dir.join("out.csv");

        write_records(&path, &[listing("1", "a"), listing("2", "b")], TableFormat::SUMMARY).unwrap();
        write_records(&path, &[listing("3", "c")], TableFormat::SUMMARY).unwrap();

        assert_eq!(read_ids(&path).unwrap(), vec!["3"]);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_ids_require_id_column() {
        assert!(ids_from_str("titulo,precio\na,1\n").is_err());
        assert_eq!(ids_from_str("precio;id\n1;77\n2;\n").unwrap(), vec!["77"]);
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("id;titulo;precio\n1;a,b;2"), b';');
        assert_eq!(sniff_delimiter("id,titulo,precio"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_manifest_path_sits_next_to_output() {
        let path = RunManifest::path_for(Path::new("data/raw/propiedades.csv"));
        assert_eq!(path, PathBuf::from("data/raw/propiedades.csv.manifest.json"));
    }

    #[tokio::test]
    async fn test_save_raw_writes_pretty_json() {
        let dir = scratch_dir("raw");
        save_raw(&dir, "42", &serde_json::json!({ "id": 42 })).await.unwrap();

        let text = std::fs::read_to_string(dir.join("42.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["id"], 42);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_raw_file_name_stays_in_directory() {
        assert_eq!(raw_file_name("7364521"), "7364521.json");
        assert_eq!(raw_file_name("sub/dir/2"), "sub_dir_2.json");
        assert_eq!(raw_file_name("../x"), "___x.json");
        assert_eq!(raw_file_name("a\\b"), "a_b.json");
        assert_eq!(raw_file_name(""), "_.json");
    }

    #[tokio::test]
    async fn test_save_raw_with_path_like_id() {
        let dir = scratch_dir("raw-path");
        let written = save_raw(&dir, "../escape", &serde_json::json!({ "id": "../escape" }))
            .await
            .unwrap();

        assert_eq!(written, dir.join("___escape.json"));
        assert!(written.exists());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_write_predictions() {
        let dir = scratch_dir("predictions");
        let path = dir.join("pred.csv");

        write_predictions(&path, &[100.0, 200.0], &[110.0, 190.5]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, vec!["real,prediccion", "100,110", "200,190.5"]);
        std::fs::remove_dir_all(dir).ok();
    }
}

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{MetricsError, MetricsResult};
use crate::model::RawQueryRow;
use crate::util::sha256_bytes;

/// Parsed records of one source file together with the hash of the bytes
/// they were parsed from.
#[derive(Debug, Clone)]
pub struct LoadedSource<T> {
    pub path: PathBuf,
    pub sha256: String,
    pub records: Vec<T>,
}

pub type Parser<T> = fn(&Path, &[u8]) -> MetricsResult<Vec<T>>;

pub fn read_source(path: &Path) -> MetricsResult<(Vec<u8>, String)> {
    let bytes = fs::read(path).map_err(|err| MetricsError::load(path, err))?;
    let sha256 = sha256_bytes(&bytes);
    Ok((bytes, sha256))
}

pub fn parse_query_rows(path: &Path, bytes: &[u8]) -> MetricsResult<Vec<RawQueryRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<RawQueryRow>().enumerate() {
        let row = record
            .map_err(|err| MetricsError::load(path, format!("csv record {index}: {err}")))?;
        rows.push(row);
    }

    Ok(rows)
}

pub fn parse_json_records<T: DeserializeOwned>(
    path: &Path,
    bytes: &[u8],
) -> MetricsResult<Vec<T>> {
    serde_json::from_slice(bytes).map_err(|err| MetricsError::load(path, err))
}

pub fn load_query_rows(path: &Path) -> MetricsResult<LoadedSource<RawQueryRow>> {
    load_with(path, parse_query_rows)
}

pub fn load_json_records<T: DeserializeOwned>(path: &Path) -> MetricsResult<LoadedSource<T>> {
    load_with(path, parse_json_records::<T>)
}

fn load_with<T>(path: &Path, parse: Parser<T>) -> MetricsResult<LoadedSource<T>> {
    let (bytes, sha256) = read_source(path)?;
    let records = parse(path, &bytes)?;
    Ok(LoadedSource {
        path: path.to_path_buf(),
        sha256,
        records,
    })
}

/// Loaded sources keyed by path and validated by content hash.
///
/// Every lookup re-reads the file bytes; parsing only happens when the hash
/// differs from the cached entry.
#[derive(Debug)]
pub struct SourceCache<T> {
    entries: HashMap<PathBuf, LoadedSource<T>>,
    hits: usize,
    misses: usize,
}

impl<T> Default for SourceCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }
}

impl<T> SourceCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(
        &mut self,
        path: &Path,
        parse: Parser<T>,
    ) -> MetricsResult<&LoadedSource<T>> {
        let (bytes, sha256) = read_source(path)?;

        let fresh = self
            .entries
            .get(path)
            .is_some_and(|entry| entry.sha256 == sha256);

        if fresh {
            self.hits += 1;
            debug!(path = %path.display(), sha256 = %sha256, "source cache hit");
        } else {
            self.misses += 1;
            self.entries.remove(path);
            let records = parse(path, &bytes)?;
            debug!(
                path = %path.display(),
                sha256 = %sha256,
                records = records.len(),
                "source cache miss"
            );
            self.entries.insert(
                path.to_path_buf(),
                LoadedSource {
                    path: path.to_path_buf(),
                    sha256,
                    records,
                },
            );
        }

        self.entries
            .get(path)
            .ok_or_else(|| MetricsError::load(path, "cache entry vanished after load"))
    }

    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::metrics::normalize;
    use crate::model::ExpertEvaluation;

    const HEADER: &str = "mata_kuliah,query,faiss_avg_score,rerank_avg_score,rerank_top1,faiss_time_ms,rerank_time_ms,total_time_ms\n";

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).expect("fixture should be written");
        path
    }

    #[test]
    fn parse_query_rows_maps_upstream_headers_to_canonical_fields() {
        let csv = format!(
            "{HEADER}Basis Data,\"Apa itu normalisasi, dan mengapa?\",0.71,2.5,4.1,12.3,80.2,93.0\n"
        );

        let rows = parse_query_rows(Path::new("inline.csv"), csv.as_bytes())
            .expect("csv should parse");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subject.as_deref(), Some("Basis Data"));
        assert_eq!(
            rows[0].query_text.as_deref(),
            Some("Apa itu normalisasi, dan mengapa?")
        );
        assert_eq!(rows[0].rerank_top1_logit.as_deref(), Some("4.1"));
        assert_eq!(rows[0].total_time_ms.as_deref(), Some("93.0"));
    }

    #[test]
    fn parse_query_rows_accepts_canonical_headers() {
        let csv = "subject,query_text,faiss_score,rerank_avg_logit,rerank_top1_logit,faiss_time_ms,rerank_time_ms,total_time_ms\nOOP,q,0.5,0.1,0.2,1,2,3\n";

        let rows = parse_query_rows(Path::new("inline.csv"), csv.as_bytes())
            .expect("csv should parse");
        assert_eq!(rows[0].subject.as_deref(), Some("OOP"));
        assert_eq!(rows[0].rerank_avg_logit.as_deref(), Some("0.1"));
    }

    #[test]
    fn parse_query_rows_leaves_missing_columns_for_normalize_to_report() {
        let csv = "mata_kuliah,query,faiss_avg_score\nOOP,q,0.5\n";

        let rows = parse_query_rows(Path::new("inline.csv"), csv.as_bytes())
            .expect("csv should parse");
        assert_eq!(rows[0].faiss_score.as_deref(), Some("0.5"));
        assert!(rows[0].rerank_avg_logit.is_none());
    }

    #[test]
    fn short_records_surface_as_malformed_input_after_normalize() {
        let csv = format!("{HEADER}OOP,q,0.5,0.1,0.2,1,2,3\nOOP,q,0.5\n");

        let rows = parse_query_rows(Path::new("short.csv"), csv.as_bytes())
            .expect("short records should still parse");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].faiss_score.as_deref(), Some("0.5"));
        assert!(rows[1].rerank_avg_logit.is_none());
        assert!(rows[1].total_time_ms.is_none());

        let error = normalize(&rows).expect_err("missing numeric fields must be rejected");
        match error {
            MetricsError::MalformedInput { row, field, .. } => {
                assert_eq!(row, 1);
                assert_eq!(field, "rerank_avg_logit");
            }
            other => panic!("expected malformed input, got {other:?}"),
        }
    }

    #[test]
    fn load_query_rows_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = load_query_rows(&dir.path().join("absent.csv")).expect_err("missing file");
        match error {
            MetricsError::Load { path, .. } => assert!(path.ends_with("absent.csv")),
            other => panic!("expected load error, got {other:?}"),
        }
    }

    #[test]
    fn load_json_records_parses_evaluation_array() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(
            dir.path(),
            "eval.json",
            r#"[{
                "evaluator_name": "Dosen A",
                "assessment_id": "A-1",
                "mata_kuliah": "OOP",
                "relevance": 4,
                "difficulty_match": 4,
                "structure": 5,
                "pedagogical_value": 4,
                "overall": 4.25
            }]"#,
        );

        let loaded = load_json_records::<ExpertEvaluation>(&path).expect("json should load");
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].subject, "OOP");
        assert_eq!(loaded.sha256.len(), 64);
    }

    #[test]
    fn source_cache_reuses_entry_until_content_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(dir.path(), "raw.csv", &format!("{HEADER}OOP,q,0.5,0,0,1,2,3\n"));

        let mut cache = SourceCache::<RawQueryRow>::new();
        let first_hash = cache
            .get_or_load(&path, parse_query_rows)
            .expect("first load")
            .sha256
            .clone();
        let second = cache.get_or_load(&path, parse_query_rows).expect("cached load");
        assert_eq!(second.sha256, first_hash);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);

        fs::write(&path, format!("{HEADER}OOP,q,0.5,0,0,1,2,3\nOOP,r,0.6,1,1,1,2,3\n"))
            .expect("fixture should be rewritten");
        let reloaded = cache.get_or_load(&path, parse_query_rows).expect("reload");
        assert_eq!(reloaded.records.len(), 2);
        assert_ne!(reloaded.sha256, first_hash);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn source_cache_invalidate_forces_reparse() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(dir.path(), "raw.csv", &format!("{HEADER}OOP,q,0.5,0,0,1,2,3\n"));

        let mut cache = SourceCache::<RawQueryRow>::new();
        cache.get_or_load(&path, parse_query_rows).expect("first load");
        assert!(cache.invalidate(&path));
        assert!(cache.is_empty());

        cache.get_or_load(&path, parse_query_rows).expect("second load");
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.hits(), 0);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn source_cache_drops_stale_entry_when_reparse_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(dir.path(), "raw.csv", &format!("{HEADER}OOP,q,0.5,0,0,1,2,3\n"));

        let mut cache = SourceCache::<RawQueryRow>::new();
        cache.get_or_load(&path, parse_query_rows).expect("first load");

        let mut broken = HEADER.as_bytes().to_vec();
        broken.extend_from_slice(b"OOP,\xff\xfe,0.5,0,0,1,2,3\n");
        fs::write(&path, broken).expect("fixture should be rewritten");
        assert!(cache.get_or_load(&path, parse_query_rows).is_err());
        assert!(cache.is_empty());
    }
}

pub mod assessments;
pub mod evaluations;
pub mod report;
pub mod retrieval;

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use thesis_results::loader::{parse_json_records, parse_query_rows, SourceCache};
use thesis_results::metrics::normalize;
use thesis_results::model::{
    ExpertEvaluation, GeneratedAssessment, RawQueryRow, ScoredQuery, SourceFile,
};
use thesis_results::MetricsResult;
use tracing::debug;

/// Per-invocation caches for the three result files.
#[derive(Debug, Default)]
pub struct DataSources {
    queries: SourceCache<RawQueryRow>,
    evaluations: SourceCache<ExpertEvaluation>,
    assessments: SourceCache<GeneratedAssessment>,
}

impl DataSources {
    pub fn scored_queries(
        &mut self,
        path: &Path,
    ) -> MetricsResult<(Vec<ScoredQuery>, SourceFile)> {
        let loaded = self.queries.get_or_load(path, parse_query_rows)?;
        let scored = normalize(&loaded.records)?;
        Ok((scored, source_file(path, &loaded.sha256)))
    }

    pub fn evaluations(
        &mut self,
        path: &Path,
    ) -> MetricsResult<(Vec<ExpertEvaluation>, SourceFile)> {
        let loaded = self
            .evaluations
            .get_or_load(path, parse_json_records::<ExpertEvaluation>)?;
        Ok((loaded.records.clone(), source_file(path, &loaded.sha256)))
    }

    pub fn assessments(
        &mut self,
        path: &Path,
    ) -> MetricsResult<(Vec<GeneratedAssessment>, SourceFile)> {
        let loaded = self
            .assessments
            .get_or_load(path, parse_json_records::<GeneratedAssessment>)?;
        Ok((loaded.records.clone(), source_file(path, &loaded.sha256)))
    }

    pub fn log_cache_stats(&self) {
        debug!(
            query_hits = self.queries.hits(),
            query_misses = self.queries.misses(),
            evaluation_hits = self.evaluations.hits(),
            evaluation_misses = self.evaluations.misses(),
            assessment_hits = self.assessments.hits(),
            assessment_misses = self.assessments.misses(),
            "source cache stats"
        );
    }
}

fn source_file(path: &Path, sha256: &str) -> SourceFile {
    SourceFile {
        path: path.display().to_string(),
        sha256: sha256.to_string(),
    }
}

pub fn write_json_stdout<T: Serialize>(value: &T) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, value).context("failed to serialize json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

pub fn write_text_stdout<F>(render: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let mut output = io::BufWriter::new(io::stdout().lock());
    render(&mut output).context("failed to write text output")?;
    output.flush()?;
    Ok(())
}

pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

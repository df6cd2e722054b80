use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thesis_results::evaluation::{summarize_assessments, summarize_evaluations};
use thesis_results::metrics::build_retrieval_report;
use thesis_results::model::{OUTPUT_SCHEMA_VERSION, ResultsReport, SourceFile};
use thesis_results::util::{ReportStamp, write_json_pretty};
use thesis_results::{MetricsError, MetricsResult};
use tracing::{info, warn};

use crate::cli::ReportArgs;
use crate::commands::DataSources;

pub fn run(args: ReportArgs) -> Result<()> {
    let stamp = ReportStamp::now();
    let mut sources = DataSources::default();
    let mut files = Vec::<SourceFile>::new();
    let mut warnings = Vec::<String>::new();

    let retrieval_path = args.data.retrieval_path();
    let retrieval = sources
        .scored_queries(&retrieval_path)
        .and_then(|(rows, source)| {
            files.push(source);
            build_retrieval_report(&rows)
        });
    let retrieval = keep_or_warn("retrieval", retrieval, &mut warnings)?;

    let evaluations_path = args.data.evaluations_path();
    let evaluations = sources
        .evaluations(&evaluations_path)
        .and_then(|(records, source)| {
            files.push(source);
            summarize_evaluations(&records)
        });
    let evaluations = keep_or_warn("evaluations", evaluations, &mut warnings)?;

    let assessments_path = args.data.assessments_path();
    let assessments = sources
        .assessments(&assessments_path)
        .and_then(|(records, source)| {
            files.push(source);
            summarize_assessments(&records)
        });
    let assessments = keep_or_warn("assessments", assessments, &mut warnings)?;

    sources.log_cache_stats();

    let report = ResultsReport {
        schema_version: OUTPUT_SCHEMA_VERSION,
        generated_at: stamp.generated_at.clone(),
        sources: files,
        retrieval,
        evaluations,
        assessments,
        warnings,
    };

    let output_path = args
        .output
        .unwrap_or_else(|| default_output_path(&args.data.data_dir, &stamp));
    write_json_pretty(&output_path, &report)
        .with_context(|| format!("failed to write report {}", output_path.display()))?;

    info!(
        path = %output_path.display(),
        sources = report.sources.len(),
        warnings = report.warnings.len(),
        "wrote results report"
    );

    Ok(())
}

fn default_output_path(data_dir: &Path, stamp: &ReportStamp) -> PathBuf {
    data_dir
        .join("reports")
        .join(format!("results_report_{}.json", stamp.file_suffix))
}

/// Missing or empty sources become report warnings; malformed rows abort.
fn keep_or_warn<T>(
    section: &str,
    result: MetricsResult<T>,
    warnings: &mut Vec<String>,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err @ (MetricsError::Load { .. } | MetricsError::EmptyDataset { .. })) => {
            warn!(section, error = %err, "section omitted from report");
            warnings.push(format!("{section}: {err}"));
            Ok(None)
        }
        Err(err) => Err(err).with_context(|| format!("failed to build {section} section")),
    }
}

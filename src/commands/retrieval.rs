use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use thesis_results::metrics::{build_retrieval_report, filter_by_subject, subjects};
use thesis_results::model::{OUTPUT_SCHEMA_VERSION, RetrievalReport, ScoredQuery, SourceFile};
use tracing::{info, warn};

use crate::cli::RetrievalArgs;
use crate::commands::{DataSources, write_json_stdout, write_text_stdout};

#[derive(Debug, Serialize)]
struct RetrievalOutput<'a> {
    schema_version: u32,
    source: SourceFile,
    report: RetrievalReport,
    subject_filter: Option<String>,
    queries: Vec<&'a ScoredQuery>,
}

pub fn run(args: RetrievalArgs) -> Result<()> {
    let path = args.data.retrieval_path();
    info!(path = %path.display(), "loading retrieval measurements");

    let mut sources = DataSources::default();
    let (rows, source) = sources.scored_queries(&path).with_context(|| {
        format!(
            "failed to prepare retrieval measurements from {}",
            path.display()
        )
    })?;
    info!(rows = rows.len(), sha256 = %source.sha256, "normalized retrieval measurements");

    let report =
        build_retrieval_report(&rows).context("failed to summarize retrieval measurements")?;

    if let Some(subject) = &args.subject
        && !subjects(&rows).contains(subject)
    {
        warn!(subject = %subject, "subject filter matches no queries");
    }

    let queries = if args.details {
        filter_by_subject(&rows, args.subject.as_deref())
    } else {
        Vec::new()
    };

    let output = RetrievalOutput {
        schema_version: OUTPUT_SCHEMA_VERSION,
        source,
        report,
        subject_filter: args.subject.clone(),
        queries,
    };

    if args.json {
        write_json_stdout(&output)
    } else {
        write_text_stdout(|out| render_text(out, &output))
    }
}

fn render_text(out: &mut dyn Write, output: &RetrievalOutput<'_>) -> io::Result<()> {
    let report = &output.report;

    writeln!(out, "Source: {} (sha256 {})", output.source.path, output.source.sha256)?;
    writeln!(out)?;

    writeln!(out, "Per subject:")?;
    writeln!(out, "\tsubject\tP(relevant)\tresponse_ms\tqueries")?;
    for summary in &report.subjects {
        writeln!(
            out,
            "\t{}\t{:.1}%\t{:.2}\t{}",
            display_subject(&summary.subject),
            summary.mean_rerank_probability,
            summary.mean_response_time_ms,
            summary.query_count
        )?;
    }
    writeln!(out)?;

    let corpus = &report.corpus;
    writeln!(out, "Corpus ({} queries):", corpus.query_count)?;
    writeln!(
        out,
        "\tmean top-k P(relevant): {:.1}%",
        corpus.mean_topk_probability * 100.0
    )?;
    writeln!(
        out,
        "\tmean top-1 P(relevant): {:.1}%",
        corpus.mean_top1_probability * 100.0
    )?;
    writeln!(out, "\tsuccess rate (top-1 >= 70%): {}%", corpus.success_rate_at_70)?;
    writeln!(out, "\tsuccess rate (top-1 >= 50%): {}%", corpus.success_rate_at_50)?;
    writeln!(out, "\tmean total time: {:.2} ms", corpus.mean_total_time_ms)?;
    writeln!(out)?;

    let scores = &report.scores;
    writeln!(out, "Score comparison:")?;
    writeln!(out, "\tFAISS cosine similarity: {:.2}", scores.mean_faiss_similarity)?;
    writeln!(out, "\trerank probability: {:.1}%", scores.mean_rerank_probability_pct)?;
    writeln!(out, "\ttop-1 probability: {:.1}%", scores.mean_top1_probability_pct)?;
    writeln!(out)?;

    writeln!(out, "Relevance distribution:")?;
    for bucket in &report.distribution {
        writeln!(
            out,
            "\t{} ({})\t{}\t{:.0}%",
            bucket.category,
            bucket.category.range_label(),
            bucket.query_count,
            bucket.percentage
        )?;
    }
    writeln!(out)?;

    let timing = &report.timing;
    writeln!(out, "Response time:")?;
    writeln!(
        out,
        "\tFAISS search\t{:.2} ms\t{:.1}%",
        timing.mean_faiss_time_ms, timing.faiss_share_pct
    )?;
    writeln!(
        out,
        "\tcross-encoder rerank\t{:.2} ms\t{:.1}%",
        timing.mean_rerank_time_ms, timing.rerank_share_pct
    )?;
    writeln!(out, "\tpipeline\t{:.2} ms\t100.0%", timing.mean_pipeline_time_ms)?;
    writeln!(
        out,
        "\treported total\t{:.2} ms (unaccounted {:.2} ms)",
        timing.mean_total_time_ms, timing.mean_unaccounted_time_ms
    )?;

    if !output.queries.is_empty() {
        writeln!(out)?;
        match &output.subject_filter {
            Some(subject) => writeln!(out, "Queries ({subject}): {}", output.queries.len())?,
            None => writeln!(out, "Queries: {}", output.queries.len())?,
        }
        for row in &output.queries {
            writeln!(
                out,
                "\t{}\tfaiss={:.2}\tP(relevant)={:.1}%\ttop1={:.1}%\t{}",
                display_subject(&row.measurement.subject),
                row.faiss_probability,
                row.rerank_probability * 100.0,
                row.rerank_top1_probability * 100.0,
                row.measurement.query_text
            )?;
        }
    }

    Ok(())
}

fn display_subject(subject: &str) -> &str {
    if subject.is_empty() {
        "(no subject)"
    } else {
        subject
    }
}

#[cfg(test)]
mod tests {
    use thesis_results::metrics::score_measurement;
    use thesis_results::model::QueryMeasurement;

    use super::*;

    fn row(subject: &str, logit: f64) -> ScoredQuery {
        score_measurement(QueryMeasurement {
            subject: subject.to_string(),
            query_text: format!("apa itu {subject}?"),
            faiss_score: 0.64,
            rerank_avg_logit: logit,
            rerank_top1_logit: logit + 1.0,
            faiss_time_ms: 20.0,
            rerank_time_ms: 60.0,
            total_time_ms: 82.0,
        })
    }

    #[test]
    fn render_text_lists_every_section() {
        let rows = vec![row("OOP", 3.0), row("", -1.0)];
        let output = RetrievalOutput {
            schema_version: OUTPUT_SCHEMA_VERSION,
            source: SourceFile {
                path: "hasil/Raw_Data_Retrieval.csv".to_string(),
                sha256: "abc".to_string(),
            },
            report: build_retrieval_report(&rows).expect("non-empty corpus"),
            subject_filter: None,
            queries: filter_by_subject(&rows, None),
        };

        let mut buffer = Vec::new();
        render_text(&mut buffer, &output).expect("render into memory");
        let text = String::from_utf8(buffer).expect("utf-8 output");

        assert!(text.contains("Per subject:"));
        assert!(text.contains("(no subject)"));
        assert!(text.contains("Very Relevant (>= 90%)"));
        assert!(text.contains("\tFAISS search\t20.00 ms\t25.0%"));
        assert!(text.contains("unaccounted 2.00 ms"));
        assert!(text.contains("Queries: 2"));
        assert!(text.contains("apa itu OOP?"));
    }

    #[test]
    fn json_output_uses_canonical_field_names() {
        let rows = vec![row("Basis Data", 0.0)];
        let output = RetrievalOutput {
            schema_version: OUTPUT_SCHEMA_VERSION,
            source: SourceFile {
                path: "raw.csv".to_string(),
                sha256: "abc".to_string(),
            },
            report: build_retrieval_report(&rows).expect("non-empty corpus"),
            subject_filter: Some("Basis Data".to_string()),
            queries: filter_by_subject(&rows, Some("Basis Data")),
        };

        let value = serde_json::to_value(&output).expect("serializable output");
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["report"]["subjects"][0]["subject"], "Basis Data");
        assert_eq!(value["report"]["corpus"]["mean_topk_probability"], 0.5);
        assert_eq!(value["report"]["distribution"][2]["category"], "Moderately Relevant");
        assert_eq!(value["queries"][0]["rerank_avg_logit"], 0.0);
        assert_eq!(value["queries"][0]["rerank_probability"], 0.5);
    }
}

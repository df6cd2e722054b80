use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use thesis_results::evaluation::{filter_assessments, summarize_assessments};
use thesis_results::model::{
    AssessmentSummary, GeneratedAssessment, OUTPUT_SCHEMA_VERSION, SourceFile,
};
use tracing::info;

use crate::cli::AssessmentsArgs;
use crate::commands::{DataSources, write_json_stdout, write_text_stdout, yes_no};

#[derive(Debug, Serialize)]
struct AssessmentsOutput<'a> {
    schema_version: u32,
    source: SourceFile,
    summary: AssessmentSummary,
    subject_filter: Option<String>,
    assessments: Vec<&'a GeneratedAssessment>,
}

pub fn run(args: AssessmentsArgs) -> Result<()> {
    let path = args.data.assessments_path();
    info!(path = %path.display(), "loading generated assessments");

    let mut sources = DataSources::default();
    let (assessments, source) = sources
        .assessments(&path)
        .with_context(|| {
            format!("failed to load generated assessments from {}", path.display())
        })?;

    let summary =
        summarize_assessments(&assessments).context("failed to summarize generated assessments")?;
    info!(
        total = summary.total_assessments,
        complete = summary.complete_count,
        "summarized generated assessments"
    );

    let listed = if args.subject.is_some() {
        filter_assessments(&assessments, args.subject.as_deref())
    } else {
        Vec::new()
    };

    let output = AssessmentsOutput {
        schema_version: OUTPUT_SCHEMA_VERSION,
        source,
        summary,
        subject_filter: args.subject.clone(),
        assessments: listed,
    };

    if args.json {
        write_json_stdout(&output)
    } else {
        write_text_stdout(|out| render_text(out, &output))
    }
}

fn render_text(out: &mut dyn Write, output: &AssessmentsOutput<'_>) -> io::Result<()> {
    let summary = &output.summary;

    writeln!(out, "Source: {} (sha256 {})", output.source.path, output.source.sha256)?;
    writeln!(
        out,
        "Assessments: {} across {} subjects",
        summary.total_assessments, summary.subject_count
    )?;
    writeln!(
        out,
        "\tstructure compliance: {}/{} ({:.0}%)",
        summary.complete_count, summary.total_assessments, summary.compliance_rate_pct
    )?;
    writeln!(
        out,
        "\tmean processing time: {:.1}s",
        summary.mean_processing_time_s
    )?;
    writeln!(out)?;

    writeln!(out, "Per subject:")?;
    for entry in &summary.per_subject {
        writeln!(out, "\t{}\t{}", entry.subject, entry.count)?;
    }

    if let Some(subject) = &output.subject_filter {
        writeln!(out)?;
        writeln!(out, "Assessments for {subject}: {}", output.assessments.len())?;
        for assessment in &output.assessments {
            writeln!(
                out,
                "\t{}\t{}\ttime={:.1}s\thas_soal={}\thas_kunci_jawaban={}",
                assessment.topic.as_deref().unwrap_or("Unknown"),
                assessment.difficulty,
                assessment.metrics.processing_time_s,
                yes_no(assessment.metrics.has_soal),
                yes_no(assessment.metrics.has_kunci_jawaban),
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_text_lists_subject_detail_when_filtered() {
        let assessments: Vec<GeneratedAssessment> = serde_json::from_str(
            r#"[
              {"mata_kuliah": "Basis Data", "topic": "Normalisasi", "difficulty": "Mudah",
               "metrics": {"structure_compliance": 1.0, "processing_time_s": 12.5,
                           "has_soal": true, "has_kunci_jawaban": true}},
              {"mata_kuliah": "OOP", "difficulty": "Sulit",
               "metrics": {"structure_compliance": 0.5, "processing_time_s": 7.5}}
            ]"#,
        )
        .expect("fixture should deserialize");

        let output = AssessmentsOutput {
            schema_version: OUTPUT_SCHEMA_VERSION,
            source: SourceFile {
                path: "log.json".to_string(),
                sha256: "abc".to_string(),
            },
            summary: summarize_assessments(&assessments).expect("non-empty assessments"),
            subject_filter: Some("OOP".to_string()),
            assessments: filter_assessments(&assessments, Some("OOP")),
        };

        let mut buffer = Vec::new();
        render_text(&mut buffer, &output).expect("render into memory");
        let text = String::from_utf8(buffer).expect("utf-8 output");

        assert!(text.contains("structure compliance: 1/2 (50%)"));
        assert!(text.contains("mean processing time: 10.0s"));
        assert!(text.contains("Assessments for OOP: 1"));
        assert!(text.contains("\tUnknown\tSulit\ttime=7.5s\thas_soal=no\thas_kunci_jawaban=no"));
    }
}

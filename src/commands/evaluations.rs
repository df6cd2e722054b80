use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use thesis_results::evaluation::{
    EvaluationFilter, filter_evaluations, summarize_evaluations, with_comments,
};
use thesis_results::model::{
    EvaluationSummary, ExpertEvaluation, OUTPUT_SCHEMA_VERSION, SourceFile,
};
use tracing::info;

use crate::cli::EvaluationsArgs;
use crate::commands::{DataSources, write_json_stdout, write_text_stdout};

#[derive(Debug, Serialize)]
struct EvaluationsOutput<'a> {
    schema_version: u32,
    source: SourceFile,
    summary: EvaluationSummary,
    shown: usize,
    evaluations: Vec<&'a ExpertEvaluation>,
}

pub fn run(args: EvaluationsArgs) -> Result<()> {
    let path = args.data.evaluations_path();
    info!(path = %path.display(), "loading expert evaluations");

    let mut sources = DataSources::default();
    let (evaluations, source) = sources
        .evaluations(&path)
        .with_context(|| {
            format!("failed to load expert evaluations from {}", path.display())
        })?;

    let summary =
        summarize_evaluations(&evaluations).context("failed to summarize expert evaluations")?;

    let filter = EvaluationFilter {
        subject: args.subject.clone(),
        evaluator: args.evaluator.clone(),
        difficulty: args.difficulty.clone(),
    };
    let filtered = filter_evaluations(&evaluations, &filter);
    info!(
        total = evaluations.len(),
        shown = filtered.len(),
        "filtered expert evaluations"
    );

    let output = EvaluationsOutput {
        schema_version: OUTPUT_SCHEMA_VERSION,
        source,
        summary,
        shown: filtered.len(),
        evaluations: filtered,
    };

    if args.json {
        write_json_stdout(&output)
    } else {
        write_text_stdout(|out| render_text(out, &output))
    }
}

fn render_text(out: &mut dyn Write, output: &EvaluationsOutput<'_>) -> io::Result<()> {
    let summary = &output.summary;

    writeln!(out, "Source: {} (sha256 {})", output.source.path, output.source.sha256)?;
    writeln!(
        out,
        "Evaluations: {} by {} evaluators over {} assessments",
        summary.total_evaluations, summary.unique_evaluators, summary.unique_assessments
    )?;
    writeln!(out, "\trelevance\t{:.2}", summary.mean_relevance)?;
    writeln!(out, "\tdifficulty match\t{:.2}", summary.mean_difficulty_match)?;
    writeln!(out, "\tstructure\t{:.2}", summary.mean_structure)?;
    writeln!(out, "\tpedagogical value\t{:.2}", summary.mean_pedagogical_value)?;
    writeln!(out, "\toverall\t{:.2}", summary.mean_overall)?;
    writeln!(
        out,
        "Bands: excellent={} good={} needs_improvement={}",
        summary.excellent_count, summary.good_count, summary.needs_improvement_count
    )?;
    writeln!(out)?;

    writeln!(out, "Showing {} evaluations", output.shown)?;
    for evaluation in &output.evaluations {
        writeln!(
            out,
            "\t{}\t{}\t{}\t{}\trel={:.1} diff={:.1} struct={:.1} ped={:.1} overall={:.2}\t{}",
            evaluation.evaluator_name,
            evaluation.subject,
            evaluation.topic,
            evaluation.difficulty,
            evaluation.relevance,
            evaluation.difficulty_match,
            evaluation.structure,
            evaluation.pedagogical_value,
            evaluation.overall,
            evaluation.interpretation.as_deref().unwrap_or("-"),
        )?;
    }

    let commented = with_comments(output.evaluations.iter().copied());
    if !commented.is_empty() {
        writeln!(out)?;
        writeln!(out, "Comments:")?;
        for evaluation in commented {
            writeln!(
                out,
                "\t{} on {}: {}",
                evaluation.evaluator_name,
                evaluation.topic,
                evaluation.comments.as_deref().unwrap_or_default().trim()
            )?;
        }
    }

    Ok(())
}

use std::collections::{BTreeSet, HashMap};

use crate::error::{MetricsError, MetricsResult};
use crate::model::{
    CategoryCount, CorpusSummary, QueryMeasurement, RawQueryRow, RelevanceCategory,
    RetrievalReport, ScoreComparison, ScoredQuery, SubjectSummary, TimingBreakdown,
};


pub const VERY_RELEVANT_MIN: f64 = 0.90;
pub const RELEVANT_MIN: f64 = 0.70;
pub const MODERATELY_RELEVANT_MIN: f64 = 0.50;

pub const SUCCESS_THRESHOLD_HIGH: f64 = 0.70;
pub const SUCCESS_THRESHOLD_LOW: f64 = 0.50;

/// Logistic function, evaluated so that `exp` never sees a large positive
/// argument.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

/// Validates raw rows and derives the probability columns.
///
/// Row indices in errors are zero-based positions in `rows`. Output order is
/// input order and no row is dropped.
pub fn normalize(rows: &[RawQueryRow]) -> MetricsResult<Vec<ScoredQuery>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| parse_measurement(index, row).map(score_measurement))
        .collect()
}

pub fn score_measurement(measurement: QueryMeasurement) -> ScoredQuery {
    ScoredQuery {
        rerank_probability: sigmoid(measurement.rerank_avg_logit),
        rerank_top1_probability: sigmoid(measurement.rerank_top1_logit),
        faiss_probability: measurement.faiss_score,
        measurement,
    }
}

fn parse_measurement(index: usize, row: &RawQueryRow) -> MetricsResult<QueryMeasurement> {
    Ok(QueryMeasurement {
        subject: row.subject.clone().unwrap_or_default(),
        query_text: row.query_text.clone().unwrap_or_default(),
        faiss_score: parse_number(index, "faiss_score", row.faiss_score.as_deref())?,
        rerank_avg_logit: parse_number(
            index,
            "rerank_avg_logit",
            row.rerank_avg_logit.as_deref(),
        )?,
        rerank_top1_logit: parse_number(
            index,
            "rerank_top1_logit",
            row.rerank_top1_logit.as_deref(),
        )?,
        faiss_time_ms: parse_number(index, "faiss_time_ms", row.faiss_time_ms.as_deref())?,
        rerank_time_ms: parse_number(index, "rerank_time_ms", row.rerank_time_ms.as_deref())?,
        total_time_ms: parse_number(index, "total_time_ms", row.total_time_ms.as_deref())?,
    })
}

fn parse_number(index: usize, field: &'static str, value: Option<&str>) -> MetricsResult<f64> {
    let raw = value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| MetricsError::malformed(index, field, "missing value"))?;

    let parsed = raw
        .parse::<f64>()
        .map_err(|_| MetricsError::malformed(index, field, format!("not a number: {raw:?}")))?;

    if !parsed.is_finite() {
        return Err(MetricsError::malformed(
            index,
            field,
            format!("non-finite value: {raw:?}"),
        ));
    }

    Ok(parsed)
}

#[derive(Default)]
struct SubjectAccumulator {
    probability_sum: f64,
    time_sum: f64,
    count: usize,
}

/// Per-subject means in first-seen subject order.
pub fn aggregate_by_subject(rows: &[ScoredQuery]) -> Vec<SubjectSummary> {
    let mut positions = HashMap::<&str, usize>::new();
    let mut groups = Vec::<(&str, SubjectAccumulator)>::new();

    for row in rows {
        let subject = row.measurement.subject.as_str();
        let position = *positions.entry(subject).or_insert_with(|| {
            groups.push((subject, SubjectAccumulator::default()));
            groups.len() - 1
        });

        let accumulator = &mut groups[position].1;
        accumulator.probability_sum += row.rerank_probability;
        accumulator.time_sum += row.measurement.total_time_ms;
        accumulator.count += 1;
    }

    groups
        .into_iter()
        .map(|(subject, accumulator)| {
            let count = accumulator.count as f64;
            SubjectSummary {
                subject: subject.to_string(),
                mean_rerank_probability: accumulator.probability_sum / count * 100.0,
                mean_response_time_ms: accumulator.time_sum / count,
                query_count: accumulator.count,
            }
        })
        .collect()
}

pub fn summarize_corpus(rows: &[ScoredQuery]) -> MetricsResult<CorpusSummary> {
    let empty = || MetricsError::EmptyDataset {
        what: "retrieval corpus",
    };

    let mean_topk_probability =
        mean(rows.iter().map(|row| row.rerank_probability)).ok_or_else(empty)?;
    let mean_top1_probability =
        mean(rows.iter().map(|row| row.rerank_top1_probability)).ok_or_else(empty)?;
    let mean_total_time_ms =
        mean(rows.iter().map(|row| row.measurement.total_time_ms)).ok_or_else(empty)?;

    Ok(CorpusSummary {
        query_count: rows.len(),
        mean_topk_probability,
        mean_top1_probability,
        success_rate_at_70: success_rate(rows, SUCCESS_THRESHOLD_HIGH).ok_or_else(empty)?,
        success_rate_at_50: success_rate(rows, SUCCESS_THRESHOLD_LOW).ok_or_else(empty)?,
        mean_total_time_ms,
    })
}

/// Whole-number percentage of rows whose top-1 probability reaches `threshold`.
///
/// Halves round away from zero: 1 hit in 8 rows is 13, not 12.
fn success_rate(rows: &[ScoredQuery], threshold: f64) -> Option<u32> {
    if rows.is_empty() {
        return None;
    }
    let hits = rows
        .iter()
        .filter(|row| row.rerank_top1_probability >= threshold)
        .count();
    Some((hits as f64 * 100.0 / rows.len() as f64).round() as u32)
}

pub fn categorize(probability: f64) -> RelevanceCategory {
    if probability >= VERY_RELEVANT_MIN {
        RelevanceCategory::VeryRelevant
    } else if probability >= RELEVANT_MIN {
        RelevanceCategory::Relevant
    } else if probability >= MODERATELY_RELEVANT_MIN {
        RelevanceCategory::ModeratelyRelevant
    } else {
        RelevanceCategory::LowRelevance
    }
}

/// Buckets every row by `rerank_probability`. All four categories are always
/// present, highest threshold first.
pub fn relevance_distribution(rows: &[ScoredQuery]) -> MetricsResult<Vec<CategoryCount>> {
    if rows.is_empty() {
        return Err(MetricsError::EmptyDataset {
            what: "relevance distribution",
        });
    }

    let mut counts = [0_usize; 4];
    for row in rows {
        counts[categorize(row.rerank_probability) as usize] += 1;
    }

    let total = rows.len() as f64;
    Ok(RelevanceCategory::ALL
        .iter()
        .zip(counts)
        .map(|(category, query_count)| CategoryCount {
            category: *category,
            query_count,
            percentage: query_count as f64 / total * 100.0,
        })
        .collect())
}

pub fn timing_breakdown(rows: &[ScoredQuery]) -> MetricsResult<TimingBreakdown> {
    let empty = || MetricsError::EmptyDataset {
        what: "timing breakdown",
    };

    let mean_faiss_time_ms = mean(rows.iter().map(|row| row.measurement.faiss_time_ms))
        .ok_or_else(empty)?;
    let mean_rerank_time_ms = mean(rows.iter().map(|row| row.measurement.rerank_time_ms))
        .ok_or_else(empty)?;
    let mean_total_time_ms = mean(rows.iter().map(|row| row.measurement.total_time_ms))
        .ok_or_else(empty)?;
    let mean_unaccounted_time_ms = mean(rows.iter().map(|row| {
        let measurement = &row.measurement;
        measurement.total_time_ms - (measurement.faiss_time_ms + measurement.rerank_time_ms)
    }))
    .ok_or_else(empty)?;

    let mean_pipeline_time_ms = mean_faiss_time_ms + mean_rerank_time_ms;
    let share = |part: f64| {
        if mean_pipeline_time_ms > 0.0 {
            part / mean_pipeline_time_ms * 100.0
        } else {
            0.0
        }
    };

    Ok(TimingBreakdown {
        mean_faiss_time_ms,
        mean_rerank_time_ms,
        mean_pipeline_time_ms,
        faiss_share_pct: share(mean_faiss_time_ms),
        rerank_share_pct: share(mean_rerank_time_ms),
        mean_total_time_ms,
        mean_unaccounted_time_ms,
    })
}

pub fn score_comparison(rows: &[ScoredQuery]) -> MetricsResult<ScoreComparison> {
    let empty = || MetricsError::EmptyDataset {
        what: "score comparison",
    };

    Ok(ScoreComparison {
        mean_faiss_similarity: mean(rows.iter().map(|row| row.faiss_probability))
            .ok_or_else(empty)?,
        mean_rerank_probability_pct: mean(rows.iter().map(|row| row.rerank_probability))
            .ok_or_else(empty)?
            * 100.0,
        mean_top1_probability_pct: mean(rows.iter().map(|row| row.rerank_top1_probability))
            .ok_or_else(empty)?
            * 100.0,
    })
}

/// Runs every retrieval view over an already normalized corpus.
pub fn build_retrieval_report(rows: &[ScoredQuery]) -> MetricsResult<RetrievalReport> {
    Ok(RetrievalReport {
        corpus: summarize_corpus(rows)?,
        subjects: aggregate_by_subject(rows),
        scores: score_comparison(rows)?,
        distribution: relevance_distribution(rows)?,
        timing: timing_breakdown(rows)?,
    })
}

pub fn filter_by_subject<'a>(
    rows: &'a [ScoredQuery],
    subject: Option<&str>,
) -> Vec<&'a ScoredQuery> {
    rows.iter()
        .filter(|row| subject.is_none_or(|wanted| row.measurement.subject == wanted))
        .collect()
}

pub fn subjects(rows: &[ScoredQuery]) -> Vec<String> {
    rows.iter()
        .map(|row| row.measurement.subject.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut total = 0.0_f64;
    let mut count = 0_usize;
    for value in values {
        total += value;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(total / count as f64)
    }
}

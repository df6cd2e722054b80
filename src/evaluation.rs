use std::collections::{HashMap, HashSet};

use crate::error::{MetricsError, MetricsResult};
use crate::metrics::mean;
use crate::model::{
    AssessmentSummary, EvaluationSummary, ExpertEvaluation, GeneratedAssessment, SubjectCount,
};

pub const EXCELLENT_OVERALL_MIN: f64 = 4.25;
pub const GOOD_OVERALL_MIN: f64 = 3.5;

/// Exact-match filters; `None` keeps every value.
#[derive(Debug, Clone, Default)]
pub struct EvaluationFilter {
    pub subject: Option<String>,
    pub evaluator: Option<String>,
    pub difficulty: Option<String>,
}

impl EvaluationFilter {
    pub fn matches(&self, evaluation: &ExpertEvaluation) -> bool {
        fn accepts(wanted: &Option<String>, actual: &str) -> bool {
            wanted.as_deref().is_none_or(|wanted| wanted == actual)
        }

        accepts(&self.subject, &evaluation.subject)
            && accepts(&self.evaluator, &evaluation.evaluator_name)
            && accepts(&self.difficulty, &evaluation.difficulty)
    }
}

pub fn filter_evaluations<'a>(
    evaluations: &'a [ExpertEvaluation],
    filter: &EvaluationFilter,
) -> Vec<&'a ExpertEvaluation> {
    evaluations
        .iter()
        .filter(|evaluation| filter.matches(evaluation))
        .collect()
}

/// Evaluations carrying a non-blank reviewer comment.
pub fn with_comments<'a, I>(evaluations: I) -> Vec<&'a ExpertEvaluation>
where
    I: IntoIterator<Item = &'a ExpertEvaluation>,
{
    evaluations
        .into_iter()
        .filter(|evaluation| {
            evaluation
                .comments
                .as_deref()
                .is_some_and(|comment| !comment.trim().is_empty())
        })
        .collect()
}

pub fn summarize_evaluations(
    evaluations: &[ExpertEvaluation],
) -> MetricsResult<EvaluationSummary> {
    let empty = || MetricsError::EmptyDataset {
        what: "expert evaluations",
    };
    let aspect_mean = |select: fn(&ExpertEvaluation) -> f64| {
        mean(evaluations.iter().map(select)).ok_or_else(empty)
    };

    let mean_overall = aspect_mean(|evaluation| evaluation.overall)?;

    let unique_evaluators = evaluations
        .iter()
        .map(|evaluation| evaluation.evaluator_name.as_str())
        .collect::<HashSet<_>>()
        .len();
    let unique_assessments = evaluations
        .iter()
        .map(|evaluation| evaluation.assessment_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    let excellent_count = evaluations
        .iter()
        .filter(|evaluation| evaluation.overall >= EXCELLENT_OVERALL_MIN)
        .count();
    let good_count = evaluations
        .iter()
        .filter(|evaluation| {
            evaluation.overall >= GOOD_OVERALL_MIN && evaluation.overall < EXCELLENT_OVERALL_MIN
        })
        .count();
    let needs_improvement_count = evaluations
        .iter()
        .filter(|evaluation| evaluation.overall < GOOD_OVERALL_MIN)
        .count();

    Ok(EvaluationSummary {
        total_evaluations: evaluations.len(),
        unique_evaluators,
        unique_assessments,
        mean_overall,
        mean_relevance: aspect_mean(|evaluation| evaluation.relevance)?,
        mean_difficulty_match: aspect_mean(|evaluation| evaluation.difficulty_match)?,
        mean_structure: aspect_mean(|evaluation| evaluation.structure)?,
        mean_pedagogical_value: aspect_mean(|evaluation| evaluation.pedagogical_value)?,
        excellent_count,
        good_count,
        needs_improvement_count,
    })
}

pub fn filter_assessments<'a>(
    assessments: &'a [GeneratedAssessment],
    subject: Option<&str>,
) -> Vec<&'a GeneratedAssessment> {
    assessments
        .iter()
        .filter(|assessment| subject.is_none_or(|wanted| assessment.subject == wanted))
        .collect()
}

pub fn summarize_assessments(
    assessments: &[GeneratedAssessment],
) -> MetricsResult<AssessmentSummary> {
    let mean_processing_time_s = mean(
        assessments
            .iter()
            .map(|assessment| assessment.metrics.processing_time_s),
    )
    .ok_or(MetricsError::EmptyDataset {
        what: "generated assessments",
    })?;

    let mut positions = HashMap::<&str, usize>::new();
    let mut per_subject = Vec::<SubjectCount>::new();
    for assessment in assessments {
        let subject = assessment.subject.as_str();
        let position = *positions.entry(subject).or_insert_with(|| {
            per_subject.push(SubjectCount {
                subject: subject.to_string(),
                count: 0,
            });
            per_subject.len() - 1
        });
        per_subject[position].count += 1;
    }
    // Largest subjects first; ties keep first-seen order.
    per_subject.sort_by(|left, right| right.count.cmp(&left.count));

    let complete_count = assessments
        .iter()
        .filter(|assessment| assessment.metrics.structure_compliance == 1.0)
        .count();
    let total = assessments.len();

    Ok(AssessmentSummary {
        total_assessments: total,
        subject_count: per_subject.len(),
        complete_count,
        compliance_rate_pct: complete_count as f64 / total as f64 * 100.0,
        mean_processing_time_s,
        per_subject,
    })
}

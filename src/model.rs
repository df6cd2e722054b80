use serde::{Deserialize, Serialize};

pub const OUTPUT_SCHEMA_VERSION: u32 = 1;

/// One CSV row as read from disk, before numeric validation.
///
/// Headers follow the upstream export (`mata_kuliah`, `rerank_top1`, ...);
/// the canonical field names are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawQueryRow {
    #[serde(default, rename = "mata_kuliah", alias = "subject")]
    pub subject: Option<String>,
    #[serde(default, rename = "query", alias = "query_text")]
    pub query_text: Option<String>,
    #[serde(default, rename = "faiss_avg_score", alias = "faiss_score")]
    pub faiss_score: Option<String>,
    #[serde(default, rename = "rerank_avg_score", alias = "rerank_avg_logit")]
    pub rerank_avg_logit: Option<String>,
    #[serde(default, rename = "rerank_top1", alias = "rerank_top1_logit")]
    pub rerank_top1_logit: Option<String>,
    #[serde(default)]
    pub faiss_time_ms: Option<String>,
    #[serde(default)]
    pub rerank_time_ms: Option<String>,
    #[serde(default)]
    pub total_time_ms: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMeasurement {
    pub subject: String,
    pub query_text: String,
    pub faiss_score: f64,
    pub rerank_avg_logit: f64,
    pub rerank_top1_logit: f64,
    pub faiss_time_ms: f64,
    pub rerank_time_ms: f64,
    pub total_time_ms: f64,
}

/// A measurement plus the probabilities derived from its raw scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredQuery {
    #[serde(flatten)]
    pub measurement: QueryMeasurement,
    pub rerank_probability: f64,
    pub rerank_top1_probability: f64,
    pub faiss_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSummary {
    pub subject: String,
    /// Percentage, 0-100.
    pub mean_rerank_probability: f64,
    pub mean_response_time_ms: f64,
    pub query_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusSummary {
    pub query_count: usize,
    pub mean_topk_probability: f64,
    pub mean_top1_probability: f64,
    pub success_rate_at_70: u32,
    pub success_rate_at_50: u32,
    pub mean_total_time_ms: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum RelevanceCategory {
    #[serde(rename = "Very Relevant")]
    VeryRelevant,
    #[serde(rename = "Relevant")]
    Relevant,
    #[serde(rename = "Moderately Relevant")]
    ModeratelyRelevant,
    #[serde(rename = "Low Relevance")]
    LowRelevance,
}

impl RelevanceCategory {
    pub const ALL: [Self; 4] = [
        Self::VeryRelevant,
        Self::Relevant,
        Self::ModeratelyRelevant,
        Self::LowRelevance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryRelevant => "Very Relevant",
            Self::Relevant => "Relevant",
            Self::ModeratelyRelevant => "Moderately Relevant",
            Self::LowRelevance => "Low Relevance",
        }
    }

    pub fn range_label(self) -> &'static str {
        match self {
            Self::VeryRelevant => ">= 90%",
            Self::Relevant => "70-90%",
            Self::ModeratelyRelevant => "50-70%",
            Self::LowRelevance => "< 50%",
        }
    }
}

impl std::fmt::Display for RelevanceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: RelevanceCategory,
    pub query_count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingBreakdown {
    pub mean_faiss_time_ms: f64,
    pub mean_rerank_time_ms: f64,
    pub mean_pipeline_time_ms: f64,
    pub faiss_share_pct: f64,
    pub rerank_share_pct: f64,
    pub mean_total_time_ms: f64,
    pub mean_unaccounted_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreComparison {
    pub mean_faiss_similarity: f64,
    pub mean_rerank_probability_pct: f64,
    pub mean_top1_probability_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertEvaluation {
    pub evaluator_name: String,
    pub assessment_id: String,
    #[serde(rename = "mata_kuliah", alias = "subject")]
    pub subject: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub difficulty: String,
    pub relevance: f64,
    pub difficulty_match: f64,
    pub structure: f64,
    pub pedagogical_value: f64,
    pub overall: f64,
    #[serde(default)]
    pub interpretation: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub total_evaluations: usize,
    pub unique_evaluators: usize,
    pub unique_assessments: usize,
    pub mean_overall: f64,
    pub mean_relevance: f64,
    pub mean_difficulty_match: f64,
    pub mean_structure: f64,
    pub mean_pedagogical_value: f64,
    pub excellent_count: usize,
    pub good_count: usize,
    pub needs_improvement_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentMetrics {
    #[serde(default)]
    pub structure_compliance: f64,
    #[serde(default)]
    pub processing_time_s: f64,
    #[serde(default)]
    pub has_soal: bool,
    #[serde(default)]
    pub has_kunci_jawaban: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAssessment {
    #[serde(rename = "mata_kuliah", alias = "subject")]
    pub subject: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub metrics: AssessmentMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectCount {
    pub subject: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentSummary {
    pub total_assessments: usize,
    pub subject_count: usize,
    pub complete_count: usize,
    pub compliance_rate_pct: f64,
    pub mean_processing_time_s: f64,
    pub per_subject: Vec<SubjectCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievalReport {
    pub subjects: Vec<SubjectSummary>,
    pub corpus: CorpusSummary,
    pub scores: ScoreComparison,
    pub distribution: Vec<CategoryCount>,
    pub timing: TimingBreakdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub path: String,
    pub sha256: String,
}

/// Combined document written by the `report` command.
#[derive(Debug, Clone, Serialize)]
pub struct ResultsReport {
    pub schema_version: u32,
    pub generated_at: String,
    pub sources: Vec<SourceFile>,
    pub retrieval: Option<RetrievalReport>,
    pub evaluations: Option<EvaluationSummary>,
    pub assessments: Option<AssessmentSummary>,
    pub warnings: Vec<String>,
}

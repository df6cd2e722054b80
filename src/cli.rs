use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub const RETRIEVAL_FILE: &str = "Raw_Data_Retrieval.csv";
pub const EVALUATIONS_FILE: &str = "Data_Evaluasi_Expert.json";
pub const ASSESSMENTS_FILE: &str = "Log_Hasil_Generate_Soal.json";

#[derive(Parser, Debug)]
#[command(
    name = "thesis-results",
    version,
    about = "Summaries of precomputed retrieval, evaluation and generation results"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Retrieval(RetrievalArgs),
    Evaluations(EvaluationsArgs),
    Assessments(AssessmentsArgs),
    Report(ReportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    #[arg(long, default_value = "hasil")]
    pub data_dir: PathBuf,

    #[arg(long)]
    pub retrieval_path: Option<PathBuf>,

    #[arg(long)]
    pub evaluations_path: Option<PathBuf>,

    #[arg(long)]
    pub assessments_path: Option<PathBuf>,
}

impl DataArgs {
    pub fn retrieval_path(&self) -> PathBuf {
        self.retrieval_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(RETRIEVAL_FILE))
    }

    pub fn evaluations_path(&self) -> PathBuf {
        self.evaluations_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(EVALUATIONS_FILE))
    }

    pub fn assessments_path(&self) -> PathBuf {
        self.assessments_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(ASSESSMENTS_FILE))
    }
}

#[derive(Args, Debug, Clone)]
pub struct RetrievalArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long)]
    pub subject: Option<String>,

    #[arg(long, default_value_t = false)]
    pub details: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct EvaluationsArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long)]
    pub subject: Option<String>,

    #[arg(long)]
    pub evaluator: Option<String>,

    #[arg(long)]
    pub difficulty: Option<String>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AssessmentsArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long)]
    pub subject: Option<String>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn data_paths_default_to_files_under_data_dir() {
        let cli = Cli::parse_from(["thesis-results", "retrieval", "--data-dir", "out"]);
        let Commands::Retrieval(args) = cli.command else {
            panic!("expected retrieval command");
        };
        assert_eq!(args.data.retrieval_path(), PathBuf::from("out").join(RETRIEVAL_FILE));
        assert!(!args.details);
    }

    #[test]
    fn explicit_path_overrides_data_dir() {
        let cli = Cli::parse_from([
            "thesis-results",
            "evaluations",
            "--evaluations-path",
            "/tmp/eval.json",
            "--evaluator",
            "Dosen A",
        ]);
        let Commands::Evaluations(args) = cli.command else {
            panic!("expected evaluations command");
        };
        assert_eq!(args.data.evaluations_path(), PathBuf::from("/tmp/eval.json"));
        assert_eq!(args.evaluator.as_deref(), Some("Dosen A"));
    }
}

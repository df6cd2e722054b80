use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// One instant rendered the two ways a report needs it: RFC 3339 for the
/// `generated_at` field and a separator-free form for file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportStamp {
    pub generated_at: String,
    pub file_suffix: String,
}

impl ReportStamp {
    pub fn at(ts: DateTime<Utc>) -> Self {
        Self {
            generated_at: ts.to_rfc3339_opts(SecondsFormat::Secs, true),
            file_suffix: ts.format("%Y%m%dT%H%M%SZ").to_string(),
        }
    }

    pub fn now() -> Self {
        Self::at(Utc::now())
    }
}

pub fn sha256_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Pretty JSON plus a trailing newline; missing parent directories are created.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report directory {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("failed to serialize json into {}", path.display()))?;
    writeln!(writer).with_context(|| format!("failed to write {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))
}

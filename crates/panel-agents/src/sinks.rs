//! JSONL persistence sinks.
//!
//! Append-only line-delimited JSON, one record per line, suitable for
//! later grading and shadow-versus-live comparison. The live and shadow
//! paths write to separate files through separate traits.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use consensus::{Bundle, ConsensusSink, FinalConsensus, RunTelemetry, ShadowRun, ShadowSink, VoteWeight};

async fn append_line<T: Serialize>(path: &Path, record: &T) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    Ok(())
}

/// Live-path sink writing expert bundles and final consensuses.
pub struct JsonlConsensusSink {
    path: PathBuf,
}

impl JsonlConsensusSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
enum ConsensusRecord<'a> {
    ExpertBundle {
        recorded_at: String,
        bundle: &'a Bundle,
        weight: &'a VoteWeight,
    },
    Consensus {
        recorded_at: String,
        consensus: &'a FinalConsensus,
        telemetry: &'a RunTelemetry,
    },
}

#[async_trait]
impl ConsensusSink for JsonlConsensusSink {
    async fn record_expert(&self, bundle: &Bundle, weight: &VoteWeight) -> anyhow::Result<()> {
        append_line(
            &self.path,
            &ConsensusRecord::ExpertBundle {
                recorded_at: chrono::Utc::now().to_rfc3339(),
                bundle,
                weight,
            },
        )
        .await
    }

    async fn record_consensus(
        &self,
        consensus: &FinalConsensus,
        telemetry: &RunTelemetry,
    ) -> anyhow::Result<()> {
        append_line(
            &self.path,
            &ConsensusRecord::Consensus {
                recorded_at: chrono::Utc::now().to_rfc3339(),
                consensus,
                telemetry,
            },
        )
        .await
    }
}

/// Shadow-path sink; a distinct type and file from the live sink.
pub struct JsonlShadowSink {
    path: PathBuf,
}

impl JsonlShadowSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Serialize)]
struct ShadowRecord<'a> {
    recorded_at: String,
    run: &'a ShadowRun,
}

#[async_trait]
impl ShadowSink for JsonlShadowSink {
    async fn record(&self, run: &ShadowRun) -> anyhow::Result<()> {
        append_line(
            &self.path,
            &ShadowRecord {
                recorded_at: chrono::Utc::now().to_rfc3339(),
                run,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus::{compute_weights, ExpertProfile};

    #[tokio::test]
    async fn test_expert_records_append_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("consensus.jsonl");
        let sink = JsonlConsensusSink::new(&path);

        let bundle = Bundle::fallback("quant", "game-1");
        let weights = compute_weights(&[ExpertProfile::rookie("quant")]).unwrap();
        sink.record_expert(&bundle, &weights[0]).await.unwrap();
        sink.record_expert(&bundle, &weights[0]).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["kind"], "expert_bundle");
            assert_eq!(value["bundle"]["expert_id"], "quant");
        }
    }

    #[tokio::test]
    async fn test_shadow_records_go_to_their_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shadow.jsonl");
        let sink = JsonlShadowSink::new(&path);

        let run = ShadowRun::new(Bundle::fallback("quant", "game-1"), false, 50, None);
        sink.record(&run).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(value["run"]["expert_id"], "quant");
        assert_eq!(value["run"]["valid"], false);
    }
}

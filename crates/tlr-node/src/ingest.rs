//! Ingestion: the single writer task and the file readers feeding it.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use tlr_routing::{CurrencyNetwork, TrustlineEvent, TrustlineSnapshot};

/// Work for the writer task. Commands are applied in the order they are sent.
#[derive(Debug)]
pub enum IngestCommand {
    /// Replace the whole graph.
    FullSync(Vec<TrustlineSnapshot>),
    /// Apply one event from the ordered stream.
    Event(TrustlineEvent),
    /// Reply once every earlier command has been applied.
    Flush(oneshot::Sender<IngestStats>),
}

/// Counters kept by the writer task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub applied: u64,
    pub rejected: u64,
}

/// Spawn the only task allowed to mutate `network`.
///
/// A rejected event is logged and counted; it never stops the stream. The
/// task ends when every sender is dropped and returns its final counters.
///
/// Taking the write lock waits for in-flight searches, so the writer lives
/// on the blocking pool like the queries do.
pub fn spawn_writer(
    network: Arc<CurrencyNetwork>,
    capacity: usize,
) -> (mpsc::Sender<IngestCommand>, JoinHandle<IngestStats>) {
    let (tx, mut rx) = mpsc::channel::<IngestCommand>(capacity);
    let handle = tokio::task::spawn_blocking(move || {
        let mut stats = IngestStats::default();
        while let Some(command) = rx.blocking_recv() {
            match command {
                IngestCommand::FullSync(snapshots) => {
                    match network.apply_full_sync(snapshots) {
                        Ok(()) => stats.applied += 1,
                        Err(e) => {
                            stats.rejected += 1;
                            tracing::error!(error = %e, "full sync rejected");
                        }
                    }
                }
                IngestCommand::Event(event) => match network.apply_event(&event) {
                    Ok(()) => stats.applied += 1,
                    Err(e) => {
                        stats.rejected += 1;
                        let (a, b) = event.accounts();
                        tracing::warn!(error = %e, a = %a, b = %b, "event rejected");
                    }
                },
                IngestCommand::Flush(reply) => {
                    let _ = reply.send(stats);
                }
            }
        }
        tracing::info!(
            applied = stats.applied,
            rejected = stats.rejected,
            "ingest writer exited"
        );
        stats
    });
    (tx, handle)
}

/// Read a snapshot file: a JSON array of trustlines.
pub async fn load_snapshot(path: &Path) -> Result<Vec<TrustlineSnapshot>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    let snapshots: Vec<TrustlineSnapshot> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing snapshot {}", path.display()))?;
    tracing::info!(path = %path.display(), trustlines = snapshots.len(), "snapshot loaded");
    Ok(snapshots)
}

/// Stream a JSON-lines event log into the writer. Blank lines are skipped.
/// Returns the number of events sent.
pub async fn feed_event_log(path: &Path, tx: &mpsc::Sender<IngestCommand>) -> Result<usize> {
    let file = File::open(path)
        .await
        .with_context(|| format!("opening event log {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut sent = 0;
    let mut line_no = 0;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: TrustlineEvent = serde_json::from_str(line)
            .with_context(|| format!("{}:{line_no}: malformed event", path.display()))?;
        tx.send(IngestCommand::Event(event))
            .await
            .map_err(|_| anyhow::anyhow!("ingest writer stopped"))?;
        sent += 1;
    }
    tracing::info!(path = %path.display(), events = sent, "event log replayed");
    Ok(sent)
}

/// Wait until the writer has applied everything sent so far.
pub async fn flush(tx: &mpsc::Sender<IngestCommand>) -> Result<IngestStats> {
    let (reply, done) = oneshot::channel();
    tx.send(IngestCommand::Flush(reply))
        .await
        .map_err(|_| anyhow::anyhow!("ingest writer stopped"))?;
    done.await
        .map_err(|_| anyhow::anyhow!("ingest writer dropped the flush"))
}

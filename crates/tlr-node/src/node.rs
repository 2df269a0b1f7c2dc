//! The relay node orchestrator.
//!
//! Owns the shared currency network, runs the ingestion writer task and
//! answers JSON-line queries read from an input stream.

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use tlr_routing::CurrencyNetwork;

use crate::config::TlrConfig;
use crate::ingest::{self, IngestCommand, IngestStats};
use crate::query::{self, Query, QueryDefaults, Response};

pub struct TlrNode {
    config: TlrConfig,
    network: Arc<CurrencyNetwork>,
    /// Sender side of the writer task; `None` until started.
    ingest_tx: Option<mpsc::Sender<IngestCommand>>,
    writer: Option<JoinHandle<IngestStats>>,
}

impl TlrNode {
    pub fn new(config: TlrConfig) -> Result<Self> {
        config.validate()?;
        let network = Arc::new(CurrencyNetwork::new(config.network)?);
        tracing::info!(
            fee_divisor = config.network.capacity_imbalance_fee_divisor,
            default_interest_rate = config.network.default_interest_rate,
            custom_interests = config.network.custom_interests,
            "relay node created"
        );
        Ok(Self {
            config,
            network,
            ingest_tx: None,
            writer: None,
        })
    }

    pub fn network(&self) -> &Arc<CurrencyNetwork> {
        &self.network
    }

    /// Start the writer task and load the configured snapshot and event log.
    /// Returns once everything read has been applied.
    pub async fn start(&mut self) -> Result<IngestStats> {
        let (tx, writer) = ingest::spawn_writer(
            Arc::clone(&self.network),
            self.config.ingest.event_channel_capacity,
        );
        self.ingest_tx = Some(tx.clone());
        self.writer = Some(writer);

        if let Some(path) = &self.config.ingest.snapshot_path {
            let snapshots = ingest::load_snapshot(path).await?;
            tx.send(IngestCommand::FullSync(snapshots))
                .await
                .map_err(|_| anyhow::anyhow!("ingest writer stopped"))?;
        }
        if let Some(path) = &self.config.ingest.events_path {
            ingest::feed_event_log(path, &tx).await?;
        }

        let stats = ingest::flush(&tx).await?;
        tracing::info!(
            accounts = self.network.node_count(),
            trustlines = self.network.trustline_count(),
            applied = stats.applied,
            rejected = stats.rejected,
            "initial state loaded"
        );
        Ok(stats)
    }

    /// Sender for events arriving after start, for the indexer to use.
    pub fn ingest_sender(&self) -> Option<mpsc::Sender<IngestCommand>> {
        self.ingest_tx.clone()
    }

    /// Answer one query per input line until the input ends.
    ///
    /// Up to `max_concurrent_queries` searches run at once, so responses may
    /// come back in a different order than the queries; each carries its own
    /// query id.
    pub async fn serve<R, W>(&self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let permits = Arc::new(Semaphore::new(self.config.routing.max_concurrent_queries));
        let defaults = QueryDefaults::from(&self.config.routing);
        let (response_tx, mut response_rx) = mpsc::channel::<Response>(64);

        let mut lines = input.lines();
        let mut pending = 0usize;
        let mut input_open = true;

        tracing::info!("serving queries");
        while input_open || pending > 0 {
            tokio::select! {
                line = lines.next_line(), if input_open => {
                    match line? {
                        Some(line) if line.trim().is_empty() => {}
                        Some(line) => match serde_json::from_str::<Query>(&line) {
                            Ok(query) => {
                                let permit = Arc::clone(&permits).acquire_owned().await?;
                                let network = Arc::clone(&self.network);
                                let response_tx = response_tx.clone();
                                pending += 1;
                                tokio::spawn(async move {
                                    let response = query::run_query(network, query, defaults).await;
                                    drop(permit);
                                    let _ = response_tx.send(response).await;
                                });
                            }
                            Err(e) => {
                                tracing::debug!(error = %e, "unparseable query");
                                write_response(&mut output, &Response::bad_request(e)).await?;
                            }
                        },
                        None => input_open = false,
                    }
                }
                Some(response) = response_rx.recv(), if pending > 0 => {
                    pending -= 1;
                    write_response(&mut output, &response).await?;
                }
            }
        }
        output.flush().await?;
        Ok(())
    }

    /// Stop the writer task once everything queued has been applied.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("shutting down relay node");
        self.ingest_tx = None;
        if let Some(writer) = self.writer.take() {
            let stats = writer.await?;
            tracing::info!(
                applied = stats.applied,
                rejected = stats.rejected,
                "relay node shut down"
            );
        }
        Ok(())
    }
}

async fn write_response<W: AsyncWrite + Unpin>(output: &mut W, response: &Response) -> Result<()> {
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    Ok(())
}

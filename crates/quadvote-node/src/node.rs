//! Node runtime: engine bootstrap, persistence and the request loop.

use std::sync::Arc;

use quadvote_governance::{
    ChannelObserver, Clock, GovernanceEvent, GovernanceSnapshot, SystemClock, VotingEngine,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::commands::{self, Response};
use crate::config::NodeConfig;

/// A voting engine plus the configuration it was started from.
pub struct GovernanceNode {
    /// Node configuration
    pub config: NodeConfig,
    engine: Arc<VotingEngine>,
}

impl GovernanceNode {
    /// Create a node that reads the wall clock.
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a node with an explicit time source.
    ///
    /// Restores `<data_dir>/state.json` when persistence is enabled and the
    /// file exists. Otherwise starts empty and applies the genesis mints.
    pub fn with_clock(config: NodeConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        info!("Initializing governance node: {}", config.name);
        let owner = config.owner_address()?;

        let restored = if config.persist {
            GovernanceSnapshot::load(&config.data_dir)?
        } else {
            None
        };

        let engine = match restored {
            Some(snapshot) => {
                if snapshot.owner != owner {
                    anyhow::bail!(
                        "Snapshot owner {} does not match configured owner {}",
                        snapshot.owner,
                        owner
                    );
                }
                VotingEngine::from_snapshot(snapshot, clock)?
            }
            None => {
                let engine = VotingEngine::new(owner, clock);
                for (account, credits) in config.genesis_mints()? {
                    engine.mint(owner, account, credits)?;
                }
                info!(
                    accounts = config.genesis.len(),
                    total_supply = %engine.total_supply(),
                    "Applied genesis allocations"
                );
                engine
            }
        };

        let node = Self {
            config,
            engine: Arc::new(engine),
        };
        node.persist();
        Ok(node)
    }

    pub fn engine(&self) -> &Arc<VotingEngine> {
        &self.engine
    }

    /// Answer one request line, persisting state after a successful mutation.
    pub fn handle_line(&self, line: &str) -> Response {
        let (response, mutated) = commands::handle_line(&self.engine, line);
        if mutated {
            self.persist();
        }
        response
    }

    /// Write a snapshot if persistence is enabled. Failures are logged, the
    /// in-memory state stays authoritative.
    fn persist(&self) {
        if !self.config.persist {
            return;
        }
        if let Err(e) = self.engine.snapshot().save(&self.config.data_dir) {
            error!("Failed to persist state: {}", e);
        }
    }

    /// Serve requests from `input` until EOF, one JSON response per line.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (observer, mut events) = ChannelObserver::channel();
        self.engine.subscribe(Arc::new(observer));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let event_log = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(event) = events.recv() => log_event(&event),
                    _ = &mut shutdown_rx => break,
                }
            }
            let flushed = drain_events(&mut events);
            debug!(flushed, "Event log stopped");
        });

        info!("Governance node ready, reading requests");

        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = self.handle_line(line);
            if !response.ok {
                debug!("Request failed: {:?}", response.error);
            }
            output.write_all(response.to_line().as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
        }

        info!("Input closed, shutting down");
        // Events are queued before each response is written, so all of them
        // are in the channel by now.
        let _ = shutdown_tx.send(());
        if let Err(e) = event_log.await {
            error!("Event log task failed: {}", e);
        }
        Ok(())
    }
}

/// Log every event already queued in `events`. Returns how many there were.
fn drain_events(events: &mut mpsc::UnboundedReceiver<GovernanceEvent>) -> usize {
    let mut count = 0;
    while let Ok(event) = events.try_recv() {
        log_event(&event);
        count += 1;
    }
    count
}

fn log_event(event: &GovernanceEvent) {
    match event {
        GovernanceEvent::ProposalCreated { proposal_id, creator, expires_at } => {
            info!(proposal_id, creator = %creator, expires_at = %expires_at, "Proposal created");
        }
        GovernanceEvent::VoteCast { proposal_id, voter, support, power, credits } => {
            info!(
                proposal_id,
                voter = %voter,
                support = ?support,
                power = %power,
                credits = %credits,
                "Vote cast"
            );
        }
    }
}

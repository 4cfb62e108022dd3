//! Authority: relays movement intents, buffers position reports and
//! periodically arbitrates them into one broadcast position per player

use crate::report_window::ReportWindow;
use crate::roster::{Roster, RosterEntry};
use log::{debug, error, info, warn};
use shared::protocol::{decode, encode};
use shared::{
    GameClock, GameTime, LocalTransport, Packet, PositionArbitrator, PositionReport, SyncConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Everything the authority's loops share.
///
/// Handlers are plain async methods so they can be driven directly, without
/// the background loops, when testing.
pub struct AuthorityState {
    transport: Arc<LocalTransport>,
    clock: GameClock,
    arbitrator: PositionArbitrator,
    roster: RwLock<Roster>,
    window: RwLock<ReportWindow>,
}

impl AuthorityState {
    pub fn new(transport: Arc<LocalTransport>, config: &SyncConfig) -> Self {
        Self {
            transport,
            clock: GameClock::new(),
            arbitrator: PositionArbitrator::new(config.arbitration_epsilon),
            roster: RwLock::new(Roster::new()),
            window: RwLock::new(ReportWindow::new()),
        }
    }

    /// The session's reference game time.
    pub fn now(&self) -> GameTime {
        self.clock.now()
    }

    /// Decodes one inbound frame and dispatches it. Undecodable frames are
    /// logged and dropped.
    pub async fn handle_frame(&self, from: &str, frame: &[u8]) {
        match decode(frame) {
            Ok(packet) => self.handle_packet(from, packet).await,
            Err(e) => warn!("Dropping frame from {}: {}", from, e),
        }
    }

    pub async fn handle_packet(&self, from: &str, packet: Packet) {
        match packet {
            Packet::Join { player_id } => self.handle_join(from, &player_id).await,

            Packet::Move {
                player_id,
                vector_x,
                vector_y,
                time,
            } => {
                info!(
                    "Relaying move from {}: vector ({:.2}, {:.2}) at time {}",
                    player_id, vector_x, vector_y, time
                );
                let command = Packet::MoveCommand {
                    player_id,
                    vector_x,
                    vector_y,
                    time,
                };
                self.broadcast_packet(&command, None).await;
            }

            Packet::PositionSync { positions, time } => {
                let count = positions.len();
                {
                    let mut window = self.window.write().await;
                    for report in positions {
                        window.insert(from, report);
                    }
                }
                debug!(
                    "Received position sync from {} for {} players at time {}",
                    from, count, time
                );
            }

            other => {
                debug!("Ignoring unexpected {} packet from {}", other.kind(), from);
            }
        }
    }

    async fn handle_join(&self, from: &str, player_id: &str) {
        let now = self.now();

        let (players, positions) = {
            let mut roster = self.roster.write().await;
            roster.join(player_id, now);
            roster.snapshot()
        };

        let welcome = Packet::Welcome {
            player_id: player_id.to_string(),
            time: now,
            players,
            positions,
        };
        self.send_packet(from, &welcome).await;

        let joined = Packet::PlayerJoined {
            player_id: player_id.to_string(),
        };
        self.broadcast_packet(&joined, Some(from)).await;

        info!("Player {} joined via {}", player_id, from);
    }

    /// Broadcasts the reference time so observers can correct drift.
    pub async fn broadcast_time(&self) {
        let sync = Packet::TimeSync { time: self.now() };
        self.broadcast_packet(&sync, None).await;
    }

    /// Runs one arbitration pass over the reports gathered since the last one.
    ///
    /// The window is swapped out under the write lock, so reports that arrive
    /// meanwhile land in the next cycle. Returns the broadcast verdicts.
    pub async fn run_arbitration_cycle(&self) -> Vec<PositionReport> {
        let window = self.window.write().await.take();
        if window.is_empty() {
            return Vec::new();
        }

        let mut verdicts = Vec::with_capacity(window.entity_count());

        for (player_id, reports) in window.into_batches() {
            let Some(verdict) = self.arbitrator.arbitrate(&reports) else {
                continue;
            };

            self.roster.write().await.record_arbitration(&verdict);

            info!(
                "Arbitrated position for {}: ({:.2}, {:.2}) from {} reports",
                player_id,
                verdict.x,
                verdict.y,
                reports.len()
            );

            self.broadcast_packet(&Packet::PositionUpdate(verdict.clone()), None)
                .await;
            verdicts.push(verdict);
        }

        verdicts
    }

    pub async fn player_position(&self, player_id: &str) -> Option<RosterEntry> {
        self.roster.read().await.get(player_id).cloned()
    }

    pub async fn player_count(&self) -> usize {
        self.roster.read().await.len()
    }

    /// Reports buffered for the next arbitration cycle.
    pub async fn pending_reports(&self) -> usize {
        self.window.read().await.report_count()
    }

    async fn send_packet(&self, to: &str, packet: &Packet) {
        let frame = match encode(packet) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode {} packet: {}", packet.kind(), e);
                return;
            }
        };

        if let Err(e) = self.transport.send(to, frame).await {
            warn!("Failed to send {} to {}: {}", packet.kind(), to, e);
        }
    }

    async fn broadcast_packet(&self, packet: &Packet, exclude: Option<&str>) {
        let frame = match encode(packet) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode {} packet: {}", packet.kind(), e);
                return;
            }
        };

        if let Err(e) = self.transport.broadcast(frame, exclude).await {
            debug!("Failed to broadcast {}: {}", packet.kind(), e);
        }
    }
}

/// A running authority: shared state plus its three background loops.
pub struct Authority {
    state: Arc<AuthorityState>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Authority {
    /// Spawns the message, time-sync and arbitration loops. Must be called
    /// from within a tokio runtime.
    pub fn start(transport: Arc<LocalTransport>, config: &SyncConfig) -> Self {
        let state = Arc::new(AuthorityState::new(transport, config));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let tasks = vec![
            tokio::spawn(message_loop(Arc::clone(&state), shutdown_rx.clone())),
            tokio::spawn(time_sync_loop(
                Arc::clone(&state),
                config.time_sync_interval(),
                shutdown_rx.clone(),
            )),
            tokio::spawn(arbitration_loop(
                Arc::clone(&state),
                config.arbitration_interval(),
                shutdown_rx,
            )),
        ];

        info!("Authority started");
        Self {
            state,
            shutdown,
            tasks,
        }
    }

    pub fn state(&self) -> &Arc<AuthorityState> {
        &self.state
    }

    /// Signals every loop to exit, closes the transport and waits for the
    /// loops to finish. In-flight work is not drained.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        self.state.transport.close().await;

        for task in self.tasks {
            if let Err(e) = task.await {
                error!("Authority task panicked: {}", e);
            }
        }
        info!("Authority stopped");
    }
}

async fn message_loop(state: Arc<AuthorityState>, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            received = state.transport.receive() => match received {
                Ok((from, frame)) => state.handle_frame(&from, &frame).await,
                Err(e) => {
                    info!("Authority message loop exiting: {}", e);
                    break;
                }
            },
            _ = shutdown.changed() => break,
        }
    }
}

async fn time_sync_loop(
    state: Arc<AuthorityState>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Skip the first tick since it fires immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => state.broadcast_time().await,
            _ = shutdown.changed() => break,
        }
    }
}

async fn arbitration_loop(
    state: Arc<AuthorityState>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                state.run_arbitration_cycle().await;
            },
            _ = shutdown.changed() => break,
        }
    }
}

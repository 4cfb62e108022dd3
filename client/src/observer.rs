//! Observer network layer: consumes relayed events, keeps the local world in
//! step with them and periodically reports predicted positions

use crate::world::World;
use log::{debug, error, info, warn};
use shared::clock::needs_rebase;
use shared::protocol::{decode, encode};
use shared::transport::Frame;
use shared::{
    EntityId, GameClock, GameTime, LocalTransport, ObserverId, Packet, SyncConfig, TransportError,
    Vector2,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// State shared by an observer's loops
pub struct ObserverState {
    observer_id: ObserverId,
    player_id: EntityId,
    transport: Arc<LocalTransport>,
    clock: RwLock<GameClock>,
    world: RwLock<World>,
    config: SyncConfig,
}

impl ObserverState {
    pub fn new(
        observer_id: impl Into<ObserverId>,
        player_id: impl Into<EntityId>,
        transport: Arc<LocalTransport>,
        config: SyncConfig,
    ) -> Self {
        Self {
            observer_id: observer_id.into(),
            player_id: player_id.into(),
            transport,
            clock: RwLock::new(GameClock::new()),
            world: RwLock::new(World::new()),
            config,
        }
    }

    pub fn observer_id(&self) -> &str {
        &self.observer_id
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Local reading of the shared game time.
    pub async fn now(&self) -> GameTime {
        self.clock.read().await.now()
    }

    pub async fn handle_frame(&self, frame: &[u8]) {
        match decode(frame) {
            Ok(packet) => self.handle_packet(packet).await,
            Err(e) => warn!("[{}] Dropping undecodable frame: {}", self.observer_id, e),
        }
    }

    pub async fn handle_packet(&self, packet: Packet) {
        match packet {
            Packet::Welcome {
                time,
                players,
                positions,
                ..
            } => {
                // First contact: adopt the authority's time unconditionally
                {
                    let mut clock = self.clock.write().await;
                    *clock = clock.rebase(time);
                }
                let seeded = self.world.write().await.seed(&positions);

                info!(
                    "[{}] Welcomed at game time {}, players: {:?} ({} new)",
                    self.observer_id, time, players, seeded
                );
            }

            Packet::PlayerJoined { player_id } => {
                let now = self.now().await;
                if self.world.write().await.ensure(&player_id, now) {
                    info!("[{}] Player {} joined", self.observer_id, player_id);
                }
            }

            Packet::MoveCommand {
                player_id,
                vector_x,
                vector_y,
                time,
            } => {
                let velocity = self.world.write().await.apply_move(
                    &player_id,
                    Vector2::new(vector_x, vector_y),
                    time,
                    self.config.move_speed,
                );
                info!(
                    "[{}] Player {} moving with velocity ({:.2}, {:.2})",
                    self.observer_id, player_id, velocity.x, velocity.y
                );
            }

            Packet::TimeSync { time } => {
                let mut clock = self.clock.write().await;
                let local = clock.now();
                if needs_rebase(local, time, self.config.drift_tolerance_ms) {
                    *clock = clock.rebase(time);
                    info!(
                        "[{}] Clock rebased to {} (drift {} ms)",
                        self.observer_id,
                        time,
                        time - local
                    );
                }
            }

            Packet::PositionUpdate(verdict) => {
                let corrected = self
                    .world
                    .write()
                    .await
                    .apply_correction(&verdict, self.config.correction_threshold);

                if let Some(error) = corrected {
                    info!(
                        "[{}] Position corrected for {}: ({:.2}, {:.2}), error {:.2}",
                        self.observer_id, verdict.entity_id, verdict.x, verdict.y, error
                    );
                }
            }

            other => {
                debug!(
                    "[{}] Ignoring unexpected {} packet",
                    self.observer_id,
                    other.kind()
                );
            }
        }
    }

    /// Sends one batched report of every tracked entity's predicted position.
    /// Returns the number of positions reported.
    pub async fn report_positions(&self) -> usize {
        let now = self.now().await;
        let positions = self.world.read().await.self_report(now);
        let count = positions.len();

        if count > 0 {
            let packet = Packet::PositionSync {
                positions,
                time: now,
            };
            self.send_packet(&packet).await;
        }
        count
    }

    /// Announces a velocity change of our own player, starting now.
    ///
    /// The local world only changes once the authority relays it back.
    pub async fn send_move(&self, vector_x: f64, vector_y: f64) {
        let packet = Packet::Move {
            player_id: self.player_id.clone(),
            vector_x,
            vector_y,
            time: self.now().await,
        };
        self.send_packet(&packet).await;
    }

    /// Predicted position of `player_id` at the current game time.
    pub async fn position(&self, player_id: &str) -> Option<Vector2> {
        let now = self.now().await;
        self.world.read().await.position_at(player_id, now)
    }

    /// Predicted position of `player_id` at an explicit game time.
    pub async fn position_at(&self, player_id: &str, time: GameTime) -> Option<Vector2> {
        self.world.read().await.position_at(player_id, time)
    }

    pub async fn tracked_count(&self) -> usize {
        self.world.read().await.len()
    }

    /// Queues `packet` for the authority. Returns whether it was queued.
    async fn send_packet(&self, packet: &Packet) -> bool {
        let frame = match encode(packet) {
            Ok(frame) => frame,
            Err(e) => {
                error!("[{}] Failed to encode {}: {}", self.observer_id, packet.kind(), e);
                return false;
            }
        };

        match self.transport.send_to_authority(&self.observer_id, frame).await {
            Ok(()) => true,
            Err(e) => {
                debug!(
                    "[{}] Dropped outgoing {}: {}",
                    self.observer_id,
                    packet.kind(),
                    e
                );
                false
            }
        }
    }
}

/// A connected observer and its two background loops.
pub struct Observer {
    state: Arc<ObserverState>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Observer {
    /// Registers on the transport, asks to join as `player_id` and starts the
    /// message and self-report loops.
    pub async fn connect(
        transport: Arc<LocalTransport>,
        observer_id: &str,
        player_id: &str,
        config: SyncConfig,
    ) -> Result<Self, TransportError> {
        let inbound = transport.register(observer_id).await?;
        let report_interval = config.report_interval();
        let state = Arc::new(ObserverState::new(
            observer_id,
            player_id,
            Arc::clone(&transport),
            config,
        ));

        let join = Packet::Join {
            player_id: player_id.to_string(),
        };
        if !state.send_packet(&join).await {
            warn!(
                "[{}] Join for {} was not delivered, no welcome will follow",
                observer_id, player_id
            );
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let tasks = vec![
            tokio::spawn(message_loop(
                Arc::clone(&state),
                inbound,
                shutdown_rx.clone(),
            )),
            tokio::spawn(report_loop(
                Arc::clone(&state),
                report_interval,
                shutdown_rx,
            )),
        ];

        info!("[{}] Started for player {}", observer_id, player_id);
        Ok(Self {
            state,
            shutdown,
            tasks,
        })
    }

    pub fn state(&self) -> &Arc<ObserverState> {
        &self.state
    }

    pub async fn move_player(&self, vector_x: f64, vector_y: f64) {
        self.state.send_move(vector_x, vector_y).await;
    }

    pub async fn position(&self, player_id: &str) -> Option<Vector2> {
        self.state.position(player_id).await
    }

    /// Stops both loops and leaves the transport.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);

        for task in self.tasks {
            if let Err(e) = task.await {
                error!("[{}] Observer task panicked: {}", self.state.observer_id, e);
            }
        }

        // Already gone if the transport was closed first
        let _ = self.state.transport.unregister(&self.state.observer_id).await;
        info!("[{}] Stopped", self.state.observer_id);
    }
}

async fn message_loop(
    state: Arc<ObserverState>,
    mut inbound: mpsc::Receiver<Frame>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            frame = inbound.recv() => match frame {
                Some(frame) => state.handle_frame(&frame).await,
                None => {
                    info!("[{}] Inbound queue closed", state.observer_id);
                    break;
                }
            },
            _ = shutdown.changed() => break,
        }
    }
}

async fn report_loop(
    state: Arc<ObserverState>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let count = state.report_positions().await;
                debug!("[{}] Reported {} positions", state.observer_id, count);
            },
            _ = shutdown.changed() => break,
        }
    }
}

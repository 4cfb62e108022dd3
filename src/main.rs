use clap::Parser;
use client::observer::Observer;
use log::info;
use server::authority::Authority;
use shared::config::{
    ARBITRATION_EPSILON, ARBITRATION_INTERVAL_MS, CORRECTION_THRESHOLD, DRIFT_TOLERANCE_MS,
    MOVE_SPEED, QUEUE_CAPACITY, REPORT_INTERVAL_MS, TIME_SYNC_INTERVAL_MS,
};
use shared::{LocalTransport, SyncConfig, Vector2};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Directions handed out to observers in turn: right, up, diagonal
const SCRIPT: [(f64, f64); 3] = [(1.0, 0.0), (0.0, 1.0), (0.707, 0.707)];

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs an authority and several observers in one process", long_about = None)]
struct Args {
    /// Observer player names, comma separated
    #[arg(short, long, value_delimiter = ',', default_value = "Alice,Bob,Charlie")]
    observers: Vec<String>,

    /// Pause between scripted moves in milliseconds
    #[arg(long, default_value_t = 500)]
    step_ms: u64,

    /// How long players keep moving before the first one stops, in milliseconds
    #[arg(long, default_value_t = 2000)]
    travel_ms: u64,

    #[arg(long, default_value_t = MOVE_SPEED)]
    move_speed: f64,

    #[arg(long, default_value_t = ARBITRATION_EPSILON)]
    epsilon: f64,

    #[arg(long, default_value_t = CORRECTION_THRESHOLD)]
    correction_threshold: f64,

    #[arg(long, default_value_t = DRIFT_TOLERANCE_MS)]
    drift_tolerance_ms: i64,

    #[arg(long, default_value_t = REPORT_INTERVAL_MS)]
    report_interval_ms: u64,

    #[arg(long, default_value_t = ARBITRATION_INTERVAL_MS)]
    arbitration_interval_ms: u64,

    #[arg(long, default_value_t = TIME_SYNC_INTERVAL_MS)]
    time_sync_interval_ms: u64,

    #[arg(long, default_value_t = QUEUE_CAPACITY)]
    queue_capacity: usize,
}

impl Args {
    fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            move_speed: self.move_speed,
            arbitration_epsilon: self.epsilon,
            correction_threshold: self.correction_threshold,
            drift_tolerance_ms: self.drift_tolerance_ms,
            report_interval_ms: self.report_interval_ms,
            arbitration_interval_ms: self.arbitration_interval_ms,
            time_sync_interval_ms: self.time_sync_interval_ms,
            queue_capacity: self.queue_capacity,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.observers.is_empty() {
        return Err("at least one observer is required".into());
    }

    let config = args.sync_config();
    let step = Duration::from_millis(args.step_ms);
    let transport = Arc::new(LocalTransport::new(config.queue_capacity));
    let authority = Authority::start(Arc::clone(&transport), &config);

    let mut observers = Vec::with_capacity(args.observers.len());
    for (i, name) in args.observers.iter().enumerate() {
        let observer = Observer::connect(
            Arc::clone(&transport),
            &format!("client_{}", i),
            name,
            config.clone(),
        )
        .await?;
        observers.push(observer);
    }
    sleep(step).await;

    // Everyone starts moving, one after another
    for (i, observer) in observers.iter().enumerate() {
        let (x, y) = SCRIPT[i % SCRIPT.len()];
        info!("{} moves ({}, {})", args.observers[i], x, y);
        observer.move_player(x, y).await;
        sleep(step).await;
    }
    sleep(Duration::from_millis(args.travel_ms)).await;

    info!("{} stops", args.observers[0]);
    observers[0].move_player(0.0, 0.0).await;

    // Let at least two arbitration cycles pass
    sleep(config.arbitration_interval() * 2 + step).await;

    // Compare every view at one common game time
    let at = authority.state().now();
    let mut views = Vec::with_capacity(observers.len());
    for (i, observer) in observers.iter().enumerate() {
        println!("\n{}'s view at game time {}:", args.observers[i], at);
        let mut view = Vec::with_capacity(args.observers.len());
        for player in &args.observers {
            let position = observer.state().position_at(player, at).await;
            match position {
                Some(p) => println!("  {:<10} ({:>8.2}, {:>8.2})", player, p.x, p.y),
                None => println!("  {:<10} unknown", player),
            }
            view.push(position);
        }
        views.push(view);
    }

    println!("\nConsistency:");
    let mut worst = 0.0_f64;
    for (p, player) in args.observers.iter().enumerate() {
        let positions: Vec<Vector2> = views.iter().filter_map(|view| view[p]).collect();
        let deviation = max_pairwise_deviation(&positions);
        worst = worst.max(deviation);
        println!("  {:<10} max deviation {:.3}", player, deviation);
    }

    if worst < config.arbitration_epsilon {
        println!("\nViews agree (worst deviation {:.3})", worst);
    } else {
        println!("\nViews diverge (worst deviation {:.3})", worst);
    }

    for observer in observers {
        observer.stop().await;
    }
    authority.stop().await;

    Ok(())
}

fn max_pairwise_deviation(positions: &[Vector2]) -> f64 {
    let mut max = 0.0_f64;
    for (i, a) in positions.iter().enumerate() {
        for b in &positions[i + 1..] {
            max = max.max(a.distance(b));
        }
    }
    max
}

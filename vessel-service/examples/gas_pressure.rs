//! Gas-pressure demo: one server, two clients, one in-process broker.
//!
//! The server owns the container (engine + background temperature driver +
//! dispatcher). An **observer** client polls pressure and the destroyed
//! flag; an **operator** client nudges mass with random deltas whenever the
//! pressure it last saw leaves the adjustment window. All three talk only
//! through the broker, exactly as they would against a real one.
//!
//! ```bash
//! cargo run --example gas_pressure            # run for 30 seconds
//! cargo run --example gas_pressure -- 120     # run for 120 seconds
//! RUST_LOG=debug cargo run --example gas_pressure
//! ```

use std::env;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vessel_core::{JsonCodec, topology};
use vessel_service::{
    ContainerClient, ContainerEngine, DriverConfig, ServiceDispatcher, TemperatureDriver,
    ThresholdLimits,
};
use vessel_transport::{Broker, ClientConfig};

const OBSERVER_POLL: Duration = Duration::from_secs(1);
const OPERATOR_POLL: Duration = Duration::from_secs(1);

async fn run_observer(broker: Broker) {
    let client = ContainerClient::connect(&broker, "Observer", ClientConfig::default())
        .expect("observer connects");
    info!(reply_queue = client.reply_queue(), "observer up");

    loop {
        tokio::time::sleep(OBSERVER_POLL).await;
        match (client.pressure().await, client.is_destroyed().await) {
            (Ok(pressure), Ok(destroyed)) => {
                info!(pressure, destroyed, "observed");
            }
            (pressure, destroyed) => {
                warn!(?pressure, ?destroyed, "observer poll failed");
            }
        }
    }
}

/// The operator's local decision heuristic: compare the last-seen pressure
/// against thresholds it knows out of band, then push a random delta.
async fn run_operator(broker: Broker, limits: ThresholdLimits) {
    let client = ContainerClient::connect(&broker, "Operator", ClientConfig::default())
        .expect("operator connects");
    info!(reply_queue = client.reply_queue(), "operator up");

    loop {
        tokio::time::sleep(OPERATOR_POLL).await;
        let pressure = match client.pressure().await {
            Ok(pressure) => pressure,
            Err(error) => {
                warn!(%error, "operator poll failed");
                continue;
            }
        };

        let amount = rand::rng().random_range(1.0..5.0);
        let outcome = if pressure < limits.lower {
            Some(("add", client.increase_mass(amount).await))
        } else if pressure > limits.upper {
            Some(("remove", client.decrease_mass(amount).await))
        } else {
            None
        };

        match outcome {
            Some((verb, Ok(result))) if result.is_success => {
                info!(verb, amount, "mass adjusted");
            }
            Some((verb, Ok(result))) => {
                info!(verb, reason = ?result.failure_reason, "adjustment rejected");
            }
            Some((verb, Err(error))) => {
                warn!(verb, %error, "adjustment call failed");
            }
            None => {}
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let seconds: u64 = env::args()
        .nth(1)
        .map(|arg| arg.parse().expect("duration must be a number of seconds"))
        .unwrap_or(30);

    let broker = Broker::new(topology::EXCHANGE);

    // Server side: engine, dispatcher, background driver.
    let engine = Arc::new(ContainerEngine::with_defaults());
    let limits = engine.limits();
    let _dispatcher = ServiceDispatcher::new(engine.clone(), broker.clone(), JsonCodec)
        .start()
        .expect("dispatcher starts");
    let driver = TemperatureDriver::new(engine, DriverConfig::default()).spawn();
    info!(exchange = topology::EXCHANGE, "server up");

    // Client side.
    let observer = tokio::spawn(run_observer(broker.clone()));
    let operator = tokio::spawn(run_operator(broker.clone(), limits));

    tokio::time::sleep(Duration::from_secs(seconds)).await;
    info!("demo finished");
    observer.abort();
    operator.abort();
    driver.abort();
}

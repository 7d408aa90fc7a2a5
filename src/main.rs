//! caplink-probe — connect to the capture service and print what it says.
//!
//! Diagnostic front-end for the connector: connects, starts a scan,
//! subscribes to process and traffic pushes, logs them, and polls the
//! process inventory every few seconds. Ctrl-C stops the scan and
//! disconnects.

use caplink::{Connector, ConnectorConfig, MessageKind, ProcessInfo, TrafficUpdate};
use tokio::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = ConnectorConfig::from_env();
    tracing::info!(endpoint = %config.endpoint(), "caplink probe starting");

    let connector = Connector::spawn(config);

    if let Err(e) = connector.connect().await {
        tracing::error!(error = %e, "initial connect failed");
        std::process::exit(1);
    }

    let mut processes = connector
        .subscribe(MessageKind::ProcessDetected)
        .await
        .expect("connector task alive");
    let mut traffic = connector
        .subscribe(MessageKind::TrafficUpdate)
        .await
        .expect("connector task alive");

    if let Err(e) = connector.start_scan().await {
        tracing::error!(error = %e, "start failed");
    }

    let mut poll = tokio::time::interval(Duration::from_secs(5));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(msg) = processes.recv() => {
                match msg.payload::<ProcessInfo>() {
                    Ok(p) => tracing::info!(pid = p.pid, name = %p.name, "process detected"),
                    Err(e) => tracing::warn!(error = %e, "unreadable process payload"),
                }
            }
            Some(msg) = traffic.recv() => {
                if let Ok(t) = msg.payload::<TrafficUpdate>() {
                    tracing::debug!(
                        process_id = t.process_id,
                        bytes_in = t.bytes_in,
                        bytes_out = t.bytes_out,
                        "traffic"
                    );
                }
            }
            _ = poll.tick() => {
                match connector.get_processes().await {
                    Ok(list) => tracing::info!(count = list.len(), "process inventory"),
                    Err(e) => tracing::warn!(error = %e, "get-processes failed"),
                }
            }
        }
    }

    let _ = connector.stop_scan().await;
    connector.disconnect().await;
    tracing::info!("caplink probe stopped");
}

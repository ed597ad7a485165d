//! Prometheus metrics for shardlink
//!
//! Exposes metrics at /metrics endpoint for monitoring and observability.
//! The management channel reports through the [`ClusterHealth`] capability;
//! wiring a [`Metrics`] instance in as the health sink is optional and the
//! subsystem runs unchanged without one.

use prometheus::{IntCounter, IntGauge, Opts, Registry};

use crate::cluster::ClusterHealth;

mod server;

pub use server::MetricsServer;

/// All shardlink metrics in one place
pub struct Metrics {
    pub registry: Registry,

    // Management channel metrics
    pub management_messages_sent: IntCounter,
    pub management_messages_received: IntCounter,

    // Connector metrics
    pub connector_running: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let management_messages_sent = IntCounter::with_opts(Opts::new(
            "shardlink_management_messages_sent_total",
            "Management messages handed to the channel transport since startup",
        ))
        .unwrap();

        let management_messages_received = IntCounter::with_opts(Opts::new(
            "shardlink_management_messages_received_total",
            "Management datagrams processed by the channel since startup",
        ))
        .unwrap();

        let connector_running = IntGauge::with_opts(Opts::new(
            "shardlink_connector_running",
            "1 while the managed cluster connector is running",
        ))
        .unwrap();

        registry
            .register(Box::new(management_messages_sent.clone()))
            .unwrap();
        registry
            .register(Box::new(management_messages_received.clone()))
            .unwrap();
        registry.register(Box::new(connector_running.clone())).unwrap();

        Self {
            registry,
            management_messages_sent,
            management_messages_received,
            connector_running,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterHealth for Metrics {
    fn sending_cluster_management_message(&self) {
        self.management_messages_sent.inc();
    }

    fn receiving_cluster_management_message(&self) {
        self.management_messages_received.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_counters_increment() {
        let metrics = Metrics::new();
        metrics.sending_cluster_management_message();
        metrics.sending_cluster_management_message();
        metrics.receiving_cluster_management_message();

        assert_eq!(metrics.management_messages_sent.get(), 2);
        assert_eq!(metrics.management_messages_received.get(), 1);
    }

    #[test]
    fn test_registry_gathers_all_families() {
        let metrics = Metrics::new();
        metrics.connector_running.set(1);
        let families = metrics.registry.gather();
        assert_eq!(families.len(), 3);
    }
}

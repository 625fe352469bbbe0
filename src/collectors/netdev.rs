//! Network interface statistics collector.
//!
//! This module parses per-interface counters from /proc/net/dev.

use serde::Serialize;

/// RX counters needed for a usable line.
const MIN_NETDEV_FIELDS: usize = 8;
/// Full RX + TX column set.
const FULL_NETDEV_FIELDS: usize = 16;

/// Network interface statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetDevStats {
    pub name: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errors: u64,
    pub rx_dropped: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
    pub tx_dropped: u64,
}

/// Parses /proc/net/dev content in kernel order.
pub fn parse_netdev(content: &str) -> Vec<NetDevStats> {
    let mut stats = Vec::new();

    // Skip the first two header lines
    for line in content.lines().skip(2) {
        // Split by ':' to separate interface name from stats
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };

        let values: Vec<u64> = rest
            .split_whitespace()
            .map(|v| v.parse().unwrap_or(0))
            .collect();
        if values.len() < MIN_NETDEV_FIELDS {
            continue; // Skip malformed lines
        }

        let mut net_stat = NetDevStats {
            name: name.trim().to_string(),
            rx_bytes: values[0],
            rx_packets: values[1],
            rx_errors: values[2],
            rx_dropped: values[3],
            ..Default::default()
        };

        // 4..8 are fifo, frame, compressed, multicast; TX starts at 8
        if values.len() >= FULL_NETDEV_FIELDS {
            net_stat.tx_bytes = values[8];
            net_stat.tx_packets = values[9];
            net_stat.tx_errors = values[10];
            net_stat.tx_dropped = values[11];
        }

        stats.push(net_stat);
    }

    stats
}

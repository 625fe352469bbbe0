//! Protocol counters from /proc/net/snmp and /proc/net/netstat.
//!
//! Both files interleave tables as header/value line pairs sharing a prefix:
//! ```text
//! Tcp: RtoAlgorithm RtoMin ActiveOpens PassiveOpens
//! Tcp: 1 200 10 5
//! Udp: InDatagrams NoPorts
//! Udp: 100 2
//! ```
//! A line is a header when no header is buffered or the buffered header has a
//! different prefix; otherwise it is the value line for that header. Values
//! pair with header names by position and are keyed as prefix + name, e.g.
//! `TcpActiveOpens`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::CollectError;

/// Flattened `prefix + field` counters in key order.
pub type ProtocolTable = BTreeMap<String, u64>;

/// Parses any double-line protocol file into a flat key map.
pub fn parse_protocol_table(content: &str) -> ProtocolTable {
    let mut table = ProtocolTable::new();
    let mut header: Option<(&str, Vec<&str>)> = None;

    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let Some(first) = fields.next() else {
            continue;
        };
        let prefix = first.trim_end_matches(':');
        let rest: Vec<&str> = fields.collect();
        if rest.is_empty() {
            continue;
        }

        match header.take() {
            Some((buffered, names)) if buffered == prefix => {
                for (name, raw) in names.iter().zip(rest.iter()) {
                    table.insert(format!("{}{}", prefix, name), raw.parse().unwrap_or(0));
                }
            }
            _ => header = Some((prefix, rest)),
        }
    }

    table
}

fn require_pairs(table: ProtocolTable, path: &str) -> Result<ProtocolTable, CollectError> {
    if table.is_empty() {
        return Err(CollectError::format(path, "no header/value table pairs"));
    }
    Ok(table)
}

/// Selected counters from /proc/net/snmp plus the full key map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnmpStats {
    pub ip_in_receives: u64,
    pub ip_out_requests: u64,
    pub ip_in_discards: u64,
    pub ip_out_discards: u64,
    pub tcp_active_opens: u64,
    pub tcp_passive_opens: u64,
    pub tcp_curr_estab: u64,
    pub tcp_in_segs: u64,
    pub tcp_out_segs: u64,
    pub tcp_retrans_segs: u64,
    pub tcp_in_errs: u64,
    pub tcp_out_rsts: u64,
    pub udp_in_datagrams: u64,
    pub udp_out_datagrams: u64,
    pub udp_in_errors: u64,
    pub udp_no_ports: u64,
    #[serde(skip)]
    pub table: ProtocolTable,
}

impl SnmpStats {
    pub fn from_table(table: ProtocolTable) -> Self {
        let get = |key: &str| table.get(key).copied().unwrap_or(0);
        Self {
            ip_in_receives: get("IpInReceives"),
            ip_out_requests: get("IpOutRequests"),
            ip_in_discards: get("IpInDiscards"),
            ip_out_discards: get("IpOutDiscards"),
            tcp_active_opens: get("TcpActiveOpens"),
            tcp_passive_opens: get("TcpPassiveOpens"),
            tcp_curr_estab: get("TcpCurrEstab"),
            tcp_in_segs: get("TcpInSegs"),
            tcp_out_segs: get("TcpOutSegs"),
            tcp_retrans_segs: get("TcpRetransSegs"),
            tcp_in_errs: get("TcpInErrs"),
            tcp_out_rsts: get("TcpOutRsts"),
            udp_in_datagrams: get("UdpInDatagrams"),
            udp_out_datagrams: get("UdpOutDatagrams"),
            udp_in_errors: get("UdpInErrors"),
            udp_no_ports: get("UdpNoPorts"),
            table,
        }
    }
}

pub fn parse_snmp(content: &str) -> Result<SnmpStats, CollectError> {
    let table = require_pairs(parse_protocol_table(content), "net/snmp")?;
    Ok(SnmpStats::from_table(table))
}

/// Selected counters from /proc/net/netstat plus the full key map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetstatStats {
    pub tcp_syncookies_sent: u64,
    pub tcp_syncookies_recv: u64,
    pub tcp_syncookies_failed: u64,
    pub tcp_listen_overflows: u64,
    pub tcp_listen_drops: u64,
    pub tcp_timeouts: u64,
    pub ip_in_octets: u64,
    pub ip_out_octets: u64,
    #[serde(skip)]
    pub table: ProtocolTable,
}

impl NetstatStats {
    pub fn from_table(table: ProtocolTable) -> Self {
        let get = |key: &str| table.get(key).copied().unwrap_or(0);
        Self {
            tcp_syncookies_sent: get("TcpExtSyncookiesSent"),
            tcp_syncookies_recv: get("TcpExtSyncookiesRecv"),
            tcp_syncookies_failed: get("TcpExtSyncookiesFailed"),
            tcp_listen_overflows: get("TcpExtListenOverflows"),
            tcp_listen_drops: get("TcpExtListenDrops"),
            tcp_timeouts: get("TcpExtTCPTimeouts"),
            ip_in_octets: get("IpExtInOctets"),
            ip_out_octets: get("IpExtOutOctets"),
            table,
        }
    }
}

pub fn parse_netstat(content: &str) -> Result<NetstatStats, CollectError> {
    let table = require_pairs(parse_protocol_table(content), "net/netstat")?;
    Ok(NetstatStats::from_table(table))
}

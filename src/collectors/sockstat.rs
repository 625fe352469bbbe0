//! Socket usage from /proc/net/sockstat.
//!
//! Each protocol line is `PROTO: key value key value ...`.

use serde::Serialize;

use crate::error::CollectError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SockStats {
    pub sockets_used: u64,
    pub tcp_inuse: u64,
    pub tcp_orphan: u64,
    pub tcp_tw: u64,
    pub tcp_alloc: u64,
    pub tcp_mem: u64,
    pub udp_inuse: u64,
    pub udp_mem: u64,
    pub raw_inuse: u64,
    pub frag_inuse: u64,
    pub frag_mem: u64,
}

/// Yields `(key, value)` pairs following the protocol token.
fn pairs<'a>(fields: &'a [&'a str]) -> impl Iterator<Item = (&'a str, u64)> + 'a {
    fields[1..]
        .chunks_exact(2)
        .map(|kv| (kv[0], kv[1].parse().unwrap_or(0)))
}

pub fn parse_sockstat(content: &str) -> Result<SockStats, CollectError> {
    let mut stats = SockStats::default();
    let mut saw_sockets = false;

    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            continue;
        }

        match fields[0] {
            "sockets:" => {
                saw_sockets = true;
                for (key, val) in pairs(&fields) {
                    if key == "used" {
                        stats.sockets_used = val;
                    }
                }
            }
            "TCP:" => {
                for (key, val) in pairs(&fields) {
                    match key {
                        "inuse" => stats.tcp_inuse = val,
                        "orphan" => stats.tcp_orphan = val,
                        "tw" => stats.tcp_tw = val,
                        "alloc" => stats.tcp_alloc = val,
                        "mem" => stats.tcp_mem = val,
                        _ => {}
                    }
                }
            }
            "UDP:" => {
                for (key, val) in pairs(&fields) {
                    match key {
                        "inuse" => stats.udp_inuse = val,
                        "mem" => stats.udp_mem = val,
                        _ => {}
                    }
                }
            }
            "RAW:" => {
                for (key, val) in pairs(&fields) {
                    if key == "inuse" {
                        stats.raw_inuse = val;
                    }
                }
            }
            "FRAG:" => {
                for (key, val) in pairs(&fields) {
                    match key {
                        "inuse" => stats.frag_inuse = val,
                        "memory" => stats.frag_mem = val,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    if !saw_sockets {
        return Err(CollectError::format("net/sockstat", "sockets line not found"));
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOCKSTAT: &str = "sockets: used 231\n\
                            TCP: inuse 12 orphan 1 tw 4 alloc 20 mem 3\n\
                            UDP: inuse 5 mem 2\n\
                            UDPLITE: inuse 0\n\
                            RAW: inuse 1\n\
                            FRAG: inuse 0 memory 0\n";

    #[test]
    fn test_parse_sockstat() {
        let s = parse_sockstat(SOCKSTAT).unwrap();
        assert_eq!(s.sockets_used, 231);
        assert_eq!(s.tcp_inuse, 12);
        assert_eq!(s.tcp_orphan, 1);
        assert_eq!(s.tcp_tw, 4);
        assert_eq!(s.tcp_alloc, 20);
        assert_eq!(s.tcp_mem, 3);
        assert_eq!(s.udp_inuse, 5);
        assert_eq!(s.udp_mem, 2);
        assert_eq!(s.raw_inuse, 1);
        assert_eq!(s.frag_mem, 0);
    }

    #[test]
    fn test_dangling_key_ignored() {
        let s = parse_sockstat("sockets: used 3\nTCP: inuse 2 orphan\n").unwrap();
        assert_eq!(s.tcp_inuse, 2);
        assert_eq!(s.tcp_orphan, 0);
    }

    #[test]
    fn test_missing_sockets_line() {
        assert!(parse_sockstat("TCP: inuse 1\n").is_err());
    }
}

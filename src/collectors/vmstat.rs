//! Virtual memory event counters from /proc/vmstat.

use serde::Serialize;

use crate::error::CollectError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VmStats {
    pub pgfault: u64,
    pub pgmajfault: u64,
    pub pgpgin: u64,
    pub pgpgout: u64,
    pub pswpin: u64,
    pub pswpout: u64,
    pub oom_kill: u64,
    pub numa_hit: u64,
    pub numa_miss: u64,
}

/// Parses `key value` lines. Unknown keys are ignored; an input with no
/// well-formed line at all is rejected.
pub fn parse_vmstat(content: &str) -> Result<VmStats, CollectError> {
    let mut stats = VmStats::default();
    let mut pairs = 0usize;

    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let (Some(key), Some(raw), None) = (fields.next(), fields.next(), fields.next()) else {
            continue;
        };
        pairs += 1;

        let val = raw.parse().unwrap_or(0);
        match key {
            "pgfault" => stats.pgfault = val,
            "pgmajfault" => stats.pgmajfault = val,
            "pgpgin" => stats.pgpgin = val,
            "pgpgout" => stats.pgpgout = val,
            "pswpin" => stats.pswpin = val,
            "pswpout" => stats.pswpout = val,
            "oom_kill" => stats.oom_kill = val,
            "numa_hit" => stats.numa_hit = val,
            "numa_miss" => stats.numa_miss = val,
            _ => {}
        }
    }

    if pairs == 0 {
        return Err(CollectError::format("vmstat", "no key/value lines"));
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vmstat() {
        let content = "nr_free_pages 123\n\
                       numa_hit 9\n\
                       numa_miss 1\n\
                       pgpgin 5000\n\
                       pgpgout 3000\n\
                       pswpin 2\n\
                       pswpout 4\n\
                       pgfault 100000\n\
                       pgmajfault 50\n\
                       oom_kill 1\n";
        let vm = parse_vmstat(content).unwrap();
        assert_eq!(vm.pgfault, 100000);
        assert_eq!(vm.pgmajfault, 50);
        assert_eq!(vm.pgpgin, 5000);
        assert_eq!(vm.pgpgout, 3000);
        assert_eq!(vm.pswpin, 2);
        assert_eq!(vm.pswpout, 4);
        assert_eq!(vm.oom_kill, 1);
        assert_eq!(vm.numa_hit, 9);
        assert_eq!(vm.numa_miss, 1);
    }

    #[test]
    fn test_older_kernel_without_oom_kill() {
        let vm = parse_vmstat("pgfault 7\n").unwrap();
        assert_eq!(vm.pgfault, 7);
        assert_eq!(vm.oom_kill, 0);
    }

    #[test]
    fn test_empty_is_format_error() {
        assert!(parse_vmstat("").is_err());
        assert!(parse_vmstat("garbage line with words\n").is_err());
    }
}

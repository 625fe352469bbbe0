//! Per-process accounting from /proc/<pid>/stat and /proc/<pid>/cmdline.
//!
//! The command name inside the stat line is parenthesized and may itself
//! contain parentheses or whitespace, so the name span runs from the first
//! `(` to the last `)`. Every later field is addressed by its offset from the
//! closing parenthesis.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::CollectError;

/// Fields after `)` needed to reach rss (offset 21).
const MIN_STAT_FIELDS: usize = 22;

// Offsets counted from the first field after the closing parenthesis.
const STATE: usize = 0;
const PPID: usize = 1;
const UTIME: usize = 11;
const STIME: usize = 12;
const STARTTIME: usize = 19;
const RSS_PAGES: usize = 21;

/// Get the host page size in bytes (usually 4096).
fn get_page_size() -> u64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_PAGESIZE
        // Returns -1 on error, handled by the > 0 check
        unsafe {
            let size = libc::sysconf(libc::_SC_PAGESIZE);
            if size > 0 {
                return size as u64;
            }
        }
    }
    4096
}

/// Host page size, used to convert RSS pages to bytes.
pub static PAGE_SIZE: Lazy<u64> = Lazy::new(get_page_size);

/// One process as seen at a single instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub ppid: u32,
    pub name: String,
    pub state: String,
    /// User-mode time in clock ticks.
    pub utime: u64,
    /// Kernel-mode time in clock ticks.
    pub stime: u64,
    /// Clock ticks since boot at which the process started.
    pub start_time: u64,
    /// Resident set size in bytes.
    pub rss: u64,
    pub cmdline: String,
}

impl ProcessInfo {
    /// Total CPU ticks consumed so far.
    pub fn cpu_ticks(&self) -> u64 {
        self.utime.saturating_add(self.stime)
    }
}

/// Parses a /proc/<pid>/stat line. `cmdline` is left empty.
pub fn parse_pid_stat(content: &str, page_size: u64) -> Result<ProcessInfo, CollectError> {
    let (open, close) = match (content.find('('), content.rfind(')')) {
        (Some(open), Some(close)) if close > open => (open, close),
        _ => return Err(CollectError::format("stat", "command name parentheses not found")),
    };

    let pid = content[..open].trim().parse().unwrap_or(0);
    let name = content[open + 1..close].to_string();

    let fields: Vec<&str> = content[close + 1..].split_whitespace().collect();
    if fields.len() < MIN_STAT_FIELDS {
        return Err(CollectError::format(
            "stat",
            format!(
                "expected at least {} fields after command name, got {}",
                MIN_STAT_FIELDS,
                fields.len()
            ),
        ));
    }

    let num = |idx: usize| -> u64 { fields[idx].parse().unwrap_or(0) };

    Ok(ProcessInfo {
        pid,
        ppid: fields[PPID].parse().unwrap_or(0),
        name,
        state: fields[STATE].to_string(),
        utime: num(UTIME),
        stime: num(STIME),
        start_time: num(STARTTIME),
        rss: num(RSS_PAGES).saturating_mul(page_size),
        cmdline: String::new(),
    })
}

/// Renders raw cmdline bytes: NUL separators become spaces. Falls back to
/// `name` when the result is empty (kernel threads, zombies).
pub fn parse_cmdline(raw: &[u8], name: &str) -> String {
    let joined = String::from_utf8_lossy(raw).replace('\0', " ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        name.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "1234 (test_process) S 1 1234 1234 0 -1 4194304 100 0 0 0 1000 500 0 0 20 0 1 0 12345 12345678 256 18446744073709551615 4194304 4238788";

    #[test]
    fn test_parse_pid_stat() {
        let info = parse_pid_stat(STAT, 4096).unwrap();
        assert_eq!(info.pid, 1234);
        assert_eq!(info.ppid, 1);
        assert_eq!(info.name, "test_process");
        assert_eq!(info.state, "S");
        assert_eq!(info.utime, 1000);
        assert_eq!(info.stime, 500);
        assert_eq!(info.cpu_ticks(), 1500);
        assert_eq!(info.start_time, 12345);
        assert_eq!(info.rss, 256 * 4096);
    }

    #[test]
    fn test_name_with_parentheses_and_spaces() {
        let line = "42 (weird) name (x)) R 7 0 0 0 -1 0 0 0 0 0 30 20 0 0 20 0 1 0 99 0 10";
        let info = parse_pid_stat(line, 4096).unwrap();
        assert_eq!(info.name, "weird) name (x)");
        assert_eq!(info.state, "R");
        assert_eq!(info.ppid, 7);
        assert_eq!(info.utime, 30);
        assert_eq!(info.stime, 20);
        assert_eq!(info.start_time, 99);
        assert_eq!(info.rss, 10 * 4096);
    }

    #[test]
    fn test_missing_parentheses_is_format_error() {
        assert!(parse_pid_stat("1 init S 0 0", 4096).is_err());
        assert!(parse_pid_stat("1 )init( S 0 0", 4096).is_err());
    }

    #[test]
    fn test_too_few_fields_is_format_error() {
        assert!(parse_pid_stat("1234 (test) S 1 2 3", 4096).is_err());
    }

    #[test]
    fn test_parse_cmdline() {
        assert_eq!(
            parse_cmdline(b"/usr/bin/python3\0-m\0http.server\0", "python3"),
            "/usr/bin/python3 -m http.server"
        );
        assert_eq!(parse_cmdline(b"", "kworker/0:1"), "kworker/0:1");
        assert_eq!(parse_cmdline(b"\0\0", "zombie"), "zombie");
    }

    #[test]
    fn test_page_size_is_positive() {
        assert!(*PAGE_SIZE > 0);
    }
}

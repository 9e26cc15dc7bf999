//! Hardware profile of the evaluation host
//!
//! Measured results are only comparable on the same hardware, so every
//! external evaluation is labelled with the host it ran on.

use serde::{Deserialize, Serialize};

#[cfg(any(target_os = "windows", target_os = "macos"))]
use std::process::Command;

/// Description of the host running evaluations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareProfile {
    pub os: String,
    pub arch: String,
    /// Logical CPUs available to this process
    pub cpu_cores: usize,
    pub ram_total_mb: u64,
    pub ram_used_mb: u64,
}

impl HardwareProfile {
    /// Detect the current host (best effort, unknown values stay zero)
    pub fn detect() -> Self {
        let (ram_used_mb, ram_total_mb) = detect_memory().unwrap_or((0, 0));
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_cores: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            ram_total_mb,
            ram_used_mb,
        }
    }
}

/// Returns `(used_mb, total_mb)`
fn detect_memory() -> Option<(u64, u64)> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/meminfo").ok()?;
        return parse_meminfo(&content);
    }

    #[cfg(target_os = "macos")]
    {
        return detect_memory_macos();
    }

    #[cfg(target_os = "windows")]
    {
        return detect_memory_windows();
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        None
    }
}

/// Parse `/proc/meminfo` content into `(used_mb, total_mb)`
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_meminfo(content: &str) -> Option<(u64, u64)> {
    let mut total_kb = None;
    let mut available_kb = None;

    for line in content.lines() {
        // "MemTotal:       16318496 kB"
        let mut parts = line.split_whitespace();
        let key = parts.next();
        let value = parts.next().and_then(|v| v.parse::<u64>().ok());
        match key {
            Some("MemTotal:") => total_kb = value,
            Some("MemAvailable:") => available_kb = value,
            _ => {}
        }
    }

    let total = total_kb?;
    let used = total.saturating_sub(available_kb.unwrap_or(0));
    Some((used / 1024, total / 1024))
}

#[cfg(target_os = "macos")]
fn detect_memory_macos() -> Option<(u64, u64)> {
    let output = Command::new("sysctl")
        .args(["-n", "hw.memsize"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let bytes = String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse::<u64>()
        .ok()?;
    // vm_stat paging math is not worth it for a label; report total only
    Some((0, bytes / 1024 / 1024))
}

#[cfg(target_os = "windows")]
fn detect_memory_windows() -> Option<(u64, u64)> {
    let output = Command::new("wmic")
        .args(["OS", "get", "FreePhysicalMemory,TotalVisibleMemorySize", "/Value"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut free_kb: Option<u64> = None;
    let mut total_kb: Option<u64> = None;

    for line in stdout.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("FreePhysicalMemory=") {
            free_kb = value.trim().parse().ok();
        } else if let Some(value) = line.strip_prefix("TotalVisibleMemorySize=") {
            total_kb = value.trim().parse().ok();
        }
    }

    match (free_kb, total_kb) {
        (Some(free), Some(total)) if total > 0 => {
            Some((total.saturating_sub(free) / 1024, total / 1024))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meminfo() {
        let content = "MemTotal:       16384000 kB\nMemFree:         1024000 kB\nMemAvailable:    8192000 kB\n";
        let (used, total) = parse_meminfo(content).expect("meminfo");
        assert_eq!(total, 16000);
        assert_eq!(used, 8000);
    }

    #[test]
    fn test_parse_meminfo_missing_total() {
        assert!(parse_meminfo("MemFree: 10 kB\n").is_none());
    }

    #[test]
    fn test_detect_fills_static_fields() {
        let profile = HardwareProfile::detect();
        assert_eq!(profile.os, std::env::consts::OS);
        assert!(profile.cpu_cores >= 1);
    }
}

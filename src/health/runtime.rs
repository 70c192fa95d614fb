//! Process runtime statistics.
//!
//! Memory pressure is resident set size over a budget: the configured
//! `memory_limit_bytes`, or total host memory when none is set.

use parking_lot::Mutex;
use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub used_bytes: u64,
    pub limit_bytes: u64,
    pub used_percent: f64,
    pub used: String,
    pub limit: String,
    pub virtual_bytes: u64,
}

impl MemoryStats {
    pub fn new(used_bytes: u64, limit_bytes: u64) -> Self {
        let used_percent = if limit_bytes == 0 {
            0.0
        } else {
            used_bytes as f64 / limit_bytes as f64 * 100.0
        };
        Self {
            used_bytes,
            limit_bytes,
            used_percent,
            used: format_bytes(used_bytes),
            limit: format_bytes(limit_bytes),
            virtual_bytes: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuStats {
    pub available_processors: usize,
    pub system_load_average: f64,
    /// Percent of one core; 0 on the first sample.
    pub process_cpu_load: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OsStats {
    pub name: String,
    pub version: String,
    pub arch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuntimeStats {
    pub memory: MemoryStats,
    pub cpu: CpuStats,
    pub os: OsStats,
}

impl RuntimeStats {
    /// Healthy while memory usage stays below `threshold_percent`.
    pub fn is_healthy(&self, threshold_percent: f64) -> bool {
        self.memory.used_percent < threshold_percent
    }
}

/// Source of runtime statistics.
pub trait RuntimeProbe: Send + Sync {
    fn sample(&self) -> RuntimeStats;
}

pub struct SysinfoRuntimeProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
    memory_limit: Option<u64>,
}

impl SysinfoRuntimeProbe {
    pub fn new(memory_limit: Option<u64>) -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot resolve own pid, process stats disabled");
                None
            }
        };
        Self {
            system: Mutex::new(System::new()),
            pid,
            memory_limit,
        }
    }
}

impl RuntimeProbe for SysinfoRuntimeProbe {
    fn sample(&self) -> RuntimeStats {
        let mut system = self.system.lock();
        system.refresh_memory();

        let mut used = 0;
        let mut virtual_bytes = 0;
        let mut process_cpu_load = 0.0;
        if let Some(pid) = self.pid {
            system.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                true,
                ProcessRefreshKind::new().with_memory().with_cpu(),
            );
            if let Some(process) = system.process(pid) {
                used = process.memory();
                virtual_bytes = process.virtual_memory();
                process_cpu_load = process.cpu_usage();
            }
        }

        let limit = self.memory_limit.unwrap_or_else(|| system.total_memory());
        let memory = MemoryStats {
            virtual_bytes,
            ..MemoryStats::new(used, limit)
        };

        let cpu = CpuStats {
            available_processors: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            system_load_average: System::load_average().one,
            process_cpu_load,
        };

        let os = OsStats {
            name: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            version: System::os_version().unwrap_or_default(),
            arch: std::env::consts::ARCH.to_string(),
        };

        RuntimeStats { memory, cpu, os }
    }
}

/// Binary-prefixed size, e.g. `1.5 KB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["K", "M", "G", "T", "P", "E"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    value /= 1024.0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}B", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn memory_percent_and_threshold() {
        let stats = RuntimeStats {
            memory: MemoryStats::new(95, 100),
            ..Default::default()
        };
        assert_eq!(stats.memory.used_percent, 95.0);
        assert!(!stats.is_healthy(90.0));
        assert!(stats.is_healthy(96.0));
        assert_eq!(MemoryStats::new(5, 0).used_percent, 0.0);
    }

    #[test]
    fn sysinfo_probe_reports_this_process() {
        let probe = SysinfoRuntimeProbe::new(None);
        let stats = probe.sample();
        assert!(stats.memory.limit_bytes > 0);
        assert!(stats.cpu.available_processors >= 1);
        assert!(!stats.os.arch.is_empty());
    }
}

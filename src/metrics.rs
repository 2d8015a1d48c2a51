/*
 *  metrics.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Host metrics gathered from /proc and statvfs
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */
//! Parsers for the /proc files the system tabs read, plus mounted filesystem
//! sizes. Parsing is kept apart from file access so it can be tested with
//! canned text.

use std::ffi::CString;
use std::fs;
use std::io;
use std::mem::MaybeUninit;

const PROC_STAT: &str = "/proc/stat";
const PROC_MEMINFO: &str = "/proc/meminfo";
const PROC_UPTIME: &str = "/proc/uptime";
const PROC_MOUNTS: &str = "/proc/mounts";

/// Cumulative jiffies for one core.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

/// Per-core counters from /proc/stat, the aggregate `cpu` line excluded
pub fn parse_cpu_times(stat: &str) -> Vec<CpuTimes> {
    stat.lines()
        .filter(|line| {
            line.strip_prefix("cpu")
                .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
        })
        .map(|line| {
            // user nice system idle iowait irq softirq steal
            let fields: Vec<u64> = line
                .split_whitespace()
                .skip(1)
                .take(8)
                .filter_map(|f| f.parse().ok())
                .collect();
            let total: u64 = fields.iter().sum();
            let idle = fields.get(3).copied().unwrap_or(0) + fields.get(4).copied().unwrap_or(0);
            CpuTimes { busy: total.saturating_sub(idle), total }
        })
        .collect()
}

/// Busy fraction of a core between two samples, 0.0..=1.0
pub fn cpu_usage(previous: &CpuTimes, current: &CpuTimes) -> f64 {
    let total = current.total.saturating_sub(previous.total);
    if total == 0 {
        return 0.0;
    }
    let busy = current.busy.saturating_sub(previous.busy);
    (busy as f64 / total as f64).clamp(0.0, 1.0)
}

/// Turns successive /proc/stat readings into per-core usage.
///
/// The first sample measures from boot.
#[derive(Debug, Default, Clone)]
pub struct CpuSampler {
    previous: Vec<CpuTimes>,
}

impl CpuSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_from(&mut self, stat: &str) -> Vec<f64> {
        let current = parse_cpu_times(stat);
        let usage = current
            .iter()
            .enumerate()
            .map(|(i, now)| {
                let before = self.previous.get(i).copied().unwrap_or_default();
                cpu_usage(&before, now)
            })
            .collect();
        self.previous = current;
        usage
    }

    pub fn sample(&mut self) -> io::Result<Vec<f64>> {
        let stat = fs::read_to_string(PROC_STAT)?;
        Ok(self.sample_from(&stat))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MemoryInfo {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.available_bytes)
    }

    pub fn used_fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes() as f64 / self.total_bytes as f64
    }
}

/// `MemTotal` and `MemAvailable` from /proc/meminfo (reported in kB)
pub fn parse_meminfo(meminfo: &str) -> Option<MemoryInfo> {
    let field = |name: &str| -> Option<u64> {
        meminfo.lines().find_map(|line| {
            let rest = line.strip_prefix(name)?.strip_prefix(':')?;
            rest.split_whitespace().next()?.parse::<u64>().ok()
        })
    };
    Some(MemoryInfo {
        total_bytes: field("MemTotal")? * 1024,
        available_bytes: field("MemAvailable")? * 1024,
    })
}

pub fn read_meminfo() -> io::Result<MemoryInfo> {
    let text = fs::read_to_string(PROC_MEMINFO)?;
    parse_meminfo(&text).ok_or_else(|| invalid_data("meminfo lacks MemTotal/MemAvailable"))
}

/// Seconds since boot, first field of /proc/uptime
pub fn parse_uptime(uptime: &str) -> Option<f64> {
    uptime.split_whitespace().next()?.parse().ok()
}

pub fn read_uptime() -> io::Result<f64> {
    let text = fs::read_to_string(PROC_UPTIME)?;
    parse_uptime(&text).ok_or_else(|| invalid_data("unreadable uptime"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mountpoint: String,
}

/// Block device mounts from /proc/mounts, in file order
pub fn parse_mounts(mounts: &str) -> Vec<MountEntry> {
    mounts
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mountpoint = fields.next()?;
            device.starts_with("/dev/").then(|| MountEntry {
                device: device.to_string(),
                mountpoint: unescape_mount_path(mountpoint),
            })
        })
        .collect()
}

pub fn read_mounts() -> io::Result<Vec<MountEntry>> {
    Ok(parse_mounts(&fs::read_to_string(PROC_MOUNTS)?))
}

/// Undo the kernel's octal escaping (`\040` for space and friends)
fn unescape_mount_path(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let digits = path.get(i + 1..i + 4).unwrap_or("");
            if let Ok(value) = u8::from_str_radix(digits, 8) {
                out.push(value);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiskSpace {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

impl DiskSpace {
    pub fn used_fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.total_bytes as f64
    }
}

/// Size and usage of the filesystem mounted at `mountpoint`
pub fn disk_space(mountpoint: &str) -> io::Result<DiskSpace> {
    let path = CString::new(mountpoint).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mut stat = MaybeUninit::<libc::statvfs>::uninit();

    // SAFETY: path is NUL terminated and stat is only read after success
    let rc = unsafe { libc::statvfs(path.as_ptr(), stat.as_mut_ptr()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    let stat = unsafe { stat.assume_init() };

    let fragment = stat.f_frsize as u64;
    let total = stat.f_blocks as u64 * fragment;
    let free = stat.f_bfree as u64 * fragment;
    Ok(DiskSpace { total_bytes: total, used_bytes: total.saturating_sub(free) })
}

fn invalid_data(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "cpu  300 0 100 600 0 0 0 0 0 0\n\
                        cpu0 100 0 50 300 0 0 0 0 0 0\n\
                        cpu1 200 0 50 300 0 0 0 0 0 0\n\
                        intr 12345\n\
                        cpuidle_x 1\n";

    #[test]
    fn test_parse_cpu_times_per_core() {
        let times = parse_cpu_times(STAT);
        assert_eq!(times.len(), 2);
        assert_eq!(times[0], CpuTimes { busy: 150, total: 450 });
        assert_eq!(times[1], CpuTimes { busy: 250, total: 550 });
    }

    #[test]
    fn test_sampler_uses_deltas() {
        let mut sampler = CpuSampler::new();
        sampler.sample_from(STAT);

        let later = "cpu  0 0 0 0 0 0 0 0\n\
                     cpu0 150 0 50 350 0 0 0 0\n\
                     cpu1 300 0 50 300 0 0 0 0\n";
        let usage = sampler.sample_from(later);
        assert_eq!(usage.len(), 2);
        assert!((usage[0] - 0.5).abs() < 1e-9);
        assert!((usage[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_usage_without_progress_is_zero() {
        let t = CpuTimes { busy: 10, total: 20 };
        assert_eq!(cpu_usage(&t, &t), 0.0);
    }

    #[test]
    fn test_parse_meminfo() {
        let text = "MemTotal:        8000000 kB\nMemFree:  100 kB\nMemAvailable:    2000000 kB\n";
        let mem = parse_meminfo(text).unwrap();
        assert_eq!(mem.total_bytes, 8_000_000 * 1024);
        assert_eq!(mem.used_bytes(), 6_000_000 * 1024);
        assert!((mem.used_fraction() - 0.75).abs() < 1e-9);

        assert!(parse_meminfo("MemTotal: 1 kB\n").is_none());
    }

    #[test]
    fn test_parse_uptime() {
        assert_eq!(parse_uptime("35021.52 120000.10\n"), Some(35021.52));
        assert_eq!(parse_uptime(""), None);
    }

    #[test]
    fn test_parse_mounts_keeps_block_devices() {
        let text = "proc /proc proc rw 0 0\n\
                    /dev/sda1 / ext4 rw 0 0\n\
                    tmpfs /run tmpfs rw 0 0\n\
                    /dev/sdb1 /mnt/my\\040disk vfat rw 0 0\n";
        let mounts = parse_mounts(text);
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].mountpoint, "/");
        assert_eq!(mounts[1].device, "/dev/sdb1");
        assert_eq!(mounts[1].mountpoint, "/mnt/my disk");
    }

    #[test]
    fn test_disk_space_root() {
        let space = disk_space("/").unwrap();
        assert!(space.total_bytes > 0);
        assert!(space.used_bytes <= space.total_bytes);
    }

    #[test]
    fn test_disk_space_missing_path() {
        assert!(disk_space("/definitely/not/mounted/here").is_err());
    }
}

/*
 *  tabs/sysinfo.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	System tabs - CPU, memory, uptime and mounted disk usage
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

use std::io;

use log::warn;

use super::{write_error_line, write_usage_bar, Tab};
use crate::deutils::{format_size, format_timespan};
use crate::display::{Color, DisplayError, SerialDisplay};
use crate::metrics::{self, CpuSampler, DiskSpace, MemoryInfo, MountEntry};

pub struct SystemStats {
    sampler: CpuSampler,
    cpu_usages: Vec<f64>,
    memory: MemoryInfo,
    uptime_secs: u64,
    error: Option<String>,
}

impl Default for SystemStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemStats {
    pub fn new() -> Self {
        Self {
            sampler: CpuSampler::new(),
            cpu_usages: Vec::new(),
            memory: MemoryInfo::default(),
            uptime_secs: 0,
            error: None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Read /proc again; anything unreadable keeps its last value
    pub fn refresh(&mut self) {
        let cpu = self.sampler.sample();
        self.update_with(cpu, metrics::read_meminfo(), metrics::read_uptime());
    }

    /// Fold one round of readings in; the first failed source becomes the error line
    pub fn update_with(
        &mut self,
        cpu: io::Result<Vec<f64>>,
        memory: io::Result<MemoryInfo>,
        uptime: io::Result<f64>,
    ) {
        let mut failed = None;
        match cpu {
            Ok(usages) => self.cpu_usages = usages,
            Err(e) => {
                warn!("Unable to read CPU counters: {}", e);
                failed.get_or_insert("CPU stats unavailable");
            }
        }
        match memory {
            Ok(memory) => self.memory = memory,
            Err(e) => {
                warn!("Unable to read memory info: {}", e);
                failed.get_or_insert("Memory info unavailable");
            }
        }
        match uptime {
            Ok(uptime) => self.uptime_secs = uptime as u64,
            Err(e) => {
                warn!("Unable to read uptime: {}", e);
                failed.get_or_insert("Uptime unavailable");
            }
        }
        self.error = failed.map(String::from);
    }

    pub fn set_readings(&mut self, cpu_usages: Vec<f64>, memory: MemoryInfo, uptime_secs: u64) {
        self.cpu_usages = cpu_usages;
        self.memory = memory;
        self.uptime_secs = uptime_secs;
    }

    pub async fn draw(&self, display: &mut SerialDisplay) -> Result<(), DisplayError> {
        for (i, usage) in self.cpu_usages.iter().enumerate() {
            display
                .set_foreground(Color::White)
                .await?
                .write(&format!("CPU {i}:"))
                .await?
                .set_foreground(Color::Yellow)
                .await?
                .write_line(&format!(" {:.2} %", usage * 100.0))
                .await?;
            write_usage_bar(display, *usage).await?;
        }

        let used = format_size(self.memory.used_bytes());
        let total = format_size(self.memory.total_bytes);
        display
            .linebreak()
            .await?
            .write_line("RAM")
            .await?
            .set_foreground(Color::Yellow)
            .await?
            .write_line(&format!("{used} / {total}"))
            .await?;
        write_usage_bar(display, self.memory.used_fraction()).await?;

        display
            .linebreak()
            .await?
            .write_line("Uptime:")
            .await?
            .set_foreground(Color::Yellow)
            .await?
            .write_line(&format_timespan(self.uptime_secs))
            .await?
            .set_foreground(Color::White)
            .await?;

        if let Some(error) = &self.error {
            display.linebreak().await?;
            write_error_line(display, error).await?;
        }
        Ok(())
    }
}

impl Tab for SystemStats {
    fn title(&self) -> &str {
        "System stats"
    }

    async fn render(&mut self, display: &mut SerialDisplay) -> Result<(), DisplayError> {
        self.refresh();
        self.draw(display).await
    }
}

/// Usage of every block device mount seen so far.
///
/// Mounts stay listed once seen; one whose statvfs fails keeps its last size.
pub struct DiskUsage {
    disks: Vec<(String, DiskSpace)>,
    error: Option<String>,
}

impl Default for DiskUsage {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskUsage {
    pub fn new() -> Self {
        Self { disks: Vec::new(), error: None }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn refresh(&mut self) {
        self.refresh_from(metrics::read_mounts(), metrics::disk_space);
    }

    /// Like `update_with`, but a mount table that could not be read keeps
    /// the known disks and raises the error line
    pub fn refresh_from<F>(&mut self, mounts: io::Result<Vec<MountEntry>>, measure: F)
    where
        F: Fn(&str) -> io::Result<DiskSpace>,
    {
        match mounts {
            Ok(mounts) => {
                self.error = None;
                self.update_with(&mounts, measure);
            }
            Err(e) => {
                warn!("Unable to read mounts: {}", e);
                self.error = Some("Mount table unavailable".to_string());
            }
        }
    }

    /// Measure `mounts` with `measure`, skipping the ones it cannot size
    pub fn update_with<F>(&mut self, mounts: &[MountEntry], measure: F)
    where
        F: Fn(&str) -> io::Result<DiskSpace>,
    {
        for mount in mounts {
            let space = match measure(&mount.mountpoint) {
                Ok(space) if space.total_bytes > 0 => space,
                Ok(_) => continue,
                Err(e) => {
                    warn!("statvfs {} ({}) failed: {}", mount.mountpoint, mount.device, e);
                    continue;
                }
            };
            match self.disks.iter_mut().find(|(path, _)| *path == mount.mountpoint) {
                Some((_, known)) => *known = space,
                None => self.disks.push((mount.mountpoint.clone(), space)),
            }
        }
    }

    pub fn disks(&self) -> &[(String, DiskSpace)] {
        &self.disks
    }

    pub async fn draw(&self, display: &mut SerialDisplay) -> Result<(), DisplayError> {
        for (mountpoint, space) in &self.disks {
            display
                .set_foreground(Color::White)
                .await?
                .write_line(mountpoint)
                .await?
                .set_foreground(Color::Yellow)
                .await?
                .write_line(&format!(
                    "{} / {}",
                    format_size(space.used_bytes),
                    format_size(space.total_bytes)
                ))
                .await?;
            write_usage_bar(display, space.used_fraction()).await?;
            display.linebreak().await?;
        }
        if let Some(error) = &self.error {
            write_error_line(display, error).await?;
        }
        Ok(())
    }
}

impl Tab for DiskUsage {
    fn title(&self) -> &str {
        "Disk usage"
    }

    async fn render(&mut self, display: &mut SerialDisplay) -> Result<(), DisplayError> {
        self.refresh();
        self.draw(display).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::MockTransport;

    fn mount(path: &str) -> MountEntry {
        MountEntry { device: "/dev/sda1".into(), mountpoint: path.into() }
    }

    #[tokio::test(start_paused = true)]
    async fn test_system_stats_layout() {
        let transport = MockTransport::new();
        let mut display = SerialDisplay::new(transport.boxed());
        let mut tab = SystemStats::new();
        tab.set_readings(
            vec![0.1, 0.5],
            MemoryInfo { total_bytes: 2_000_000_000, available_bytes: 500_000_000 },
            90061,
        );

        tab.draw(&mut display).await.unwrap();

        let out = transport.output();
        assert!(out.contains("CPU 0:"));
        assert!(out.contains(" 10.00 %"));
        assert!(out.contains("CPU 1:"));
        assert!(out.contains(" 50.00 %"));
        assert!(out.contains("1.5 GB / 2 GB"));
        assert!(out.contains("1D 1h 1m 1s"));
        // green, yellow, then red for 75% RAM
        assert!(out.contains("\x1b[32m"));
        assert!(out.contains("\x1b[31m"));
    }

    #[test]
    fn test_disk_entries_persist_and_skip_failures() {
        let mut tab = DiskUsage::new();
        tab.update_with(&[mount("/"), mount("/boot")], |path| match path {
            "/" => Ok(DiskSpace { total_bytes: 100, used_bytes: 40 }),
            _ => Ok(DiskSpace { total_bytes: 10, used_bytes: 1 }),
        });
        assert_eq!(tab.disks().len(), 2);

        tab.update_with(&[mount("/"), mount("/boot")], |path| match path {
            "/" => Ok(DiskSpace { total_bytes: 100, used_bytes: 50 }),
            _ => Err(io::Error::other("gone")),
        });
        assert_eq!(tab.disks().len(), 2);
        assert_eq!(tab.disks()[0].1.used_bytes, 50);
        assert_eq!(tab.disks()[1].1.used_bytes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disk_usage_draw() {
        let transport = MockTransport::new();
        let mut display = SerialDisplay::new(transport.boxed());
        let mut tab = DiskUsage::new();
        tab.update_with(&[mount("/")], |_| {
            Ok(DiskSpace { total_bytes: 64_000_000_000, used_bytes: 16_000_000_000 })
        });

        tab.draw(&mut display).await.unwrap();

        let out = transport.output();
        assert!(out.contains("16 GB / 64 GB"));
        assert!(out.contains("\x1b[32m"));
        assert!(out.ends_with("\n\r"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_proc_shows_error_line() {
        let transport = MockTransport::new();
        let mut display = SerialDisplay::new(transport.boxed());
        let mut tab = SystemStats::new();
        tab.set_readings(vec![0.2], MemoryInfo { total_bytes: 1000, available_bytes: 900 }, 60);

        tab.update_with(
            Ok(vec![0.4]),
            Err(io::Error::new(io::ErrorKind::NotFound, "no meminfo")),
            Err(io::Error::new(io::ErrorKind::NotFound, "no uptime")),
        );
        assert_eq!(tab.error(), Some("Memory info unavailable"));

        tab.draw(&mut display).await.unwrap();

        let out = transport.output();
        assert!(out.contains(" 40.00 %"));
        assert!(out.contains("100 bytes / 1 KB"));
        assert!(out.contains("1m"));
        assert!(out.contains("\x1b[31mMemory info unavailable"));

        tab.update_with(Ok(vec![0.4]), Ok(MemoryInfo::default()), Ok(5.0));
        assert_eq!(tab.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_mounts_keep_disks_and_show_error() {
        let transport = MockTransport::new();
        let mut display = SerialDisplay::new(transport.boxed());
        let mut tab = DiskUsage::new();
        let measure = |_: &str| -> io::Result<DiskSpace> { Ok(DiskSpace { total_bytes: 100, used_bytes: 10 }) };

        tab.refresh_from(Ok(vec![mount("/")]), measure);
        assert_eq!(tab.error(), None);

        tab.refresh_from(Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")), measure);
        assert_eq!(tab.disks().len(), 1);

        tab.draw(&mut display).await.unwrap();

        let out = transport.output();
        assert!(out.contains("10 bytes / 100 bytes"));
        assert!(out.contains("\x1b[31mMount table unavailable"));
    }
}

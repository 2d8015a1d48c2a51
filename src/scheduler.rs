/*
 *  scheduler.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Rotation scheduler - header, current tab, and timed tab switching
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

use std::time::Duration;

use log::{debug, error, info};
use tokio::sync::watch;
use tokio::time::{sleep, Instant};

use crate::config::ConfigError;
use crate::display::{DisplayError, SerialDisplay};
use crate::header::StatusHeader;
use crate::tabs::Tab;

/// Text size used while blanking the screen between tabs
pub const ERASE_TEXT_SIZE: u8 = 4;

/// Pause after a tick that failed on the transport
pub const ERROR_PAUSE: Duration = Duration::from_secs(1);

/// Fixed, ordered set of tabs; never changes once built.
pub struct TabRegistry<T> {
    tabs: Vec<T>,
}

impl<T: Tab> TabRegistry<T> {
    pub fn new(tabs: Vec<T>) -> Result<Self, ConfigError> {
        if tabs.is_empty() {
            return Err(ConfigError::Validation("no tabs configured".into()));
        }
        Ok(Self { tabs })
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.tabs.get(index)
    }

    pub fn titles(&self) -> Vec<&str> {
        self.tabs.iter().map(|t| t.title()).collect()
    }
}

/// Which tab is showing and how long it has been up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleState {
    current_index: usize,
    tab_count: usize,
    elapsed: Duration,
    interval: Duration,
}

impl ScheduleState {
    /// `start_index` is 0-based and must name an existing tab
    pub fn new(tab_count: usize, start_index: usize, interval: Duration) -> Result<Self, ConfigError> {
        if tab_count == 0 {
            return Err(ConfigError::Validation("no tabs configured".into()));
        }
        if start_index >= tab_count {
            return Err(ConfigError::Validation(format!(
                "start tab {} out of range 1..={}",
                start_index + 1,
                tab_count
            )));
        }
        if interval.is_zero() {
            return Err(ConfigError::Validation("switch interval must be > 0".into()));
        }
        Ok(Self { current_index: start_index, tab_count, elapsed: Duration::ZERO, interval })
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Add `delta` to the time on screen; true when it is time to move on.
    ///
    /// A lone tab never rotates.
    pub fn record(&mut self, delta: Duration) -> bool {
        self.elapsed += delta;
        if self.elapsed >= self.interval && self.tab_count > 1 {
            self.elapsed = Duration::ZERO;
            self.current_index = (self.current_index + 1) % self.tab_count;
            true
        } else {
            false
        }
    }
}

pub struct RotationScheduler<T> {
    registry: TabRegistry<T>,
    state: ScheduleState,
    header: StatusHeader,
    last_tick: Instant,
}

impl<T: Tab> RotationScheduler<T> {
    pub fn new(registry: TabRegistry<T>, start_index: usize, interval: Duration) -> Result<Self, ConfigError> {
        let state = ScheduleState::new(registry.len(), start_index, interval)?;
        Ok(Self { registry, state, header: StatusHeader::new(), last_tick: Instant::now() })
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index()
    }

    pub fn registry(&self) -> &TabRegistry<T> {
        &self.registry
    }

    /// One pass: header, current tab, bookkeeping, and the erase on a switch.
    ///
    /// Time is accounted and the switch made even when drawing failed; the
    /// first display error is returned afterwards. Returns whether the tab
    /// changed.
    pub async fn tick(&mut self, display: &mut SerialDisplay) -> Result<bool, DisplayError> {
        let index = self.state.current_index();
        let count = self.registry.len();
        let tab = &mut self.registry.tabs[index];

        let mut result = self.header.render(display, index, tab.title(), count).await;
        if result.is_ok() {
            result = tab.render(display).await;
        }

        let now = Instant::now();
        let delta = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;

        let rotated = self.state.record(delta);
        if rotated {
            debug!("Switching to tab {} of {}", self.state.current_index() + 1, count);
            let erased = erase_transition(display).await;
            if result.is_ok() {
                result = erased;
            }
        }
        result.map(|_| rotated)
    }

    /// Tick until `shutdown` reads true; checked before every tick
    pub async fn run(&mut self, display: &mut SerialDisplay, shutdown: watch::Receiver<bool>) {
        info!(
            "Rotating {} tabs every {:?}, starting with '{}'",
            self.registry.len(),
            self.state.interval,
            self.registry.tabs[self.state.current_index()].title()
        );
        self.last_tick = Instant::now();

        loop {
            if *shutdown.borrow() {
                info!("Shutdown requested, leaving render loop");
                break;
            }
            if let Err(e) = self.tick(display).await {
                error!("Render tick failed: {}", e);
                sleep(ERROR_PAUSE).await;
            }
        }
    }
}

/// Blank everything below the header, quickly, at the largest text size
async fn erase_transition(display: &mut SerialDisplay) -> Result<(), DisplayError> {
    let text_size = display.text_size();
    display.set_text_size(ERASE_TEXT_SIZE).await?;
    let rows = display.rows();
    display.erase_rows(1, rows.saturating_sub(1)).await?;
    display.set_text_size(text_size).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::MockTransport;

    /// Takes `work` of virtual time per render
    struct SlowTab {
        title: String,
        work: Duration,
        renders: usize,
        stop_after: Option<(usize, watch::Sender<bool>)>,
    }

    impl SlowTab {
        fn new(title: &str, work: Duration) -> Self {
            Self { title: title.into(), work, renders: 0, stop_after: None }
        }
    }

    impl Tab for SlowTab {
        fn title(&self) -> &str {
            &self.title
        }

        async fn render(&mut self, display: &mut SerialDisplay) -> Result<(), DisplayError> {
            self.renders += 1;
            display.write_line(&format!("render {}", self.renders)).await?;
            sleep(self.work).await;
            if let Some((limit, tx)) = &self.stop_after {
                if self.renders >= *limit {
                    let _ = tx.send(true);
                }
            }
            Ok(())
        }
    }

    fn three_tabs() -> TabRegistry<SlowTab> {
        let work = Duration::from_secs(5);
        TabRegistry::new(vec![SlowTab::new("A", work), SlowTab::new("B", work), SlowTab::new("C", work)]).unwrap()
    }

    #[test]
    fn test_rotation_sequence() {
        let mut state = ScheduleState::new(3, 0, Duration::from_secs(15)).unwrap();
        assert!(!state.record(Duration::from_secs(10)));
        assert!(state.record(Duration::from_secs(6)));
        assert_eq!(state.current_index(), 1, "after 16s");
        assert!(state.record(Duration::from_secs(15)));
        assert_eq!(state.current_index(), 2, "after 31s");
        assert!(state.record(Duration::from_secs(15)));
        assert_eq!(state.current_index(), 0, "after 46s");
    }

    #[test]
    fn test_single_tab_never_rotates() {
        let mut state = ScheduleState::new(1, 0, Duration::from_secs(15)).unwrap();
        for _ in 0..100 {
            assert!(!state.record(Duration::from_secs(60)));
        }
        assert_eq!(state.current_index(), 0);
    }

    #[test]
    fn test_start_index_validated() {
        assert!(ScheduleState::new(3, 3, Duration::from_secs(15)).is_err());
        assert!(ScheduleState::new(0, 0, Duration::from_secs(15)).is_err());
        assert!(ScheduleState::new(2, 0, Duration::ZERO).is_err());
        assert_eq!(ScheduleState::new(3, 2, Duration::from_secs(1)).unwrap().current_index(), 2);
    }

    #[test]
    fn test_empty_registry_rejected() {
        assert!(TabRegistry::<SlowTab>::new(vec![]).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_rotate_and_erase() {
        let transport = MockTransport::new();
        let mut display = SerialDisplay::new(transport.boxed());
        let mut scheduler = RotationScheduler::new(three_tabs(), 0, Duration::from_secs(15)).unwrap();

        assert!(!scheduler.tick(&mut display).await.unwrap());
        assert!(!scheduler.tick(&mut display).await.unwrap());
        assert_eq!(scheduler.current_index(), 0);
        transport.clear();

        assert!(scheduler.tick(&mut display).await.unwrap());
        assert_eq!(scheduler.current_index(), 1);

        let out = transport.output();
        let grow = out.find("\x1b[4s").unwrap();
        let restore = out.rfind("\x1b[2s").unwrap();
        assert!(grow < restore);
        assert_eq!(display.text_size(), 2);

        // header now names the second tab
        transport.clear();
        scheduler.tick(&mut display).await.unwrap();
        assert!(transport.output().contains("2 / 3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tick_still_keeps_time() {
        let transport = MockTransport::new();
        let mut display = SerialDisplay::new(transport.boxed());
        let mut scheduler = RotationScheduler::new(three_tabs(), 0, Duration::from_secs(15)).unwrap();

        transport.set_write_failure(true);
        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(scheduler.tick(&mut display).await.is_err());
        assert_eq!(scheduler.current_index(), 1);

        transport.set_write_failure(false);
        assert!(scheduler.tick(&mut display).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let mut tab = SlowTab::new("Only", Duration::from_secs(1));
        tab.stop_after = Some((3, tx));

        let transport = MockTransport::new();
        let mut display = SerialDisplay::new(transport.boxed());
        let mut scheduler = RotationScheduler::new(TabRegistry::new(vec![tab]).unwrap(), 0, Duration::from_secs(15)).unwrap();

        scheduler.run(&mut display, rx).await;

        assert_eq!(scheduler.registry().get(0).unwrap().renders, 3);
        assert_eq!(scheduler.current_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_does_nothing_when_already_cancelled() {
        let (_tx, rx) = watch::channel(true);
        let transport = MockTransport::new();
        let mut display = SerialDisplay::new(transport.boxed());
        let mut scheduler = RotationScheduler::new(three_tabs(), 0, Duration::from_secs(15)).unwrap();

        scheduler.run(&mut display, rx).await;

        assert!(transport.output().is_empty());
    }
}

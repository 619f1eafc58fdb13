use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::audio;
use crate::backend::poller::{PollEvent, StatusPoller};
use crate::backend::{BackendClient, DetectionStatus};
use crate::config::AppConfig;

/// Which card the kiosk is showing. Exactly one is ever active; every
/// transition below goes through `enter_scanning`, `grant_access` or
/// `enter_idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for someone to step up
    Idle,
    /// Camera detection running, status poll live
    Scanning,
    /// Backend confirmed the check, waiting for reset
    Granted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

/// A running scan: the poll task handle plus its event channel. Created
/// when the backend acknowledges `/start_scan`, destroyed on grant or
/// reset. Owning both halves here is what keeps "one live poll task at a
/// time" a structural fact instead of a convention.
pub struct ScanSession {
    poller: StatusPoller,
    events: mpsc::UnboundedReceiver<PollEvent>,
    pub started: Instant,
}

pub struct App {
    pub phase: Phase,
    pub popup: Popup,

    session: Option<ScanSession>,
    backend: BackendClient,
    pub config: AppConfig,

    /// Latest detection state from the backend (streak gauge, debug badge)
    pub detection: DetectionStatus,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    /// Render tick counter, drives the scan-line animation
    pub frame: u64,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let backend = BackendClient::new(&config.backend_url)?;
        Ok(Self {
            phase: Phase::Idle,
            popup: Popup::None,
            session: None,
            backend,
            config,
            detection: DetectionStatus::default(),
            status_message: None,
            status_message_time: None,
            frame: 0,
        })
    }

    /// Set a status message (auto-clears after 3 seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    pub fn is_scanning(&self) -> bool {
        self.session.is_some()
    }

    /// How long the current scan has been running, if one is live.
    pub fn scan_elapsed(&self) -> Option<Duration> {
        self.session.as_ref().map(|s| s.started.elapsed())
    }

    /// One-time status fetch on startup so the debug badge is right before
    /// the first scan. Never transitions the phase.
    pub async fn refresh(&mut self) {
        match self.backend.fetch_status().await {
            Ok(status) => self.detection = status,
            Err(e) => {
                tracing::warn!("initial status fetch failed: {}", e);
                self.set_status(format!("Backend unreachable: {}", e));
            }
        }
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.popup == Popup::Help {
            if matches!(
                key.code,
                KeyCode::Esc
                    | KeyCode::Enter
                    | KeyCode::Char('h')
                    | KeyCode::Char('?')
                    | KeyCode::Char('q')
            ) {
                self.popup = Popup::None;
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Char('h') | KeyCode::Char('?') => self.popup = Popup::Help,
            KeyCode::Char('d') => self.toggle_debug().await,
            KeyCode::Char('s') | KeyCode::Enter | KeyCode::Char(' ') => match self.phase {
                Phase::Idle => self.start_scanning().await,
                Phase::Granted => self.reset_system().await,
                Phase::Scanning => {}
            },
            // Reset doubles as the cancel path while a scan is running
            KeyCode::Char('r') => match self.phase {
                Phase::Scanning | Phase::Granted => self.reset_system().await,
                Phase::Idle => {}
            },
            KeyCode::Esc => {
                if self.phase == Phase::Scanning {
                    self.reset_system().await;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Ask the backend to begin detection; only transition once it
    /// acknowledges, so a failed start leaves no half-open session behind.
    async fn start_scanning(&mut self) {
        match self.backend.start_scan().await {
            Ok(()) => {
                self.enter_scanning();
                self.set_status("Scanning started");
            }
            Err(e) => {
                tracing::error!("start_scan request failed: {}", e);
                self.set_status(format!("Could not start scan: {}", e));
            }
        }
    }

    /// Spawn the poll task and flip to the scanning card. Any prior
    /// session is stopped first, so two starts can never stack timers.
    fn enter_scanning(&mut self) {
        if let Some(old) = self.session.take() {
            tracing::warn!("scan started while a session was live, replacing it");
            old.poller.stop();
        }

        let cadence = Duration::from_millis(self.config.poll_interval_ms);
        let (poller, events) = StatusPoller::spawn(self.backend.clone(), cadence);

        self.session = Some(ScanSession {
            poller,
            events,
            started: Instant::now(),
        });
        self.detection.is_scanning = true;
        self.detection.access_granted = false;
        self.detection.consecutive_frames = 0;
        self.phase = Phase::Scanning;
    }

    /// Ask the backend to clear detection state, then return to the idle
    /// card. Works from the granted card and as a mid-scan cancel.
    async fn reset_system(&mut self) {
        match self.backend.reset().await {
            Ok(()) => {
                self.enter_idle();
                self.set_status("Ready for the next check");
            }
            Err(e) => {
                tracing::error!("reset request failed: {}", e);
                self.set_status(format!("Could not reset: {}", e));
            }
        }
    }

    /// Tear down any live session and show the idle card.
    fn enter_idle(&mut self) {
        if let Some(session) = self.session.take() {
            session.poller.stop();
        }
        self.detection = DetectionStatus {
            debug_mode: self.detection.debug_mode,
            ..DetectionStatus::default()
        };
        self.phase = Phase::Idle;
    }

    /// The backend confirmed the check: stop polling, chime, notify, and
    /// show the granted card.
    fn grant_access(&mut self) {
        if let Some(session) = self.session.take() {
            session.poller.stop();
        }
        self.phase = Phase::Granted;
        self.set_status("Access granted");

        if let Some(chime) = &self.config.chime_path {
            audio::play_chime(chime);
        }
        if self.config.notifications {
            let _ = notify_rust::Notification::new()
                .summary("garita")
                .body("Access granted")
                .icon("camera-video")
                .show();
        }
    }

    async fn toggle_debug(&mut self) {
        match self.backend.toggle_debug().await {
            Ok(enabled) => {
                self.detection.debug_mode = enabled;
                self.set_status(if enabled {
                    "Backend debug overlay on"
                } else {
                    "Backend debug overlay off"
                });
            }
            Err(e) => {
                tracing::error!("toggle_debug request failed: {}", e);
                self.set_status(format!("Could not toggle debug: {}", e));
            }
        }
    }

    /// Apply one poll outcome. No-op unless a session is live, so a stale
    /// event can never act after a grant or reset already tore down.
    fn handle_poll(&mut self, event: PollEvent) {
        if self.session.is_none() {
            return;
        }

        match event {
            PollEvent::Status(status) => {
                let granted = status.access_granted;
                self.detection = status;
                if granted {
                    self.grant_access();
                }
            }
            PollEvent::Unreachable(e) => {
                self.set_status(format!("Backend unreachable: {}", e));
            }
        }
    }

    pub async fn tick(&mut self) -> Result<()> {
        self.frame = self.frame.wrapping_add(1);

        // Clear status message after 3 seconds
        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= 3 {
                self.status_message = None;
                self.status_message_time = None;
            }
        }

        // Drain whatever the poll task produced since the last frame
        let mut events = Vec::new();
        if let Some(session) = self.session.as_mut() {
            while let Ok(event) = session.events.try_recv() {
                events.push(event);
            }
        }
        for event in events {
            self.handle_poll(event);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> AppConfig {
        AppConfig {
            // Unroutable on purpose: these tests never want a real backend
            backend_url: "http://192.0.2.1:1".to_string(),
            poll_interval_ms: 10,
            chime_path: None,
            notifications: false,
        }
    }

    fn granted() -> PollEvent {
        PollEvent::Status(DetectionStatus {
            access_granted: true,
            ..DetectionStatus::default()
        })
    }

    #[tokio::test]
    async fn scan_start_creates_exactly_one_session() {
        let mut app = App::new(quiet_config()).unwrap();
        assert_eq!(app.phase, Phase::Idle);

        app.enter_scanning();
        assert_eq!(app.phase, Phase::Scanning);
        assert!(app.is_scanning());

        // Starting again replaces the session rather than stacking one
        app.enter_scanning();
        assert!(app.is_scanning());
        assert!(app.session.as_ref().unwrap().poller.is_active());
    }

    #[tokio::test]
    async fn granted_status_ends_the_session() {
        let mut app = App::new(quiet_config()).unwrap();
        app.enter_scanning();

        app.handle_poll(granted());

        assert_eq!(app.phase, Phase::Granted);
        assert!(!app.is_scanning());
    }

    #[tokio::test]
    async fn negative_status_keeps_scanning() {
        let mut app = App::new(quiet_config()).unwrap();
        app.enter_scanning();

        app.handle_poll(PollEvent::Status(DetectionStatus {
            access_granted: false,
            consecutive_frames: 7,
            ..DetectionStatus::default()
        }));

        assert_eq!(app.phase, Phase::Scanning);
        assert!(app.is_scanning());
        assert_eq!(app.detection.consecutive_frames, 7);
    }

    #[tokio::test]
    async fn stale_poll_event_is_ignored_without_session() {
        let mut app = App::new(quiet_config()).unwrap();
        app.enter_scanning();
        app.handle_poll(granted());
        assert_eq!(app.phase, Phase::Granted);

        // A queued event arriving after teardown must change nothing
        app.handle_poll(granted());
        assert_eq!(app.phase, Phase::Granted);
        assert!(!app.is_scanning());
    }

    #[tokio::test]
    async fn reset_cancels_a_running_scan() {
        let mut app = App::new(quiet_config()).unwrap();
        app.enter_scanning();
        assert!(app.is_scanning());

        app.enter_idle();
        assert_eq!(app.phase, Phase::Idle);
        assert!(!app.is_scanning());
    }

    #[tokio::test]
    async fn reset_clears_detection_but_keeps_debug_flag() {
        let mut app = App::new(quiet_config()).unwrap();
        app.enter_scanning();
        app.handle_poll(PollEvent::Status(DetectionStatus {
            access_granted: true,
            consecutive_frames: 15,
            debug_mode: true,
            ..DetectionStatus::default()
        }));
        assert_eq!(app.phase, Phase::Granted);

        app.enter_idle();
        assert!(!app.detection.access_granted);
        assert_eq!(app.detection.consecutive_frames, 0);
        assert!(app.detection.debug_mode);
    }

    #[tokio::test]
    async fn unreachable_poll_surfaces_a_message_and_keeps_scanning() {
        let mut app = App::new(quiet_config()).unwrap();
        app.enter_scanning();

        app.handle_poll(PollEvent::Unreachable("connection refused".to_string()));

        assert_eq!(app.phase, Phase::Scanning);
        assert!(app.is_scanning());
        assert!(app
            .status_message
            .as_deref()
            .unwrap()
            .contains("unreachable"));
    }

    #[tokio::test]
    async fn tick_drains_poll_events() {
        let mut app = App::new(quiet_config()).unwrap();
        app.enter_scanning();

        // The poller is hitting an unroutable address; give it a moment to
        // queue at least one Unreachable event, then drain it via tick
        tokio::time::sleep(Duration::from_millis(100)).await;
        app.tick().await.unwrap();

        assert_eq!(app.phase, Phase::Scanning);
        app.enter_idle();
    }
}

use std::time::{
    Duration,
    Instant,
};

use eframe::egui;

use crate::{
    core::{
        models::{
            parse_batch,
            SessionStatus,
            SummarySession,
        },
        settings::DisplaySettings,
    },
    gui::{
        cards::EguiCardSurface,
        live_view,
        overlay::LoadingOverlay,
        summary_view,
        theme::Theme,
        top_bar::TopBar,
    },
    roster::RosterReconciler,
    summary::{
        AcqAction,
        FetchOutcome,
        SummaryAcquisition,
    },
    tasks::{
        NetEvent,
        NetWorker,
    },
};

/// Delay before switching back to the live screen once a new session is
/// detected; cancelled if the session flaps back to inactive first.
const RETURN_TO_LIVE_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Live,
    Summary,
}

pub struct DisplayApp {
    settings: DisplaySettings,
    theme: Theme,
    worker: NetWorker,
    epoch: Instant,

    // Live roster
    surface: EguiCardSurface,
    roster: RosterReconciler<EguiCardSurface>,

    // Session state
    session: Option<SessionStatus>,
    session_active: bool,
    screen: Screen,
    pending_return: Option<u64>,

    // Summary
    acquisition: SummaryAcquisition,
    summary: Option<SummarySession>,
    overlay: LoadingOverlay,

    /// Content area measured last frame; reconciliation uses it for the
    /// layout pass so resizes coalesce to one pass per frame.
    content_rect: egui::Rect,
}

impl DisplayApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: DisplaySettings) -> Self {
        let theme = Theme::night();
        theme.apply(&cc.egui_ctx);

        let worker = NetWorker::new(settings.clone());
        worker.start();

        let roster = RosterReconciler::new(settings.fade_duration_ms, settings.max_cards);

        Self {
            settings,
            theme,
            worker,
            epoch: Instant::now(),
            surface: EguiCardSurface,
            roster,
            session: None,
            session_active: false,
            screen: Screen::Live,
            pending_return: None,
            acquisition: SummaryAcquisition::new(),
            summary: None,
            overlay: LoadingOverlay::new(),
            content_rect: cc.egui_ctx.screen_rect(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn handle_event(&mut self, event: NetEvent, now_ms: u64) {
        match event {
            NetEvent::Batch(payload) => {
                let batch = parse_batch(&payload);
                let rect = self.content_rect;
                self.roster.reconcile(
                    &mut self.surface,
                    &batch,
                    self.session_active,
                    now_ms,
                    rect.width(),
                    rect.height(),
                    self.settings.card_gap_px,
                );
            }
            NetEvent::BatchError(e) => eprintln!("Live feed error: {}", e),
            NetEvent::Status(status) => self.handle_status(status, now_ms),
            NetEvent::StatusError(e) => eprintln!("Session status error: {}", e),
            NetEvent::Summary { generation, outcome } => {
                if let FetchOutcome::TransportError(e) = &outcome {
                    eprintln!("Summary fetch failed: {}", e);
                }
                self.acquisition.on_outcome(now_ms, generation, outcome);
            }
        }
    }

    fn handle_status(&mut self, status: SessionStatus, now_ms: u64) {
        let was_active = self.session_active;
        self.session_active = status.active;

        if was_active && !status.active {
            // session just ended: switch over and acquire a fresh snapshot
            self.pending_return = None;
            self.screen = Screen::Summary;
            let action = self.acquisition.begin(now_ms);
            self.apply_action(action);
        } else if !was_active
            && status.active
            && self.screen == Screen::Summary
            && self.pending_return.is_none()
        {
            self.pending_return = Some(now_ms + RETURN_TO_LIVE_MS);
        }

        self.session = Some(status);
    }

    fn apply_action(&mut self, action: AcqAction) {
        match action {
            AcqAction::Prime => self.worker.prime_summary(),
            AcqAction::Fetch { validator, generation } => {
                self.worker.fetch_summary(validator, generation)
            }
            AcqAction::Render(snapshot) => {
                println!(
                    "Rendering summary for run {} ({} devices)",
                    snapshot.run_id.as_deref().unwrap_or("<unknown>"),
                    snapshot.devices.len()
                );
                self.summary = Some(snapshot);
            }
        }
    }
}

impl eframe::App for DisplayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now_ms = self.now_ms();

        for event in self.worker.poll_events() {
            self.handle_event(event, now_ms);
        }

        if let Some(at) = self.pending_return {
            if now_ms >= at {
                self.pending_return = None;
                self.screen = Screen::Live;
            }
        }

        if let Some(action) = self.acquisition.tick(now_ms) {
            self.apply_action(action);
        }

        if self.screen == Screen::Summary && self.acquisition.placeholder_visible() {
            if !self.overlay.active {
                self.overlay.set_message("Preparing session summary...");
            }
        } else {
            self.overlay.clear();
        }

        TopBar::show(ctx, &self.theme, self.session.as_ref());

        egui::CentralPanel::default()
            .frame(egui::Frame::default().fill(self.theme.background).inner_margin(10.0))
            .show(ctx, |ui| {
                self.content_rect = ui.available_rect_before_wrap();
                match self.screen {
                    Screen::Live => {
                        live_view::show(ui, &self.theme, &self.roster, self.settings.card_gap_px);
                    }
                    Screen::Summary => {
                        if let Some(summary) = &self.summary {
                            summary_view::show(ui, &self.theme, summary, self.settings.card_gap_px);
                        }
                    }
                }
            });

        self.overlay.show(ctx, &self.theme);

        // timers (fades, retries, the clock) keep moving without input
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

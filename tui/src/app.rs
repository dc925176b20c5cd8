//! Kiosk application state and its event loop.
//!
//! `App` is owned by a single task. Every input (terminal events, feed
//! snapshots, frame ticks, readiness reports, thumbnails, the mission clock
//! and the reveal gate timer) is handled to completion before the next one,
//! and the screen is redrawn afterwards.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::DateTime;
use chrono::Utc;
use crossterm::event::Event;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use futures::Stream;
use futures::StreamExt;
use kiosk_client::LoadedImage;
use kiosk_core::FeedSnapshot;
use kiosk_core::FrameLoopKind;
use kiosk_core::FrameLoopSlot;
use kiosk_core::FrameTick;
use kiosk_core::KioskConfig;
use kiosk_core::MissionClock;
use kiosk_core::PresentationTimeline;
use kiosk_core::ReadinessCoordinator;
use kiosk_core::ReadinessReport;
use kiosk_core::ResourceLoader;
use kiosk_core::RevealClock;
use kiosk_core::TimelineFrame;
use ratatui::Terminal;
use ratatui::backend::Backend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::Widget;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;

use crate::colors;
use crate::history_grid::HistoryTile;
use crate::pixels::ScaleCache;
use crate::surface::SurfaceLayout;
use crate::surface::blit;
use crate::thumbnails::ThumbnailLoaded;
use crate::thumbnails::ThumbnailStore;
use crate::transmission::CaptionOverlay;
use crate::transmission::EnlargedView;
use crate::transmission::LoadingScreen;
use crate::transmission::MountedReveal;
use crate::transmission::TransmissionPanel;

const MISSION_TICK: Duration = Duration::from_secs(1);

/// Receiving ends of the channels the app's background work reports on.
pub(crate) struct AppChannels {
    pub frame_rx: UnboundedReceiver<FrameTick>,
    pub ready_rx: UnboundedReceiver<ReadinessReport<LoadedImage>>,
    pub thumbnail_rx: UnboundedReceiver<ThumbnailLoaded>,
}

/// Outcome of the readiness check for the featured item.
struct FeaturedImage {
    id: Arc<str>,
    image: Option<LoadedImage>,
}

pub(crate) struct App<L>
where
    L: ResourceLoader<Output = LoadedImage>,
{
    config: KioskConfig,
    snapshot: FeedSnapshot,
    timeline: PresentationTimeline,
    presentation_loop: FrameLoopSlot,
    reveal_loop: FrameLoopSlot,
    frame_tx: UnboundedSender<FrameTick>,
    readiness: ReadinessCoordinator<L>,
    featured_image: Option<FeaturedImage>,
    reveal: Option<RevealClock>,
    gate_passed: bool,
    mission: MissionClock,
    thumbnails: ThumbnailStore<L>,
    scale_cache: ScaleCache,
    viewport: Rect,
    manual_scroll: u32,
    selected: Option<usize>,
    enlarged: Option<usize>,
    wall_clock: fn() -> DateTime<Utc>,
    should_exit: bool,
}

impl<L> App<L>
where
    L: ResourceLoader<Output = LoadedImage>,
{
    pub(crate) fn new(
        config: KioskConfig,
        featured_loader: Arc<L>,
        thumbnail_loader: Arc<L>,
        cancel: CancellationToken,
    ) -> (Self, AppChannels) {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        let (thumbnail_tx, thumbnail_rx) = mpsc::unbounded_channel();

        let app = Self {
            timeline: PresentationTimeline::new(&config.timeline),
            presentation_loop: FrameLoopSlot::new(FrameLoopKind::Presentation, cancel.clone()),
            reveal_loop: FrameLoopSlot::new(FrameLoopKind::Reveal, cancel),
            frame_tx,
            readiness: ReadinessCoordinator::new(featured_loader, ready_tx),
            featured_image: None,
            reveal: None,
            gate_passed: false,
            mission: MissionClock::new(config.mission.epoch),
            thumbnails: ThumbnailStore::new(
                thumbnail_loader,
                config.surface.thumbnail_concurrency,
                thumbnail_tx,
            ),
            scale_cache: ScaleCache::default(),
            snapshot: FeedSnapshot::default(),
            viewport: Rect::default(),
            manual_scroll: 0,
            selected: None,
            enlarged: None,
            wall_clock: Utc::now,
            should_exit: false,
            config,
        };
        let channels = AppChannels {
            frame_rx,
            ready_rx,
            thumbnail_rx,
        };
        (app, channels)
    }

    pub(crate) async fn run<B, S>(
        mut self,
        terminal: &mut Terminal<B>,
        events: S,
        mut feed: watch::Receiver<FeedSnapshot>,
        mut channels: AppChannels,
        cancel: CancellationToken,
    ) -> anyhow::Result<()>
    where
        B: Backend,
        S: Stream<Item = io::Result<Event>>,
    {
        let mut events = std::pin::pin!(events);
        let size = terminal.size().context("querying terminal size")?;
        self.resize(Rect::new(0, 0, size.width, size.height));
        let initial = feed.borrow_and_update().clone();
        self.on_snapshot(initial, Instant::now());

        let mut mission_ticker = tokio::time::interval(MISSION_TICK);
        mission_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut feed_open = true;
        let mut redraw = true;

        loop {
            if redraw {
                let now = Instant::now();
                self.request_visible_thumbnails(now);
                terminal.draw(|frame| {
                    let area = frame.area();
                    self.render(area, frame.buffer_mut(), now);
                })?;
            }
            redraw = true;

            let gate = self.gate_deadline();
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.next() => match event {
                    Some(Ok(event)) => self.handle_event(event, Instant::now()),
                    Some(Err(err)) => return Err(err).context("reading terminal events"),
                    None => break,
                },
                changed = feed.changed(), if feed_open => {
                    if changed.is_ok() {
                        let snapshot = feed.borrow_and_update().clone();
                        self.on_snapshot(snapshot, Instant::now());
                    } else {
                        debug!("feed closed");
                        feed_open = false;
                    }
                }
                Some(tick) = channels.frame_rx.recv() => {
                    redraw = self.on_frame_tick(tick);
                }
                Some(report) = channels.ready_rx.recv() => {
                    self.on_readiness(report, Instant::now());
                }
                Some(loaded) = channels.thumbnail_rx.recv() => {
                    self.thumbnails.on_loaded(loaded);
                }
                _ = mission_ticker.tick() => {}
                _ = tokio::time::sleep_until(gate.unwrap_or_else(Instant::now)), if gate.is_some() => {
                    self.on_gate_open(Instant::now());
                }
            }

            if self.should_exit {
                break;
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn with_wall_clock(mut self, wall_clock: fn() -> DateTime<Utc>) -> Self {
        self.wall_clock = wall_clock;
        self
    }

    fn layout(&self) -> SurfaceLayout {
        SurfaceLayout::new(
            self.viewport,
            self.config.surface.history_columns,
            self.snapshot.history().len(),
        )
    }

    pub(crate) fn resize(&mut self, viewport: Rect) {
        self.viewport = viewport;
        self.manual_scroll = self.manual_scroll.min(self.layout().max_scroll());
    }

    /// Adopts a new feed snapshot. A new featured identity re-arms the
    /// timeline and discards everything derived from the previous one.
    pub(crate) fn on_snapshot(&mut self, snapshot: FeedSnapshot, now: Instant) {
        self.snapshot = snapshot;
        let extent = self.layout().max_scroll();
        let Some(featured) = self.snapshot.featured().cloned() else {
            return;
        };
        if !self.timeline.arm(Some(&featured), f64::from(extent), now) {
            return;
        }
        info!(id = featured.id(), extent, "presenting new transmission");

        self.presentation_loop.start(
            self.config.surface.presentation_frame_interval(),
            Some(self.timeline.duration()),
            self.frame_tx.clone(),
        );
        self.reveal_loop.stop();
        self.reveal = None;
        self.featured_image = None;
        self.gate_passed = false;
        self.readiness.request(featured.id());
        self.manual_scroll = 0;
        self.selected = None;
        self.enlarged = None;
    }

    /// When the reveal gate timer should fire, if it has not yet.
    pub(crate) fn gate_deadline(&self) -> Option<Instant> {
        if self.gate_passed {
            return None;
        }
        self.timeline.gate_deadline()
    }

    pub(crate) fn on_gate_open(&mut self, now: Instant) {
        self.gate_passed = true;
        self.try_mount_reveal(now);
    }

    pub(crate) fn on_readiness(&mut self, report: ReadinessReport<LoadedImage>, now: Instant) {
        let Some(report) = self.readiness.accept(report) else {
            return;
        };
        self.featured_image = Some(FeaturedImage {
            id: report.id,
            image: report.resource,
        });
        self.try_mount_reveal(now);
    }

    /// Mounts the reveal once the gate is open and the image is ready.
    fn try_mount_reveal(&mut self, now: Instant) {
        if self.reveal.is_some() || !self.timeline.frame(now).reveal_open {
            return;
        }
        let Some(featured) = self.snapshot.featured() else {
            return;
        };
        let ready = self
            .featured_image
            .as_ref()
            .is_some_and(|image| *image.id == *featured.id());
        if !ready {
            return;
        }

        let wall = (self.wall_clock)();
        let clock = RevealClock::new(featured, wall, &self.config.reveal);
        let state = clock.state(wall);
        debug!(
            id = featured.id(),
            visible_cells = state.visible_cells,
            "mounting reveal"
        );
        if !state.is_complete() {
            self.reveal_loop.start(
                self.config.surface.reveal_frame_interval(),
                None,
                self.frame_tx.clone(),
            );
        }
        self.reveal = Some(clock);
    }

    /// Returns `false` for ticks of superseded loops.
    pub(crate) fn on_frame_tick(&mut self, tick: FrameTick) -> bool {
        if self.presentation_loop.accepts(tick) {
            if tick.last {
                self.presentation_loop.stop();
            }
            return true;
        }
        if self.reveal_loop.accepts(tick) {
            let wall = (self.wall_clock)();
            if self
                .reveal
                .as_ref()
                .is_some_and(|clock| clock.state(wall).is_complete())
            {
                self.reveal_loop.stop();
            }
            return true;
        }
        false
    }

    pub(crate) fn handle_event(&mut self, event: Event, now: Instant) {
        match event {
            Event::Key(key) => self.handle_key(key, now),
            Event::Resize(width, height) => self.resize(Rect::new(0, 0, width, height)),
            _ => {}
        }
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        let quit = matches!(key.code, KeyCode::Char('q'))
            || (key.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(key.code, KeyCode::Char('c')));
        if quit {
            self.should_exit = true;
            return;
        }

        if self.enlarged.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace) {
                self.enlarged = None;
            }
            return;
        }

        if !self.timeline.frame(now).history_visible {
            return;
        }
        let layout = self.layout();
        let len = self.snapshot.history().len();
        let columns = usize::from(layout.columns);
        let page = u32::from(self.viewport.height.max(1));

        match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down if len > 0 => {
                let index = match (self.selected, key.code) {
                    (None, _) => 0,
                    (Some(i), KeyCode::Left) => i.saturating_sub(1),
                    (Some(i), KeyCode::Right) => (i + 1).min(len - 1),
                    (Some(i), KeyCode::Up) => i.checked_sub(columns).unwrap_or(i),
                    (Some(i), KeyCode::Down) if i + columns < len => i + columns,
                    (Some(i), _) => i,
                };
                self.selected = Some(index);
                self.manual_scroll = layout.scroll_to_tile(index, self.manual_scroll);
            }
            KeyCode::Enter => {
                if let Some(index) = self.selected {
                    self.enlarged = Some(index);
                }
            }
            KeyCode::Esc => self.selected = None,
            KeyCode::PageDown => {
                self.manual_scroll = self
                    .manual_scroll
                    .saturating_add(page)
                    .min(layout.max_scroll());
            }
            KeyCode::PageUp => self.manual_scroll = self.manual_scroll.saturating_sub(page),
            KeyCode::Home => self.manual_scroll = 0,
            KeyCode::End => self.manual_scroll = layout.max_scroll(),
            _ => {}
        }
    }

    fn scroll_offset(&self, frame: &TimelineFrame, layout: &SurfaceLayout) -> u32 {
        let rows = if frame.animating {
            frame.scroll_rows()
        } else {
            self.manual_scroll
        };
        rows.min(layout.max_scroll())
    }

    /// Starts loading thumbnails for tiles on screen and for the enlarged view.
    pub(crate) fn request_visible_thumbnails(&mut self, now: Instant) {
        let frame = self.timeline.frame(now);
        if !frame.history_visible {
            return;
        }
        let layout = self.layout();
        let scroll = self.scroll_offset(&frame, &layout);
        let history = self.snapshot.history();
        let wanted = layout.visible_tiles(scroll).chain(self.enlarged);
        for index in wanted {
            if let Some(record) = history.get(index) {
                self.thumbnails.ensure(&record.shared_id());
            }
        }
    }

    pub(crate) fn render(&self, area: Rect, buf: &mut Buffer, now: Instant) {
        let Some(featured) = self.snapshot.featured() else {
            LoadingScreen.render(area, buf);
            return;
        };
        buf.set_style(area, Style::default().bg(colors::background()));

        let frame = self.timeline.frame(now);
        let history = self.snapshot.history();
        let layout = SurfaceLayout::new(area, self.config.surface.history_columns, history.len());
        let scroll = self.scroll_offset(&frame, &layout);

        if let Some(placement) = layout.place(0, area.height, scroll) {
            let wall = (self.wall_clock)();
            let mounted = self
                .reveal
                .as_ref()
                .filter(|clock| clock.id() == featured.id())
                .map(|clock| MountedReveal {
                    image: self
                        .featured_image
                        .as_ref()
                        .and_then(|image| image.image.as_ref()),
                    grid: clock.grid(),
                    state: clock.state(wall),
                });
            let mut scratch = Buffer::empty(Rect::new(0, 0, area.width, area.height));
            TransmissionPanel {
                record: featured,
                mounted,
                mission: self.mission.readout(wall),
                cache: &self.scale_cache,
            }
            .render(scratch.area, &mut scratch);
            blit(&scratch, placement, area.x, buf);
        }

        if frame.history_visible {
            for index in layout.visible_tiles(scroll) {
                let Some(record) = history.get(index) else {
                    continue;
                };
                let (x, y) = layout.tile_origin(index);
                let Some(placement) = layout.place(y, layout.tile_height, scroll) else {
                    continue;
                };
                let mut scratch =
                    Buffer::empty(Rect::new(0, 0, layout.tile_width, layout.tile_height));
                HistoryTile {
                    record,
                    thumbnail: self.thumbnails.get(record.id()),
                    selected: self.selected == Some(index),
                    cache: &self.scale_cache,
                }
                .render(scratch.area, &mut scratch);
                blit(&scratch, placement, x, buf);
            }
        }

        if let Some(text) = frame.caption.as_deref() {
            CaptionOverlay { text }.render(area, buf);
        }

        if let Some(record) = self.enlarged.and_then(|index| history.get(index)) {
            EnlargedView {
                record,
                thumbnail: self.thumbnails.get(record.id()),
                cache: &self.scale_cache,
            }
            .render(area, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::Rgba;
    use image::RgbaImage;
    use kiosk_core::FeedReconciler;
    use kiosk_core::LoadError;
    use kiosk_core::ReadinessStatus;
    use pretty_assertions::assert_eq;
    use ratatui::backend::TestBackend;

    const A: &str = "https://s/a_20250911_200000_.png";
    const B: &str = "https://s/b_20250911_203000_.png";
    const C: &str = "https://s/c_20250911_210000_.png";
    const D: &str = "https://s/d_20250911_213000_.png";

    struct SolidLoader;

    #[async_trait]
    impl ResourceLoader for SolidLoader {
        type Output = LoadedImage;

        async fn load(&self, id: &str) -> Result<LoadedImage, LoadError> {
            if id.contains("broken") {
                return Err(LoadError::Decode("truncated".to_string()));
            }
            Ok(LoadedImage::new(RgbaImage::from_pixel(
                8,
                8,
                Rgba([200, 30, 30, 255]),
            )))
        }
    }

    /// 30 minutes after the capture of `C`.
    fn wall() -> DateTime<Utc> {
        DateTime::from_timestamp(1_757_626_200, 0).unwrap_or_default()
    }

    fn app() -> (App<SolidLoader>, AppChannels) {
        let (app, channels) = App::new(
            KioskConfig::default(),
            Arc::new(SolidLoader),
            Arc::new(SolidLoader),
            CancellationToken::new(),
        );
        let mut app = app.with_wall_clock(wall);
        app.resize(Rect::new(0, 0, 80, 24));
        (app, channels)
    }

    fn snapshot(reconciler: &mut FeedReconciler, files: &[&str]) -> FeedSnapshot {
        reconciler.apply_listing(files.iter().copied());
        reconciler.snapshot().clone()
    }

    fn screen(app: &App<SolidLoader>) -> String {
        let mut terminal = match Terminal::new(TestBackend::new(80, 24)) {
            Ok(terminal) => terminal,
            Err(err) => panic!("test terminal: {err}"),
        };
        let drawn = terminal.draw(|frame| {
            let area = frame.area();
            app.render(area, frame.buffer_mut(), Instant::now());
        });
        assert!(drawn.is_ok());
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                if let Some(cell) = buffer.cell((x, y)) {
                    text.push_str(cell.symbol());
                }
            }
            text.push('\n');
        }
        text
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn deliver_readiness(app: &mut App<SolidLoader>, channels: &mut AppChannels) {
        let Some(report) = channels.ready_rx.recv().await else {
            panic!("readiness report expected");
        };
        app.on_readiness(report, Instant::now());
    }

    #[tokio::test(start_paused = true)]
    async fn loading_screen_until_first_listing() {
        let (app, _channels) = app();
        assert!(screen(&app).contains("Loading..."));
    }

    #[tokio::test(start_paused = true)]
    async fn arrival_sequence_gates_history_and_reveal() {
        let (mut app, mut channels) = app();
        let mut reconciler = FeedReconciler::new();
        let files: Vec<&str> = vec![A, B, C, "https://s/e_20250911_190000_.png"];
        app.on_snapshot(snapshot(&mut reconciler, &files), Instant::now());
        assert_eq!(app.timeline.armed_for(), Some(C));

        tokio::time::advance(Duration::from_millis(1_500)).await;
        let text = screen(&app);
        assert!(text.contains("Establishing link..."));
        assert!(!text.contains("2025-09-11"));

        deliver_readiness(&mut app, &mut channels).await;
        assert_eq!(
            app.readiness.status(),
            ReadinessStatus::Ready { degraded: false }
        );
        assert!(app.reveal.is_none());

        tokio::time::advance(Duration::from_millis(8_500)).await;
        app.on_frame_tick(FrameTick {
            kind: FrameLoopKind::Presentation,
            generation: app.presentation_loop.generation(),
            last: true,
        });
        app.handle_key(key(KeyCode::End), Instant::now());
        let text = screen(&app);
        assert!(!text.contains("Establishing link..."));
        assert!(text.contains("2025-09-11 20:30:00"));
        assert!(app.reveal.is_none());

        tokio::time::advance(Duration::from_millis(3_000)).await;
        assert!(app.gate_deadline().is_some_and(|gate| gate <= Instant::now()));
        app.on_gate_open(Instant::now());
        assert_eq!(app.gate_deadline(), None);
        let state = app.reveal.as_ref().map(|clock| clock.state(wall()));
        assert_eq!(state.map(|s| s.visible_cells), Some(1800));

        app.handle_key(key(KeyCode::Home), Instant::now());
        let text = screen(&app);
        assert!(text.contains("Mission Elapsed Time"));
        assert!(text.contains("00:00:30:00"));
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_after_gate_mounts_immediately() {
        let (mut app, mut channels) = app();
        let mut reconciler = FeedReconciler::new();
        app.on_snapshot(snapshot(&mut reconciler, &[A, C]), Instant::now());

        tokio::time::advance(Duration::from_millis(13_000)).await;
        app.on_gate_open(Instant::now());
        // Reports already queued are delivered after the gate here.
        deliver_readiness(&mut app, &mut channels).await;
        assert!(app.reveal.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn new_featured_item_rearms_and_drops_reveal() {
        let (mut app, mut channels) = app();
        let mut reconciler = FeedReconciler::new();
        app.on_snapshot(snapshot(&mut reconciler, &[A, B, C]), Instant::now());
        deliver_readiness(&mut app, &mut channels).await;
        tokio::time::advance(Duration::from_millis(13_000)).await;
        app.on_gate_open(Instant::now());
        assert!(app.reveal.is_some());
        let old_generation = app.presentation_loop.generation();

        app.on_snapshot(snapshot(&mut reconciler, &[A, B, C, D]), Instant::now());
        assert_eq!(app.timeline.armed_for(), Some(D));
        assert!(app.reveal.is_none());
        assert_eq!(app.timeline.elapsed(Instant::now()), Some(Duration::ZERO));
        assert_eq!(app.snapshot.history().ids(), vec![C, B, A]);
        assert!(!app.on_frame_tick(FrameTick {
            kind: FrameLoopKind::Presentation,
            generation: old_generation,
            last: false,
        }));

        // The same listing again changes nothing.
        let generation = app.presentation_loop.generation();
        app.on_snapshot(snapshot(&mut reconciler, &[A, B, C, D]), Instant::now());
        assert_eq!(app.presentation_loop.generation(), generation);
    }

    #[tokio::test(start_paused = true)]
    async fn broken_featured_image_still_mounts() {
        let (mut app, mut channels) = app();
        let mut reconciler = FeedReconciler::new();
        app.on_snapshot(
            snapshot(&mut reconciler, &["https://s/broken_20250911_210000_.png"]),
            Instant::now(),
        );
        deliver_readiness(&mut app, &mut channels).await;
        assert_eq!(
            app.readiness.status(),
            ReadinessStatus::Ready { degraded: true }
        );
        tokio::time::advance(Duration::from_millis(13_000)).await;
        app.on_gate_open(Instant::now());
        assert!(app.reveal.is_some());
        assert!(screen(&app).contains("Mission Elapsed Time"));
    }

    #[tokio::test(start_paused = true)]
    async fn keys_select_and_enlarge_once_history_is_visible() {
        let (mut app, _channels) = app();
        let mut reconciler = FeedReconciler::new();
        app.on_snapshot(snapshot(&mut reconciler, &[A, B, C]), Instant::now());

        app.handle_key(key(KeyCode::Right), Instant::now());
        assert_eq!(app.selected, None);

        tokio::time::advance(Duration::from_millis(10_000)).await;
        app.handle_key(key(KeyCode::Right), Instant::now());
        assert_eq!(app.selected, Some(0));
        app.handle_key(key(KeyCode::Right), Instant::now());
        app.handle_key(key(KeyCode::Right), Instant::now());
        assert_eq!(app.selected, Some(1));
        assert!(app.manual_scroll > 0);

        app.handle_key(key(KeyCode::Enter), Instant::now());
        assert_eq!(app.enlarged, Some(1));
        app.request_visible_thumbnails(Instant::now());
        assert!(screen(&app).contains("Esc to close"));

        app.handle_key(key(KeyCode::Down), Instant::now());
        assert_eq!(app.selected, Some(1));
        app.handle_key(key(KeyCode::Esc), Instant::now());
        assert_eq!(app.enlarged, None);
        assert!(!app.should_exit);
    }

    #[tokio::test(start_paused = true)]
    async fn thumbnails_load_for_visible_tiles() {
        let (mut app, mut channels) = app();
        let mut reconciler = FeedReconciler::new();
        app.on_snapshot(snapshot(&mut reconciler, &[A, B, C]), Instant::now());
        app.request_visible_thumbnails(Instant::now());
        assert!(app.thumbnails.get(B).is_none());

        tokio::time::advance(Duration::from_millis(10_000)).await;
        app.handle_key(key(KeyCode::End), Instant::now());
        app.request_visible_thumbnails(Instant::now());
        for _ in 0..2 {
            let Some(loaded) = channels.thumbnail_rx.recv().await else {
                panic!("thumbnail expected");
            };
            app.thumbnails.on_loaded(loaded);
        }
        assert!(matches!(
            app.thumbnails.get(B),
            Some(crate::thumbnails::Thumbnail::Ready(_))
        ));
        assert!(matches!(
            app.thumbnails.get(A),
            Some(crate::thumbnails::Thumbnail::Ready(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn run_exits_on_quit_key() {
        let (app, channels) = app();
        let (_tx, feed) = watch::channel(FeedSnapshot::default());
        let mut terminal = match Terminal::new(TestBackend::new(40, 12)) {
            Ok(terminal) => terminal,
            Err(err) => panic!("test terminal: {err}"),
        };
        let quit = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        let events = futures::stream::iter(vec![Ok::<_, io::Error>(quit)]).chain(futures::stream::pending());

        let result = app
            .run(&mut terminal, events, feed, channels, CancellationToken::new())
            .await;
        assert!(result.is_ok());
        let buffer = terminal.backend().buffer();
        let row: String = (0..40)
            .filter_map(|x| buffer.cell((x, 6)).map(|cell| cell.symbol().to_string()))
            .collect();
        assert_eq!(row.trim(), "Loading...");
    }
}

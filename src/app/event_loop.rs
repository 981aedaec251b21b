use std::io::stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use ratatui::DefaultTerminal;

use crate::app::{App, Message, Mode, Model, update};
use crate::paste::PasteScope;
use crate::worker::Workers;

use super::effects::ClipboardSlot;

/// How long quitting waits for a running save to report back.
const SAVE_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

pub(super) struct ResizeDebouncer {
    delay_ms: u64,
    pending: Option<(u16, u16, u64)>,
}

impl ResizeDebouncer {
    pub(super) const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub(super) const fn queue(&mut self, width: u16, height: u16, now_ms: u64) {
        self.pending = Some((width, height, now_ms));
    }

    pub(super) fn take_ready(&mut self, now_ms: u64) -> Option<(u16, u16)> {
        let (width, height, queued_at) = self.pending?;
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.pending = None;
            Some((width, height))
        } else {
            None
        }
    }

    pub(super) const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl App {
    /// Run the main event loop.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal initialization or the event loop
    /// encounters an I/O failure. Service failures are logged, never
    /// returned.
    pub fn run(&mut self) -> Result<()> {
        let mut workers = Workers::new(Arc::clone(&self.service), self.converter.clone());

        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal: webpart requires an interactive terminal")?;
        let size = terminal.size()?;

        let mut model =
            Model::new(self.mode, (size.width, size.height)).with_preview(self.preview_visible);
        model.begin_load(self.content_id.clone());
        Self::dispatch_pending_work(&mut model, &mut workers);

        // Pastes are only intercepted while the editor is up.
        let paste_scope = if self.mode == Mode::Edit {
            match PasteScope::enable(stdout()) {
                Ok(scope) => Some(scope),
                Err(err) => {
                    tracing::warn!(%err, "bracketed paste unavailable");
                    None
                }
            }
        } else {
            None
        };

        let result = Self::event_loop(&mut terminal, &mut model, &mut workers);

        drop(paste_scope);
        ratatui::restore();

        Self::finish_saves(&mut model, &mut workers, SAVE_DRAIN_TIMEOUT);
        result
    }

    fn event_loop(
        terminal: &mut DefaultTerminal,
        model: &mut Model,
        workers: &mut Workers,
    ) -> Result<()> {
        let start = Instant::now();
        let mut resize_debouncer = ResizeDebouncer::new(100);
        let mut clipboard: ClipboardSlot = None;
        let mut needs_render = true;

        loop {
            if model.expire_toast(Instant::now()) {
                needs_render = true;
            }

            while let Some(event) = workers.try_recv() {
                Self::apply(model, workers, &mut clipboard, Message::Worker(event));
                needs_render = true;
            }

            let now_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            if let Some((width, height)) = resize_debouncer.take_ready(now_ms) {
                tracing::debug!(width, height, "applying resize");
                *model = update(std::mem::take(model), Message::Resize(width, height));
                needs_render = true;
            }

            // Handle events
            let poll_ms = if needs_render {
                0
            } else if resize_debouncer.is_pending() {
                10
            } else {
                50
            };
            if event::poll(Duration::from_millis(poll_ms))? {
                // Refresh timestamp after poll wait so the debouncer uses accurate times.
                let event_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                let msg =
                    Self::handle_event(&event::read()?, model, event_ms, &mut resize_debouncer);
                if let Some(msg) = msg {
                    Self::apply(model, workers, &mut clipboard, msg);
                    needs_render = true;
                }

                // Coalesce key repeat bursts into a single render.
                while event::poll(Duration::from_millis(0))? {
                    let drain_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    let msg =
                        Self::handle_event(&event::read()?, model, drain_ms, &mut resize_debouncer);
                    if let Some(msg) = msg {
                        Self::apply(model, workers, &mut clipboard, msg);
                        needs_render = true;
                    }
                }
            }

            if needs_render {
                terminal.draw(|frame| Self::view(model, frame))?;
                needs_render = false;
            }

            if model.should_quit {
                break;
            }
        }
        Ok(())
    }

    fn apply(model: &mut Model, workers: &mut Workers, clipboard: &mut ClipboardSlot, msg: Message) {
        tracing::trace!(?msg, "message");
        let side_msg = msg.clone();
        *model = update(std::mem::take(model), msg);
        Self::handle_message_side_effects(model, workers, clipboard, &side_msg);
    }

    /// Wait for a running save so quitting does not drop it.
    pub(super) fn finish_saves(model: &mut Model, workers: &mut Workers, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        while model.save_in_flight() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!("quit before the last save finished");
                return;
            }
            let Some(event) = workers.recv_timeout(remaining) else {
                continue;
            };
            *model = update(std::mem::take(model), Message::Worker(event));
            Self::dispatch_pending_work(model, workers);
        }
    }
}

//! Fullscreen kiosk window driven by explicit event pumping.
//!
//! The slideshow loop owns the thread, so instead of handing control to
//! `EventLoop::run_app` the window drains pending events whenever the
//! presenter swaps buffers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tracing::{debug, error, info};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Fullscreen, Window, WindowAttributes, WindowId},
};

use crate::error::Error;
use crate::processing::layout::ScreenGeometry;

const OPEN_ATTEMPTS: usize = 200;
const OPEN_POLL: Duration = Duration::from_millis(10);

#[derive(Default)]
struct KioskHandler {
    window: Option<Arc<Window>>,
    create_error: Option<String>,
    close_requested: bool,
    resized: Option<PhysicalSize<u32>>,
}

impl ApplicationHandler for KioskHandler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = WindowAttributes::default()
            .with_title("slideshow")
            .with_fullscreen(Some(Fullscreen::Borderless(None)));
        match event_loop.create_window(attrs) {
            Ok(window) => {
                window.set_cursor_visible(false);
                info!("kiosk window created");
                self.window = Some(Arc::new(window));
            }
            Err(err) => {
                error!(error = %err, "failed to create kiosk window");
                self.create_error = Some(err.to_string());
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }
        match event {
            WindowEvent::CloseRequested => {
                info!("window close requested");
                self.close_requested = true;
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && matches!(
                        event.physical_key,
                        PhysicalKey::Code(KeyCode::Escape | KeyCode::KeyQ)
                    ) =>
            {
                info!(key = ?event.physical_key, "quit key pressed");
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                debug!(width = size.width, height = size.height, "window resized");
                self.resized = Some(size);
            }
            _ => {}
        }
    }
}

/// A borderless fullscreen window with a hidden cursor.
pub struct KioskWindow {
    event_loop: EventLoop<()>,
    handler: KioskHandler,
}

impl KioskWindow {
    /// Create the event loop and pump it until the window exists.
    pub fn open() -> Result<Self, Error> {
        let event_loop = EventLoop::new()
            .map_err(|err| Error::Display(anyhow!(err).context("failed to build event loop")))?;
        let mut kiosk = Self {
            event_loop,
            handler: KioskHandler::default(),
        };
        for _ in 0..OPEN_ATTEMPTS {
            if let PumpStatus::Exit(code) = kiosk
                .event_loop
                .pump_app_events(Some(OPEN_POLL), &mut kiosk.handler)
            {
                return Err(Error::Display(anyhow!(
                    "event loop exited with code {code} before the window opened"
                )));
            }
            if let Some(reason) = kiosk.handler.create_error.take() {
                return Err(Error::Display(anyhow!("failed to create window: {reason}")));
            }
            if kiosk.handler.window.is_some() {
                return Ok(kiosk);
            }
        }
        Err(Error::Display(anyhow!("window system never delivered a window")))
    }

    /// The native window, for surface creation.
    ///
    /// # Errors
    /// [`Error::Display`] if called after the window went away.
    pub fn window(&self) -> Result<Arc<Window>, Error> {
        self.handler
            .window
            .clone()
            .ok_or_else(|| Error::Display(anyhow!("kiosk window is not available")))
    }

    /// Physical screen size, measured once at startup.
    ///
    /// Prefers the monitor's mode size so the aspect matches the panel even
    /// while the compositor is still resizing the window.
    #[must_use]
    pub fn screen_geometry(&self) -> ScreenGeometry {
        let Some(window) = self.handler.window.as_ref() else {
            return ScreenGeometry::new(1, 1);
        };
        let size = window
            .current_monitor()
            .map(|monitor| monitor.size())
            .filter(|size| size.width > 0 && size.height > 0)
            .unwrap_or_else(|| window.inner_size());
        ScreenGeometry::new(size.width, size.height)
    }

    /// Drain pending window events without blocking.
    ///
    /// Returns the latest size if the window was resized since the last
    /// call.
    ///
    /// # Errors
    /// [`Error::DisplayClosed`] once the window was closed or a quit key
    /// was pressed.
    pub fn pump(&mut self) -> Result<Option<PhysicalSize<u32>>, Error> {
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.handler);
        if matches!(status, PumpStatus::Exit(_)) || self.handler.close_requested {
            return Err(Error::DisplayClosed);
        }
        Ok(self.handler.resized.take())
    }
}

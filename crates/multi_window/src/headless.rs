//! Headless Surfaces
//!
//! In-memory [`NativeSurface`] used by the host binary and by tests. It keeps
//! the chrome state a real window would have so callers can inspect what the
//! registry asked for, and it reports closes the way the macOS window
//! delegate does: twice, once for "should close" and once for "will close".

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::SurfaceError;
use crate::lifecycle::CloseNotifier;
use crate::surface::{
    BackgroundColor, Frame, NativeSurface, Size, SurfaceFactory, TitleBarStyle, WindowSpawn,
};
use crate::WindowId;

/// Virtual screen that `center` positions against
const SCREEN: Size = Size {
    width: 1920.0,
    height: 1080.0,
};

/// Observable state of a headless window
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceState {
    pub visible: bool,
    pub closed: bool,
    pub frame: Frame,
    pub title: String,
    pub resizable: bool,
    pub autosave_name: Option<String>,
    pub title_bar_style: TitleBarStyle,
    pub buttons_visible: bool,
    pub opacity: f64,
    pub background: Option<BackgroundColor>,
    pub min_size: Option<Size>,
    pub max_size: Option<Size>,
    pub entrypoint_args: Vec<String>,
}

impl SurfaceState {
    fn new(title: impl Into<String>, entrypoint_args: Vec<String>) -> Self {
        Self {
            visible: false,
            closed: false,
            frame: WindowSpawn::DEFAULT_FRAME,
            title: title.into(),
            resizable: true,
            autosave_name: None,
            title_bar_style: TitleBarStyle::Normal,
            buttons_visible: true,
            opacity: 1.0,
            background: None,
            min_size: None,
            max_size: None,
            entrypoint_args,
        }
    }
}

pub struct HeadlessSurface {
    window_id: WindowId,
    state: Arc<Mutex<SurfaceState>>,
    notifier: CloseNotifier,
}

impl HeadlessSurface {
    fn new(state: SurfaceState, notifier: CloseNotifier) -> Self {
        Self {
            window_id: notifier.window_id(),
            state: Arc::new(Mutex::new(state)),
            notifier,
        }
    }

    /// The window the process starts with: already visible, no entrypoint arguments
    pub fn main(title: impl Into<String>, notifier: CloseNotifier) -> Self {
        let mut state = SurfaceState::new(title, Vec::new());
        state.visible = true;
        Self::new(state, notifier)
    }

    pub fn state(&self) -> SurfaceState {
        self.state.lock().clone()
    }

    /// Apply `f` to the state unless the window is already closed
    fn update<F>(&self, f: F) -> Result<(), SurfaceError>
    where
        F: FnOnce(&mut SurfaceState),
    {
        let mut state = self.state.lock();
        if state.closed {
            return Err(SurfaceError::new(format!(
                "window {} is closed",
                self.window_id
            )));
        }
        f(&mut state);
        Ok(())
    }
}

impl NativeSurface for HeadlessSurface {
    fn show(&self) -> Result<(), SurfaceError> {
        self.update(|state| state.visible = true)
    }

    fn hide(&self) -> Result<(), SurfaceError> {
        self.update(|state| state.visible = false)
    }

    fn close(&self) -> Result<(), SurfaceError> {
        self.update(|state| {
            state.visible = false;
            state.closed = true;
        })?;

        // Lock released: the observer may call straight back into the registry
        self.notifier.notify();
        self.notifier.notify();
        Ok(())
    }

    fn center(&self) -> Result<(), SurfaceError> {
        self.update(|state| {
            state.frame.left = ((SCREEN.width - state.frame.width) / 2.0).max(0.0);
            state.frame.top = ((SCREEN.height - state.frame.height) / 2.0).max(0.0);
        })
    }

    fn set_frame(&self, frame: Frame) -> Result<(), SurfaceError> {
        self.update(|state| state.frame = frame)
    }

    fn set_title(&self, title: &str) -> Result<(), SurfaceError> {
        self.update(|state| state.title = title.to_string())
    }

    fn set_resizable(&self, resizable: bool) -> Result<(), SurfaceError> {
        self.update(|state| state.resizable = resizable)
    }

    fn set_frame_autosave_name(&self, name: &str) -> Result<(), SurfaceError> {
        self.update(|state| state.autosave_name = Some(name.to_string()))
    }

    fn set_title_bar_style(
        &self,
        style: TitleBarStyle,
        buttons_visible: bool,
    ) -> Result<(), SurfaceError> {
        self.update(|state| {
            state.title_bar_style = style;
            state.buttons_visible = buttons_visible;
        })
    }

    fn set_opacity(&self, opacity: f64) -> Result<(), SurfaceError> {
        self.update(|state| state.opacity = opacity)
    }

    fn set_background_color(&self, color: BackgroundColor) -> Result<(), SurfaceError> {
        self.update(|state| state.background = Some(color))
    }

    fn set_min_size(&self, size: Size) -> Result<(), SurfaceError> {
        self.update(|state| state.min_size = Some(size))
    }

    fn set_max_size(&self, size: Size) -> Result<(), SurfaceError> {
        self.update(|state| state.max_size = Some(size))
    }
}

/// Builds [`HeadlessSurface`]s and tracks each one's state.
///
/// Tracking is weak: once the registry releases a window its state goes with
/// it. [`HeadlessSurfaceFactory::retaining`] keeps every state alive instead,
/// so closed windows stay inspectable.
#[derive(Default)]
pub struct HeadlessSurfaceFactory {
    tracked: DashMap<WindowId, Weak<Mutex<SurfaceState>>>,
    retained: Option<DashMap<WindowId, Arc<Mutex<SurfaceState>>>>,
    fail_next: Mutex<Option<String>>,
}

impl HeadlessSurfaceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory that keeps the state of every window it built, released or not
    pub fn retaining() -> Self {
        Self {
            retained: Some(DashMap::new()),
            ..Self::default()
        }
    }

    /// Current state of a window built by this factory. Released windows are
    /// only visible on a retaining factory.
    pub fn inspect(&self, window_id: WindowId) -> Option<SurfaceState> {
        let live = self
            .tracked
            .get(&window_id)
            .and_then(|state| state.upgrade());
        let state = live.or_else(|| {
            self.retained
                .as_ref()
                .and_then(|retained| retained.get(&window_id).map(|state| state.clone()))
        })?;
        let snapshot = state.lock().clone();
        Some(snapshot)
    }

    /// Make the next `create` fail with `message`
    pub fn fail_next_create(&self, message: impl Into<String>) {
        *self.fail_next.lock() = Some(message.into());
    }

    /// Number of windows whose surface is still alive
    pub fn live_count(&self) -> usize {
        self.prune();
        self.tracked.len()
    }

    fn prune(&self) {
        self.tracked.retain(|_, state| state.strong_count() > 0);
    }
}

impl SurfaceFactory for HeadlessSurfaceFactory {
    fn create(
        &self,
        spawn: &WindowSpawn,
        notifier: CloseNotifier,
    ) -> Result<Box<dyn NativeSurface>, SurfaceError> {
        if let Some(message) = self.fail_next.lock().take() {
            return Err(SurfaceError::new(message));
        }

        self.prune();

        let surface = HeadlessSurface::new(SurfaceState::new("", spawn.entrypoint_args()), notifier);
        self.tracked.insert(spawn.id, Arc::downgrade(&surface.state));
        if let Some(retained) = &self.retained {
            retained.insert(spawn.id, surface.state.clone());
        }

        debug!(window_id = spawn.id, "Headless surface created");
        Ok(Box::new(surface))
    }
}

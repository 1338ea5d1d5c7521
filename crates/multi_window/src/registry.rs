//! Window Registry
//!
//! Process-wide table of live windows. It is the only place window ids are
//! issued, looked up or removed, and it owns every [`WindowEntity`].
//!
//! # Lifecycle
//!
//! ```text
//! attach_main ──► [0] ─────────────────────────────── close ──► main_closed signal
//! create ───────► [n] ── close / on_close(n) ──► evict(n) ──► channel teardown, surface released
//! ```
//!
//! Chrome commands addressed to a window that is gone are not fatal: they
//! log a warning and return `CommandError::WindowNotFound`, because the
//! window may have closed while the command was in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::channel::{Channel, MethodHandler};
use crate::error::{CommandError, RegistryError, SurfaceError};
use crate::id::IdAllocator;
use crate::lifecycle::{CloseNotifier, LifecycleObserver};
use crate::router::MethodRouter;
use crate::surface::{
    BackgroundColor, Frame, NativeSurface, Size, SurfaceFactory, TitleBarStyle, WindowSpawn,
};
use crate::{WindowId, MAIN_WINDOW_ID};

/// Builds the application-level method handler for a window
pub type HandlerFactory = Arc<dyn Fn(WindowId) -> Arc<dyn MethodHandler> + Send + Sync>;

/// Called for every new secondary window before it becomes visible to lookups
pub type WindowCreatedHook = Arc<dyn Fn(WindowId, &Arc<Channel>) + Send + Sync>;

/// A live window: its identity, its native surface and its channel
pub struct WindowEntity {
    id: WindowId,
    surface: Box<dyn NativeSurface>,
    channel: Arc<Channel>,
}

impl WindowEntity {
    fn new(id: WindowId, surface: Box<dyn NativeSurface>, channel: Arc<Channel>) -> Self {
        Self {
            id,
            surface,
            channel,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn surface(&self) -> &dyn NativeSurface {
        self.surface.as_ref()
    }

    pub fn channel(&self) -> &Arc<Channel> {
        &self.channel
    }
}

impl Drop for WindowEntity {
    fn drop(&mut self) {
        debug!(window_id = self.id, "Releasing window resources");
    }
}

/// Registry construction options
#[derive(Clone, Default)]
pub struct RegistryOptions {
    /// Applied to every `Channel::invoke`; `None` waits indefinitely
    pub invoke_timeout: Option<Duration>,
    /// Upper bound on live secondary windows
    pub max_windows: Option<usize>,
    pub handler_factory: Option<HandlerFactory>,
    pub on_window_created: Option<WindowCreatedHook>,
}

impl RegistryOptions {
    pub fn with_invoke_timeout(mut self, timeout: Duration) -> Self {
        self.invoke_timeout = Some(timeout);
        self
    }

    pub fn with_max_windows(mut self, max_windows: usize) -> Self {
        self.max_windows = Some(max_windows);
        self
    }

    pub fn with_handler_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(WindowId) -> Arc<dyn MethodHandler> + Send + Sync + 'static,
    {
        self.handler_factory = Some(Arc::new(factory));
        self
    }

    pub fn with_window_created_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(WindowId, &Arc<Channel>) + Send + Sync + 'static,
    {
        self.on_window_created = Some(Arc::new(hook));
        self
    }
}

impl std::fmt::Debug for RegistryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryOptions")
            .field("invoke_timeout", &self.invoke_timeout)
            .field("max_windows", &self.max_windows)
            .field("handler_factory", &self.handler_factory.is_some())
            .field("on_window_created", &self.on_window_created.is_some())
            .finish()
    }
}

/// A secondary-window slot held while a `create` is in progress
struct SlotReservation<'a> {
    pending: &'a AtomicUsize,
}

impl Drop for SlotReservation<'_> {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct WindowRegistry {
    self_ref: Weak<WindowRegistry>,
    windows: RwLock<HashMap<WindowId, Arc<WindowEntity>>>,
    /// Creates that passed the window limit but are not inserted yet
    pending_creates: AtomicUsize,
    ids: IdAllocator,
    factory: Arc<dyn SurfaceFactory>,
    router: Arc<MethodRouter>,
    options: RegistryOptions,
    main_closed: watch::Sender<bool>,
}

impl WindowRegistry {
    /// Create an empty registry. The main window is attached separately.
    pub fn new(factory: Arc<dyn SurfaceFactory>, options: RegistryOptions) -> Arc<Self> {
        let (main_closed, _) = watch::channel(false);
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            windows: RwLock::new(HashMap::new()),
            pending_creates: AtomicUsize::new(0),
            ids: IdAllocator::new(),
            factory,
            router: Arc::new(MethodRouter::new(self_ref.clone())),
            options,
            main_closed,
        })
    }

    pub fn router(&self) -> &Arc<MethodRouter> {
        &self.router
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Close notifier bound to this registry, for surfaces built outside `create`
    pub fn close_notifier(&self, window_id: WindowId) -> CloseNotifier {
        let observer: Weak<dyn LifecycleObserver> = self.self_ref.clone();
        CloseNotifier::new(window_id, observer)
    }

    fn build_channel(&self, window_id: WindowId) -> Arc<Channel> {
        let channel = Arc::new(Channel::new(window_id, self.options.invoke_timeout));
        channel.set_dispatcher(self.router.clone());
        if let Some(factory) = &self.options.handler_factory {
            channel.set_handler(factory(window_id));
        }
        channel
    }

    /// Register the pre-existing main window under id 0. Only valid once.
    pub fn attach_main(&self, surface: Box<dyn NativeSurface>) -> Result<(), RegistryError> {
        // The handler factory may call back into the registry
        let channel = self.build_channel(MAIN_WINDOW_ID);

        let mut windows = self.windows.write();
        if windows.contains_key(&MAIN_WINDOW_ID) {
            return Err(RegistryError::MainAlreadyAttached);
        }
        windows.insert(
            MAIN_WINDOW_ID,
            Arc::new(WindowEntity::new(MAIN_WINDOW_ID, surface, channel)),
        );
        drop(windows);

        info!(window_id = MAIN_WINDOW_ID, "Main window attached");
        Ok(())
    }

    /// Create a secondary window and return its id.
    ///
    /// If the native layer fails nothing is registered; the id it would have
    /// had is not reused.
    pub fn create(&self, arguments: impl Into<String>) -> Result<WindowId, RegistryError> {
        let reservation = self.reserve_slot()?;

        let id = self.ids.next_id();
        let spawn = WindowSpawn::new(id, arguments);

        let surface = self
            .factory
            .create(&spawn, self.close_notifier(id))
            .map_err(|e| {
                error!(window_id = id, error = %e, "Failed to create native surface");
                RegistryError::Native {
                    window: id,
                    message: e.to_string(),
                }
            })?;

        let channel = self.build_channel(id);
        if let Some(hook) = &self.options.on_window_created {
            hook(id, &channel);
        }

        let mut windows = self.windows.write();
        windows.insert(id, Arc::new(WindowEntity::new(id, surface, channel)));
        drop(reservation);
        drop(windows);

        info!(window_id = id, arguments = %spawn.arguments, "Window created");
        Ok(id)
    }

    /// Claim room for one more secondary window. Checking and claiming happen
    /// under the write lock, so concurrent creates cannot overshoot the limit.
    fn reserve_slot(&self) -> Result<SlotReservation<'_>, RegistryError> {
        let windows = self.windows.write();
        if let Some(limit) = self.options.max_windows {
            let live = windows.keys().filter(|id| **id != MAIN_WINDOW_ID).count();
            if live + self.pending_creates.load(Ordering::SeqCst) >= limit {
                warn!(limit, "Refusing to create window: limit reached");
                return Err(RegistryError::WindowLimit { limit });
            }
        }

        self.pending_creates.fetch_add(1, Ordering::SeqCst);
        Ok(SlotReservation {
            pending: &self.pending_creates,
        })
    }

    /// Look up a live window. Never fails; `None` if the id is not registered.
    pub fn lookup(&self, window_id: WindowId) -> Option<Arc<WindowEntity>> {
        self.windows.read().get(&window_id).cloned()
    }

    pub fn channel(&self, window_id: WindowId) -> Option<Arc<Channel>> {
        self.lookup(window_id).map(|entity| entity.channel().clone())
    }

    pub fn contains(&self, window_id: WindowId) -> bool {
        self.windows.read().contains_key(&window_id)
    }

    /// Number of live windows, main window included
    pub fn window_count(&self) -> usize {
        self.windows.read().len()
    }

    /// Ids of every live window except the main window, in no particular order
    pub fn list_secondary_ids(&self) -> Vec<WindowId> {
        self.windows
            .read()
            .keys()
            .copied()
            .filter(|id| *id != MAIN_WINDOW_ID)
            .collect()
    }

    /// Resolve a window and run one surface operation on it, outside the lock
    fn with_surface<F>(&self, window_id: WindowId, op: &'static str, f: F) -> Result<(), CommandError>
    where
        F: FnOnce(&dyn NativeSurface) -> Result<(), SurfaceError>,
    {
        let Some(entity) = self.lookup(window_id) else {
            warn!(window_id, op, "window {} not exists.", window_id);
            return Err(CommandError::WindowNotFound(window_id));
        };

        f(entity.surface()).map_err(|e| {
            warn!(window_id, op, error = %e, "Native surface operation failed");
            CommandError::Surface {
                window: window_id,
                message: e.to_string(),
            }
        })
    }

    pub fn show(&self, window_id: WindowId) -> Result<(), CommandError> {
        self.with_surface(window_id, "show", |surface| surface.show())
    }

    pub fn hide(&self, window_id: WindowId) -> Result<(), CommandError> {
        self.with_surface(window_id, "hide", |surface| surface.hide())
    }

    /// Close a window. A secondary window is evicted once the surface accepts
    /// the close, whether or not the surface also reported it.
    pub fn close(&self, window_id: WindowId) -> Result<(), CommandError> {
        self.with_surface(window_id, "close", |surface| surface.close())?;
        if window_id != MAIN_WINDOW_ID {
            self.evict(window_id);
        }
        Ok(())
    }

    pub fn center(&self, window_id: WindowId) -> Result<(), CommandError> {
        self.with_surface(window_id, "center", |surface| surface.center())
    }

    pub fn set_frame(&self, window_id: WindowId, frame: Frame) -> Result<(), CommandError> {
        self.with_surface(window_id, "setFrame", |surface| surface.set_frame(frame))
    }

    pub fn set_title(&self, window_id: WindowId, title: &str) -> Result<(), CommandError> {
        self.with_surface(window_id, "setTitle", |surface| surface.set_title(title))
    }

    pub fn set_resizable(&self, window_id: WindowId, resizable: bool) -> Result<(), CommandError> {
        self.with_surface(window_id, "resizable", |surface| {
            surface.set_resizable(resizable)
        })
    }

    pub fn set_frame_autosave_name(&self, window_id: WindowId, name: &str) -> Result<(), CommandError> {
        self.with_surface(window_id, "setFrameAutosaveName", |surface| {
            surface.set_frame_autosave_name(name)
        })
    }

    pub fn set_title_bar_style(
        &self,
        window_id: WindowId,
        style: TitleBarStyle,
        buttons_visible: bool,
    ) -> Result<(), CommandError> {
        self.with_surface(window_id, "setTitleBarStyle", |surface| {
            surface.set_title_bar_style(style, buttons_visible)
        })
    }

    pub fn set_opacity(&self, window_id: WindowId, opacity: f64) -> Result<(), CommandError> {
        self.with_surface(window_id, "setOpacity", |surface| surface.set_opacity(opacity))
    }

    pub fn set_background_color(
        &self,
        window_id: WindowId,
        color: BackgroundColor,
    ) -> Result<(), CommandError> {
        self.with_surface(window_id, "setBackgroundColor", |surface| {
            surface.set_background_color(color)
        })
    }

    pub fn set_minimum_size(&self, window_id: WindowId, size: Size) -> Result<(), CommandError> {
        self.with_surface(window_id, "setMinimumSize", |surface| surface.set_min_size(size))
    }

    pub fn set_maximum_size(&self, window_id: WindowId, size: Size) -> Result<(), CommandError> {
        self.with_surface(window_id, "setMaximumSize", |surface| surface.set_max_size(size))
    }

    /// Ask every registered window to close. A window whose surface fails is
    /// logged and skipped, and a main window that already reported its close
    /// is left alone. Returns how many windows accepted the close.
    pub fn close_all(&self) -> usize {
        let main_closed = self.is_main_closed();
        let snapshot: Vec<Arc<WindowEntity>> = self
            .windows
            .read()
            .values()
            .filter(|entity| !(main_closed && entity.id() == MAIN_WINDOW_ID))
            .cloned()
            .collect();

        let mut closed = 0;
        for entity in snapshot {
            match entity.surface().close() {
                Ok(()) => {
                    closed += 1;
                    if entity.id() != MAIN_WINDOW_ID {
                        self.evict(entity.id());
                    }
                }
                Err(e) => {
                    error!(window_id = entity.id(), error = %e, "Failed to close window");
                }
            }
        }

        info!(closed, "Closed all windows");
        closed
    }

    /// Remove a secondary window and release its resources. Evicting an id
    /// that is not registered is a no-op. Returns whether anything was removed.
    pub fn evict(&self, window_id: WindowId) -> bool {
        if window_id == MAIN_WINDOW_ID {
            warn!("Main window is only released at process shutdown");
            return false;
        }

        let mut windows = self.windows.write();
        let Some(entity) = windows.remove(&window_id) else {
            debug!(window_id, "Window already evicted");
            return false;
        };
        // Pending calls fail before anyone can observe the entry missing
        let failed_calls = entity.channel().teardown();
        drop(windows);

        info!(window_id, failed_calls, "Window evicted");
        drop(entity);
        true
    }

    /// Receiver that flips to `true` once the main window reports it closed
    pub fn subscribe_main_closed(&self) -> watch::Receiver<bool> {
        self.main_closed.subscribe()
    }

    pub fn is_main_closed(&self) -> bool {
        *self.main_closed.borrow()
    }
}

impl LifecycleObserver for WindowRegistry {
    fn on_close(&self, window_id: WindowId) {
        if window_id == MAIN_WINDOW_ID {
            if !self.main_closed.send_replace(true) {
                info!("Main window closed, shutting down");
            }
            return;
        }
        self.evict(window_id);
    }
}

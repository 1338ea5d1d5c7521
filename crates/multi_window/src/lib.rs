//! Multi-Window Registry
//!
//! Window identities, lifecycle tracking and cross-window method routing for a
//! desktop process that hosts several top-level windows, each with its own
//! isolated UI surface.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            WindowRegistry                │
//! │  (RwLock<HashMap<WindowId, Entity>>)     │
//! ├──────────────────────────────────────────┤
//! │ - ids: IdAllocator                       │
//! │ - factory: SurfaceFactory                │
//! │ - router: MethodRouter (Weak registry)   │
//! │ - main_closed: watch channel             │
//! └──────────────────────────────────────────┘
//!          ↓             ↓             ↓
//!      Window 0      Window 1      Window 2
//!     surface +     surface +     surface +
//!      Channel       Channel       Channel
//! ```
//!
//! A call from window 1 to window 2 goes `Channel(1)::invoke` → `MethodRouter`
//! → `Channel(2)::dispatch` → window 2's `MethodHandler`, and the reply comes
//! back to window 1 through its pending-call map, matched by correlation id.
//!
//! # Usage
//!
//! ```rust,ignore
//! let factory = Arc::new(HeadlessSurfaceFactory::new());
//! let registry = WindowRegistry::new(factory, RegistryOptions::default());
//!
//! let main = HeadlessSurface::main("main", registry.close_notifier(MAIN_WINDOW_ID));
//! registry.attach_main(Box::new(main))?;
//!
//! let id = registry.create("{\"route\":\"settings\"}")?;
//! registry.set_title(id, "Settings")?;
//!
//! let channel = registry.channel(id).unwrap();
//! let reply = channel.invoke(MAIN_WINDOW_ID, "ping", Value::Null).await?;
//! ```
//!
//! # Thread Safety
//!
//! The registry map is guarded by a single `RwLock`; creation, eviction and
//! iteration are serialized by it. Native surfaces are only called on a cloned
//! `Arc<WindowEntity>` with the lock released, so a surface may report its own
//! close back into the registry while being closed.

pub mod channel;
pub mod command;
pub mod error;
pub mod headless;
pub mod id;
pub mod lifecycle;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod surface;

pub use channel::{Channel, Dispatch, MethodHandler};
pub use command::WindowCommand;
pub use error::{CallError, CommandError, RegistryError, SurfaceError};
pub use headless::{HeadlessSurface, HeadlessSurfaceFactory, SurfaceState};
pub use id::IdAllocator;
pub use lifecycle::{CloseNotifier, LifecycleObserver};
pub use protocol::{MethodCall, Reply};
pub use registry::{HandlerFactory, RegistryOptions, WindowCreatedHook, WindowEntity, WindowRegistry};
pub use router::MethodRouter;
pub use surface::{BackgroundColor, Frame, NativeSurface, Rgba, Size, SurfaceFactory, TitleBarStyle, WindowSpawn};

/// Integer window identity, unique for the lifetime of the process
pub type WindowId = i64;

/// Identity permanently reserved for the process's original window
pub const MAIN_WINDOW_ID: WindowId = 0;

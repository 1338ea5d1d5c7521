//! End-to-end scenarios against a registry backed by headless surfaces

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use multi_window::error::codes;
use multi_window::{
    BackgroundColor, CallError, CloseNotifier, CommandError, Frame, HeadlessSurface,
    HeadlessSurfaceFactory, MethodCall, MethodHandler, NativeSurface, Reply, RegistryOptions, Rgba,
    Size, SurfaceError, SurfaceFactory, TitleBarStyle, WindowCommand, WindowId, WindowRegistry,
    WindowSpawn, MAIN_WINDOW_ID,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Handler that records every call it serves and answers with its window id
struct Recording {
    window_id: WindowId,
    seen: Arc<Mutex<Vec<MethodCall>>>,
}

#[async_trait]
impl MethodHandler for Recording {
    async fn handle(&self, call: MethodCall) -> Result<Value, CallError> {
        self.seen.lock().push(call.clone());
        match call.method.as_str() {
            "whoami" => Ok(json!(self.window_id)),
            "sleep" => {
                let ms = call.arguments.as_u64().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(json!(ms))
            }
            "hang" => std::future::pending().await,
            "fail" => Err(CallError::failed("busy", "try later")),
            _ => Ok(call.arguments),
        }
    }
}

struct Fixture {
    registry: Arc<WindowRegistry>,
    factory: Arc<HeadlessSurfaceFactory>,
    seen: Arc<Mutex<Vec<MethodCall>>>,
}

fn fixture_with(options: RegistryOptions) -> Fixture {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let factory = Arc::new(HeadlessSurfaceFactory::retaining());
    let options = options.with_handler_factory({
        let seen = seen.clone();
        move |window_id| -> Arc<dyn MethodHandler> {
            Arc::new(Recording {
                window_id,
                seen: seen.clone(),
            })
        }
    });
    let registry = WindowRegistry::new(factory.clone(), options);
    let main = HeadlessSurface::main("main", registry.close_notifier(MAIN_WINDOW_ID));
    registry.attach_main(Box::new(main)).unwrap();

    Fixture {
        registry,
        factory,
        seen,
    }
}

fn fixture() -> Fixture {
    fixture_with(RegistryOptions::default())
}

fn sorted(mut ids: Vec<WindowId>) -> Vec<WindowId> {
    ids.sort_unstable();
    ids
}

#[test]
fn create_create_close_scenario() {
    let f = fixture();

    assert_eq!(f.registry.create("").unwrap(), 1);
    assert_eq!(f.registry.create("").unwrap(), 2);
    assert_eq!(sorted(f.registry.list_secondary_ids()), vec![1, 2]);

    f.registry.close(1).unwrap();
    assert_eq!(f.registry.list_secondary_ids(), vec![2]);
    assert!(f.factory.inspect(1).unwrap().closed);

    // Ids are never reused after a close
    assert_eq!(f.registry.create("").unwrap(), 3);
}

#[test]
fn ids_strictly_increase_across_failures() {
    let f = fixture();
    let mut last = MAIN_WINDOW_ID;
    for round in 0..10 {
        if round % 3 == 0 {
            f.factory.fail_next_create("display lost");
            assert!(f.registry.create("").is_err());
            continue;
        }
        let id = f.registry.create("").unwrap();
        assert!(id > last);
        last = id;
    }
}

#[test]
fn background_color_scenarios() {
    let f = fixture();
    let id = f.registry.create("").unwrap();

    let set = |a: i64, r: i64, g: i64, b: i64| {
        WindowCommand::parse(
            "setBackgroundColor",
            json!({
                "windowId": id,
                "backgroundColorA": a,
                "backgroundColorR": r,
                "backgroundColorG": g,
                "backgroundColorB": b
            }),
        )
        .unwrap()
        .execute(&f.registry)
        .unwrap();
        f.factory.inspect(id).unwrap().background
    };

    assert_eq!(set(0, 0, 0, 0), Some(BackgroundColor::Transparent));
    assert_eq!(
        set(255, 255, 0, 0),
        Some(BackgroundColor::Rgba(Rgba {
            r: 1.0,
            g: 0.0,
            b: 0.0,
            a: 1.0
        }))
    );
}

#[test]
fn chrome_commands_reach_the_surface() {
    let f = fixture();
    let id = f.registry.create("{\"route\":\"settings\"}").unwrap();

    let commands = [
        ("show", json!(id)),
        ("setTitle", json!({ "windowId": id, "title": "Settings" })),
        ("resizable", json!({ "windowId": id, "resizable": false })),
        ("setFrameAutosaveName", json!({ "windowId": id, "name": "settings" })),
        ("setOpacity", json!({ "windowId": id, "opacity": 0.25 })),
        ("setMinimumSize", json!({ "windowId": id, "width": 200, "height": 100 })),
        ("setMaximumSize", json!({ "windowId": id, "width": 800, "height": 600 })),
        (
            "setTitleBarStyle",
            json!({ "windowId": id, "titleBarStyle": "hidden", "windowButtonVisibility": false }),
        ),
        (
            "setFrame",
            json!({ "windowId": id, "left": 0, "top": 0, "width": 640, "height": 480 }),
        ),
        ("center", json!({ "windowId": id })),
    ];
    for (method, args) in commands {
        let reply = WindowCommand::parse(method, args)
            .unwrap()
            .execute(&f.registry)
            .unwrap();
        assert_eq!(reply, Value::Null, "{method}");
    }

    let state = f.factory.inspect(id).unwrap();
    assert!(state.visible);
    assert_eq!(state.title, "Settings");
    assert!(!state.resizable);
    assert_eq!(state.autosave_name.as_deref(), Some("settings"));
    assert_eq!(state.opacity, 0.25);
    assert_eq!(state.min_size.map(|s| (s.width, s.height)), Some((200.0, 100.0)));
    assert_eq!(state.max_size.map(|s| (s.width, s.height)), Some((800.0, 600.0)));
    assert!(!state.buttons_visible);
    assert_eq!(
        (state.frame.left, state.frame.top, state.frame.width),
        (640.0, 300.0, 640.0)
    );
    assert_eq!(state.entrypoint_args[2], "{\"route\":\"settings\"}");
}

#[test]
fn command_replies_encode_as_wire_shapes() {
    let f = fixture();

    let created = Reply::from(WindowCommand::parse("createWindow", json!("x")).and_then(|c| c.execute(&f.registry)));
    assert_eq!(created, Reply::success(json!(1)));

    let listed = Reply::from(
        WindowCommand::parse("getAllSubWindowIds", Value::Null).and_then(|c| c.execute(&f.registry)),
    );
    assert_eq!(listed, Reply::success(json!([1])));

    let missing = Reply::from(WindowCommand::parse("hide", json!(77)).and_then(|c| c.execute(&f.registry)));
    assert_eq!(missing.error_code(), Some(codes::WINDOW_NOT_FOUND));
}

#[test]
fn command_on_closed_window_is_localized() {
    let f = fixture();
    let a = f.registry.create("").unwrap();
    let b = f.registry.create("").unwrap();

    f.registry.close(a).unwrap();
    assert_eq!(f.registry.show(a), Err(CommandError::WindowNotFound(a)));

    // Other windows are unaffected
    f.registry.show(b).unwrap();
    assert!(f.factory.inspect(b).unwrap().visible);
}

#[tokio::test]
async fn route_to_missing_target() {
    let f = fixture();
    let id = f.registry.create("").unwrap();
    let channel = f.registry.channel(id).unwrap();

    let err = channel.invoke(99, "ping", Value::Null).await.unwrap_err();
    assert_eq!(err, CallError::TargetNotFound { target: 99 });
    assert_eq!(err.code(), "-1");

    // Caller is not affected
    assert!(f.registry.contains(id));
    assert_eq!(channel.pending_count(), 0);
    assert!(f.seen.lock().is_empty());
}

#[tokio::test]
async fn routing_delivers_exactly_once_with_fields_intact() {
    let f = fixture();
    let a = f.registry.create("").unwrap();
    let b = f.registry.create("").unwrap();

    let channel = f.registry.channel(a).unwrap();
    let reply = channel
        .invoke(b, "update", json!({ "count": 3 }))
        .await
        .unwrap();
    assert_eq!(reply, json!({ "count": 3 }));

    let seen = f.seen.lock().clone();
    assert_eq!(
        seen,
        vec![MethodCall::new(a, b, "update", json!({ "count": 3 }))]
    );
}

#[tokio::test]
async fn secondary_can_call_main() {
    let f = fixture();
    let id = f.registry.create("").unwrap();

    let reply = f
        .registry
        .channel(id)
        .unwrap()
        .invoke(MAIN_WINDOW_ID, "whoami", Value::Null)
        .await
        .unwrap();
    assert_eq!(reply, json!(0));
}

#[tokio::test]
async fn handler_errors_pass_through() {
    let f = fixture();
    let id = f.registry.create("").unwrap();

    let err = f
        .registry
        .channel(MAIN_WINDOW_ID)
        .unwrap()
        .invoke(id, "fail", Value::Null)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "busy");
    assert_eq!(Reply::from(err).error_code(), Some("busy"));
}

#[tokio::test]
async fn concurrent_replies_match_their_calls() {
    let f = fixture();
    let target = f.registry.create("").unwrap();
    let channel = f.registry.channel(MAIN_WINDOW_ID).unwrap();

    // Longer sleeps finish last, so replies arrive out of order
    let mut tasks = Vec::new();
    for ms in [40u64, 5, 25, 0, 15] {
        let channel = channel.clone();
        tasks.push(tokio::spawn(async move {
            (ms, channel.invoke(target, "sleep", json!(ms)).await)
        }));
    }

    for task in tasks {
        let (ms, reply) = task.await.unwrap();
        assert_eq!(reply.unwrap(), json!(ms));
    }
    assert_eq!(channel.pending_count(), 0);
}

#[tokio::test]
async fn eviction_fails_pending_calls() {
    let f = fixture();
    let caller = f.registry.create("").unwrap();
    let channel = f.registry.channel(caller).unwrap();

    let waiting = tokio::spawn({
        let channel = channel.clone();
        async move { channel.invoke(MAIN_WINDOW_ID, "hang", Value::Null).await }
    });
    while channel.pending_count() == 0 {
        tokio::task::yield_now().await;
    }

    f.registry.close(caller).unwrap();
    assert_eq!(
        waiting.await.unwrap(),
        Err(CallError::ChannelClosed { window: caller })
    );
    assert!(channel.is_closed());
    assert_eq!(channel.pending_count(), 0);

    // The torn-down channel refuses new calls
    assert_eq!(
        channel.invoke(MAIN_WINDOW_ID, "whoami", Value::Null).await,
        Err(CallError::ChannelClosed { window: caller })
    );
}

#[tokio::test]
async fn closing_target_mid_call_fails_the_call() {
    let f = fixture();
    let target = f.registry.create("").unwrap();
    let channel = f.registry.channel(MAIN_WINDOW_ID).unwrap();

    let waiting = tokio::spawn({
        let channel = channel.clone();
        async move { channel.invoke(target, "hang", Value::Null).await }
    });
    while f.seen.lock().is_empty() {
        tokio::task::yield_now().await;
    }

    f.registry.close(target).unwrap();
    assert_eq!(
        waiting.await.unwrap(),
        Err(CallError::ChannelClosed { window: target })
    );
}

#[tokio::test]
async fn invoke_timeout() {
    let f = fixture_with(RegistryOptions::default().with_invoke_timeout(Duration::from_millis(20)));
    let target = f.registry.create("").unwrap();
    let channel = f.registry.channel(MAIN_WINDOW_ID).unwrap();

    let err = channel.invoke(target, "hang", Value::Null).await.unwrap_err();
    assert!(matches!(err, CallError::Timeout { after_ms: 20, .. }));
    assert_eq!(err.code(), codes::TIMEOUT);
    assert_eq!(channel.pending_count(), 0);
}

#[test]
fn double_close_notification_evicts_once() {
    let f = fixture();
    let id = f.registry.create("").unwrap();
    let channel = f.registry.channel(id).unwrap();

    // The headless surface reports the close twice; only one eviction happens
    f.registry.close(id).unwrap();
    assert!(!f.registry.contains(id));
    assert!(channel.is_closed());
    assert!(!f.registry.evict(id));
}

#[test]
fn close_all_closes_everything() {
    let f = fixture();
    for _ in 0..3 {
        f.registry.create("").unwrap();
    }
    let main_closed = f.registry.subscribe_main_closed();

    assert_eq!(f.registry.close_all(), 4);
    assert!(f.registry.list_secondary_ids().is_empty());
    assert!(*main_closed.borrow());
    for id in 1..=3 {
        assert!(f.factory.inspect(id).unwrap().closed);
    }
}

/// Surface whose native close always fails; everything else goes to the
/// wrapped headless surface
struct Stuck(Box<dyn NativeSurface>);

impl NativeSurface for Stuck {
    fn show(&self) -> Result<(), SurfaceError> {
        self.0.show()
    }

    fn hide(&self) -> Result<(), SurfaceError> {
        self.0.hide()
    }

    fn close(&self) -> Result<(), SurfaceError> {
        Err(SurfaceError::new("close vetoed"))
    }

    fn center(&self) -> Result<(), SurfaceError> {
        self.0.center()
    }

    fn set_frame(&self, frame: Frame) -> Result<(), SurfaceError> {
        self.0.set_frame(frame)
    }

    fn set_title(&self, title: &str) -> Result<(), SurfaceError> {
        self.0.set_title(title)
    }

    fn set_resizable(&self, resizable: bool) -> Result<(), SurfaceError> {
        self.0.set_resizable(resizable)
    }

    fn set_frame_autosave_name(&self, name: &str) -> Result<(), SurfaceError> {
        self.0.set_frame_autosave_name(name)
    }

    fn set_title_bar_style(
        &self,
        style: TitleBarStyle,
        buttons_visible: bool,
    ) -> Result<(), SurfaceError> {
        self.0.set_title_bar_style(style, buttons_visible)
    }

    fn set_opacity(&self, opacity: f64) -> Result<(), SurfaceError> {
        self.0.set_opacity(opacity)
    }

    fn set_background_color(&self, color: BackgroundColor) -> Result<(), SurfaceError> {
        self.0.set_background_color(color)
    }

    fn set_min_size(&self, size: Size) -> Result<(), SurfaceError> {
        self.0.set_min_size(size)
    }

    fn set_max_size(&self, size: Size) -> Result<(), SurfaceError> {
        self.0.set_max_size(size)
    }
}

/// Headless factory that hands out a [`Stuck`] surface for one window id
struct JammedFactory {
    inner: HeadlessSurfaceFactory,
    jammed: WindowId,
}

impl SurfaceFactory for JammedFactory {
    fn create(
        &self,
        spawn: &WindowSpawn,
        notifier: CloseNotifier,
    ) -> Result<Box<dyn NativeSurface>, SurfaceError> {
        let surface = self.inner.create(spawn, notifier)?;
        if spawn.id == self.jammed {
            Ok(Box::new(Stuck(surface)))
        } else {
            Ok(surface)
        }
    }
}

#[test]
fn close_all_keeps_going_past_a_failing_surface() {
    let factory = Arc::new(JammedFactory {
        inner: HeadlessSurfaceFactory::retaining(),
        jammed: 2,
    });
    let registry = WindowRegistry::new(factory.clone(), RegistryOptions::default());
    let main = HeadlessSurface::main("main", registry.close_notifier(MAIN_WINDOW_ID));
    registry.attach_main(Box::new(main)).unwrap();
    for _ in 0..3 {
        registry.create("").unwrap();
    }

    // Main plus windows 1 and 3; window 2 refuses
    assert_eq!(registry.close_all(), 3);
    assert_eq!(registry.list_secondary_ids(), vec![2]);
    assert!(registry.is_main_closed());
    for id in [1, 3] {
        assert!(!registry.contains(id));
        assert!(factory.inner.inspect(id).unwrap().closed);
    }
    assert!(!factory.inner.inspect(2).unwrap().closed);
    assert!(registry.channel(2).is_some_and(|channel| !channel.is_closed()));
}

#[test]
fn closed_windows_do_not_accumulate_in_the_factory() {
    let factory = Arc::new(HeadlessSurfaceFactory::new());
    let registry = WindowRegistry::new(
        factory.clone(),
        RegistryOptions::default().with_max_windows(1),
    );
    for _ in 0..100 {
        let id = registry.create("").unwrap();
        registry.close(id).unwrap();
    }

    assert_eq!(registry.window_count(), 0);
    assert_eq!(factory.live_count(), 0);
}

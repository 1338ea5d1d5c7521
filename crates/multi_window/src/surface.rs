//! Native Surface Boundary
//!
//! The registry never draws anything itself. It talks to the platform through
//! [`NativeSurface`] (one per window) and builds new surfaces through a
//! [`SurfaceFactory`]. The value types here are what crosses that boundary.

use serde::{Deserialize, Serialize};

use crate::error::SurfaceError;
use crate::lifecycle::CloseNotifier;
use crate::WindowId;

/// Window rectangle in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleBarStyle {
    #[default]
    Normal,
    Hidden,
}

impl TitleBarStyle {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "normal" => Some(TitleBarStyle::Normal),
            "hidden" => Some(TitleBarStyle::Hidden),
            _ => None,
        }
    }
}

/// Normalized colour, every channel in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BackgroundColor {
    Transparent,
    Rgba(Rgba),
}

impl BackgroundColor {
    /// Convert 8-bit ARGB components; all four at zero means fully transparent
    pub fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        if a == 0 && r == 0 && g == 0 && b == 0 {
            return BackgroundColor::Transparent;
        }
        BackgroundColor::Rgba(Rgba {
            r: f64::from(r) / 255.0,
            g: f64::from(g) / 255.0,
            b: f64::from(b) / 255.0,
            a: f64::from(a) / 255.0,
        })
    }

    pub fn is_transparent(&self) -> bool {
        matches!(self, BackgroundColor::Transparent)
    }
}

/// Everything the native layer needs to build a secondary window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpawn {
    pub id: WindowId,
    pub arguments: String,
}

impl WindowSpawn {
    /// Content rectangle a new window starts with
    pub const DEFAULT_FRAME: Frame = Frame {
        left: 0.0,
        top: 0.0,
        width: 480.0,
        height: 270.0,
    };

    pub fn new(id: WindowId, arguments: impl Into<String>) -> Self {
        Self {
            id,
            arguments: arguments.into(),
        }
    }

    /// Entrypoint arguments handed to the window's UI runtime
    pub fn entrypoint_args(&self) -> Vec<String> {
        vec![
            "multi_window".to_string(),
            self.id.to_string(),
            self.arguments.clone(),
        ]
    }
}

/// Primitive operations on one native window.
///
/// Implementations must tolerate being called from whichever thread drives the
/// registry; they are never called with the registry lock held.
pub trait NativeSurface: Send + Sync {
    fn show(&self) -> Result<(), SurfaceError>;
    fn hide(&self) -> Result<(), SurfaceError>;

    /// Close the window. The surface reports the close through the
    /// `CloseNotifier` it was built with, possibly more than once.
    fn close(&self) -> Result<(), SurfaceError>;

    fn center(&self) -> Result<(), SurfaceError>;
    fn set_frame(&self, frame: Frame) -> Result<(), SurfaceError>;
    fn set_title(&self, title: &str) -> Result<(), SurfaceError>;
    fn set_resizable(&self, resizable: bool) -> Result<(), SurfaceError>;
    fn set_frame_autosave_name(&self, name: &str) -> Result<(), SurfaceError>;
    fn set_title_bar_style(
        &self,
        style: TitleBarStyle,
        buttons_visible: bool,
    ) -> Result<(), SurfaceError>;
    fn set_opacity(&self, opacity: f64) -> Result<(), SurfaceError>;
    fn set_background_color(&self, color: BackgroundColor) -> Result<(), SurfaceError>;
    fn set_min_size(&self, size: Size) -> Result<(), SurfaceError>;
    fn set_max_size(&self, size: Size) -> Result<(), SurfaceError>;
}

/// Builds native surfaces for newly created windows
pub trait SurfaceFactory: Send + Sync {
    fn create(
        &self,
        spawn: &WindowSpawn,
        notifier: CloseNotifier,
    ) -> Result<Box<dyn NativeSurface>, SurfaceError>;
}

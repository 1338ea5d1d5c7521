//! Window Commands
//!
//! Typed form of the chrome commands the UI sends to the registry. Arguments
//! arrive as loosely shaped JSON; [`WindowCommand::parse`] checks every field
//! up front so a bad request fails with a structured error instead of
//! reaching the native layer.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::CommandError;
use crate::registry::WindowRegistry;
use crate::surface::{BackgroundColor, Frame, Size, TitleBarStyle};
use crate::WindowId;

#[derive(Debug, Clone, PartialEq)]
pub enum WindowCommand {
    CreateWindow { arguments: String },
    Show { window_id: WindowId },
    Hide { window_id: WindowId },
    Close { window_id: WindowId },
    Center { window_id: WindowId },
    SetFrame { window_id: WindowId, frame: Frame },
    SetTitle { window_id: WindowId, title: String },
    Resizable { window_id: WindowId, resizable: bool },
    SetFrameAutosaveName { window_id: WindowId, name: String },
    GetAllSubWindowIds,
    SetTitleBarStyle {
        window_id: WindowId,
        style: TitleBarStyle,
        buttons_visible: bool,
    },
    SetOpacity { window_id: WindowId, opacity: f64 },
    SetBackgroundColor {
        window_id: WindowId,
        color: BackgroundColor,
    },
    SetMinimumSize { window_id: WindowId, size: Size },
    SetMaximumSize { window_id: WindowId, size: Size },
}

impl WindowCommand {
    /// Parse a command from its method name and raw arguments
    pub fn parse(method: &str, arguments: Value) -> Result<Self, CommandError> {
        let command = match method {
            "createWindow" => WindowCommand::CreateWindow {
                arguments: match arguments {
                    Value::Null => String::new(),
                    Value::String(payload) => payload,
                    _ => return Err(invalid(method, "arguments", "a string")),
                },
            },
            "show" => WindowCommand::Show {
                window_id: single_window_id(method, &arguments)?,
            },
            "hide" => WindowCommand::Hide {
                window_id: single_window_id(method, &arguments)?,
            },
            "close" => WindowCommand::Close {
                window_id: single_window_id(method, &arguments)?,
            },
            "center" => WindowCommand::Center {
                window_id: single_window_id(method, &arguments)?,
            },
            "getAllSubWindowIds" => WindowCommand::GetAllSubWindowIds,
            "setFrame" => {
                let fields = Fields::new(method, &arguments)?;
                let width = fields.non_negative("width")?;
                let height = fields.non_negative("height")?;
                WindowCommand::SetFrame {
                    window_id: fields.window_id()?,
                    frame: Frame::new(fields.float("left")?, fields.float("top")?, width, height),
                }
            }
            "setTitle" => {
                let fields = Fields::new(method, &arguments)?;
                WindowCommand::SetTitle {
                    window_id: fields.window_id()?,
                    title: fields.string("title")?,
                }
            }
            "resizable" => {
                let fields = Fields::new(method, &arguments)?;
                WindowCommand::Resizable {
                    window_id: fields.window_id()?,
                    resizable: fields.bool("resizable")?,
                }
            }
            "setFrameAutosaveName" => {
                let fields = Fields::new(method, &arguments)?;
                WindowCommand::SetFrameAutosaveName {
                    window_id: fields.window_id()?,
                    name: fields.string("name")?,
                }
            }
            "setTitleBarStyle" => {
                let fields = Fields::new(method, &arguments)?;
                let style_name = fields.string("titleBarStyle")?;
                let style = TitleBarStyle::parse(&style_name).ok_or_else(|| {
                    invalid(method, "titleBarStyle", "\"normal\" or \"hidden\"")
                })?;
                WindowCommand::SetTitleBarStyle {
                    window_id: fields.window_id()?,
                    style,
                    buttons_visible: fields.bool("windowButtonVisibility")?,
                }
            }
            "setOpacity" => {
                let fields = Fields::new(method, &arguments)?;
                let opacity = fields.float("opacity")?;
                if !(0.0..=1.0).contains(&opacity) {
                    return Err(CommandError::OutOfRange {
                        method: method.to_string(),
                        field: "opacity",
                        value: opacity.to_string(),
                    });
                }
                WindowCommand::SetOpacity {
                    window_id: fields.window_id()?,
                    opacity,
                }
            }
            "setBackgroundColor" => {
                let fields = Fields::new(method, &arguments)?;
                let color = BackgroundColor::from_argb(
                    fields.color_component("backgroundColorA")?,
                    fields.color_component("backgroundColorR")?,
                    fields.color_component("backgroundColorG")?,
                    fields.color_component("backgroundColorB")?,
                );
                WindowCommand::SetBackgroundColor {
                    window_id: fields.window_id()?,
                    color,
                }
            }
            "setMinimumSize" => {
                let fields = Fields::new(method, &arguments)?;
                WindowCommand::SetMinimumSize {
                    window_id: fields.window_id()?,
                    size: fields.size()?,
                }
            }
            "setMaximumSize" => {
                let fields = Fields::new(method, &arguments)?;
                WindowCommand::SetMaximumSize {
                    window_id: fields.window_id()?,
                    size: fields.size()?,
                }
            }
            other => return Err(CommandError::NotImplemented(other.to_string())),
        };

        Ok(command)
    }

    /// Wire name of the command
    pub fn method(&self) -> &'static str {
        match self {
            WindowCommand::CreateWindow { .. } => "createWindow",
            WindowCommand::Show { .. } => "show",
            WindowCommand::Hide { .. } => "hide",
            WindowCommand::Close { .. } => "close",
            WindowCommand::Center { .. } => "center",
            WindowCommand::SetFrame { .. } => "setFrame",
            WindowCommand::SetTitle { .. } => "setTitle",
            WindowCommand::Resizable { .. } => "resizable",
            WindowCommand::SetFrameAutosaveName { .. } => "setFrameAutosaveName",
            WindowCommand::GetAllSubWindowIds => "getAllSubWindowIds",
            WindowCommand::SetTitleBarStyle { .. } => "setTitleBarStyle",
            WindowCommand::SetOpacity { .. } => "setOpacity",
            WindowCommand::SetBackgroundColor { .. } => "setBackgroundColor",
            WindowCommand::SetMinimumSize { .. } => "setMinimumSize",
            WindowCommand::SetMaximumSize { .. } => "setMaximumSize",
        }
    }

    /// Run the command against a registry. Returns the reply value: the new id
    /// for `createWindow`, the id list for `getAllSubWindowIds`, null otherwise.
    pub fn execute(self, registry: &WindowRegistry) -> Result<Value, CommandError> {
        debug!(method = self.method(), "Executing window command");

        match self {
            WindowCommand::CreateWindow { arguments } => {
                let id = registry.create(arguments)?;
                return Ok(json!(id));
            }
            WindowCommand::GetAllSubWindowIds => {
                let mut ids = registry.list_secondary_ids();
                ids.sort_unstable();
                return Ok(json!(ids));
            }
            WindowCommand::Show { window_id } => registry.show(window_id)?,
            WindowCommand::Hide { window_id } => registry.hide(window_id)?,
            WindowCommand::Close { window_id } => registry.close(window_id)?,
            WindowCommand::Center { window_id } => registry.center(window_id)?,
            WindowCommand::SetFrame { window_id, frame } => registry.set_frame(window_id, frame)?,
            WindowCommand::SetTitle { window_id, title } => registry.set_title(window_id, &title)?,
            WindowCommand::Resizable {
                window_id,
                resizable,
            } => registry.set_resizable(window_id, resizable)?,
            WindowCommand::SetFrameAutosaveName { window_id, name } => {
                registry.set_frame_autosave_name(window_id, &name)?
            }
            WindowCommand::SetTitleBarStyle {
                window_id,
                style,
                buttons_visible,
            } => registry.set_title_bar_style(window_id, style, buttons_visible)?,
            WindowCommand::SetOpacity { window_id, opacity } => {
                registry.set_opacity(window_id, opacity)?
            }
            WindowCommand::SetBackgroundColor { window_id, color } => {
                registry.set_background_color(window_id, color)?
            }
            WindowCommand::SetMinimumSize { window_id, size } => {
                registry.set_minimum_size(window_id, size)?
            }
            WindowCommand::SetMaximumSize { window_id, size } => {
                registry.set_maximum_size(window_id, size)?
            }
        }

        Ok(Value::Null)
    }
}

fn invalid(method: &str, field: &'static str, expected: &'static str) -> CommandError {
    CommandError::InvalidField {
        method: method.to_string(),
        field,
        expected,
    }
}

/// `show`/`hide`/`close`/`center` take a bare id or `{ "windowId": n }`
fn single_window_id(method: &str, arguments: &Value) -> Result<WindowId, CommandError> {
    match arguments {
        Value::Number(n) => n.as_i64().ok_or_else(|| invalid(method, "windowId", "an integer")),
        Value::Object(_) => Fields::new(method, arguments)?.window_id(),
        Value::Null => Err(CommandError::MissingField {
            method: method.to_string(),
            field: "windowId",
        }),
        _ => Err(invalid(method, "windowId", "an integer")),
    }
}

/// Field accessor over an object-shaped argument map
struct Fields<'a> {
    method: &'a str,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn new(method: &'a str, arguments: &'a Value) -> Result<Self, CommandError> {
        match arguments {
            Value::Object(map) => Ok(Self { method, map }),
            _ => Err(invalid(method, "arguments", "an object")),
        }
    }

    fn get(&self, field: &'static str) -> Result<&'a Value, CommandError> {
        match self.map.get(field) {
            Some(Value::Null) | None => Err(CommandError::MissingField {
                method: self.method.to_string(),
                field,
            }),
            Some(value) => Ok(value),
        }
    }

    fn window_id(&self) -> Result<WindowId, CommandError> {
        self.get("windowId")?
            .as_i64()
            .ok_or_else(|| invalid(self.method, "windowId", "an integer"))
    }

    fn float(&self, field: &'static str) -> Result<f64, CommandError> {
        self.get(field)?
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(self.method, field, "a number"))
    }

    fn non_negative(&self, field: &'static str) -> Result<f64, CommandError> {
        let value = self.float(field)?;
        if value < 0.0 {
            return Err(CommandError::OutOfRange {
                method: self.method.to_string(),
                field,
                value: value.to_string(),
            });
        }
        Ok(value)
    }

    fn size(&self) -> Result<Size, CommandError> {
        Ok(Size::new(
            self.non_negative("width")?,
            self.non_negative("height")?,
        ))
    }

    fn string(&self, field: &'static str) -> Result<String, CommandError> {
        self.get(field)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| invalid(self.method, field, "a string"))
    }

    fn bool(&self, field: &'static str) -> Result<bool, CommandError> {
        self.get(field)?
            .as_bool()
            .ok_or_else(|| invalid(self.method, field, "a boolean"))
    }

    fn color_component(&self, field: &'static str) -> Result<u8, CommandError> {
        let raw = self
            .get(field)?
            .as_i64()
            .ok_or_else(|| invalid(self.method, field, "an integer"))?;
        u8::try_from(raw).map_err(|_| CommandError::OutOfRange {
            method: self.method.to_string(),
            field,
            value: raw.to_string(),
        })
    }
}

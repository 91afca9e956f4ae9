//! # Mailcanvas Protocol
//!
//! Typed messages exchanged between the sandboxed rendering surface and the
//! controller that owns the canonical document.
//!
//! Every message is JSON of the form `{"type": "<kebab-case>", ...fields}` with
//! camelCase field names:
//!
//! ```json
//! {"type": "drop", "selector": ".mc-el-3f2a-4", "position": "after", "snippet": "<p>Hi</p>"}
//! {"type": "structural-action", "selector": "body > table", "action": "move-up"}
//! ```
//!
//! Messages are stateless and self-contained: each one carries the selector
//! it refers to, computed against the document the surface was showing.

use std::collections::BTreeMap;

use mailcanvas_css::DeclarationList;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Where dropped content lands relative to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    Before,
    After,
    Inside,
}

/// Pointer geometry reported with a drop, relative to the target element box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropProbe {
    pub offset_y: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructuralAction {
    Delete,
    MoveUp,
    MoveDown,
    Duplicate,
}

/// Surface → controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SurfaceMessage {
    /// Content dropped onto the canvas. Without `position` or `probe` the
    /// target's tag decides the position.
    #[serde(rename_all = "camelCase")]
    Drop {
        #[serde(default)]
        selector: Option<String>,
        #[serde(default)]
        position: Option<DropPosition>,
        #[serde(default)]
        probe: Option<DropProbe>,
        snippet: String,
    },

    #[serde(rename_all = "camelCase")]
    ElementSelected {
        selector: String,
        tag_name: String,
        #[serde(default)]
        bounding_rect: Option<BoundingRect>,
    },

    ElementDeselected,

    #[serde(rename_all = "camelCase")]
    TextUpdated {
        selector: String,
        new_content: String,
    },

    #[serde(rename_all = "camelCase")]
    StructuralAction {
        selector: String,
        action: StructuralAction,
    },

    #[serde(rename_all = "camelCase")]
    StyleEditRequest {
        selector: String,
        tag_name: String,
        #[serde(default)]
        current_declarations: DeclarationList,
        #[serde(default)]
        table_attrs: BTreeMap<String, String>,
    },

    #[serde(rename_all = "camelCase")]
    LinkEditRequest {
        selector: String,
        #[serde(default)]
        current_href: Option<String>,
    },

    ImageUrlRequest {
        selector: String,
    },

    ImageUploadRequest {
        selector: String,
    },
}

impl SurfaceMessage {
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire name of the message, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            SurfaceMessage::Drop { .. } => "drop",
            SurfaceMessage::ElementSelected { .. } => "element-selected",
            SurfaceMessage::ElementDeselected => "element-deselected",
            SurfaceMessage::TextUpdated { .. } => "text-updated",
            SurfaceMessage::StructuralAction { .. } => "structural-action",
            SurfaceMessage::StyleEditRequest { .. } => "style-edit-request",
            SurfaceMessage::LinkEditRequest { .. } => "link-edit-request",
            SurfaceMessage::ImageUrlRequest { .. } => "image-url-request",
            SurfaceMessage::ImageUploadRequest { .. } => "image-upload-request",
        }
    }

    /// The selector the message targets, if any
    pub fn selector(&self) -> Option<&str> {
        match self {
            SurfaceMessage::Drop { selector, .. } => selector.as_deref(),
            SurfaceMessage::ElementDeselected => None,
            SurfaceMessage::ElementSelected { selector, .. }
            | SurfaceMessage::TextUpdated { selector, .. }
            | SurfaceMessage::StructuralAction { selector, .. }
            | SurfaceMessage::StyleEditRequest { selector, .. }
            | SurfaceMessage::LinkEditRequest { selector, .. }
            | SurfaceMessage::ImageUrlRequest { selector }
            | SurfaceMessage::ImageUploadRequest { selector } => Some(selector),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Controller → surface (and any other listener)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControllerEvent {
    /// The canonical document changed; the surface re-renders and reattaches
    /// its handlers.
    Render { document: String, version: u64 },

    #[serde(rename_all = "camelCase")]
    SelectionChanged {
        selector: Option<String>,
        tag_name: Option<String>,
        bounding_rect: Option<BoundingRect>,
    },

    /// Declarations come expanded (one entry per box side)
    #[serde(rename_all = "camelCase")]
    OpenStyleEditor {
        selector: String,
        tag_name: String,
        declarations: DeclarationList,
        table_attrs: BTreeMap<String, String>,
    },

    OpenLinkEditor {
        selector: String,
        href: Option<String>,
    },

    RequestImageUrl {
        selector: String,
    },

    RequestImageUpload {
        selector: String,
    },

    Notice {
        level: NoticeLevel,
        message: String,
    },
}

impl ControllerEvent {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ControllerEvent::Render { .. } => "render",
            ControllerEvent::SelectionChanged { .. } => "selection-changed",
            ControllerEvent::OpenStyleEditor { .. } => "open-style-editor",
            ControllerEvent::OpenLinkEditor { .. } => "open-link-editor",
            ControllerEvent::RequestImageUrl { .. } => "request-image-url",
            ControllerEvent::RequestImageUpload { .. } => "request-image-upload",
            ControllerEvent::Notice { .. } => "notice",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ControllerEvent::Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        ControllerEvent::Notice {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_message_wire_format() {
        let json = r#"{"type":"drop","selector":".mc-el-a-1","position":"after","snippet":"<p>Hi</p>"}"#;
        let message = SurfaceMessage::from_json(json).unwrap();
        assert_eq!(
            message,
            SurfaceMessage::Drop {
                selector: Some(".mc-el-a-1".to_string()),
                position: Some(DropPosition::After),
                probe: None,
                snippet: "<p>Hi</p>".to_string(),
            }
        );
        assert_eq!(message.kind(), "drop");
    }

    #[test]
    fn test_drop_with_probe_and_no_selector() {
        let json = r#"{"type":"drop","probe":{"offsetY":10,"height":100},"snippet":"<hr>"}"#;
        match SurfaceMessage::from_json(json).unwrap() {
            SurfaceMessage::Drop {
                selector,
                position,
                probe,
                ..
            } => {
                assert_eq!(selector, None);
                assert_eq!(position, None);
                assert_eq!(
                    probe,
                    Some(DropProbe {
                        offset_y: 10.0,
                        height: 100.0
                    })
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_camel_case_fields() {
        let json = r##"{"type":"text-updated","selector":"#hero","newContent":"Hello <b>there</b>"}"##;
        let message = SurfaceMessage::from_json(json).unwrap();
        assert_eq!(message.selector(), Some("#hero"));

        let json = r#"{"type":"structural-action","selector":"body > p","action":"move-down"}"#;
        assert!(matches!(
            SurfaceMessage::from_json(json).unwrap(),
            SurfaceMessage::StructuralAction {
                action: StructuralAction::MoveDown,
                ..
            }
        ));
    }

    #[test]
    fn test_unit_variant() {
        let message = SurfaceMessage::from_json(r#"{"type":"element-deselected"}"#).unwrap();
        assert_eq!(message, SurfaceMessage::ElementDeselected);
        assert_eq!(message.selector(), None);
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        let err = SurfaceMessage::from_json(r#"{"type":"explode"}"#).unwrap_err();
        assert!(err.to_string().starts_with("Malformed message"));
    }

    #[test]
    fn test_controller_event_wire_format() {
        let event = ControllerEvent::OpenStyleEditor {
            selector: ".mc-el-a-1".to_string(),
            tag_name: "td".to_string(),
            declarations: DeclarationList::parse("padding-top: 4px"),
            table_attrs: BTreeMap::from([("width".to_string(), "600".to_string())]),
        };
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "open-style-editor");
        assert_eq!(value["tagName"], "td");
        assert_eq!(value["declarations"][0]["property"], "padding-top");
        assert_eq!(value["tableAttrs"]["width"], "600");
    }
}

//! # Edit Session Management
//!
//! The controller-side state container for one editor.
//!
//! An EditSession owns the canonical document string and everything derived
//! from the user's gestures: the current selection, the generated-identity
//! counter and the undo history. Surface messages are handled one at a time,
//! each against the then-current committed document:
//!
//! ```text
//! SurfaceMessage → Mutation → parse → apply → post-effects → serialize → commit
//!                                         ↘ rejected: nothing committed
//! ```

use std::collections::BTreeMap;

use mailcanvas_css::expand_box_shorthands;
use mailcanvas_dom::markers::is_editor_internal;
use mailcanvas_dom::{get_session_seed, selector, IdGenerator, NodeId};
use mailcanvas_protocol::{ControllerEvent, DropPosition, DropProbe, StructuralAction, SurfaceMessage};
use tracing::{debug, info};

use crate::document::{Document, Skeleton};
use crate::drop_target;
use crate::errors::EditorError;
use crate::mutations::{MoveDirection, Mutation, MutationContext, MutationResult};
use crate::post_effects::PostEffectEngine;
use crate::scope::{is_in_scope, root_scope};
use crate::style_sync::read_rule_for_editing;
use crate::undo_stack::UndoStack;

/// Presentation attributes offered by the style editor for table parts
const TABLE_ATTRIBUTES: &[&str] = &[
    "width", "height", "align", "valign", "bgcolor", "background", "border", "cellpadding",
    "cellspacing",
];

/// Per-session knobs
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Label shown inside placeholders
    pub placeholder_text: String,

    /// Maximum undo levels (0 = unlimited)
    pub undo_levels: usize,

    /// Seed for generated identities; derived from the session id when absent
    pub id_seed: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            placeholder_text: "Drop content here".to_string(),
            undo_levels: 100,
            id_seed: None,
        }
    }
}

/// Canonical editing state of one template
#[derive(Debug)]
pub struct EditSession {
    /// Unique session identifier
    pub id: String,

    /// Canonical serialized document
    committed: String,

    /// Increments on every commit, load, undo and redo
    version: u64,

    /// Selector of the selected element, as last reported by the surface
    selection: Option<String>,

    seed: String,
    ids: IdGenerator,
    history: UndoStack,
    effects: PostEffectEngine,
    settings: SessionSettings,
}

impl EditSession {
    /// Start a session on an existing document (sanitized on load)
    pub fn new(id: impl Into<String>, html: &str, settings: SessionSettings) -> Self {
        let id = id.into();
        let seed = settings
            .id_seed
            .clone()
            .unwrap_or_else(|| get_session_seed(&id));
        let committed = Document::load(html).serialize();

        info!(session = %id, seed = %seed, len = committed.len(), "Edit session started");

        Self {
            history: UndoStack::with_max_levels(settings.undo_levels),
            ids: IdGenerator::from_seed(seed.clone()),
            seed,
            id,
            committed,
            version: 0,
            selection: None,
            effects: PostEffectEngine::new(),
            settings,
        }
    }

    /// Start a session on a default skeleton
    pub fn with_skeleton(id: impl Into<String>, skeleton: Skeleton, settings: SessionSettings) -> Self {
        let html = skeleton.build(&settings.placeholder_text);
        Self::new(id, &html, settings)
    }

    pub fn document(&self) -> &str {
        &self.committed
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    /// Current document as a render event
    pub fn render_event(&self) -> ControllerEvent {
        ControllerEvent::Render {
            document: self.committed.clone(),
            version: self.version,
        }
    }

    /// Replace the document wholesale (template load)
    ///
    /// Selection, history and generated identities do not carry over.
    pub fn load(&mut self, html: &str) -> ControllerEvent {
        self.committed = Document::load(html).serialize();
        self.selection = None;
        self.history.clear();
        self.ids = IdGenerator::from_seed(self.seed.clone());
        self.version += 1;
        info!(session = %self.id, version = self.version, "Document loaded");
        self.render_event()
    }

    /// Apply one mutation to the committed document
    ///
    /// Rejections and changes that serialize to the same document are
    /// reported as `Noop` and commit nothing.
    pub fn apply(&mut self, mutation: &Mutation) -> MutationResult {
        let mut doc = Document::parse(&self.committed);
        let mut ids = self.ids.clone();
        let mut ctx = MutationContext {
            ids: &mut ids,
            placeholder_text: &self.settings.placeholder_text,
        };

        if let Err(err) = mutation.apply(&mut doc, &mut ctx) {
            debug!(
                kind = mutation.kind(),
                selector = mutation.selector().unwrap_or_default(),
                error = %err,
                "Mutation rejected"
            );
            return MutationResult::Noop {
                reason: err.to_string(),
            };
        }

        let repaired = self
            .effects
            .run(mutation, &mut doc, &self.settings.placeholder_text);
        let html = doc.serialize();
        if html == self.committed {
            debug!(kind = mutation.kind(), "Mutation left document unchanged");
            return MutationResult::Noop {
                reason: "Document unchanged".to_string(),
            };
        }

        let before = std::mem::replace(&mut self.committed, html);
        self.history.record(before, mutation.kind());
        self.ids = ids;
        self.version += 1;

        debug!(
            kind = mutation.kind(),
            version = self.version,
            effects = ?repaired,
            "Mutation applied"
        );
        MutationResult::Applied {
            version: self.version,
        }
    }

    pub fn undo(&mut self) -> Result<ControllerEvent, EditorError> {
        let previous = self
            .history
            .undo(self.committed.clone())
            .ok_or(EditorError::EmptyHistory("undo"))?;
        self.restore(previous);
        Ok(self.render_event())
    }

    pub fn redo(&mut self) -> Result<ControllerEvent, EditorError> {
        let next = self
            .history
            .redo(self.committed.clone())
            .ok_or(EditorError::EmptyHistory("redo"))?;
        self.restore(next);
        Ok(self.render_event())
    }

    fn restore(&mut self, html: String) {
        self.committed = html;
        self.version += 1;
        self.drop_stale_selection();
    }

    /// Decode and handle a JSON surface message
    pub fn handle_json(&mut self, json: &str) -> Result<Vec<ControllerEvent>, EditorError> {
        let message = SurfaceMessage::from_json(json)?;
        Ok(self.handle(message))
    }

    /// Handle one surface message; returns the events to send back
    pub fn handle(&mut self, message: SurfaceMessage) -> Vec<ControllerEvent> {
        debug!(kind = message.kind(), selector = message.selector().unwrap_or_default(), "Surface message");

        match message {
            SurfaceMessage::Drop {
                selector,
                position,
                probe,
                snippet,
            } => match self.drop_mutation(selector.as_deref(), position, probe, snippet) {
                Some(mutation) => self.commit(&mutation),
                None => Vec::new(),
            },

            SurfaceMessage::ElementSelected {
                selector,
                tag_name,
                bounding_rect,
            } => {
                if self.selectable(&selector).is_none() {
                    debug!(selector = %selector, "Ignoring selection of unselectable element");
                    return Vec::new();
                }
                self.selection = Some(selector.clone());
                vec![ControllerEvent::SelectionChanged {
                    selector: Some(selector),
                    tag_name: Some(tag_name),
                    bounding_rect,
                }]
            }

            SurfaceMessage::ElementDeselected => {
                self.selection = None;
                vec![deselected()]
            }

            SurfaceMessage::TextUpdated {
                selector,
                new_content,
            } => self.commit(&Mutation::SetText {
                selector,
                content: new_content,
            }),

            SurfaceMessage::StructuralAction { selector, action } => {
                let mutation = match action {
                    StructuralAction::Delete => Mutation::Remove { selector },
                    StructuralAction::MoveUp => Mutation::Move {
                        selector,
                        direction: MoveDirection::Up,
                    },
                    StructuralAction::MoveDown => Mutation::Move {
                        selector,
                        direction: MoveDirection::Down,
                    },
                    StructuralAction::Duplicate => Mutation::Duplicate { selector },
                };
                self.commit(&mutation)
            }

            SurfaceMessage::StyleEditRequest {
                selector,
                current_declarations,
                table_attrs,
                ..
            } => {
                let doc = Document::parse(&self.committed);
                let Some(node) = selectable_in(&doc, &selector) else {
                    return Vec::new();
                };
                let tree = doc.tree();
                let tag = tree.tag(node).unwrap_or_default().to_string();

                let mut declarations = read_rule_for_editing(&doc, node);
                if declarations.is_empty() {
                    declarations = expand_box_shorthands(&current_declarations);
                }

                let mut attrs = BTreeMap::new();
                if matches!(tag.as_str(), "table" | "tr" | "td" | "th") {
                    attrs = table_attrs;
                    for name in TABLE_ATTRIBUTES {
                        if let Some(value) = tree.get_attr(node, name) {
                            attrs.insert(name.to_string(), value.to_string());
                        }
                    }
                }

                vec![ControllerEvent::OpenStyleEditor {
                    selector,
                    tag_name: tag,
                    declarations,
                    table_attrs: attrs,
                }]
            }

            SurfaceMessage::LinkEditRequest {
                selector,
                current_href,
            } => {
                let doc = Document::parse(&self.committed);
                let Some(node) = selectable_in(&doc, &selector) else {
                    return Vec::new();
                };
                let href = doc
                    .tree()
                    .get_attr(node, "href")
                    .map(str::to_string)
                    .or(current_href);
                vec![ControllerEvent::OpenLinkEditor { selector, href }]
            }

            SurfaceMessage::ImageUrlRequest { selector } => {
                if !self.is_image(&selector) {
                    return Vec::new();
                }
                vec![ControllerEvent::RequestImageUrl { selector }]
            }

            SurfaceMessage::ImageUploadRequest { selector } => {
                if !self.is_image(&selector) {
                    return Vec::new();
                }
                vec![ControllerEvent::RequestImageUpload { selector }]
            }
        }
    }

    /// Apply and, when something changed, produce the render (and a
    /// deselection if the selected element is gone)
    fn commit(&mut self, mutation: &Mutation) -> Vec<ControllerEvent> {
        if !self.apply(mutation).is_applied() {
            return Vec::new();
        }
        let mut events = vec![self.render_event()];
        if self.drop_stale_selection() {
            events.push(deselected());
        }
        events
    }

    fn drop_stale_selection(&mut self) -> bool {
        let Some(selected) = self.selection.as_deref() else {
            return false;
        };
        let doc = Document::parse(&self.committed);
        if selectable_in(&doc, selected).is_some() {
            return false;
        }
        self.selection = None;
        true
    }

    fn selectable(&self, selector: &str) -> Option<NodeId> {
        selectable_in(&Document::parse(&self.committed), selector)
    }

    fn is_image(&self, selector: &str) -> bool {
        let doc = Document::parse(&self.committed);
        selectable_in(&doc, selector).is_some_and(|node| doc.tree().tag(node) == Some("img"))
    }

    /// Turn a drop into an inject mutation against the resolved target
    fn drop_mutation(
        &self,
        raw_selector: Option<&str>,
        position: Option<DropPosition>,
        probe: Option<DropProbe>,
        snippet: String,
    ) -> Option<Mutation> {
        let doc = Document::parse(&self.committed);
        let tree = doc.tree();
        let Some(root) = root_scope(tree) else {
            debug!("Drop ignored: no root scope");
            return None;
        };

        let raw = raw_selector.and_then(|s| selector::resolve_str(tree, s));
        let Some(target) = drop_target::resolve(tree, root, raw, position, probe) else {
            debug!(selector = raw_selector.unwrap_or_default(), "Drop outside root scope ignored");
            return None;
        };

        Some(Mutation::Inject {
            snippet,
            target: selector::generate(tree, target.node).map(|s| s.to_string()),
            position: target.position,
        })
    }
}

/// Resolve a selector to an element the user may select
fn selectable_in(doc: &Document, selector: &str) -> Option<NodeId> {
    let tree = doc.tree();
    let root = root_scope(tree)?;
    let node = selector::resolve_str(tree, selector)?;
    (is_in_scope(tree, root, node) && !is_editor_internal(tree, node)).then_some(node)
}

fn deselected() -> ControllerEvent {
    ControllerEvent::SelectionChanged {
        selector: None,
        tag_name: None,
        bounding_rect: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(html: &str) -> EditSession {
        EditSession::new(
            "client-1",
            html,
            SessionSettings {
                id_seed: Some("t".to_string()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_session_creation() {
        let session = EditSession::with_skeleton("client-1", Skeleton::Popup, SessionSettings::default());
        assert_eq!(session.id, "client-1");
        assert_eq!(session.version(), 0);
        assert!(session.selection().is_none());
        assert!(session.document().contains("mc-placeholder"));
    }

    #[test]
    fn test_selection_roundtrip() {
        let mut session = session(r#"<div class="mc-root"><p>x</p></div>"#);
        let events = session.handle(SurfaceMessage::ElementSelected {
            selector: "body > div > p".to_string(),
            tag_name: "p".to_string(),
            bounding_rect: None,
        });
        assert_eq!(events.len(), 1);
        assert_eq!(session.selection(), Some("body > div > p"));

        let events = session.handle(SurfaceMessage::ElementDeselected);
        assert_eq!(events, vec![deselected()]);
        assert!(session.selection().is_none());
    }

    #[test]
    fn test_out_of_scope_selection_ignored() {
        let mut session = session(r#"<p>outside</p><div class="mc-root"></div>"#);
        let events = session.handle(SurfaceMessage::ElementSelected {
            selector: "body > p".to_string(),
            tag_name: "p".to_string(),
            bounding_rect: None,
        });
        assert!(events.is_empty());
        assert!(session.selection().is_none());
    }

    #[test]
    fn test_delete_clears_selection() {
        let mut session = session(r#"<div class="mc-root"><p>a</p><p>b</p></div>"#);
        session.handle(SurfaceMessage::ElementSelected {
            selector: "body > div > p:nth-of-type(2)".to_string(),
            tag_name: "p".to_string(),
            bounding_rect: None,
        });
        let events = session.handle(SurfaceMessage::StructuralAction {
            selector: "body > div > p:nth-of-type(2)".to_string(),
            action: StructuralAction::Delete,
        });
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ControllerEvent::Render { version: 1, .. }));
        assert_eq!(events[1], deselected());
    }

    #[test]
    fn test_failed_mutation_commits_nothing() {
        let mut session = session(r#"<div class="mc-root"><p>a</p></div>"#);
        let before = session.document().to_string();
        let result = session.apply(&Mutation::Remove {
            selector: ".missing".to_string(),
        });
        assert_eq!(
            result,
            MutationResult::Noop {
                reason: "Selector not found: .missing".to_string()
            }
        );
        assert_eq!(session.document(), before);
        assert_eq!(session.version(), 0);
        assert!(!session.history().can_undo());
    }

    #[test]
    fn test_undo_redo_restore_documents() {
        let mut session = session(r#"<div class="mc-root"><p>a</p></div>"#);
        let original = session.document().to_string();

        session.apply(&Mutation::SetText {
            selector: "body > div > p".to_string(),
            content: "b".to_string(),
        });
        let edited = session.document().to_string();
        assert_ne!(edited, original);

        session.undo().unwrap();
        assert_eq!(session.document(), original);
        session.redo().unwrap();
        assert_eq!(session.document(), edited);
        assert_eq!(session.version(), 3);
        assert!(matches!(session.redo(), Err(EditorError::EmptyHistory("redo"))));
    }

    #[test]
    fn test_load_resets_state() {
        let mut session = session(r#"<div class="mc-root"><p>a</p></div>"#);
        session.apply(&Mutation::Inject {
            snippet: "<p>b</p>".to_string(),
            target: None,
            position: DropPosition::Inside,
        });
        let event = session.load(r#"<div class="mc-root"><p class="mc-ui-selected">c</p></div>"#);
        assert!(matches!(event, ControllerEvent::Render { version: 2, .. }));
        assert!(!session.history().can_undo());
        assert!(!session.document().contains("mc-ui-"));
    }

    #[test]
    fn test_link_and_image_requests() {
        let mut session = session(
            r#"<div class="mc-root"><a href="https://example.com">x</a><img src="a.png"></div>"#,
        );
        let events = session.handle(SurfaceMessage::LinkEditRequest {
            selector: "body > div > a".to_string(),
            current_href: None,
        });
        assert_eq!(
            events,
            vec![ControllerEvent::OpenLinkEditor {
                selector: "body > div > a".to_string(),
                href: Some("https://example.com".to_string()),
            }]
        );

        let events = session.handle(SurfaceMessage::ImageUploadRequest {
            selector: "body > div > img".to_string(),
        });
        assert_eq!(events.len(), 1);

        let events = session.handle(SurfaceMessage::ImageUrlRequest {
            selector: "body > div > a".to_string(),
        });
        assert!(events.is_empty());
    }

    #[test]
    fn test_style_edit_request_reads_table_attributes() {
        let mut session = session(
            r##"<html><head><style id="mc-styles">.mc-el-t-1 { padding: 4px 8px; }</style></head><body><table class="mc-root"><tbody><tr><td class="mc-el-t-1" width="300" bgcolor="#fff">x</td></tr></tbody></table></body></html>"##,
        );
        let events = session.handle(SurfaceMessage::StyleEditRequest {
            selector: ".mc-el-t-1".to_string(),
            tag_name: "TD".to_string(),
            current_declarations: Default::default(),
            table_attrs: BTreeMap::from([("align".to_string(), "left".to_string())]),
        });
        match &events[..] {
            [ControllerEvent::OpenStyleEditor {
                tag_name,
                declarations,
                table_attrs,
                ..
            }] => {
                assert_eq!(tag_name, "td");
                assert_eq!(declarations.get("padding-left"), Some("8px"));
                assert_eq!(table_attrs.get("width").map(String::as_str), Some("300"));
                assert_eq!(table_attrs.get("bgcolor").map(String::as_str), Some("#fff"));
                assert_eq!(table_attrs.get("align").map(String::as_str), Some("left"));
            }
            other => panic!("unexpected events {:?}", other),
        }
    }

    #[test]
    fn test_handle_json_rejects_garbage() {
        let mut session = session(r#"<div class="mc-root"></div>"#);
        assert!(matches!(
            session.handle_json("{not json"),
            Err(EditorError::Protocol(_))
        ));
    }
}

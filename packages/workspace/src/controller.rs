//! # Editor controller
//!
//! One task owns the EditSession. Requests reach it through an mpsc mailbox
//! and are handled strictly in arrival order, each against the latest
//! committed document; replies go back on a oneshot channel.
//!
//! Every event the session produces is also fanned out on a broadcast
//! channel (the SSE stream). Render events leave the controller with the
//! composed preview page, not the canonical document.

use mailcanvas_editor::{ControllerEvent, EditSession, EditorError, Mutation, MutationResult, SurfaceMessage};
use mailcanvas_preview::{compose, PreviewOptions};
use mailcanvas_protocol::NoticeLevel;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{WorkspaceError, WorkspaceResult};

const MAILBOX_SIZE: usize = 64;
const EVENT_BUFFER: usize = 128;

/// Canonical document and its version
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DocumentSnapshot {
    pub document: String,
    pub version: u64,
}

enum Command {
    Message {
        message: SurfaceMessage,
        reply: oneshot::Sender<Vec<ControllerEvent>>,
    },
    Apply {
        mutation: Mutation,
        reply: oneshot::Sender<MutationResult>,
    },
    Undo {
        reply: oneshot::Sender<Result<u64, EditorError>>,
    },
    Redo {
        reply: oneshot::Sender<Result<u64, EditorError>>,
    },
    Load {
        html: String,
        reply: oneshot::Sender<u64>,
    },
    Snapshot {
        reply: oneshot::Sender<DocumentSnapshot>,
    },
    Preview {
        options: Option<PreviewOptions>,
        reply: oneshot::Sender<WorkspaceResult<String>>,
    },
    SetPreviewOptions {
        options: PreviewOptions,
        reply: oneshot::Sender<()>,
    },
    Notice {
        level: NoticeLevel,
        message: String,
    },
}

/// Cloneable handle to the controller task
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    mailbox: mpsc::Sender<Command>,
    events: broadcast::Sender<ControllerEvent>,
}

impl ControllerHandle {
    /// Spawn the controller task on the current runtime
    pub fn spawn(session: EditSession, preview: PreviewOptions) -> Self {
        let (mailbox, inbox) = mpsc::channel(MAILBOX_SIZE);
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let controller = Controller {
            session,
            preview,
            events: events.clone(),
        };
        tokio::spawn(controller.run(inbox));

        Self { mailbox, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> WorkspaceResult<T> {
        let (reply, response) = oneshot::channel();
        self.mailbox
            .send(make(reply))
            .await
            .map_err(|_| WorkspaceError::ControllerGone)?;
        response.await.map_err(|_| WorkspaceError::ControllerGone)
    }

    /// Handle one surface message; returns the events it produced
    pub async fn message(&self, message: SurfaceMessage) -> WorkspaceResult<Vec<ControllerEvent>> {
        self.request(|reply| Command::Message { message, reply }).await
    }

    pub async fn apply(&self, mutation: Mutation) -> WorkspaceResult<MutationResult> {
        self.request(|reply| Command::Apply { mutation, reply }).await
    }

    pub async fn undo(&self) -> WorkspaceResult<u64> {
        Ok(self.request(|reply| Command::Undo { reply }).await??)
    }

    pub async fn redo(&self) -> WorkspaceResult<u64> {
        Ok(self.request(|reply| Command::Redo { reply }).await??)
    }

    /// Replace the document; returns the new version
    pub async fn load(&self, html: String) -> WorkspaceResult<u64> {
        self.request(|reply| Command::Load { html, reply }).await
    }

    pub async fn snapshot(&self) -> WorkspaceResult<DocumentSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Compose the current document; `None` uses the stored options
    pub async fn preview(&self, options: Option<PreviewOptions>) -> WorkspaceResult<String> {
        self.request(|reply| Command::Preview { options, reply }).await?
    }

    /// Options used for broadcast renders from now on
    pub async fn set_preview_options(&self, options: PreviewOptions) -> WorkspaceResult<()> {
        self.request(|reply| Command::SetPreviewOptions { options, reply })
            .await
    }

    /// Show a user-visible message on every connected surface
    pub async fn notify(&self, level: NoticeLevel, message: impl Into<String>) -> WorkspaceResult<()> {
        self.mailbox
            .send(Command::Notice {
                level,
                message: message.into(),
            })
            .await
            .map_err(|_| WorkspaceError::ControllerGone)
    }
}

struct Controller {
    session: EditSession,
    preview: PreviewOptions,
    events: broadcast::Sender<ControllerEvent>,
}

impl Controller {
    async fn run(mut self, mut inbox: mpsc::Receiver<Command>) {
        info!(session = %self.session.id, "Controller started");
        while let Some(command) = inbox.recv().await {
            self.handle(command);
        }
        info!(session = %self.session.id, "Controller stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Message { message, reply } => {
                let events = self.session.handle(message);
                let events = self.publish(events);
                let _ = reply.send(events);
            }

            Command::Apply { mutation, reply } => {
                let result = self.session.apply(&mutation);
                if result.is_applied() {
                    self.publish(vec![self.session.render_event()]);
                }
                let _ = reply.send(result);
            }

            Command::Undo { reply } => {
                let result = self.session.undo().map(|event| {
                    self.publish(vec![event]);
                    self.session.version()
                });
                let _ = reply.send(result);
            }

            Command::Redo { reply } => {
                let result = self.session.redo().map(|event| {
                    self.publish(vec![event]);
                    self.session.version()
                });
                let _ = reply.send(result);
            }

            Command::Load { html, reply } => {
                let event = self.session.load(&html);
                self.publish(vec![event]);
                let _ = reply.send(self.session.version());
            }

            Command::Snapshot { reply } => {
                let _ = reply.send(DocumentSnapshot {
                    document: self.session.document().to_string(),
                    version: self.session.version(),
                });
            }

            Command::Preview { options, reply } => {
                let options = options.as_ref().unwrap_or(&self.preview);
                let page = compose(self.session.document(), options).map_err(WorkspaceError::from);
                let _ = reply.send(page);
            }

            Command::SetPreviewOptions { options, reply } => {
                debug!(viewport = %options.viewport, "Preview options updated");
                self.preview = options;
                self.publish(vec![self.session.render_event()]);
                let _ = reply.send(());
            }

            Command::Notice { level, message } => {
                self.publish(vec![ControllerEvent::Notice { level, message }]);
            }
        }
    }

    /// Compose renders and broadcast; returns the outgoing events
    fn publish(&self, events: Vec<ControllerEvent>) -> Vec<ControllerEvent> {
        let outgoing: Vec<ControllerEvent> = events
            .into_iter()
            .map(|event| match event {
                ControllerEvent::Render { document, version } => match compose(&document, &self.preview) {
                    Ok(page) => ControllerEvent::Render {
                        document: page,
                        version,
                    },
                    Err(err) => {
                        warn!(version, error = %err, "Document cannot be previewed");
                        ControllerEvent::error(format!("Preview unavailable: {}", err))
                    }
                },
                other => other,
            })
            .collect();

        for event in &outgoing {
            // No subscribers is fine
            let _ = self.events.send(event.clone());
        }
        outgoing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailcanvas_editor::{DropPosition, SessionSettings, Skeleton};

    fn handle() -> ControllerHandle {
        let session = EditSession::with_skeleton("test", Skeleton::Popup, SessionSettings::default());
        ControllerHandle::spawn(session, PreviewOptions::interactive())
    }

    fn inject(snippet: &str) -> Mutation {
        Mutation::Inject {
            snippet: snippet.to_string(),
            target: None,
            position: DropPosition::Inside,
        }
    }

    #[tokio::test]
    async fn test_commands_are_serialized() {
        let controller = handle();
        let mut tasks = Vec::new();
        for i in 0..10 {
            let controller = controller.clone();
            tasks.push(tokio::spawn(async move {
                controller.apply(inject(&format!("<p>{}</p>", i))).await.unwrap()
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_applied());
        }

        let snapshot = controller.snapshot().await.unwrap();
        assert_eq!(snapshot.version, 10);
        assert_eq!(snapshot.document.matches("<p ").count(), 10);
    }

    #[tokio::test]
    async fn test_renders_are_broadcast_composed() {
        let controller = handle();
        let mut events = controller.subscribe();

        controller.apply(inject("<h1>Hello</h1>")).await.unwrap();
        match events.recv().await.unwrap() {
            ControllerEvent::Render { document, version } => {
                assert_eq!(version, 1);
                assert!(document.contains("mc-ui-bridge"));
                assert!(document.contains("Hello</h1>"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_undo_with_empty_history() {
        let controller = handle();
        assert!(matches!(
            controller.undo().await,
            Err(WorkspaceError::Editor(EditorError::EmptyHistory("undo")))
        ));

        controller.apply(inject("<p>x</p>")).await.unwrap();
        assert_eq!(controller.undo().await.unwrap(), 2);
        assert_eq!(controller.redo().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_notice_reaches_subscribers() {
        let controller = handle();
        let mut events = controller.subscribe();
        controller.notify(NoticeLevel::Error, "Upload failed").await.unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            ControllerEvent::Notice {
                level: NoticeLevel::Error,
                message: "Upload failed".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_load_without_root_reports_notice() {
        let controller = handle();
        let mut events = controller.subscribe();
        controller.load("<p>no root</p>".to_string()).await.unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            ControllerEvent::Notice { level: NoticeLevel::Error, .. }
        ));
    }
}

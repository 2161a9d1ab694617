use std::future::Future;
use std::sync::Arc;

use hubchat_core::{ChatSession, Conversation, ConversationId, HttpBackend, Message, Role};
use ratatui::widgets::ListState;
use tokio::sync::{mpsc, oneshot};
use tracing::error;

use crate::tui::AppEvent;
use crate::view::{ChannelObserver, ViewEvent};

pub type Session = ChatSession<HttpBackend, ChannelObserver>;

/// Starting sidebar: the remembered conversations, then any extra ids not
/// already among them.
pub fn seed_conversations(mut remembered: Vec<Conversation>, ids: &[i64]) -> Vec<Conversation> {
    for &id in ids {
        let id = ConversationId(id);
        if !remembered.iter().any(|c| c.id == id) {
            remembered.push(Conversation::new(id));
        }
    }
    remembered
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Sidebar,
    Input,
}

/// A y/n prompt waiting for the user.
pub struct PendingConfirm {
    pub prompt: String,
    reply: oneshot::Sender<bool>,
}

pub struct App {
    pub should_quit: bool,
    pub focus: FocusPane,

    // Sidebar
    pub conversations: Vec<Conversation>,
    pub sidebar_state: ListState,
    pub active: Option<ConversationId>,

    // Transcript mirror, fed by the session observer
    pub messages: Vec<Message>,
    pub streaming: bool,
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub animation_frame: u8,

    // Input box
    pub input: String,
    pub input_cursor: usize,
    pub input_enabled: bool,

    // Banners
    pub llm_available: Option<bool>,
    pub flash: Option<String>,
    pub confirm: Option<PendingConfirm>,

    pub session: Arc<Session>,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(session: Arc<Session>, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        let conversations = session.conversations();
        let mut sidebar_state = ListState::default();
        if !conversations.is_empty() {
            sidebar_state.select(Some(0));
        }

        Self {
            should_quit: false,
            focus: FocusPane::Sidebar,
            conversations,
            sidebar_state,
            active: session.active(),
            messages: Vec::new(),
            streaming: false,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            input: String::new(),
            input_cursor: 0,
            input_enabled: session.input_enabled(),
            llm_available: None,
            flash: None,
            confirm: None,
            session,
            events,
        }
    }

    /// Run a session operation in the background, reporting failures as a flash banner.
    fn spawn<F>(&self, what: &'static str, task: F)
    where
        F: Future<Output = hubchat_core::Result<()>> + Send + 'static,
    {
        let events = self.events.clone();
        tokio::spawn(async move {
            if let Err(err) = task.await {
                error!(error = %err, "{} failed", what);
                let _ = events.send(AppEvent::View(ViewEvent::Flash(format!("{} failed: {}", what, err))));
            }
        });
    }

    pub fn new_conversation(&mut self) {
        let session = Arc::clone(&self.session);
        self.spawn("New conversation", async move {
            session.create_conversation().await.map(|_| ())
        });
    }

    pub fn open_selected(&mut self) {
        if let Some(id) = self.selected_conversation() {
            let session = Arc::clone(&self.session);
            self.spawn("Loading conversation", async move {
                session.select_conversation(id).await
            });
        }
    }

    pub fn delete_selected(&mut self) {
        if let Some(id) = self.selected_conversation() {
            let session = Arc::clone(&self.session);
            self.spawn("Delete", async move {
                session.delete_conversation(id).await.map(|_| ())
            });
        }
    }

    /// Hand the input text to the session. Emptiness and single-flight are the
    /// session's call; the box is only cleared when the text was accepted.
    pub fn submit_input(&mut self) {
        if !self.input_enabled || self.active.is_none() || self.input.trim().is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.input);
        self.input_cursor = 0;
        let session = Arc::clone(&self.session);
        tokio::spawn(async move {
            session.send(&text).await;
        });
    }

    pub fn probe_llm(&self) {
        let session = Arc::clone(&self.session);
        let events = self.events.clone();
        tokio::spawn(async move {
            let available = session.probe_llm().await;
            let _ = events.send(AppEvent::View(ViewEvent::LlmStatus(available)));
        });
    }

    pub fn answer_confirm(&mut self, yes: bool) {
        if let Some(pending) = self.confirm.take() {
            let _ = pending.reply.send(yes);
        }
    }

    pub fn apply(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::MessageAppended(index, message) => {
                if index == self.messages.len() {
                    self.messages.push(message);
                } else if let Some(slot) = self.messages.get_mut(index) {
                    *slot = message;
                }
                self.scroll_to_bottom();
            }
            ViewEvent::MessageUpdated(index, message) => {
                if let Some(slot) = self.messages.get_mut(index) {
                    *slot = message;
                }
            }
            ViewEvent::TranscriptReset(messages) => {
                self.messages = messages;
                self.chat_scroll = 0;
                self.scroll_to_bottom();
            }
            ViewEvent::TitleChanged(id, title) => {
                if let Some(entry) = self.conversations.iter_mut().find(|c| c.id == id) {
                    entry.title = title;
                }
            }
            ViewEvent::InputEnabled(enabled) => {
                self.input_enabled = enabled;
                // Input is disabled exactly while a reply streams or nothing is active
                self.streaming = !enabled && self.active.is_some();
                if enabled && self.active.is_some() {
                    self.focus = FocusPane::Input;
                }
            }
            ViewEvent::ScrollToBottom => self.scroll_to_bottom(),
            ViewEvent::ConversationAdded(conversation) => {
                self.conversations.insert(0, conversation);
                self.sidebar_state.select(Some(0));
            }
            ViewEvent::ConversationRemoved(id) => {
                self.conversations.retain(|c| c.id != id);
                let selected = self.sidebar_state.selected().unwrap_or(0);
                if self.conversations.is_empty() {
                    self.sidebar_state.select(None);
                } else {
                    self.sidebar_state.select(Some(selected.min(self.conversations.len() - 1)));
                }
            }
            ViewEvent::ActiveChanged(active) => {
                self.active = active;
                if active.is_none() {
                    self.streaming = false;
                    self.focus = FocusPane::Sidebar;
                }
            }
            ViewEvent::Confirm(prompt, reply) => {
                // A newer prompt replaces an unanswered one, which then reads as "no".
                self.confirm = Some(PendingConfirm { prompt, reply });
            }
            ViewEvent::LlmStatus(available) => self.llm_available = Some(available),
            ViewEvent::Flash(message) => self.flash = Some(message),
        }
    }

    pub fn selected_conversation(&self) -> Option<ConversationId> {
        self.sidebar_state
            .selected()
            .and_then(|i| self.conversations.get(i))
            .map(|c| c.id)
    }

    pub fn sidebar_down(&mut self) {
        let len = self.conversations.len();
        if len > 0 {
            let i = self.sidebar_state.selected().map_or(0, |i| (i + 1).min(len - 1));
            self.sidebar_state.select(Some(i));
        }
    }

    pub fn sidebar_up(&mut self) {
        if !self.conversations.is_empty() {
            let i = self.sidebar_state.selected().unwrap_or(0);
            self.sidebar_state.select(Some(i.saturating_sub(1)));
        }
    }

    pub fn tick_animation(&mut self) {
        if self.streaming {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.total_chat_lines().saturating_sub(self.visible_height());
        self.chat_scroll = (self.chat_scroll + lines).min(max);
    }

    /// Follow the newest content.
    pub fn scroll_to_bottom(&mut self) {
        let total = self.total_chat_lines();
        let visible = self.visible_height();
        self.chat_scroll = total.saturating_sub(visible);
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Rendered line count of the transcript, using the last known wrap width.
    pub fn total_chat_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total: usize = 0;
        for msg in self.messages.iter().filter(|m| m.role != Role::System) {
            total += 1; // role label
            for line in msg.content.lines() {
                let chars = line.chars().count();
                total += if chars == 0 { 1 } else { chars.div_ceil(wrap_width) };
            }
            total += 1; // blank separator
        }
        total.min(u16::MAX as usize) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        app_at("http://localhost:5000")
    }

    fn app_at(base_url: &str) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ChatSession::new(
            HttpBackend::new(base_url),
            ChannelObserver::new(tx.clone()),
            hubchat_core::AlwaysConfirm,
        )
        .with_conversations(vec![
            Conversation::with_title(ConversationId(2), "Essays"),
            Conversation::with_title(ConversationId(1), "Visits"),
        ]);
        (App::new(Arc::new(session), tx), rx)
    }

    #[test]
    fn test_seed_appends_unknown_ids() {
        let remembered = vec![Conversation::with_title(ConversationId(4), "Scholarships")];
        let seeded = seed_conversations(remembered, &[4, 11]);
        assert_eq!(
            seeded,
            vec![
                Conversation::with_title(ConversationId(4), "Scholarships"),
                Conversation::new(ConversationId(11)),
            ]
        );
    }

    #[tokio::test]
    async fn test_seeded_conversation_can_be_opened() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chat/1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "role": "system", "content": "student profile" },
                { "role": "user", "content": "Which campuses should I visit?" },
                { "role": "assistant", "content": "Start with the closest ones." }
            ])))
            .mount(&server)
            .await;

        let (mut app, mut rx) = app_at(&server.uri());
        let titles: Vec<&str> = app.conversations.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Essays", "Visits"]);
        assert_eq!(app.selected_conversation(), Some(ConversationId(2)));

        app.sidebar_down();
        app.open_selected();
        while let Some(AppEvent::View(event)) = rx.recv().await {
            let loaded = matches!(event, ViewEvent::TranscriptReset(_));
            app.apply(event);
            if loaded {
                break;
            }
        }

        assert_eq!(app.active, Some(ConversationId(1)));
        assert_eq!(
            app.messages,
            vec![
                Message::user("Which campuses should I visit?"),
                Message::assistant("Start with the closest ones."),
            ]
        );
        assert!(app.flash.is_none());
    }

    #[test]
    fn test_view_events_mirror_transcript() {
        let (mut app, _rx) = app();
        app.apply(ViewEvent::ActiveChanged(Some(ConversationId(2))));
        app.apply(ViewEvent::MessageAppended(0, Message::user("hi")));
        app.apply(ViewEvent::MessageAppended(1, Message::assistant("")));
        app.apply(ViewEvent::InputEnabled(false));
        assert!(app.streaming);

        app.apply(ViewEvent::MessageUpdated(1, Message::assistant("Hello")));
        app.apply(ViewEvent::InputEnabled(true));
        assert!(!app.streaming);
        assert_eq!(app.messages, vec![Message::user("hi"), Message::assistant("Hello")]);
        assert_eq!(app.focus, FocusPane::Input);
    }

    #[test]
    fn test_title_and_removal_update_sidebar() {
        let (mut app, _rx) = app();
        app.apply(ViewEvent::TitleChanged(ConversationId(1), "Campus visits".to_string()));
        assert_eq!(app.conversations[1].title, "Campus visits");

        app.sidebar_down();
        app.apply(ViewEvent::ConversationRemoved(ConversationId(1)));
        assert_eq!(app.conversations.len(), 1);
        assert_eq!(app.selected_conversation(), Some(ConversationId(2)));
    }

    #[test]
    fn test_confirm_answer_is_delivered() {
        let (mut app, _rx) = app();
        let (reply, mut answer) = oneshot::channel();
        app.apply(ViewEvent::Confirm("Delete this conversation?".to_string(), reply));
        assert!(app.confirm.is_some());
        app.answer_confirm(true);
        assert!(app.confirm.is_none());
        assert_eq!(answer.try_recv(), Ok(true));
    }

    #[test]
    fn test_wrapped_line_count() {
        let (mut app, _rx) = app();
        app.chat_width = 10;
        app.messages = vec![Message::user("x".repeat(25)), Message::assistant("a\n\nb")];
        // user: label + 3 wrapped + blank; assistant: label + 3 lines + blank
        assert_eq!(app.total_chat_lines(), 5 + 5);
    }
}

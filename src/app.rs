use ratatui::widgets::ListState;
use ragtech_core::{
    BackendClient, BackendError, CommandRecognizer, CommandSynthesizer, Config, Conversation,
    History, KeyValueStore, MemoryStore, Message, PendingSend, RecognitionEvent, Recognizer, Role,
    SessionId, SessionStore, SqliteStore, Synthesizer, VoiceInput, VoiceOutput,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub type AppConversation = Conversation<Box<dyn KeyValueStore>>;

type AnswerTask = JoinHandle<Result<String, BackendError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Sessions,
    Chat,
    Input,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    Checking,
    Online(String),
    Offline,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Conversation state
    pub conversation: AppConversation,
    pub input_cursor: usize, // cursor position in the pending input, in chars

    // Backend exchange in flight, with the question it belongs to
    pub client: BackendClient,
    pub query_task: Option<(PendingSend, AnswerTask)>,
    pub health_task: Option<AnswerTask>,
    pub backend_status: BackendStatus,

    // Session sidebar
    pub session_state: ListState,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Status line (voice notices, storage warnings)
    pub notice: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(config: &Config, voice_tx: mpsc::UnboundedSender<RecognitionEvent>) -> anyhow::Result<Self> {
        let client = BackendClient::new(&config.backend_url(), config.request_timeout())?;
        let mut notice = None;

        let store: Box<dyn KeyValueStore> = match config
            .history_path()
            .map_err(|e| e.to_string())
            .and_then(|path| SqliteStore::open(&path).map_err(|e| e.to_string()))
        {
            Ok(store) => Box::new(store),
            Err(e) => {
                warn!(error = %e, "history database unavailable, keeping history in memory");
                notice = Some("History could not be opened; this session will not be saved.".to_string());
                Box::new(MemoryStore::new())
            }
        };

        let recognizer = config
            .recognizer_command
            .as_deref()
            .and_then(|argv| CommandRecognizer::detect(argv, voice_tx))
            .map(|r| Box::new(r) as Box<dyn Recognizer>);

        let synthesizer = config
            .synthesizer_command
            .as_deref()
            .and_then(|argv| CommandSynthesizer::detect(argv, config.voices()))
            .map(|s| Box::new(s) as Box<dyn Synthesizer>);

        let mut conversation = Conversation::new(
            SessionStore::open(History::new(store)),
            VoiceInput::new(recognizer, config.input_language()),
            VoiceOutput::new(synthesizer, config.output_language(), config.voice_output_enabled()),
        );
        if conversation.sessions().active_id().is_none() {
            conversation.new_session();
        }

        let health_client = client.clone();
        let health_task = tokio::spawn(async move { health_client.health().await });

        info!(backend = %client.base_url(), "app initialized");

        let mut app = Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,

            conversation,
            input_cursor: 0,

            client,
            query_task: None,
            health_task: Some(health_task),
            backend_status: BackendStatus::Checking,

            session_state: ListState::default(),

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            notice,
            animation_frame: 0,
        };
        app.sync_session_selection();
        Ok(app)
    }

    /// Send the pending input and run the backend call in the background.
    pub fn submit(&mut self) {
        let Some(pending) = self.conversation.submit_input() else {
            return;
        };
        self.input_cursor = 0;
        self.notice = None;

        let client = self.client.clone();
        let question = pending.question().to_string();
        let handle = tokio::spawn(async move { client.fetch_answer(&question).await });
        self.query_task = Some((pending, handle));

        // Scroll to bottom so "Thinking..." is visible
        self.scroll_chat_to_bottom();
    }

    /// Apply finished background work. Called on every tick.
    pub async fn poll_tasks(&mut self) {
        if self.query_task.as_ref().is_some_and(|(_, handle)| handle.is_finished()) {
            if let Some((pending, handle)) = self.query_task.take() {
                let result = handle
                    .await
                    .unwrap_or_else(|e| Err(BackendError::Unreachable(e.to_string())));
                self.conversation.complete_send(pending, result);
                self.sync_session_selection();
                self.scroll_chat_to_bottom();
            }
        }

        if self.health_task.as_ref().is_some_and(|handle| handle.is_finished()) {
            if let Some(handle) = self.health_task.take() {
                self.backend_status = match handle.await {
                    Ok(Ok(status)) => BackendStatus::Online(status),
                    Ok(Err(e)) => {
                        warn!(error = %e, "backend health check failed");
                        BackendStatus::Offline
                    }
                    Err(e) => {
                        warn!(error = %e, "backend health task failed");
                        BackendStatus::Offline
                    }
                };
            }
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_awaiting_response() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn handle_recognition(&mut self, event: RecognitionEvent) {
        self.conversation.handle_recognition(event);
        self.input_cursor = self.conversation.input().char_count();
    }

    pub fn toggle_voice_input(&mut self) {
        if let Some(outcome) = self.conversation.toggle_voice_input() {
            self.notice = outcome.notice();
        }
    }

    pub fn toggle_voice_output(&mut self) {
        let enabled = self.conversation.toggle_voice_output();
        if let Err(e) = Config::save_voice_output(enabled) {
            warn!(error = %e, "could not remember voice output setting");
            self.notice = Some(format!("Voice output setting not saved: {}", e));
        }
    }

    // Session sidebar

    pub fn selected_session_id(&self) -> Option<SessionId> {
        let sessions = self.conversation.sessions().sessions();
        self.session_state
            .selected()
            .and_then(|i| sessions.get(i))
            .map(|s| s.id().clone())
    }

    pub fn sessions_nav_down(&mut self) {
        let len = self.conversation.sessions().sessions().len();
        if len > 0 {
            let i = self.session_state.selected().map(|i| (i + 1) % len).unwrap_or(0);
            self.session_state.select(Some(i));
        }
    }

    pub fn sessions_nav_up(&mut self) {
        let len = self.conversation.sessions().sessions().len();
        if len > 0 {
            let i = self
                .session_state
                .selected()
                .map(|i| if i == 0 { len - 1 } else { i - 1 })
                .unwrap_or(0);
            self.session_state.select(Some(i));
        }
    }

    pub fn open_selected_session(&mut self) {
        if let Some(id) = self.selected_session_id() {
            if self.conversation.select_session(&id).is_ok() {
                self.input_cursor = 0;
                self.scroll_chat_to_bottom();
            }
        }
    }

    pub fn new_session(&mut self) {
        self.conversation.new_session();
        self.input_cursor = 0;
        self.chat_scroll = 0;
        self.sync_session_selection();
    }

    pub fn delete_selected_session(&mut self) {
        if let Some(id) = self.selected_session_id() {
            if self.conversation.delete_session(&id) {
                self.input_cursor = self.input_cursor.min(self.conversation.input().char_count());
                self.sync_session_selection();
                self.scroll_chat_to_bottom();
            }
        }
    }

    /// Point the sidebar highlight at the active session.
    pub fn sync_session_selection(&mut self) {
        let store = self.conversation.sessions();
        let index = store
            .active_id()
            .and_then(|id| store.sessions().iter().position(|s| s.id() == id));
        self.session_state.select(index);
    }

    // Chat view

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    /// Scroll chat to bottom so the newest message is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let total_lines = timeline_height(
            self.conversation.active_messages(),
            self.conversation.is_awaiting_active(),
            wrap_width,
        );

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}

/// Rows the chat timeline occupies at `wrap_width`, laid out as `ui::render_chat` draws it.
pub fn timeline_height(messages: &[Message], awaiting: bool, wrap_width: usize) -> u16 {
    let wrap_width = wrap_width.max(1);
    // Use character count, not byte length, for proper UTF-8 handling
    let rows = |line: &str| (line.chars().count() / wrap_width + 1) as u16;

    let mut total_lines: u16 = 0;
    for msg in messages {
        match msg.role {
            // System text is drawn as one line with no role label
            Role::System => total_lines = total_lines.saturating_add(rows(&msg.text)),
            Role::User | Role::Assistant => {
                total_lines = total_lines.saturating_add(1); // Role line
                for line in msg.text.lines() {
                    total_lines = total_lines.saturating_add(rows(line));
                }
            }
        }
        total_lines = total_lines.saturating_add(1); // Blank line after message
    }

    if awaiting {
        total_lines = total_lines.saturating_add(2); // "AI:" + "Thinking..."
    }
    total_lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_message_has_no_role_line() {
        let messages = vec![Message::system("Connected to RAG-Tech backend.")];
        assert_eq!(timeline_height(&messages, false, 50), 2);
    }

    #[test]
    fn test_timeline_height_counts_wrapped_rows() {
        let messages = vec![
            Message::system("Connected to RAG-Tech backend."),
            Message::user("hi"),
            Message::assistant(format!("{}\nsecond", "x".repeat(15))),
        ];
        // system 1+1, user 1+1+1, assistant 1+2+1+1
        assert_eq!(timeline_height(&messages, false, 10), 10);
        assert_eq!(timeline_height(&messages, true, 10), 12);
    }
}

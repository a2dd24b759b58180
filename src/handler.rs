use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.poll_tasks().await;
            app.tick_animation();
        }
        AppEvent::Voice(event) => app.handle_recognition(event),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            // Voice input from the keyboard without leaving the input box
            KeyCode::Char('r') => {
                app.toggle_voice_input();
                return;
            }
            _ => {}
        }
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Sessions => FocusPane::Chat,
                FocusPane::Chat => FocusPane::Input,
                FocusPane::Input => FocusPane::Sessions,
            };
        }

        KeyCode::Char('i') => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
        }

        KeyCode::Char('n') => app.new_session(),
        KeyCode::Char('v') => app.toggle_voice_output(),
        KeyCode::Char('m') => app.toggle_voice_input(),

        _ => match app.focus {
            FocusPane::Sessions => handle_sessions_normal(app, key),
            FocusPane::Chat => handle_chat_normal(app, key),
            FocusPane::Input => {
                if key.code == KeyCode::Enter {
                    app.input_mode = InputMode::Editing;
                }
            }
        },
    }
}

fn handle_sessions_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.sessions_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.sessions_nav_up(),
        KeyCode::Enter => {
            app.open_selected_session();
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Char('d') | KeyCode::Delete => app.delete_selected_session(),
        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::PageDown => {
            for _ in 0..app.chat_height.max(1) / 2 {
                app.scroll_down();
            }
        }
        KeyCode::PageUp => {
            for _ in 0..app.chat_height.max(1) / 2 {
                app.scroll_up();
            }
        }
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        // Plain Enter sends; Alt+Enter starts a new line
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
            app.conversation.input_mut().insert(app.input_cursor, '\n');
            app.input_cursor += 1;
        }
        KeyCode::Enter if key.modifiers.is_empty() => app.submit(),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                app.conversation.input_mut().remove(app.input_cursor);
            }
        }
        KeyCode::Delete => {
            app.conversation.input_mut().remove(app.input_cursor);
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.conversation.input().char_count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.conversation.input().char_count();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.conversation.input_mut().insert(app.input_cursor, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, FocusPane};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => app.scroll_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::View(view) => app.apply(view),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // A pending confirmation captures all keys
    if app.confirm.is_some() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.answer_confirm(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.answer_confirm(false),
            _ => {}
        }
        return;
    }

    // Any key dismisses the flash banner
    app.flash = None;

    let page = app.chat_height.max(1);
    match (key.code, app.focus) {
        (KeyCode::PageUp, _) => app.scroll_up(page),
        (KeyCode::PageDown, _) => app.scroll_down(page),
        (_, FocusPane::Sidebar) => handle_sidebar(app, key),
        (_, FocusPane::Input) => handle_input(app, key),
    }
}

fn handle_sidebar(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.sidebar_down(),
        KeyCode::Char('k') | KeyCode::Up => app.sidebar_up(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.open_selected(),
        KeyCode::Char('n') => app.new_conversation(),
        KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(),
        KeyCode::Char('r') => app.probe_llm(),
        KeyCode::Tab | KeyCode::Char('i') => {
            if app.active.is_some() {
                app.focus = FocusPane::Input;
            }
        }
        _ => {}
    }
}

fn handle_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab => {
            app.focus = FocusPane::Sidebar;
        }
        KeyCode::Enter => app.submit_input(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if app.input_cursor < app.input.chars().count() {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            app.input_cursor = (app.input_cursor + 1).min(app.input.chars().count());
        }
        KeyCode::Home => app.input_cursor = 0,
        KeyCode::End => app.input_cursor = app.input.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hubchat_core::{AlwaysConfirm, ChatSession, HttpBackend};
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::view::{ChannelObserver, ViewEvent};

    #[tokio::test]
    async fn test_r_in_sidebar_rechecks_model() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/llm-status"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "available": true })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = ChatSession::new(
            HttpBackend::new(&server.uri()),
            ChannelObserver::new(tx.clone()),
            AlwaysConfirm,
        );
        let mut app = App::new(Arc::new(session), tx);
        app.llm_available = Some(false);

        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE)),
        );
        let Some(AppEvent::View(event @ ViewEvent::LlmStatus(_))) = rx.recv().await else {
            panic!("expected an llm status event");
        };
        handle_event(&mut app, AppEvent::View(event));

        assert_eq!(app.llm_available, Some(true));
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        let s = "añb";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 2), 3);
        assert_eq!(char_to_byte_index(s, 5), s.len());
    }
}

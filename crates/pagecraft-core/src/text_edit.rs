//! Inline editing of a text element's content.

use crate::element::ElementId;

/// Keyboard key for text editing.
#[derive(Debug, Clone, PartialEq)]
pub enum TextKey {
    Character(String),
    Backspace,
    Delete,
    Enter,
    Left,
    Right,
    Home,
    End,
    Escape,
}

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl TextModifiers {
    /// Get the action modifier (Ctrl on Windows/Linux, Cmd on macOS).
    pub fn action_mod(&self) -> bool {
        if cfg!(target_os = "macos") {
            self.meta
        } else {
            self.ctrl
        }
    }
}

/// Result of handling a text editing event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEditResult {
    /// Buffer or cursor changed; keep editing.
    Handled,
    /// Enter without shift: keep the buffer.
    Commit,
    /// Escape: restore the original content.
    Cancel,
    /// Not an editing key.
    NotHandled,
}

/// Edit session for one text element.
///
/// The buffer is previewed live on the element; history is only touched when
/// the session commits.
#[derive(Debug, Clone)]
pub struct InlineTextEdit {
    element_id: ElementId,
    original: String,
    buffer: String,
    /// Byte offset, always on a char boundary.
    cursor: usize,
}

impl InlineTextEdit {
    pub fn new(element_id: ElementId, content: &str) -> Self {
        Self {
            element_id,
            original: content.to_string(),
            buffer: content.to_string(),
            cursor: content.len(),
        }
    }

    pub fn element_id(&self) -> &ElementId {
        &self.element_id
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_modified(&self) -> bool {
        self.buffer != self.original
    }

    pub fn handle_key(&mut self, key: TextKey, modifiers: TextModifiers) -> TextEditResult {
        match key {
            TextKey::Escape => return TextEditResult::Cancel,
            TextKey::Enter if !modifiers.shift => return TextEditResult::Commit,
            TextKey::Enter => self.insert("\n"),
            TextKey::Backspace => {
                if let Some(prev) = self.prev_boundary() {
                    self.buffer.replace_range(prev..self.cursor, "");
                    self.cursor = prev;
                }
            }
            TextKey::Delete => {
                if let Some(next) = self.next_boundary() {
                    self.buffer.replace_range(self.cursor..next, "");
                }
            }
            TextKey::Left => {
                if let Some(prev) = self.prev_boundary() {
                    self.cursor = prev;
                }
            }
            TextKey::Right => {
                if let Some(next) = self.next_boundary() {
                    self.cursor = next;
                }
            }
            TextKey::Home => {
                self.cursor = if modifiers.action_mod() {
                    0
                } else {
                    self.buffer[..self.cursor].rfind('\n').map(|i| i + 1).unwrap_or(0)
                };
            }
            TextKey::End => {
                self.cursor = if modifiers.action_mod() {
                    self.buffer.len()
                } else {
                    self.buffer[self.cursor..]
                        .find('\n')
                        .map(|i| self.cursor + i)
                        .unwrap_or(self.buffer.len())
                };
            }
            TextKey::Character(ref c) => {
                if modifiers.action_mod() {
                    return TextEditResult::NotHandled;
                }
                self.insert(c);
            }
        }
        TextEditResult::Handled
    }

    fn insert(&mut self, s: &str) {
        self.buffer.insert_str(self.cursor, s);
        self.cursor += s.len();
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.buffer[..self.cursor].char_indices().next_back().map(|(i, _)| i)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.buffer[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(edit: &mut InlineTextEdit, key: TextKey) -> TextEditResult {
        edit.handle_key(key, TextModifiers::default())
    }

    #[test]
    fn test_typing_and_backspace() {
        let mut edit = InlineTextEdit::new(ElementId::from("t"), "héllo");
        key(&mut edit, TextKey::Backspace);
        key(&mut edit, TextKey::Character("p".into()));
        assert_eq!(edit.text(), "héllp");

        key(&mut edit, TextKey::Left);
        key(&mut edit, TextKey::Left);
        key(&mut edit, TextKey::Left);
        key(&mut edit, TextKey::Backspace);
        assert_eq!(edit.text(), "hllp");
        key(&mut edit, TextKey::Delete);
        assert_eq!(edit.text(), "hlp");
    }

    #[test]
    fn test_enter_commits_shift_enter_inserts_newline() {
        let mut edit = InlineTextEdit::new(ElementId::from("t"), "a");
        let shift = TextModifiers {
            shift: true,
            ..Default::default()
        };
        assert_eq!(edit.handle_key(TextKey::Enter, shift), TextEditResult::Handled);
        assert_eq!(edit.text(), "a\n");
        assert_eq!(key(&mut edit, TextKey::Enter), TextEditResult::Commit);
        assert_eq!(key(&mut edit, TextKey::Escape), TextEditResult::Cancel);
        assert_eq!(edit.original(), "a");
    }

    #[test]
    fn test_home_end_within_line() {
        let mut edit = InlineTextEdit::new(ElementId::from("t"), "one\ntwo");
        key(&mut edit, TextKey::Home);
        assert_eq!(edit.cursor(), 4);
        key(&mut edit, TextKey::Left);
        key(&mut edit, TextKey::Home);
        assert_eq!(edit.cursor(), 0);
        key(&mut edit, TextKey::End);
        assert_eq!(edit.cursor(), 3);
    }
}

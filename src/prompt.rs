use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

/// Single line editor behind every text entry: cell edits, file paths,
/// filter patterns. Enter finishes, Escape cancels.
#[derive(Default)]
pub struct Prompt {
    buffer: String,
    curser_pos: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone, Debug)]
pub struct PromptResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub curser_pos: usize,
}

impl Prompt {
    pub fn read(&mut self, key: event::KeyEvent) -> PromptResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::NONE) => self.enter(),
            (KeyCode::Esc, KeyModifiers::NONE) => self.escape(),
            (KeyCode::Backspace, KeyModifiers::NONE) => self.backspace(),
            (KeyCode::Left, KeyModifiers::NONE) => self.left(),
            (KeyCode::Right, KeyModifiers::NONE) => self.right(),
            (KeyCode::Home, KeyModifiers::NONE) => self.home(),
            (KeyCode::End, KeyModifiers::NONE) => self.end(),
            (kc, km) => self.key(kc, km),
        }
    }

    /// Start over with the given text, curser at the end.
    pub fn prefill(&mut self, s: &str) {
        self.clear();
        self.buffer = s.to_string();
        self.curser_pos = s.chars().count();
    }

    pub fn get(&self) -> PromptResult {
        PromptResult {
            canceled: self.canceled,
            finished: self.finished,
            input: self.buffer.clone(),
            curser_pos: self.curser_pos,
        }
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.buffer.clear();
        self.curser_pos = 0;
    }

    fn enter(&mut self) -> PromptResult {
        self.finished = true;
        trace!("Prompt finished: {}", self.buffer);
        self.get()
    }

    fn escape(&mut self) -> PromptResult {
        self.clear();
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn backspace(&mut self) -> PromptResult {
        if self.curser_pos > 0 {
            self.curser_pos -= 1;
            let pos = self.byte_pos();
            self.buffer.remove(pos);
        }
        self.get()
    }

    fn left(&mut self) -> PromptResult {
        self.curser_pos = self.curser_pos.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> PromptResult {
        if self.curser_pos < self.buffer.chars().count() {
            self.curser_pos += 1;
        }
        self.get()
    }

    fn home(&mut self) -> PromptResult {
        self.curser_pos = 0;
        self.get()
    }

    fn end(&mut self) -> PromptResult {
        self.curser_pos = self.buffer.chars().count();
        self.get()
    }

    fn key(&mut self, code: KeyCode, _modifier: KeyModifiers) -> PromptResult {
        if let Some(chr) = code.as_char() {
            let pos = self.byte_pos();
            self.buffer.insert(pos, chr);
            self.curser_pos += 1;
        }
        self.get()
    }

    fn byte_pos(&self) -> usize {
        self.buffer
            .char_indices()
            .nth(self.curser_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn press(p: &mut Prompt, code: KeyCode) -> PromptResult {
        p.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn typing_builds_the_buffer() {
        let mut p = Prompt::default();
        press(&mut p, KeyCode::Char('h'));
        press(&mut p, KeyCode::Char('i'));
        let r = press(&mut p, KeyCode::Enter);
        assert_eq!(r.input, "hi");
        assert!(r.finished);
        assert!(!r.canceled);
    }

    #[test]
    fn escape_cancels_and_clears() {
        let mut p = Prompt::default();
        press(&mut p, KeyCode::Char('x'));
        let r = press(&mut p, KeyCode::Esc);
        assert!(r.canceled);
        assert!(r.finished);
        assert_eq!(r.input, "");
    }

    #[test]
    fn backspace_removes_before_the_curser() {
        let mut p = Prompt::default();
        p.prefill("abc");
        press(&mut p, KeyCode::Left);
        press(&mut p, KeyCode::Backspace);
        assert_eq!(p.get().input, "ac");
        assert_eq!(p.get().curser_pos, 1);
    }

    #[test]
    fn insert_in_the_middle() {
        let mut p = Prompt::default();
        p.prefill("ab");
        press(&mut p, KeyCode::Left);
        press(&mut p, KeyCode::Char('X'));
        assert_eq!(p.get().input, "aXb");
    }

    #[test]
    fn prefill_puts_the_curser_at_the_end() {
        let mut p = Prompt::default();
        p.prefill("cell");
        assert_eq!(p.get().curser_pos, 4);
        press(&mut p, KeyCode::Char('!'));
        assert_eq!(p.get().input, "cell!");
    }

    #[test]
    fn multibyte_input_edits_by_character() {
        let mut p = Prompt::default();
        p.prefill("åß");
        press(&mut p, KeyCode::Backspace);
        assert_eq!(p.get().input, "å");
        press(&mut p, KeyCode::Home);
        press(&mut p, KeyCode::Char('x'));
        assert_eq!(p.get().input, "xå");
    }
}

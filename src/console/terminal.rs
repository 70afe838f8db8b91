//! Terminal rendering for console messages

use super::{ConsoleSink, Message, Style, Token, Verbosity};
use std::io::{self, Write};
use std::sync::Mutex;

/// How colours reach the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    /// Let the `console` crate decide based on the attached terminal
    #[default]
    Standard,
    /// Always emit ANSI escape codes
    Ansi,
}

/// Sink that renders to stdout
#[derive(Debug)]
pub struct TerminalConsole {
    verbosity: Verbosity,
    mode: OutputMode,
    write_lock: Mutex<()>,
}

impl TerminalConsole {
    pub fn new(verbosity: Verbosity, mode: OutputMode) -> Self {
        Self {
            verbosity,
            mode,
            write_lock: Mutex::new(()),
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    fn styled(&self, style: Style) -> Style {
        match self.mode {
            OutputMode::Ansi => style.force_styling(true),
            OutputMode::Standard => style,
        }
    }

    /// Render one message as a single terminal line
    pub fn render(&self, message: &Message) -> String {
        let mut line = String::new();

        if let Some(prefix) = &message.prefix {
            let style = match prefix.color {
                Some(color) => Style::new().fg(color),
                None => Style::new().dim(),
            };
            line.push_str(&self.styled(style).apply_to(&prefix.text).to_string());
            line.push_str(" | ");
        }

        for token in &message.tokens {
            match token {
                Token::Text(text) => line.push_str(text),
                Token::Colored(text, color) => {
                    let style = self.styled(Style::new().fg(*color));
                    line.push_str(&style.apply_to(text).to_string());
                }
                Token::Styled(text, style) => {
                    let style = self.styled(style.clone());
                    line.push_str(&style.apply_to(text).to_string());
                }
            }
        }

        line
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new(Verbosity::default(), OutputMode::default())
    }
}

impl ConsoleSink for TerminalConsole {
    fn write(&self, messages: &[Message]) {
        let mut rendered = String::new();
        for message in messages {
            if self.verbosity.allows(message.level) {
                rendered.push_str(&self.render(message));
                rendered.push('\n');
            }
        }

        if rendered.is_empty() {
            return;
        }

        // A poisoned lock only means another writer panicked mid-write.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(rendered.as_bytes());
        let _ = stdout.flush();
    }
}

//! Console sink contract
//!
//! The engine never renders anything itself. It builds [`Message`] values
//! and hands them to a [`ConsoleSink`], which owns verbosity filtering and
//! terminal rendering.

pub mod terminal;

pub use ::console::{Color, Style};
pub use terminal::{OutputMode, TerminalConsole};

use std::fmt;
use std::sync::Mutex;

/// Severity of a console message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Error,
    Warn,
    Info,
    Verbose,
}

/// How much console output a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Verbosity {
    /// Print nothing at all
    Disabled,
    /// Errors only
    Quiet,
    /// Errors, warnings and regular progress output
    #[default]
    Normal,
    /// Everything, including verbose diagnostics
    All,
}

impl Verbosity {
    /// Whether a message at `level` passes this verbosity
    pub fn allows(self, level: Level) -> bool {
        match self {
            Verbosity::Disabled => false,
            Verbosity::Quiet => level == Level::Error,
            Verbosity::Normal => level != Level::Verbose,
            Verbosity::All => true,
        }
    }
}

/// A fragment of a console line
#[derive(Debug, Clone)]
pub enum Token {
    /// Plain text
    Text(String),
    /// Text in a single foreground colour
    Colored(String, Color),
    /// Text with an arbitrary style (bold, dim, colours...)
    Styled(String, Style),
}

impl Token {
    /// The text of the token with styling stripped
    pub fn text(&self) -> &str {
        match self {
            Token::Text(text) | Token::Colored(text, _) | Token::Styled(text, _) => text,
        }
    }
}

/// Line prefix identifying which step produced a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    pub text: String,
    pub color: Option<Color>,
}

impl Prefix {
    pub fn new(text: impl Into<String>, color: Option<Color>) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

/// One console line
#[derive(Debug, Clone)]
pub struct Message {
    pub level: Level,
    pub prefix: Option<Prefix>,
    pub tokens: Vec<Token>,
}

impl Message {
    /// Create an empty message at `level`
    pub fn new(level: Level) -> Self {
        Self {
            level,
            prefix: None,
            tokens: Vec::new(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Level::Error).text(text)
    }

    pub fn warn(text: impl Into<String>) -> Self {
        Self::new(Level::Warn).text(text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Level::Info).text(text)
    }

    pub fn verbose(text: impl Into<String>) -> Self {
        Self::new(Level::Verbose).text(text)
    }

    /// Append plain text
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.tokens.push(Token::Text(text.into()));
        self
    }

    /// Append coloured text
    pub fn colored(mut self, text: impl Into<String>, color: Color) -> Self {
        self.tokens.push(Token::Colored(text.into(), color));
        self
    }

    /// Append styled text
    pub fn styled(mut self, text: impl Into<String>, style: Style) -> Self {
        self.tokens.push(Token::Styled(text.into(), style));
        self
    }

    /// Replace the line prefix
    pub fn with_prefix(mut self, prefix: Option<Prefix>) -> Self {
        self.prefix = prefix;
        self
    }

    /// The line without prefix or styling
    pub fn plain_text(&self) -> String {
        self.tokens.iter().map(Token::text).collect()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, "{} | ", prefix.text)?;
        }
        f.write_str(&self.plain_text())
    }
}

/// Destination for console messages
///
/// Implementations must be safe to call from concurrently running steps.
pub trait ConsoleSink: Send + Sync {
    fn write(&self, messages: &[Message]);
}

/// Sink that keeps every message in memory
#[derive(Debug, Default)]
pub struct MemoryConsole {
    messages: Mutex<Vec<Message>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages written so far
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// All messages rendered as plain lines (prefix included)
    pub fn lines(&self) -> Vec<String> {
        self.messages().iter().map(ToString::to_string).collect()
    }

    /// Whether any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl ConsoleSink for MemoryConsole {
    fn write(&self, messages: &[Message]) {
        if let Ok(mut stored) = self.messages.lock() {
            stored.extend_from_slice(messages);
        }
    }
}

/// Colours handed out to parallel steps
pub const PREFIX_PALETTE: [Color; 6] = [
    Color::Cyan,
    Color::Magenta,
    Color::Yellow,
    Color::Blue,
    Color::Green,
    Color::Red,
];

/// Pick the palette colour for a step name
///
/// FNV-1a keeps the choice stable between runs and builds.
pub fn prefix_color(name: &str) -> Color {
    let hash = name.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    });
    PREFIX_PALETTE[(hash % PREFIX_PALETTE.len() as u64) as usize]
}

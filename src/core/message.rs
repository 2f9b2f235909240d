#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn as_str(self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }

    pub fn is_assistant(self) -> bool {
        self == Speaker::Assistant
    }
}

impl AsRef<str> for Speaker {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Speaker {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Speaker::User),
            "assistant" => Ok(Speaker::Assistant),
            _ => Err(format!("invalid speaker role: {value}")),
        }
    }
}

impl From<Speaker> for String {
    fn from(value: Speaker) -> Self {
        value.as_str().to_string()
    }
}

/// How a turn should be drawn by a transcript view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDisplay {
    /// Nothing received yet and more is expected: show a loading indicator.
    Pending,
    /// Finished without any text: draw nothing.
    Blank,
    /// Has text. `copyable` is set only for finished replies.
    Text { copyable: bool },
}

/// One entry in the transcript.
///
/// Text can only grow while the turn is the open assistant turn; everything
/// else about a turn is fixed once it is sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    speaker: Speaker,
    text: String,
    complete: bool,
    interrupted: bool,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            complete: true,
            interrupted: false,
        }
    }

    /// A finished assistant turn, used for app-authored replies such as the
    /// failure notice.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            complete: true,
            interrupted: false,
        }
    }

    pub(crate) fn assistant_placeholder() -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: String::new(),
            complete: false,
            interrupted: false,
        }
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// True when a transport failure cut this reply short.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn is_open(&self) -> bool {
        !self.complete
    }

    pub fn display(&self) -> TurnDisplay {
        match (self.text.is_empty(), self.complete) {
            (true, false) => TurnDisplay::Pending,
            (true, true) => TurnDisplay::Blank,
            (false, complete) => TurnDisplay::Text {
                copyable: complete && !self.interrupted && self.speaker.is_assistant(),
            },
        }
    }

    pub(crate) fn push_text(&mut self, text: &str) {
        debug_assert!(self.is_open(), "text appended to a sealed turn");
        self.text.push_str(text);
    }

    pub(crate) fn seal(&mut self) {
        self.complete = true;
    }

    pub(crate) fn seal_interrupted(&mut self) {
        self.complete = true;
        self.interrupted = true;
    }
}

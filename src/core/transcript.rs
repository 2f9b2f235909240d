//! Ordered turn history for one conversation.
//!
//! Mutation is crate-private so only the session manager can change it; views
//! read through [`Transcript::turns`].

use crate::api::ChatMessage;
use crate::core::message::{Speaker, Turn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Index of the assistant turn still receiving text, if any.
    pub fn open_turn_index(&self) -> Option<usize> {
        match self.turns.last() {
            Some(turn) if turn.is_open() => Some(self.turns.len() - 1),
            _ => None,
        }
    }

    /// At most one open turn, and only as the trailing assistant turn.
    pub fn is_well_formed(&self) -> bool {
        let open: Vec<usize> = self
            .turns
            .iter()
            .enumerate()
            .filter(|(_, turn)| turn.is_open())
            .map(|(index, _)| index)
            .collect();

        match open.as_slice() {
            [] => true,
            [index] => {
                *index == self.turns.len() - 1 && self.turns[*index].speaker().is_assistant()
            }
            _ => false,
        }
    }

    /// Most recent assistant reply eligible for the copy affordance.
    pub fn last_copyable_reply(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|turn| {
            turn.speaker().is_assistant() && turn.is_complete() && !turn.is_interrupted()
        })
    }

    /// Request context: every turn reduced to role and content, as-is.
    pub fn to_api_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .map(|turn| ChatMessage {
                role: turn.speaker().as_str().to_string(),
                content: turn.text().to_string(),
            })
            .collect()
    }

    pub(crate) fn push_user(&mut self, text: impl Into<String>) -> usize {
        debug_assert!(self.open_turn_index().is_none());
        self.turns.push(Turn::user(text));
        self.turns.len() - 1
    }

    pub(crate) fn push_assistant(&mut self, text: impl Into<String>) -> usize {
        debug_assert!(self.open_turn_index().is_none());
        self.turns.push(Turn::assistant(text));
        self.turns.len() - 1
    }

    pub(crate) fn open_assistant_turn(&mut self) -> usize {
        debug_assert!(self.open_turn_index().is_none());
        self.turns.push(Turn::assistant_placeholder());
        self.turns.len() - 1
    }

    pub(crate) fn append_to_open_turn(&mut self, text: &str) -> Option<usize> {
        let index = self.open_turn_index()?;
        self.turns[index].push_text(text);
        Some(index)
    }

    pub(crate) fn seal_open_turn(&mut self) -> Option<usize> {
        let index = self.open_turn_index()?;
        self.turns[index].seal();
        Some(index)
    }

    pub(crate) fn interrupt_open_turn(&mut self) -> Option<usize> {
        let index = self.open_turn_index()?;
        self.turns[index].seal_interrupted();
        Some(index)
    }

    pub(crate) fn clear(&mut self) {
        self.turns.clear();
    }
}

pub fn speaker_label(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::User => "You",
        Speaker::Assistant => "Varys",
    }
}

use std::collections::VecDeque;

/// Names waiting to be played, strictly first in, first out.
///
/// Entries are resolved against the library when popped, not when pushed.
#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    names: VecDeque<String>,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, name: impl Into<String>) {
        self.names.push_back(name.into());
    }

    pub fn pop_front(&mut self) -> Option<String> {
        self.names.pop_front()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

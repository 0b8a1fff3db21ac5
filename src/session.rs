/// Per-UI masking state. Starts masked; only a successful reveal unmasks it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    revealed: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Record which query variant the grid is currently showing.
    pub(crate) fn set_revealed(&mut self, revealed: bool) {
        self.revealed = revealed;
    }
}

use coopsweeper_protocol::{Cursor, ParticipantId, UserView};

/// One connected user inside a room.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub identity: ParticipantId,
    pub username: String,
    pub cursor: Cursor,
    /// Cells this participant revealed on the current board.
    pub squares_cleared: u32,
}

impl Participant {
    /// A fresh participant: cursor off the board, nothing cleared.
    pub fn new(identity: ParticipantId, username: impl Into<String>) -> Self {
        Self {
            identity,
            username: username.into(),
            cursor: Cursor::default(),
            squares_cleared: 0,
        }
    }

    pub fn view(&self) -> UserView {
        UserView {
            username: self.username.clone(),
            cursor: self.cursor,
            squares_cleared: self.squares_cleared,
        }
    }
}

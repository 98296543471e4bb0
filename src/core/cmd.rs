use serde::{Deserialize, Serialize};

use crate::core::state::feed::PageRequest;

/// Side effects requested by the pure state layer.
/// Cmd captures what to do; the runner in `integration` decides how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cmd {
    /// Ask the fetch collaborator for one page
    FetchPage(PageRequest),
    /// The session is no longer valid; the host should log out
    InvalidateSession,

    LogError {
        message: String,
    },
    LogInfo {
        message: String,
    },

    // Batch command (execute multiple commands together)
    Batch(Vec<Cmd>),

    // Do nothing
    None,
}

impl Cmd {
    /// Combine multiple commands into one
    pub fn batch(commands: Vec<Cmd>) -> Cmd {
        let mut commands = commands;
        match commands.len() {
            0 => Cmd::None,
            1 => commands.pop().unwrap_or(Cmd::None),
            _ => Cmd::Batch(commands),
        }
    }

    /// Flatten nested batches into a single list, dropping `None`
    pub fn flatten(self) -> Vec<Cmd> {
        match self {
            Cmd::Batch(cmds) => cmds.into_iter().flat_map(Cmd::flatten).collect(),
            Cmd::None => vec![],
            other => vec![other],
        }
    }
}

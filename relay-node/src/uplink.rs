//! Single-slot staging area for the next outbound command.
//!
//! The endpoint only ever reports its newest state, so a fresh command
//! replaces whatever is still waiting.  This must stay a single slot: a
//! backlog of stale status frames would burn duty-cycle for nothing.

use tracing::debug;

use crate::codec::Command;

#[derive(Debug, Default)]
pub struct UplinkSlot {
    pending: Option<Command>,
}

impl UplinkSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `cmd`, returning the command it superseded (if any).
    pub fn replace(&mut self, cmd: Command) -> Option<Command> {
        let old = self.pending.replace(cmd);
        if let Some(old) = &old {
            debug!(superseded = old.name(), "uplink slot overwritten");
        }
        old
    }

    pub fn peek(&self) -> Option<&Command> {
        self.pending.as_ref()
    }

    /// Drain the slot after the frame was handed to the MAC.
    pub fn take(&mut self) -> Option<Command> {
        self.pending.take()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_command_supersedes_older() {
        let mut slot = UplinkSlot::new();
        assert!(slot.is_empty());
        assert_eq!(slot.replace(Command::Start { my_time: 1 }), None);

        let old = slot.replace(Command::Start { my_time: 2 });
        assert_eq!(old, Some(Command::Start { my_time: 1 }));
        assert_eq!(slot.peek(), Some(&Command::Start { my_time: 2 }));
    }

    #[test]
    fn take_empties_the_slot() {
        let mut slot = UplinkSlot::new();
        slot.replace(Command::Start { my_time: 1 });
        assert!(slot.take().is_some());
        assert!(slot.is_empty());
        assert!(slot.take().is_none());
    }
}

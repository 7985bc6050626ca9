use crate::Command;

/// Handles a command against the record and event stores.
///
/// The trait makes **no storage assumptions**: implementations own the stores they
/// write to, and the output/error types are theirs to choose. A handler keeps no state
/// between calls; each command carries everything needed to execute it.
pub trait CommandHandler {
    type Cmd: Command;
    type Output;
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn handle(&self, command: &Self::Cmd) -> Result<Self::Output, Self::Error>;
}

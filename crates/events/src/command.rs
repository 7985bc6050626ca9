use herdbook_core::AnimalId;

/// A command issued by the operator (command abstraction).
///
/// Commands represent **intent** ("sell A1 and A2", "register B7"). They are transient:
/// the handler validates them and turns accepted ones into row writes and ledger entries.
/// A rejected command is handed back untouched so the input can be corrected.
///
/// Commands replace any notion of a process-wide "current action": everything a handler
/// needs travels inside the command value.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable command name for logs (e.g. "register_animal").
    fn name(&self) -> &'static str;

    /// The single animal this command addresses, if any.
    ///
    /// Batch commands (a sale of several animals) and herd-level events return `None`.
    fn target_animal(&self) -> Option<&AnimalId>;
}

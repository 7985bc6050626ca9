//! Session wiring for the `herdbook` binary.
//!
//! A session is opened once per process: settings and credentials are resolved from the
//! working directory, the store is opened and both sheets are provisioned. Everything
//! after that goes through the session's command dispatcher.

pub mod dashboard;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use herdbook_infra::config::{self, Settings};
use herdbook_infra::{
    AnimalRegistry, CommandDispatcher, EventLedger, Feedback, HerdCommand, HerdResult, HerdSnapshot,
    ImgbbHost, LedgerSnapshot, PhotoHost, PhotoResolver, ReconcileMode, ReconciliationReport,
    SheetsStore, TabularStore, reconcile,
};

/// Everything the dashboard shows, read in one pass.
#[derive(Debug, Clone)]
pub struct Overview {
    pub herd: HerdSnapshot,
    pub ledger: LedgerSnapshot,
    pub reconciliation: ReconciliationReport,
}

#[derive(Debug)]
pub struct Session<S, H> {
    dispatcher: CommandDispatcher<S, H>,
}

impl Session<Arc<SheetsStore>, Option<ImgbbHost>> {
    /// Open the configured spreadsheet using the credentials found under `root`.
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        let settings = Settings::load(root).context("loading settings")?;
        let key = config::resolve_credentials(root).context("resolving credentials")?;
        let store_id = settings.store_id()?;
        let store = SheetsStore::open(store_id, &key)
            .with_context(|| format!("opening store {store_id}"))?;

        let host = match &settings.photo.api_key {
            Some(api_key) => Some(ImgbbHost::new(settings.photo.endpoint.clone(), api_key.clone())?),
            None => {
                tracing::warn!("no photo api key configured; photo uploads will be marked as errors");
                None
            }
        };

        Ok(Self::assemble(Arc::new(store), &settings, host)?)
    }
}

impl<S, H> Session<S, H>
where
    S: TabularStore + Clone,
    H: PhotoHost,
{
    /// Build a session over an already opened store and provision both sheets.
    pub fn assemble(store: S, settings: &Settings, host: H) -> HerdResult<Self> {
        let registry = AnimalRegistry::new(store.clone(), settings.animals_sheet.clone());
        let ledger = EventLedger::new(store, settings.ledger_sheet.clone());
        registry.ensure_provisioned()?;
        ledger.ensure_provisioned()?;

        Ok(Self {
            dispatcher: CommandDispatcher::new(registry, ledger, PhotoResolver::new(host)),
        })
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<S, H> {
        &self.dispatcher
    }

    pub fn handle(&self, command: &HerdCommand) -> Feedback {
        self.dispatcher.respond(command)
    }

    /// Fresh snapshots of both sheets plus a report-only reconciliation.
    pub fn overview(&self) -> HerdResult<Overview> {
        let registry = self.dispatcher.registry();
        let ledger = self.dispatcher.ledger();
        Ok(Overview {
            herd: registry.load()?,
            ledger: ledger.load()?,
            reconciliation: reconcile(registry, ledger, ReconcileMode::ReportOnly)?,
        })
    }
}

/// Open the session under `root` and print the dashboard.
pub fn run(root: &Path) -> anyhow::Result<()> {
    let session = Session::open(root)?;
    let overview = session.overview().context("reading the store")?;
    print!("{}", dashboard::render(&overview));
    Ok(())
}

use crate::config::{Config, TargetCountries};
use crate::notifier::{Notifier, NotifyError};
use crate::parser::parse_availability_rows;
use crate::source::{PageSource, SourceError};
use crate::state::{SlotState, StateError, StateStore};
use crate::types::{AvailabilityRow, NotificationEvent};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Availability page unavailable: {0}")]
    Source(#[from] SourceError),
    #[error("Notification delivery failed: {0}")]
    Notify(#[from] NotifyError),
    #[error("Could not persist state: {0}")]
    State(#[from] StateError),
}

/// Result of matching one page worth of rows against the target countries.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Keys of target countries present on the page, in document order.
    pub matched: Vec<String>,
    pub events: Vec<NotificationEvent>,
}

/// Matches `rows` against `targets`, recording the text of every matched
/// country in `state` whether or not it is an open slot.
///
/// There is no comparison with the previous value: an open slot produces an
/// event on every run that sees it.
pub fn evaluate_rows<I>(
    rows: I,
    targets: &TargetCountries,
    city: &str,
    source_url: &str,
    state: &mut SlotState,
) -> Evaluation
where
    I: IntoIterator<Item = AvailabilityRow>,
{
    let mut evaluation = Evaluation::default();

    for row in rows {
        if !targets.contains(&row.country_key) {
            continue;
        }

        log::info!(
            "{}: {}",
            row.country_key,
            if row.earliest_availability.is_empty() {
                "<no date shown>"
            } else {
                row.earliest_availability.as_str()
            }
        );
        if let Some(previous) = state.get(&row.country_key) {
            log::debug!("{} previously showed {:?}", row.country_key, previous);
        }

        if let Some(event) = NotificationEvent::from_row(&row, city, source_url) {
            evaluation.events.push(event);
        }
        evaluation.matched.push(row.country_key.clone());
        state.insert(row.country_key, row.earliest_availability);
    }

    evaluation
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub rows: usize,
    pub matched: Vec<String>,
    pub notified: usize,
}

/// Runs the whole check for one city: fetch, extract, match, alert, persist.
pub struct SlotWatcher {
    config: Config,
    source: PageSource,
    notifier: Notifier,
    store: StateStore,
}

impl SlotWatcher {
    pub fn new(config: Config, source: PageSource, notifier: Notifier) -> Self {
        let store = StateStore::new(config.state_file.clone());
        Self {
            config,
            source,
            notifier,
            store,
        }
    }

    /// Any source or delivery failure aborts the run before the state file is
    /// touched, so a partially alerted run persists nothing.
    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let config = &self.config;
        log::info!(
            "Checking {} ({}) for {} via {}",
            config.page.city_slug,
            config.page.visa_type,
            config.target_countries,
            self.source
        );

        let html = self.source.get_document().await?;
        let rows = parse_availability_rows(&html);
        let row_count = rows.len();

        let mut state = self.store.load();
        let evaluation = evaluate_rows(
            rows,
            &config.target_countries,
            config.city_slug(),
            &config.page_url(),
            &mut state,
        );

        if evaluation.matched.is_empty() {
            log::warn!(
                "None of the target countries ({}) appear among {} row(s)",
                config.target_countries,
                row_count
            );
        } else {
            for target in config.target_countries.iter() {
                if !evaluation.matched.iter().any(|m| m == target) {
                    log::info!("{} is not listed for {}", target, config.city_slug());
                }
            }
        }

        for event in &evaluation.events {
            self.notifier.notify(event).await?;
        }

        self.store.save(&state)?;

        Ok(RunSummary {
            rows: row_count,
            notified: evaluation.events.len(),
            matched: evaluation.matched,
        })
    }
}

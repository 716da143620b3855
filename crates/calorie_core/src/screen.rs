//! Calorie screen orchestration.
//!
//! # Responsibility
//! - Wire the record store, grouped index, change notifier and chart of one
//!   display surface together.
//! - Translate prompt submissions and row deletions into store mutations,
//!   change batches and bus events.
//!
//! # Invariants
//! - Every mutation reaches the store before the index and the subscriber.
//! - Once the store accepted a mutation, the bus event is published and the
//!   chart refreshed even if the subscriber rejects the batch.
//! - A subscriber that rejected a batch receives a full reload with the next
//!   delivery.
//! - The chart series is newest first in every grouping mode.
//! - The bus subscription lives exactly as long as the screen.

use crate::events::{AppContext, AppEvent, Subscription};
use crate::index::{GroupedIndex, GroupingMode, Mutation};
use crate::input::{parse_calorie_input, InputError};
use crate::model::entry::{cmp_by_timeline, now_epoch_ms, Entry, EntryId};
use crate::notify::{
    ChangeBatch, ChangeNotifier, ChangeSubscriber, IndexPath, NotifyError, SubscriberId,
};
use crate::repo::entry_repo::{EntryRepository, RepoError};
use crate::series::{extract, ChartSurface};
use crate::service::record_store::RecordStore;
use log::{info, warn};
use std::cell::Cell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Errors surfaced by screen operations.
#[derive(Debug)]
pub enum ScreenError {
    /// Prompt text was rejected before reaching the store.
    Input(InputError),
    /// Store read/write failure.
    Store(RepoError),
    /// The display surface could not apply a change batch.
    Notify(NotifyError),
    /// No row at the requested position.
    RowOutOfRange(IndexPath),
    /// The store accepted the mutation but the display could not follow.
    /// The entry is saved; retrying would duplicate it.
    ViewOutOfSync {
        entry: Entry,
        cause: Box<ScreenError>,
    },
}

impl Display for ScreenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Notify(err) => write!(f, "{err}"),
            Self::RowOutOfRange(path) => write!(f, "no entry at row {path}"),
            Self::ViewOutOfSync { entry, cause } => {
                write!(f, "entry {} saved but the view is out of sync: {cause}", entry.id)
            }
        }
    }
}

impl Error for ScreenError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Input(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Notify(err) => Some(err),
            Self::RowOutOfRange(_) => None,
            Self::ViewOutOfSync { cause, .. } => Some(cause.as_ref()),
        }
    }
}

impl From<InputError> for ScreenError {
    fn from(value: InputError) -> Self {
        Self::Input(value)
    }
}

impl From<RepoError> for ScreenError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

impl From<NotifyError> for ScreenError {
    fn from(value: NotifyError) -> Self {
        Self::Notify(value)
    }
}

/// One calorie list screen: sectioned rows plus a chart.
pub struct CalorieScreen<R: EntryRepository> {
    store: RecordStore<R>,
    index: GroupedIndex,
    notifier: ChangeNotifier,
    context: AppContext,
    chart: Box<dyn ChartSurface>,
    series: Vec<f64>,
    chart_stale: Rc<Cell<bool>>,
    last_batch: ChangeBatch,
    subscriber_stale: bool,
    _entry_events: Subscription,
}

impl<R: EntryRepository> CalorieScreen<R> {
    /// Builds the screen and subscribes it to entry events on `context`.
    ///
    /// Call `load` before reading sections.
    pub fn new(
        store: RecordStore<R>,
        context: &AppContext,
        mode: GroupingMode,
        chart: impl ChartSurface + 'static,
    ) -> Self {
        let chart_stale = Rc::new(Cell::new(true));
        let stale = Rc::clone(&chart_stale);
        let entry_events = context.bus.subscribe(move |event| match event {
            AppEvent::EntryCreated | AppEvent::EntryDeleted => stale.set(true),
        });

        Self {
            store,
            index: GroupedIndex::new(mode),
            notifier: ChangeNotifier::new(),
            context: context.clone(),
            chart: Box::new(chart),
            series: Vec::new(),
            chart_stale,
            last_batch: ChangeBatch::default(),
            subscriber_stale: false,
            _entry_events: entry_events,
        }
    }

    /// Attaches the display surface's change subscriber.
    pub fn attach_subscriber(
        &mut self,
        subscriber: impl ChangeSubscriber + 'static,
    ) -> Result<SubscriberId, ScreenError> {
        let id = self.notifier.subscribe(subscriber)?;
        self.subscriber_stale = !self.index.is_empty();
        Ok(id)
    }

    pub fn detach_subscriber(
        &mut self,
        id: SubscriberId,
    ) -> Result<Box<dyn ChangeSubscriber>, ScreenError> {
        Ok(self.notifier.unsubscribe(id)?)
    }

    /// Loads every stored entry, notifies the subscriber and draws the chart.
    pub fn load(&mut self) -> Result<(), ScreenError> {
        let entries = self.store.list_all()?;
        let batch = self.index.rebuild(entries);
        self.last_batch = batch;
        self.chart_stale.set(true);
        let delivered = self.deliver_last_batch();
        self.refresh_chart_if_stale();
        info!(
            "event=screen_load module=screen status=ok entries={} sections={}",
            self.index.len(),
            self.index.section_count()
        );
        delivered
    }

    /// Handles the prompt's Submit action.
    ///
    /// # Errors
    /// - `ScreenError::Input` when the text is empty, non-numeric or not
    ///   positive; nothing is stored in that case.
    pub fn submit_input(&mut self, text: &str) -> Result<Entry, ScreenError> {
        let calories = parse_calorie_input(text).map_err(|err| {
            warn!(
                "event=entry_submit module=screen status=rejected reason={}",
                err.code()
            );
            ScreenError::from(err)
        })?;
        self.submit_calories(calories, now_epoch_ms())
    }

    /// Appends an already-validated amount with an explicit timestamp.
    pub fn submit_calories(
        &mut self,
        calories: f64,
        timestamp_ms: i64,
    ) -> Result<Entry, ScreenError> {
        let entry = self.store.append(calories, timestamp_ms)?;
        let mirrored = self.mirror_mutation(Mutation::Inserted(entry.clone()));
        self.context.bus.publish(AppEvent::EntryCreated);
        self.refresh_chart_if_stale();
        match mirrored {
            Ok(()) => Ok(entry),
            Err(cause) => Err(ScreenError::ViewOutOfSync {
                entry,
                cause: Box::new(cause),
            }),
        }
    }

    /// Handles the row delete action.
    pub fn delete_row(&mut self, section: usize, row: usize) -> Result<Entry, ScreenError> {
        let path = IndexPath::new(section, row);
        let id = self
            .index
            .entry_at(section, row)
            .map(|entry| entry.id)
            .ok_or(ScreenError::RowOutOfRange(path))?;
        self.delete_entry(id)?
            .ok_or(ScreenError::RowOutOfRange(path))
    }

    /// Deletes by id; `Ok(None)` when the store has no such entry.
    pub fn delete_entry(&mut self, id: EntryId) -> Result<Option<Entry>, ScreenError> {
        let Some(entry) = self.store.delete(id)? else {
            return Ok(None);
        };
        let mirrored = self.mirror_mutation(Mutation::Deleted(entry.clone()));
        self.context.bus.publish(AppEvent::EntryDeleted);
        self.refresh_chart_if_stale();
        match mirrored {
            Ok(()) => Ok(Some(entry)),
            Err(cause) => Err(ScreenError::ViewOutOfSync {
                entry,
                cause: Box::new(cause),
            }),
        }
    }

    /// Resets the subscriber and delivers the whole current layout.
    pub fn resync_subscriber(&mut self) -> Result<(), ScreenError> {
        self.subscriber_stale = true;
        self.deliver_last_batch()
    }

    fn mirror_mutation(&mut self, mutation: Mutation) -> Result<(), ScreenError> {
        let batch = match self.index.apply(&mutation) {
            Ok(batch) => batch,
            Err(err) => {
                warn!("event=index_apply module=screen status=resync error={err}");
                let entries = self.store.list_all().map_err(|err| {
                    self.subscriber_stale = true;
                    err
                })?;
                self.index.rebuild(entries)
            }
        };
        self.last_batch = batch;
        self.deliver_last_batch()
    }

    /// Delivers `last_batch`, or a full reload while the subscriber is stale.
    fn deliver_last_batch(&mut self) -> Result<(), ScreenError> {
        let delivered = if self.subscriber_stale {
            self.notifier.reload(&self.index.snapshot())
        } else {
            self.notifier.deliver(&self.last_batch)
        };
        match delivered {
            Ok(_) => {
                self.subscriber_stale = false;
                Ok(())
            }
            Err(err) => {
                warn!("event=subscriber_sync module=screen status=stale error={err}");
                self.subscriber_stale = true;
                Err(err.into())
            }
        }
    }

    fn refresh_chart_if_stale(&mut self) {
        if !self.chart_stale.replace(false) {
            return;
        }
        let mut newest_first: Vec<&Entry> = self.index.entries().iter().collect();
        if self.index.mode() != GroupingMode::Timeline {
            newest_first.sort_by(|a, b| cmp_by_timeline(a, b));
        }
        self.series = extract(newest_first);
        self.chart.render(&self.series);
    }

    /// Whether the subscriber missed a batch and awaits a full reload.
    pub fn subscriber_stale(&self) -> bool {
        self.subscriber_stale
    }

    pub fn section_count(&self) -> usize {
        self.index.section_count()
    }

    pub fn row_count(&self, section: usize) -> usize {
        self.index.row_count(section)
    }

    pub fn section_title(&self, section: usize) -> Option<String> {
        self.index.section_title(section)
    }

    pub fn entry_at(&self, section: usize, row: usize) -> Option<&Entry> {
        self.index.entry_at(section, row)
    }

    /// Series currently drawn by the chart, in row order.
    pub fn chart_series(&self) -> &[f64] {
        &self.series
    }

    /// Batch produced by the most recent load or mutation.
    pub fn last_batch(&self) -> &ChangeBatch {
        &self.last_batch
    }

    pub fn index(&self) -> &GroupedIndex {
        &self.index
    }

    pub fn store(&self) -> &RecordStore<R> {
        &self.store
    }
}

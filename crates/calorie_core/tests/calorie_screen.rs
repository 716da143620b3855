use calorie_core::db::open_db_in_memory;
use calorie_core::{
    AppContext, AppEvent, CalorieScreen, ChangeEvent, ChangeSubscriber, ChartSurface,
    GroupingMode, IndexPath, NotifyError, RecordStore, ScreenError, SqliteEntryRepository,
    TableMirror, ThresholdDietPolicy,
};
use rusqlite::Connection;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Default)]
struct ChartRecorder {
    renders: Vec<Vec<f64>>,
}

impl ChartSurface for ChartRecorder {
    fn render(&mut self, series: &[f64]) {
        self.renders.push(series.to_vec());
    }
}

struct Fixture {
    context: AppContext,
    chart: Rc<RefCell<ChartRecorder>>,
    mirror: Rc<RefCell<TableMirror>>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            context: AppContext::new(),
            chart: Rc::new(RefCell::new(ChartRecorder::default())),
            mirror: Rc::new(RefCell::new(TableMirror::new())),
        }
    }

    fn screen<'conn>(&self, conn: &'conn Connection) -> CalorieScreen<SqliteEntryRepository<'conn>> {
        self.screen_in(conn, GroupingMode::default())
    }

    fn screen_in<'conn>(
        &self,
        conn: &'conn Connection,
        mode: GroupingMode,
    ) -> CalorieScreen<SqliteEntryRepository<'conn>> {
        let mut screen = unattached_screen(conn, &self.context, mode, Rc::clone(&self.chart));
        screen.attach_subscriber(Rc::clone(&self.mirror)).unwrap();
        screen.load().unwrap();
        screen
    }

    fn assert_mirror_matches(&self, screen: &CalorieScreen<SqliteEntryRepository<'_>>) {
        assert_eq!(
            self.mirror.borrow().sections(),
            screen.index().section_ids().as_slice()
        );
    }
}

fn unattached_screen<'conn>(
    conn: &'conn Connection,
    context: &AppContext,
    mode: GroupingMode,
    chart: impl ChartSurface + 'static,
) -> CalorieScreen<SqliteEntryRepository<'conn>> {
    let store = RecordStore::new(
        SqliteEntryRepository::new(conn),
        ThresholdDietPolicy::default(),
    );
    CalorieScreen::new(store, context, mode, chart)
}

#[test]
fn two_levels_then_delete_first_entry() {
    for mode in [GroupingMode::default(), GroupingMode::ByLevel] {
        let conn = open_db_in_memory().unwrap();
        let fixture = Fixture::new();
        let mut screen = fixture.screen_in(&conn, mode);

        let first = screen.submit_calories(500.0, 1_000).unwrap();
        let second = screen.submit_calories(200.0, 2_000).unwrap();

        assert_eq!(screen.section_count(), 2);
        assert_eq!(screen.row_count(0), 1);
        assert_eq!(screen.row_count(1), 1);
        let mut titles: Vec<String> = (0..2)
            .filter_map(|section| screen.section_title(section))
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["Cut", "Maintain"]);
        fixture.assert_mirror_matches(&screen);

        let path = screen.index().position_of(first.id).unwrap();
        let removed = screen.delete_row(path.section, path.row).unwrap();
        assert_eq!(removed.id, first.id);

        assert_eq!(screen.section_count(), 1);
        assert_eq!(screen.entry_at(0, 0).map(|entry| entry.id), Some(second.id));
        assert_eq!(
            screen.last_batch().events(),
            &[
                ChangeEvent::RowDeleted { path, id: first.id },
                ChangeEvent::SectionDeleted(path.section),
            ]
        );
        fixture.assert_mirror_matches(&screen);
        assert_eq!(screen.store().count().unwrap(), 1);
    }
}

#[test]
fn default_screen_lists_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let fixture = Fixture::new();
    let mut screen = fixture.screen(&conn);

    screen.submit_calories(500.0, 1).unwrap();
    screen.submit_calories(650.0, 3).unwrap();
    screen.submit_calories(200.0, 2).unwrap();

    let timestamps: Vec<i64> = screen
        .index()
        .entries()
        .iter()
        .map(|entry| entry.timestamp_ms)
        .collect();
    assert_eq!(timestamps, vec![3, 2, 1]);
    assert_eq!(screen.section_title(0).as_deref(), Some("Maintain"));
    assert_eq!(screen.section_title(1).as_deref(), Some("Cut"));
    assert_eq!(screen.section_title(2).as_deref(), Some("Maintain"));
}

#[test]
fn chart_series_is_newest_first_in_every_mode() {
    for mode in [GroupingMode::Timeline, GroupingMode::ByLevel] {
        let conn = open_db_in_memory().unwrap();
        let fixture = Fixture::new();
        let mut screen = fixture.screen_in(&conn, mode);

        screen.submit_calories(500.0, 1).unwrap();
        let cut = screen.submit_calories(200.0, 2).unwrap();
        screen.submit_calories(650.0, 3).unwrap();
        assert_eq!(screen.chart_series(), &[650.0, 200.0, 500.0]);

        screen.delete_entry(cut.id).unwrap();
        assert_eq!(screen.chart_series(), &[650.0, 500.0]);

        let chart = fixture.chart.borrow();
        let renders = &chart.renders;
        assert_eq!(renders.first(), Some(&Vec::new()));
        assert_eq!(renders.last(), Some(&vec![650.0, 500.0]));
        assert_eq!(renders.len(), 5);
    }
}

/// Subscriber that rejects every event while `failing` is set.
struct Flaky {
    mirror: TableMirror,
    failing: Rc<Cell<bool>>,
}

impl ChangeSubscriber for Flaky {
    fn reset(&mut self) {
        self.mirror.reset();
    }

    fn begin_batch(&mut self) {
        self.mirror.begin_batch();
    }

    fn apply_event(&mut self, event: &ChangeEvent) -> Result<(), NotifyError> {
        if self.failing.get() {
            return Err(NotifyError::Inconsistent("display refused".to_string()));
        }
        self.mirror.apply_event(event)
    }

    fn end_batch(&mut self) -> Result<(), NotifyError> {
        self.mirror.end_batch()
    }
}

#[test]
fn rejected_batch_still_commits_publishes_and_recovers() {
    let conn = open_db_in_memory().unwrap();
    let context = AppContext::new();
    let chart = Rc::new(RefCell::new(ChartRecorder::default()));
    let failing = Rc::new(Cell::new(false));
    let flaky = Rc::new(RefCell::new(Flaky {
        mirror: TableMirror::new(),
        failing: Rc::clone(&failing),
    }));
    let mut screen = unattached_screen(&conn, &context, GroupingMode::default(), Rc::clone(&chart));
    screen.attach_subscriber(Rc::clone(&flaky)).unwrap();
    screen.load().unwrap();
    screen.submit_calories(500.0, 1).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _subscription = context
        .bus
        .subscribe(move |event| sink.borrow_mut().push(event));

    failing.set(true);
    let (entry, cause) = match screen.submit_calories(200.0, 2) {
        Err(ScreenError::ViewOutOfSync { entry, cause }) => (entry, cause),
        other => panic!("unexpected result: {other:?}"),
    };
    assert_eq!(entry.calories, 200.0);
    assert!(matches!(*cause, ScreenError::Notify(NotifyError::Inconsistent(_))));

    assert_eq!(screen.store().count().unwrap(), 2);
    assert_eq!(screen.index().len(), 2);
    assert_eq!(*seen.borrow(), vec![AppEvent::EntryCreated]);
    assert_eq!(chart.borrow().renders.last(), Some(&vec![200.0, 500.0]));
    assert!(screen.subscriber_stale());

    failing.set(false);
    screen.submit_calories(650.0, 3).unwrap();
    assert!(!screen.subscriber_stale());
    assert_eq!(
        flaky.borrow().mirror.sections(),
        screen.index().section_ids().as_slice()
    );
}

#[test]
fn resync_subscriber_replays_current_layout() {
    let conn = open_db_in_memory().unwrap();
    let context = AppContext::new();
    let failing = Rc::new(Cell::new(false));
    let flaky = Rc::new(RefCell::new(Flaky {
        mirror: TableMirror::new(),
        failing: Rc::clone(&failing),
    }));
    let chart = Rc::new(RefCell::new(ChartRecorder::default()));
    let mut screen = unattached_screen(&conn, &context, GroupingMode::default(), chart);
    screen.attach_subscriber(Rc::clone(&flaky)).unwrap();
    screen.load().unwrap();

    failing.set(true);
    let err = screen.submit_input("320").unwrap_err();
    assert!(matches!(err, ScreenError::ViewOutOfSync { .. }));

    failing.set(false);
    screen.resync_subscriber().unwrap();
    assert_eq!(
        flaky.borrow().mirror.sections(),
        screen.index().section_ids().as_slice()
    );
    assert_eq!(screen.store().count().unwrap(), 1);
}

#[test]
fn rejected_input_leaves_store_and_view_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let fixture = Fixture::new();
    let mut screen = fixture.screen(&conn);
    screen.submit_input("420").unwrap();
    let batches_before = fixture.mirror.borrow().applied_batches();

    for text in ["", "   ", "abc", "0", "-5", "NaN"] {
        let err = screen.submit_input(text).unwrap_err();
        assert!(matches!(err, ScreenError::Input(_)), "accepted `{text}`");
    }

    assert_eq!(screen.store().count().unwrap(), 1);
    assert_eq!(screen.index().len(), 1);
    assert_eq!(fixture.mirror.borrow().applied_batches(), batches_before);
}

#[test]
fn mutations_publish_bus_events() {
    let conn = open_db_in_memory().unwrap();
    let fixture = Fixture::new();
    let mut screen = fixture.screen(&conn);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _subscription = fixture
        .context
        .bus
        .subscribe(move |event| sink.borrow_mut().push(event));

    let entry = screen.submit_input(" 1250 ").unwrap();
    screen.delete_entry(entry.id).unwrap();
    assert_eq!(screen.delete_entry(entry.id).unwrap(), None);

    assert_eq!(
        *seen.borrow(),
        vec![AppEvent::EntryCreated, AppEvent::EntryDeleted]
    );
}

#[test]
fn delete_row_out_of_range_is_reported() {
    let conn = open_db_in_memory().unwrap();
    let fixture = Fixture::new();
    let mut screen = fixture.screen(&conn);
    screen.submit_calories(500.0, 1).unwrap();

    let err = screen.delete_row(0, 3).unwrap_err();
    assert!(matches!(err, ScreenError::RowOutOfRange(path) if path == IndexPath::new(0, 3)));
    assert_eq!(screen.store().count().unwrap(), 1);
}

#[test]
fn second_screen_sees_entries_after_load() {
    let conn = open_db_in_memory().unwrap();
    let fixture = Fixture::new();
    let mut writer = fixture.screen(&conn);
    writer.submit_calories(500.0, 1).unwrap();
    writer.submit_calories(1_100.0, 2).unwrap();

    let reader_fixture = Fixture::new();
    let reader = reader_fixture.screen(&conn);

    assert_eq!(reader.section_count(), 2);
    assert_eq!(reader.index().section_ids(), writer.index().section_ids());
    reader_fixture.assert_mirror_matches(&reader);
}

#[test]
fn dropping_screen_releases_bus_subscription() {
    let conn = open_db_in_memory().unwrap();
    let fixture = Fixture::new();
    let screen = fixture.screen(&conn);
    assert_eq!(fixture.context.bus.handler_count(), 1);

    drop(screen);
    assert_eq!(fixture.context.bus.handler_count(), 0);
}

//! Chart series extraction.
//!
//! # Responsibility
//! - Reduce presented entries to the numeric series fed to a chart.
//!
//! # Invariants
//! - `extract` is total and keeps input order and length.

use crate::model::entry::Entry;
use log::warn;
use std::cell::RefCell;
use std::rc::Rc;

/// Rendering surface for a bar chart. Drawing is the implementor's concern.
pub trait ChartSurface {
    fn render(&mut self, series: &[f64]);
}

/// Shared chart owned jointly with its host.
///
/// When the host still borrows the cell, the frame is skipped and logged
/// instead of panicking; the next refresh draws the current series.
impl<C: ChartSurface + ?Sized> ChartSurface for Rc<RefCell<C>> {
    fn render(&mut self, series: &[f64]) {
        match self.try_borrow_mut() {
            Ok(mut chart) => chart.render(series),
            Err(_) => warn!(
                "event=chart_render module=series status=skipped reason=busy points={}",
                series.len()
            ),
        }
    }
}

/// One calorie value per entry, in the order given.
pub fn extract<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Vec<f64> {
    entries.into_iter().map(|entry| entry.calories).collect()
}

/// Aggregate figures used to scale a chart.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SeriesSummary {
    pub count: usize,
    pub total: f64,
    pub max: f64,
}

/// Summarizes a series; an empty series yields all zeros.
pub fn summarize(series: &[f64]) -> SeriesSummary {
    series.iter().fold(SeriesSummary::default(), |summary, value| SeriesSummary {
        count: summary.count + 1,
        total: summary.total + value,
        max: summary.max.max(*value),
    })
}

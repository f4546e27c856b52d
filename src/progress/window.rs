use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Period a progress view covers, anchored on any date inside it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind", content = "anchor")]
pub enum ProgressWindow {
    /// ISO week, Monday through Sunday.
    Week(NaiveDate),
    /// Calendar month, 1st through the last day.
    Month(NaiveDate),
}

impl ProgressWindow {
    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        match *self {
            ProgressWindow::Week(anchor) => {
                let start = walk_back_to(anchor, |d| d.weekday() == Weekday::Mon);
                let end = walk_forward_while(start, |d| d.weekday() != Weekday::Mon);
                (start, end)
            }
            ProgressWindow::Month(anchor) => {
                let start = walk_back_to(anchor, |d| d.day() == 1);
                let end = walk_forward_while(start, |d| d.month() == anchor.month());
                (start, end)
            }
        }
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        let (start, end) = self.range();
        start.iter_days().take_while(|d| *d <= end).collect()
    }

    /// "Mon".."Sun" for a week, "1".."31" for a month.
    pub fn labels(&self) -> Vec<String> {
        match self {
            ProgressWindow::Week(_) => self
                .days()
                .iter()
                .map(|d| d.format("%a").to_string())
                .collect(),
            ProgressWindow::Month(_) => self.days().iter().map(|d| d.day().to_string()).collect(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let (start, end) = self.range();
        start <= date && date <= end
    }
}

fn walk_back_to(mut date: NaiveDate, done: impl Fn(NaiveDate) -> bool) -> NaiveDate {
    while !done(date) {
        match date.pred_opt() {
            Some(prev) => date = prev,
            None => break,
        }
    }
    date
}

/// Last date reachable from `start` whose successor still satisfies `keep`.
fn walk_forward_while(start: NaiveDate, keep: impl Fn(NaiveDate) -> bool) -> NaiveDate {
    let mut date = start;
    while let Some(next) = date.succ_opt() {
        if !keep(next) {
            break;
        }
        date = next;
    }
    date
}

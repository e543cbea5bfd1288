use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::datetime::{month_end, month_start, week_start};
use crate::drag::Lanes;
use crate::task::{Task, TaskPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarRange {
    Day,
    Week,
    #[default]
    Month,
}

impl CalendarRange {
    /// First and last day shown around `anchor`. Weeks start on Sunday and
    /// the month grid is padded out to whole weeks.
    pub fn bounds(self, anchor: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            CalendarRange::Day => (anchor, anchor),
            CalendarRange::Week => {
                let start = week_start(anchor);
                (start, start.checked_add_days(Days::new(6)).unwrap_or(start))
            }
            CalendarRange::Month => {
                let start = week_start(month_start(anchor));
                let last = month_end(anchor);
                let pad = 6 - u64::from(last.weekday().num_days_from_sunday());
                (start, last.checked_add_days(Days::new(pad)).unwrap_or(last))
            }
        }
    }

    pub fn next(self, anchor: NaiveDate) -> NaiveDate {
        self.step(anchor, true)
    }

    pub fn prev(self, anchor: NaiveDate) -> NaiveDate {
        self.step(anchor, false)
    }

    fn step(self, anchor: NaiveDate, forward: bool) -> NaiveDate {
        let moved = match (self, forward) {
            (CalendarRange::Day, true) => anchor.checked_add_days(Days::new(1)),
            (CalendarRange::Day, false) => anchor.checked_sub_days(Days::new(1)),
            (CalendarRange::Week, true) => anchor.checked_add_days(Days::new(7)),
            (CalendarRange::Week, false) => anchor.checked_sub_days(Days::new(7)),
            (CalendarRange::Month, true) => anchor.checked_add_months(Months::new(1)),
            (CalendarRange::Month, false) => anchor.checked_sub_months(Months::new(1)),
        };
        moved.unwrap_or(anchor)
    }
}

impl fmt::Display for CalendarRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CalendarRange::Day => "day",
            CalendarRange::Week => "week",
            CalendarRange::Month => "month",
        };
        f.write_str(name)
    }
}

impl FromStr for CalendarRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(CalendarRange::Day),
            "week" => Ok(CalendarRange::Week),
            "month" => Ok(CalendarRange::Month),
            other => Err(anyhow::anyhow!("unknown calendar range: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_current_month: bool,
    pub is_today: bool,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarView {
    pub range: CalendarRange,
    pub anchor: NaiveDate,
    pub today: NaiveDate,
    pub days: Vec<CalendarDay>,
}

impl CalendarView {
    /// Tasks without a due date never appear on the calendar.
    pub fn build(range: CalendarRange, anchor: NaiveDate, today: NaiveDate, tasks: &[Task]) -> Self {
        let (start, end) = range.bounds(anchor);
        let days = start
            .iter_days()
            .take_while(|date| *date <= end)
            .map(|date| CalendarDay {
                date,
                is_current_month: date.month() == anchor.month() && date.year() == anchor.year(),
                is_today: date == today,
                tasks: tasks.iter().filter(|t| t.due_date == Some(date)).cloned().collect(),
            })
            .collect();
        Self {
            range,
            anchor,
            today,
            days,
        }
    }

    pub fn day(&self, date: NaiveDate) -> Option<&CalendarDay> {
        self.days.iter().find(|d| d.date == date)
    }

    pub fn is_overdue(&self, task: &Task) -> bool {
        task.is_overdue(self.today)
    }

    pub fn next(&self, tasks: &[Task]) -> Self {
        Self::build(self.range, self.range.next(self.anchor), self.today, tasks)
    }

    pub fn prev(&self, tasks: &[Task]) -> Self {
        Self::build(self.range, self.range.prev(self.anchor), self.today, tasks)
    }
}

impl Lanes for CalendarView {
    type Key = NaiveDate;

    fn lane_count(&self) -> usize {
        self.days.len()
    }

    fn lane_key(&self, idx: usize) -> Option<NaiveDate> {
        self.days.get(idx).map(|d| d.date)
    }

    fn lane_tasks(&self, idx: usize) -> &[Task] {
        self.days.get(idx).map(|d| d.tasks.as_slice()).unwrap_or(&[])
    }

    fn lane_tasks_mut(&mut self, idx: usize) -> Option<&mut Vec<Task>> {
        self.days.get_mut(idx).map(|d| &mut d.tasks)
    }

    fn membership_patch(key: &NaiveDate) -> TaskPatch {
        TaskPatch::due_date(*key)
    }
}

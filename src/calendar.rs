use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::Serialize;

/// The server's current calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Monday through Sunday, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IsoWeek {
    pub inicio: NaiveDate,
    pub fin: NaiveDate,
}

impl IsoWeek {
    pub fn containing(date: NaiveDate) -> Self {
        let offset = i64::from(date.weekday().num_days_from_monday());
        let inicio = date - Duration::days(offset);
        Self {
            inicio,
            fin: inicio + Duration::days(6),
        }
    }

    pub fn current() -> Self {
        Self::containing(today())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.inicio <= date && date <= self.fin
    }
}

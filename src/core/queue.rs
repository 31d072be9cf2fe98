//! Review queue: what is due on a given day.
//!
//! Every function here is a read-only view over a borrowed record slice.
//! Orderings are total (ties broken by id) so repeated calls with the same
//! inputs return identical output.

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::record::{add_days, CompletionStatus, MemorizationRecord, Stage};

/// Records due on one day, partitioned by stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DueToday<'a> {
    /// Open lessons, earliest target first.
    pub sabak: Vec<&'a MemorizationRecord>,
    /// Every sabki record, longest in stage first.
    pub sabki: Vec<&'a MemorizationRecord>,
    /// Manzil records scheduled for exactly this day.
    pub manzil: Vec<&'a MemorizationRecord>,
}

impl DueToday<'_> {
    /// Total number of due records.
    pub fn len(&self) -> usize {
        self.sabak.len() + self.sabki.len() + self.manzil.len()
    }

    /// Whether nothing is due.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition the records due on `today`.
pub fn due_today(records: &[MemorizationRecord], today: NaiveDate) -> DueToday<'_> {
    let mut due = DueToday::default();

    for record in records {
        match &record.stage {
            Stage::Sabak { .. } if record.status != CompletionStatus::Completed => {
                due.sabak.push(record)
            }
            Stage::Sabak { .. } => {}
            Stage::Sabki { .. } => due.sabki.push(record),
            Stage::Manzil {
                next_review_date, ..
            } if *next_review_date == today => due.manzil.push(record),
            Stage::Manzil { .. } => {}
        }
    }

    due.sabak
        .sort_by(|a, b| (a.target_date(), &a.id).cmp(&(b.target_date(), &b.id)));
    due.sabki.sort_by(|a, b| {
        b.days_in_sabki()
            .cmp(&a.days_in_sabki())
            .then_with(|| a.id.cmp(&b.id))
    });
    sort_by_next_review(&mut due.manzil);

    due
}

/// Manzil records coming up within a horizon.
///
/// Holds only the inputs; each iteration rescans the records, so the value
/// can be iterated any number of times.
#[derive(Debug, Clone, Copy)]
pub struct Upcoming<'a> {
    records: &'a [MemorizationRecord],
    from: NaiveDate,
    until: NaiveDate,
}

impl<'a> Upcoming<'a> {
    /// First day of the window.
    pub fn from(&self) -> NaiveDate {
        self.from
    }

    /// Last day of the window (inclusive).
    pub fn until(&self) -> NaiveDate {
        self.until
    }

    /// Iterate the window, earliest next review first.
    pub fn iter(&self) -> std::vec::IntoIter<&'a MemorizationRecord> {
        let (from, until) = (self.from, self.until);
        let mut items: Vec<&'a MemorizationRecord> = self
            .records
            .iter()
            .filter(|r| {
                r.next_review_date()
                    .is_some_and(|next| next >= from && next <= until)
            })
            .collect();
        sort_by_next_review(&mut items);
        items.into_iter()
    }
}

impl<'a> IntoIterator for &Upcoming<'a> {
    type Item = &'a MemorizationRecord;
    type IntoIter = std::vec::IntoIter<&'a MemorizationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Manzil records with a next review in `[today, today + horizon_days]`.
pub fn upcoming(
    records: &[MemorizationRecord],
    today: NaiveDate,
    horizon_days: u32,
) -> Upcoming<'_> {
    // Past chrono's calendar range every date is inside the window.
    let until = add_days(today, horizon_days).unwrap_or(NaiveDate::MAX);
    Upcoming {
        records,
        from: today,
        until,
    }
}

/// Manzil records whose next review has already passed, oldest first.
pub fn overdue(records: &[MemorizationRecord], today: NaiveDate) -> Vec<&MemorizationRecord> {
    let mut items: Vec<&MemorizationRecord> = records
        .iter()
        .filter(|r| r.next_review_date().is_some_and(|next| next < today))
        .collect();
    sort_by_next_review(&mut items);
    items
}

fn sort_by_next_review(items: &mut [&MemorizationRecord]) {
    items.sort_by(|a, b| (a.next_review_date(), &a.id).cmp(&(b.next_review_date(), &b.id)));
}

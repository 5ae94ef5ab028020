use std::sync::atomic::{AtomicU32, Ordering};

use chrono::NaiveDate;
use dashmap::DashMap;

use crate::error::QueueError;
use crate::models::ticket::Office;

/// Day key used when daily resets are disabled; the single counter then
/// counts up forever.
const PINNED_DAY: NaiveDate = NaiveDate::MIN;

/// Per-office-per-day ticket number allocator.
///
/// One logical counter lives behind each (office, day) key. Allocation is a
/// single `fetch_add` on that counter, so concurrent issuance for the same
/// office can never hand out the same number, and a day rollover is just the
/// first touch of a fresh key rather than a destructive reset.
pub struct Sequencer {
    counters: DashMap<(Office, NaiveDate), AtomicU32>,
    max_queue_number: u32,
    reset_daily: bool,
}

impl Sequencer {
    pub fn new(max_queue_number: u32, reset_daily: bool) -> Self {
        Self {
            counters: DashMap::new(),
            max_queue_number,
            reset_daily,
        }
    }

    pub fn day_key(&self, today: NaiveDate) -> NaiveDate {
        if self.reset_daily { today } else { PINNED_DAY }
    }

    /// Allocates the next number in `[1, max_queue_number]` for the office's
    /// current day. Numbers past the cap are never issued; each attempt past
    /// it fails with `CapacityExceeded` without disturbing other offices or
    /// days.
    pub fn next(&self, office: Office, today: NaiveDate) -> Result<u32, QueueError> {
        let day = self.day_key(today);
        let number = self
            .counters
            .entry((office, day))
            .or_insert_with(|| AtomicU32::new(0))
            .fetch_add(1, Ordering::SeqCst)
            + 1;

        if number > self.max_queue_number {
            return Err(QueueError::CapacityExceeded {
                office,
                max: self.max_queue_number,
            });
        }

        Ok(number)
    }

    /// Drops stale counters. Yesterday's keys are kept: an issuance that read
    /// the date just before midnight may still be in flight for another
    /// office, and recreating its counter at zero would re-issue numbers for
    /// that day. Only keys at least two days old can no longer be touched.
    pub fn prune_before(&self, today: NaiveDate) {
        if !self.reset_daily {
            return;
        }
        let cutoff = today.checked_sub_days(chrono::Days::new(1)).unwrap_or(today);
        self.counters.retain(|(_, day), _| *day >= cutoff);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::Sequencer;
    use crate::error::QueueError;
    use crate::models::ticket::Office;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn numbers_start_at_one_and_increase() {
        let seq = Sequencer::new(999, true);
        assert_eq!(seq.next(Office::Registrar, day(1)).unwrap(), 1);
        assert_eq!(seq.next(Office::Registrar, day(1)).unwrap(), 2);
        assert_eq!(seq.next(Office::Registrar, day(1)).unwrap(), 3);
    }

    #[test]
    fn offices_do_not_share_counters() {
        let seq = Sequencer::new(999, true);
        assert_eq!(seq.next(Office::Registrar, day(1)).unwrap(), 1);
        assert_eq!(seq.next(Office::Admissions, day(1)).unwrap(), 1);
        assert_eq!(seq.next(Office::Registrar, day(1)).unwrap(), 2);
    }

    #[test]
    fn day_rollover_resets_to_one() {
        let seq = Sequencer::new(99, true);
        for _ in 0..99 {
            seq.next(Office::Registrar, day(1)).unwrap();
        }
        assert!(matches!(
            seq.next(Office::Registrar, day(1)),
            Err(QueueError::CapacityExceeded { .. })
        ));
        assert_eq!(seq.next(Office::Registrar, day(2)).unwrap(), 1);
    }

    #[test]
    fn disabled_reset_pins_the_counter_across_days() {
        let seq = Sequencer::new(999, false);
        assert_eq!(seq.next(Office::Registrar, day(1)).unwrap(), 1);
        assert_eq!(seq.next(Office::Registrar, day(2)).unwrap(), 2);
    }

    #[test]
    fn capacity_exceeded_does_not_affect_other_offices() {
        let seq = Sequencer::new(1, true);
        seq.next(Office::Registrar, day(1)).unwrap();
        assert!(seq.next(Office::Registrar, day(1)).is_err());
        assert_eq!(seq.next(Office::Mis, day(1)).unwrap(), 1);
    }

    #[test]
    fn concurrent_issuance_yields_unique_numbers() {
        let seq = Arc::new(Sequencer::new(10_000, true));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let seq = seq.clone();
            handles.push(std::thread::spawn(move || {
                (0..500)
                    .map(|_| seq.next(Office::Registrar, day(1)).unwrap())
                    .collect::<Vec<u32>>()
            }));
        }

        let mut all: Vec<u32> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 8 * 500);
    }

    #[test]
    fn prune_keeps_yesterday_and_drops_older_days() {
        let seq = Sequencer::new(999, true);
        seq.next(Office::Registrar, day(1)).unwrap();
        seq.next(Office::Registrar, day(2)).unwrap();
        seq.next(Office::Registrar, day(3)).unwrap();
        seq.prune_before(day(3));

        // day(2) survives the midnight straddle window; day(1) is gone and
        // restarts.
        assert_eq!(seq.next(Office::Registrar, day(2)).unwrap(), 2);
        assert_eq!(seq.next(Office::Registrar, day(3)).unwrap(), 2);
        assert_eq!(seq.next(Office::Registrar, day(1)).unwrap(), 1);
    }

    #[test]
    fn pruning_for_a_new_day_never_reissues_yesterdays_numbers() {
        let seq = Sequencer::new(999, true);
        // An issuance for day(1) is in flight for one office when another
        // office rolls over to day(2) and prunes.
        assert_eq!(seq.next(Office::Registrar, day(1)).unwrap(), 1);
        seq.prune_before(day(2));
        assert_eq!(seq.next(Office::Registrar, day(1)).unwrap(), 2);
    }
}

use chrono::{Duration, NaiveDate, Utc};

/// Source of "current day" for the sequencer's daily reset boundary. A single
/// instance is shared by every office partition so day boundaries can never
/// split-brain between offices.
pub trait DayClock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock day in the operating timezone, expressed as a fixed offset from
/// UTC. The counter resets when the local date changes, i.e. local midnight.
pub struct SystemDayClock {
    utc_offset_minutes: i64,
}

impl SystemDayClock {
    pub fn new(utc_offset_minutes: i64) -> Self {
        Self { utc_offset_minutes }
    }
}

impl DayClock for SystemDayClock {
    fn today(&self) -> NaiveDate {
        (Utc::now() + Duration::minutes(self.utc_offset_minutes)).date_naive()
    }
}

/// Fixed day source for tests.
#[derive(Clone)]
pub struct FixedDayClock {
    day: std::sync::Arc<std::sync::Mutex<NaiveDate>>,
}

impl FixedDayClock {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day: std::sync::Arc::new(std::sync::Mutex::new(day)),
        }
    }

    pub fn set(&self, day: NaiveDate) {
        *self.day.lock().unwrap() = day;
    }
}

impl DayClock for FixedDayClock {
    fn today(&self) -> NaiveDate {
        *self.day.lock().unwrap()
    }
}

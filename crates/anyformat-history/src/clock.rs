use chrono::{DateTime, Utc};

/// Source of timestamps for history records.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that advances one second on every reading.
#[cfg(test)]
pub(crate) struct StepClock {
    next: std::cell::Cell<DateTime<Utc>>,
}

#[cfg(test)]
impl StepClock {
    pub(crate) fn new() -> Self {
        use chrono::TimeZone;
        Self {
            next: std::cell::Cell::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        }
    }
}

#[cfg(test)]
impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let now = self.next.get();
        self.next.set(now + chrono::Duration::seconds(1));
        now
    }
}

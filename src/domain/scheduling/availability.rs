//! Availability input: explicit windows, simple day/date expansion rules,
//! and the filters used when listing open slots.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

use super::SlotWindow;

/// Shortest and longest slot a rule may generate, in minutes.
pub const MIN_SLOT_MINUTES: i64 = 5;
pub const MAX_SLOT_MINUTES: i64 = 8 * 60;

/// Longest date range a weekday rule may span.
pub const MAX_RULE_SPAN_DAYS: i64 = 366;

/// Which days a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DaySpec {
    /// Specific calendar dates.
    Dates(Vec<NaiveDate>),
    /// Every matching weekday between `from` and `until`, inclusive.
    Weekdays {
        weekdays: Vec<Weekday>,
        from: NaiveDate,
        until: NaiveDate,
    },
}

/// Cuts `start_time..end_time` into back-to-back slots on each selected day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRule {
    pub days: DaySpec,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: i64,
}

impl AvailabilityRule {
    /// Expands the rule into concrete windows, ascending.
    ///
    /// A trailing remainder shorter than `slot_minutes` is dropped.
    pub fn expand(&self) -> Result<Vec<SlotWindow>, ValidationError> {
        if !(MIN_SLOT_MINUTES..=MAX_SLOT_MINUTES).contains(&self.slot_minutes) {
            return Err(ValidationError::out_of_range(
                "slotMinutes",
                MIN_SLOT_MINUTES,
                MAX_SLOT_MINUTES,
                self.slot_minutes,
            ));
        }
        if self.start_time >= self.end_time {
            return Err(ValidationError::invalid_format(
                "startTime",
                "must be before endTime",
            ));
        }

        let mut windows = Vec::new();
        for date in self.dates()? {
            let step = Duration::minutes(self.slot_minutes);
            let mut start = self.start_time;
            loop {
                let (end, wrapped) = start.overflowing_add_signed(step);
                if wrapped != 0 || end > self.end_time {
                    break;
                }
                windows.push(SlotWindow::new(date, start, end));
                start = end;
            }
        }
        windows.sort_by_key(SlotWindow::sort_key);
        windows.dedup();
        Ok(windows)
    }

    fn dates(&self) -> Result<Vec<NaiveDate>, ValidationError> {
        match &self.days {
            DaySpec::Dates(dates) => {
                if dates.is_empty() {
                    return Err(ValidationError::empty_field("dates"));
                }
                Ok(dates.clone())
            }
            DaySpec::Weekdays {
                weekdays,
                from,
                until,
            } => {
                if weekdays.is_empty() {
                    return Err(ValidationError::empty_field("weekdays"));
                }
                let span = until.signed_duration_since(*from).num_days();
                if !(0..=MAX_RULE_SPAN_DAYS).contains(&span) {
                    return Err(ValidationError::out_of_range(
                        "until",
                        0,
                        MAX_RULE_SPAN_DAYS,
                        span,
                    ));
                }
                Ok(from
                    .iter_days()
                    .take_while(|d| d <= until)
                    .filter(|d| weekdays.contains(&d.weekday()))
                    .collect())
            }
        }
    }
}

/// Checks windows are well formed and mutually non-overlapping.
pub fn validate_windows(windows: &[SlotWindow]) -> Result<(), ValidationError> {
    for w in windows {
        if w.start_time >= w.end_time {
            return Err(ValidationError::invalid_format(
                "availability",
                format!("{} {}-{} ends before it starts", w.date, w.start_time, w.end_time),
            ));
        }
    }
    let mut sorted: Vec<&SlotWindow> = windows.iter().collect();
    sorted.sort_by_key(|w| w.sort_key());
    for pair in sorted.windows(2) {
        if pair[0].overlaps(pair[1]) {
            return Err(ValidationError::invalid_format(
                "availability",
                format!(
                    "{} {}-{} overlaps {}-{}",
                    pair[0].date,
                    pair[0].start_time,
                    pair[0].end_time,
                    pair[1].start_time,
                    pair[1].end_time
                ),
            ));
        }
    }
    Ok(())
}

/// Restricts a slot listing to one date or one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayFilter {
    Date(NaiveDate),
    Weekday(Weekday),
}

impl DayFilter {
    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            DayFilter::Date(d) => *d == date,
            DayFilter::Weekday(w) => date.weekday() == *w,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 7, day).unwrap()
    }

    #[test]
    fn expand_cuts_dates_into_slots() {
        let rule = AvailabilityRule {
            days: DaySpec::Dates(vec![d(2)]),
            start_time: t(9, 0),
            end_time: t(10, 0),
            slot_minutes: 30,
        };
        let windows = rule.expand().unwrap();
        assert_eq!(
            windows,
            vec![
                SlotWindow::new(d(2), t(9, 0), t(9, 30)),
                SlotWindow::new(d(2), t(9, 30), t(10, 0)),
            ]
        );
        assert!(validate_windows(&windows).is_ok());
    }

    #[test]
    fn expand_drops_short_remainder() {
        let rule = AvailabilityRule {
            days: DaySpec::Dates(vec![d(2)]),
            start_time: t(9, 0),
            end_time: t(9, 50),
            slot_minutes: 30,
        };
        assert_eq!(rule.expand().unwrap().len(), 1);
    }

    #[test]
    fn expand_selects_weekdays_in_range() {
        // 2030-07-01 is a Monday.
        let rule = AvailabilityRule {
            days: DaySpec::Weekdays {
                weekdays: vec![Weekday::Mon, Weekday::Wed],
                from: d(1),
                until: d(14),
            },
            start_time: t(14, 0),
            end_time: t(15, 0),
            slot_minutes: 60,
        };
        let dates: Vec<NaiveDate> = rule.expand().unwrap().iter().map(|w| w.date).collect();
        assert_eq!(dates, vec![d(1), d(3), d(8), d(10)]);
    }

    #[test]
    fn expand_rejects_out_of_range_minutes() {
        let rule = AvailabilityRule {
            days: DaySpec::Dates(vec![d(2)]),
            start_time: t(9, 0),
            end_time: t(10, 0),
            slot_minutes: 2,
        };
        assert!(matches!(rule.expand(), Err(ValidationError::OutOfRange { .. })));
    }

    #[test]
    fn expand_rejects_inverted_range() {
        let rule = AvailabilityRule {
            days: DaySpec::Weekdays {
                weekdays: vec![Weekday::Fri],
                from: d(14),
                until: d(1),
            },
            start_time: t(9, 0),
            end_time: t(10, 0),
            slot_minutes: 30,
        };
        assert!(rule.expand().is_err());
    }

    #[test]
    fn validate_windows_rejects_overlap() {
        let windows = vec![
            SlotWindow::new(d(2), t(9, 0), t(9, 30)),
            SlotWindow::new(d(2), t(9, 20), t(9, 50)),
        ];
        assert!(validate_windows(&windows).is_err());
    }

    #[test]
    fn validate_windows_rejects_zero_length() {
        let windows = vec![SlotWindow::new(d(2), t(9, 0), t(9, 0))];
        assert!(validate_windows(&windows).is_err());
    }

    #[test]
    fn day_filter_matches_date_or_weekday() {
        assert!(DayFilter::Date(d(2)).matches(d(2)));
        assert!(!DayFilter::Date(d(2)).matches(d(3)));
        assert!(DayFilter::Weekday(Weekday::Mon).matches(d(8)));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn weekday_set() -> impl Strategy<Value = Vec<Weekday>> {
            proptest::collection::vec(0u8..7, 1..7).prop_map(|days| {
                days.into_iter()
                    .map(|n| Weekday::try_from(n).unwrap_or(Weekday::Mon))
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn expansion_is_ordered_and_passes_window_validation(
                weekdays in weekday_set(),
                span in 0i64..30,
                start_hour in 0u32..20,
                hours in 1u32..4,
                slot_minutes in MIN_SLOT_MINUTES..=120,
            ) {
                let rule = AvailabilityRule {
                    days: DaySpec::Weekdays {
                        weekdays,
                        from: d(1),
                        until: d(1) + Duration::days(span),
                    },
                    start_time: t(start_hour, 0),
                    end_time: t(start_hour + hours, 0),
                    slot_minutes,
                };
                let windows = rule.expand().unwrap();

                prop_assert!(validate_windows(&windows).is_ok());
                prop_assert!(windows.windows(2).all(|w| w[0].sort_key() < w[1].sort_key()));
                for w in &windows {
                    prop_assert!(w.start_time >= rule.start_time && w.end_time <= rule.end_time);
                }
            }
        }
    }
}

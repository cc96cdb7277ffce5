use chrono::NaiveDate;

use crate::time::days_between;

/// What a call to [`StudyStreak::record_activity`] did to the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// First recorded study day.
    Started,
    /// Already studied today (or the stored day lies in the future).
    Unchanged,
    /// Studied yesterday; the streak grew by one.
    Extended,
    /// At least one day was missed; the streak starts over at one.
    Reset,
}

impl StreakChange {
    /// True when the stored streak must be written back.
    #[must_use]
    pub fn is_modified(self) -> bool {
        !matches!(self, StreakChange::Unchanged)
    }
}

/// Consecutive-day study counter for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StudyStreak {
    current: u32,
    longest: u32,
    last_study_date: Option<NaiveDate>,
}

impl StudyStreak {
    /// Rehydrate a streak from storage. `longest` is lifted to at least `current`.
    #[must_use]
    pub fn from_persisted(current: u32, longest: u32, last_study_date: Option<NaiveDate>) -> Self {
        Self {
            current,
            longest: longest.max(current),
            last_study_date,
        }
    }

    #[must_use]
    pub fn current(&self) -> u32 {
        self.current
    }

    #[must_use]
    pub fn longest(&self) -> u32 {
        self.longest
    }

    #[must_use]
    pub fn last_study_date(&self) -> Option<NaiveDate> {
        self.last_study_date
    }

    /// Record study activity on `today`.
    ///
    /// Both dates are calendar days, so two activities on the same day never
    /// count twice.
    pub fn record_activity(&mut self, today: NaiveDate) -> StreakChange {
        let change = match self.last_study_date {
            None => {
                self.current = 1;
                StreakChange::Started
            }
            Some(last) => match days_between(last, today) {
                1 => {
                    self.current = self.current.saturating_add(1);
                    StreakChange::Extended
                }
                diff if diff > 1 => {
                    self.current = 1;
                    StreakChange::Reset
                }
                _ => return StreakChange::Unchanged,
            },
        };

        self.longest = self.longest.max(self.current);
        self.last_study_date = Some(today);
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn first_activity_starts_streak() {
        let mut streak = StudyStreak::default();
        assert_eq!(streak.record_activity(day(10)), StreakChange::Started);
        assert_eq!(streak.current(), 1);
        assert_eq!(streak.longest(), 1);
        assert_eq!(streak.last_study_date(), Some(day(10)));
    }

    #[test]
    fn same_day_is_noop() {
        let mut streak = StudyStreak::from_persisted(3, 5, Some(day(10)));
        assert_eq!(streak.record_activity(day(10)), StreakChange::Unchanged);
        assert_eq!(streak, StudyStreak::from_persisted(3, 5, Some(day(10))));
    }

    #[test]
    fn consecutive_day_extends_and_tracks_longest() {
        let mut streak = StudyStreak::from_persisted(5, 5, Some(day(10)));
        assert_eq!(streak.record_activity(day(11)), StreakChange::Extended);
        assert_eq!(streak.current(), 6);
        assert_eq!(streak.longest(), 6);
    }

    #[test]
    fn extension_below_longest_keeps_longest() {
        let mut streak = StudyStreak::from_persisted(2, 9, Some(day(10)));
        streak.record_activity(day(11));
        assert_eq!(streak.current(), 3);
        assert_eq!(streak.longest(), 9);
    }

    #[test]
    fn missed_day_resets_to_one() {
        let mut streak = StudyStreak::from_persisted(7, 7, Some(day(10)));
        assert_eq!(streak.record_activity(day(12)), StreakChange::Reset);
        assert_eq!(streak.current(), 1);
        assert_eq!(streak.longest(), 7);
        assert_eq!(streak.last_study_date(), Some(day(12)));
    }

    #[test]
    fn future_last_date_is_left_alone() {
        let mut streak = StudyStreak::from_persisted(4, 4, Some(day(20)));
        assert_eq!(streak.record_activity(day(18)), StreakChange::Unchanged);
        assert_eq!(streak.last_study_date(), Some(day(20)));
    }
}

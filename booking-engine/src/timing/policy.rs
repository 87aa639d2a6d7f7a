//! Quick-release opening rules.

use std::time::Duration;

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::domain::ClassCategory;

/// Opening time of day for one class category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningRule {
    pub category: ClassCategory,
    /// Local time on the opening day.
    pub opens_at: NaiveTime,
}

/// When quick-release quotas open, per class category.
///
/// A table rather than constants: the real quota matrix is richer than
/// one time per category, and new rules slot in without code changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickReleasePolicy {
    /// Days before the journey date on which booking opens.
    pub advance_days: u64,
    pub rules: Vec<OpeningRule>,
    /// Offset of the site's local time from UTC, in seconds.
    pub utc_offset_secs: i32,
    /// Release this long before the opening instant so the submission
    /// lands close to it.
    pub lead: Duration,
    /// Longest wait the controller accepts. Unlimited when unset; the
    /// wait is still cancellable.
    pub max_wait: Option<Duration>,
}

impl QuickReleasePolicy {
    pub fn with_rule(mut self, category: ClassCategory, opens_at: NaiveTime) -> Self {
        self.rules.retain(|r| r.category != category);
        self.rules.push(OpeningRule { category, opens_at });
        self
    }

    pub fn with_lead(mut self, lead: Duration) -> Self {
        self.lead = lead;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn rule(&self, category: ClassCategory) -> Option<&OpeningRule> {
        self.rules.iter().find(|r| r.category == category)
    }

    /// The instant the quota for `category` opens for travel on
    /// `journey_date`.
    pub fn opening_instant(
        &self,
        journey_date: NaiveDate,
        category: ClassCategory,
    ) -> Option<DateTime<Utc>> {
        let rule = self.rule(category)?;
        let offset = FixedOffset::east_opt(self.utc_offset_secs)?;
        let day = journey_date.checked_sub_days(Days::new(self.advance_days))?;
        offset
            .from_local_datetime(&day.and_time(rule.opens_at))
            .single()
            .map(|local| local.with_timezone(&Utc))
    }
}

impl Default for QuickReleasePolicy {
    /// AC classes at 10:00 and the rest at 11:00 IST, one day ahead.
    fn default() -> Self {
        let at = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN);
        Self {
            advance_days: 1,
            rules: vec![
                OpeningRule {
                    category: ClassCategory::Ac,
                    opens_at: at(10),
                },
                OpeningRule {
                    category: ClassCategory::NonAc,
                    opens_at: at(11),
                },
            ],
            utc_offset_secs: 5 * 3600 + 30 * 60,
            lead: Duration::from_millis(300),
            max_wait: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn default_opening_instants() {
        let policy = QuickReleasePolicy::default();
        let date = NaiveDate::from_ymd_opt(2026, 11, 20).unwrap();

        assert_eq!(
            policy.opening_instant(date, ClassCategory::Ac),
            Some(utc("2026-11-19T04:30:00Z"))
        );
        assert_eq!(
            policy.opening_instant(date, ClassCategory::NonAc),
            Some(utc("2026-11-19T05:30:00Z"))
        );
    }

    #[test]
    fn rules_are_replaceable() {
        let policy = QuickReleasePolicy::default()
            .with_rule(ClassCategory::NonAc, NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        assert_eq!(policy.rules.len(), 2);

        let date = NaiveDate::from_ymd_opt(2026, 11, 20).unwrap();
        assert_eq!(
            policy.opening_instant(date, ClassCategory::NonAc),
            Some(utc("2026-11-19T05:00:00Z"))
        );
    }

    #[test]
    fn missing_rule_has_no_instant() {
        let policy = QuickReleasePolicy {
            rules: vec![],
            ..QuickReleasePolicy::default()
        };
        let date = NaiveDate::from_ymd_opt(2026, 11, 20).unwrap();
        assert_eq!(policy.opening_instant(date, ClassCategory::Ac), None);
    }
}

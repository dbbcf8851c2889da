use super::RetentionPolicy;
use crate::config::RetentionConfig;
use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

/// Pure calendar math: classifies a backup date into a retention tier and
/// derives its expiration date. No side effects, no failure mode.
#[derive(Debug, Clone)]
pub struct RetentionPolicyEngine {
    retention: RetentionConfig,
}

impl RetentionPolicyEngine {
    pub fn new(retention: RetentionConfig) -> Self {
        Self { retention }
    }

    /// Assign a retention tier, checked in strict precedence order:
    /// Jan 1 is yearly even when it falls on a Sunday or (trivially) the 1st.
    pub fn classify(date: DateTime<Utc>) -> RetentionPolicy {
        if date.day() == 1 && date.month() == 1 {
            RetentionPolicy::Yearly
        } else if date.day() == 1 {
            RetentionPolicy::Monthly
        } else if date.weekday() == Weekday::Sun {
            RetentionPolicy::Weekly
        } else {
            RetentionPolicy::Daily
        }
    }

    /// Expiration instant for a backup created at `created_at`. Always
    /// strictly after `created_at`.
    pub fn expiration_for(
        &self,
        policy: RetentionPolicy,
        created_at: DateTime<Utc>,
    ) -> DateTime<Utc> {
        created_at + Duration::days(i64::from(self.retention_days(policy)))
    }

    /// Configured retention span in calendar days for a tier
    pub fn retention_days(&self, policy: RetentionPolicy) -> u32 {
        match policy {
            RetentionPolicy::Daily => self.retention.daily_days,
            RetentionPolicy::Weekly => self.retention.weekly_weeks * 7,
            RetentionPolicy::Monthly => self.retention.monthly_months * 30,
            RetentionPolicy::Yearly => self.retention.yearly_years * 365,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> DateTime<Utc> {
        format!("{s}T12:00:00Z").parse().unwrap()
    }

    #[test]
    fn test_jan_first_is_yearly() {
        // 2024-01-01 is a Monday, 2023-01-01 a Sunday; both must classify
        // yearly regardless of weekday.
        assert_eq!(
            RetentionPolicyEngine::classify(date("2024-01-01")),
            RetentionPolicy::Yearly
        );
        assert_eq!(
            RetentionPolicyEngine::classify(date("2023-01-01")),
            RetentionPolicy::Yearly
        );
    }

    #[test]
    fn test_first_of_other_months_is_monthly() {
        assert_eq!(
            RetentionPolicyEngine::classify(date("2024-03-01")),
            RetentionPolicy::Monthly
        );
        // 2024-09-01 is a Sunday; the first-of-month rule wins
        assert_eq!(
            RetentionPolicyEngine::classify(date("2024-09-01")),
            RetentionPolicy::Monthly
        );
    }

    #[test]
    fn test_sunday_is_weekly() {
        // 2024-03-03 is a Sunday and not the 1st
        assert_eq!(
            RetentionPolicyEngine::classify(date("2024-03-03")),
            RetentionPolicy::Weekly
        );
    }

    #[test]
    fn test_everything_else_is_daily() {
        // A plain Tuesday
        assert_eq!(
            RetentionPolicyEngine::classify(date("2024-03-05")),
            RetentionPolicy::Daily
        );
    }

    #[test]
    fn test_expiration_offsets_match_configured_spans() {
        let engine = RetentionPolicyEngine::new(RetentionConfig::default());
        let created = date("2024-03-05");

        assert_eq!(
            engine.expiration_for(RetentionPolicy::Daily, created),
            created + Duration::days(7)
        );
        assert_eq!(
            engine.expiration_for(RetentionPolicy::Weekly, created),
            created + Duration::days(28)
        );
        assert_eq!(
            engine.expiration_for(RetentionPolicy::Monthly, created),
            created + Duration::days(360)
        );
        assert_eq!(
            engine.expiration_for(RetentionPolicy::Yearly, created),
            created + Duration::days(2555)
        );
    }

    #[test]
    fn test_expiration_is_strictly_after_creation() {
        let engine = RetentionPolicyEngine::new(RetentionConfig {
            daily_days: 1,
            weekly_weeks: 1,
            monthly_months: 1,
            yearly_years: 1,
        });
        let created = date("2024-06-15");
        for policy in [
            RetentionPolicy::Daily,
            RetentionPolicy::Weekly,
            RetentionPolicy::Monthly,
            RetentionPolicy::Yearly,
        ] {
            assert!(engine.expiration_for(policy, created) > created);
        }
    }
}

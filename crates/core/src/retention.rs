use chrono::{DateTime, Duration, Utc};

use crate::config::RetentionConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub partner_search_days: i64,
    pub session_days: i64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { partner_search_days: 30, session_days: 90 }
    }
}

impl From<&RetentionConfig> for RetentionPolicy {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            partner_search_days: config.partner_search_days,
            session_days: config.session_days,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionCutoffs {
    pub partner_searches_before: DateTime<Utc>,
    pub sessions_before: DateTime<Utc>,
}

impl RetentionPolicy {
    pub fn cutoffs(&self, now: DateTime<Utc>) -> RetentionCutoffs {
        RetentionCutoffs {
            partner_searches_before: now - Duration::days(self.partner_search_days),
            sessions_before: now - Duration::days(self.session_days),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::RetentionPolicy;

    #[test]
    fn default_cutoffs_are_thirty_and_ninety_days() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).single().expect("valid date");
        let cutoffs = RetentionPolicy::default().cutoffs(now);
        assert_eq!(now - cutoffs.partner_searches_before, Duration::days(30));
        assert_eq!(now - cutoffs.sessions_before, Duration::days(90));
    }
}

//! Search criteria construction.
//!
//! The predicates are built once per cycle, before connecting, so a bad
//! `receivedXMinutesAgo` fails without touching the network.

use chrono::{DateTime, TimeDelta, Utc};
use mailpoll_imap::SearchCriteria;

use crate::config::{ConfigKey, Configuration};
use crate::mailbox::Message;
use crate::{Error, Result};

/// One condition of the conjunctive search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPredicate {
    /// The message has no `\Seen` flag.
    Unread,
    /// The subject contains the text (server-side, case-insensitive).
    SubjectContains(String),
    /// The message arrived strictly after the instant.
    ReceivedAfter(DateTime<Utc>),
}

impl SearchPredicate {
    /// Human-readable description for the cycle transcript.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Unread => "[flag is unread]".to_string(),
            Self::SubjectContains(text) => format!("[subject contains {text}]"),
            Self::ReceivedAfter(instant) => {
                format!("[received date is greater than {}]", instant.to_rfc2822())
            }
        }
    }

    /// IMAP SEARCH key for this predicate.
    ///
    /// SINCE only compares dates, in the server's time zone, so the date is
    /// moved back one day and [`accepts`](Self::accepts) applies the exact
    /// bound to the fetched messages.
    #[must_use]
    pub fn to_search_key(&self) -> SearchCriteria {
        match self {
            Self::Unread => SearchCriteria::Unseen,
            Self::SubjectContains(text) => SearchCriteria::Subject(text.clone()),
            Self::ReceivedAfter(instant) => {
                let date = instant.date_naive();
                SearchCriteria::Since(date.pred_opt().unwrap_or(date))
            }
        }
    }

    /// Client-side refinement. Only the received bound is re-checked; a
    /// message without an arrival time is given the benefit of the doubt.
    #[must_use]
    pub fn accepts(&self, message: &Message) -> bool {
        match self {
            Self::ReceivedAfter(instant) => message
                .received
                .is_none_or(|received| received.with_timezone(&Utc) > *instant),
            Self::Unread | Self::SubjectContains(_) => true,
        }
    }
}

/// The ordered predicate list for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria {
    predicates: Vec<SearchPredicate>,
}

impl Criteria {
    /// Builds the predicates from resolved properties.
    ///
    /// Unread always comes first, then subject, then received date; the
    /// last two only when their keys are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] if `receivedXMinutesAgo` is not a
    /// usable number of minutes.
    pub fn build(config: &Configuration, now: DateTime<Utc>) -> Result<Self> {
        let mut predicates = vec![SearchPredicate::Unread];

        if let Some(subject) = config.value(ConfigKey::SubjectContains) {
            predicates.push(SearchPredicate::SubjectContains(subject.to_string()));
        }

        if let Some(minutes) = config.received_minutes()? {
            let since = TimeDelta::try_minutes(minutes)
                .and_then(|delta| now.checked_sub_signed(delta))
                .ok_or_else(|| Error::ConfigParse {
                    line: None,
                    message: format!(
                        "'{}' is out of range: {minutes}",
                        ConfigKey::ReceivedXMinutesAgo
                    ),
                })?;
            predicates.push(SearchPredicate::ReceivedAfter(since));
        }

        Ok(Self { predicates })
    }

    /// The predicates in evaluation order.
    #[must_use]
    pub fn predicates(&self) -> &[SearchPredicate] {
        &self.predicates
    }

    /// One description per predicate, in the same order.
    #[must_use]
    pub fn descriptions(&self) -> Vec<String> {
        self.predicates
            .iter()
            .map(SearchPredicate::description)
            .collect()
    }

    /// Folds the predicates into one IMAP search.
    #[must_use]
    pub fn to_search_key(&self) -> SearchCriteria {
        SearchCriteria::And(
            self.predicates
                .iter()
                .map(SearchPredicate::to_search_key)
                .collect(),
        )
    }

    /// Returns true if the message passes every client-side check.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        self.predicates.iter().all(|p| p.accepts(message))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use chrono::{NaiveDate, TimeZone};
    use proptest::prelude::*;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 8, 12, 0, 0).unwrap()
    }

    #[test]
    fn unread_only_without_filters() {
        let criteria = Criteria::build(&Configuration::new(), now()).unwrap();
        assert_eq!(criteria.predicates(), &[SearchPredicate::Unread]);
        assert_eq!(criteria.descriptions(), vec!["[flag is unread]"]);
    }

    #[test]
    fn defaults_produce_three_predicates_in_order() {
        let config =
            Configuration::parse("subjectContains=jenkins >\nreceivedXMinutesAgo=1440").unwrap();
        let criteria = Criteria::build(&config, now()).unwrap();

        assert_eq!(
            criteria.predicates(),
            &[
                SearchPredicate::Unread,
                SearchPredicate::SubjectContains("jenkins >".to_string()),
                SearchPredicate::ReceivedAfter(Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap()),
            ]
        );
        assert_eq!(
            criteria.descriptions()[2],
            "[received date is greater than Sat, 7 Mar 2026 12:00:00 +0000]"
        );
    }

    #[test]
    fn search_key_widens_since_by_a_day() {
        let config = Configuration::parse("receivedXMinutesAgo=60").unwrap();
        let criteria = Criteria::build(&config, now()).unwrap();
        assert_eq!(
            criteria.to_search_key(),
            SearchCriteria::And(vec![
                SearchCriteria::Unseen,
                SearchCriteria::Since(NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()),
            ])
        );
    }

    #[test]
    fn received_bound_is_strict() {
        let config = Configuration::parse("receivedXMinutesAgo=60").unwrap();
        let criteria = Criteria::build(&config, now()).unwrap();
        let boundary = Utc.with_ymd_and_hms(2026, 3, 8, 11, 0, 0).unwrap();

        let at = Message {
            received: Some(boundary.fixed_offset()),
            ..Message::default()
        };
        let after = Message {
            received: Some((boundary + TimeDelta::seconds(1)).fixed_offset()),
            ..Message::default()
        };
        assert!(!criteria.matches(&at));
        assert!(criteria.matches(&after));
        assert!(criteria.matches(&Message::default()));
    }

    #[test]
    fn offsets_are_compared_as_instants() {
        let config = Configuration::parse("receivedXMinutesAgo=60").unwrap();
        let criteria = Criteria::build(&config, now()).unwrap();
        // 12:30 +0200 is 10:30 UTC, before the 11:00 UTC bound
        let received = chrono::DateTime::parse_from_rfc3339("2026-03-08T12:30:00+02:00").unwrap();
        let message = Message {
            received: Some(received),
            ..Message::default()
        };
        assert!(!criteria.matches(&message));
    }

    #[test]
    fn invalid_minutes_fail_the_build() {
        let config = Configuration::parse("receivedXMinutesAgo=yesterday").unwrap();
        assert!(matches!(
            Criteria::build(&config, now()),
            Err(Error::ConfigParse { .. })
        ));

        let config = Configuration::parse(&format!("receivedXMinutesAgo={}", i64::MAX)).unwrap();
        assert!(Criteria::build(&config, now()).is_err());
    }

    #[test]
    fn blank_subject_is_ignored() {
        let config = Configuration::parse("subjectContains=").unwrap();
        let criteria = Criteria::build(&config, now()).unwrap();
        assert_eq!(criteria.predicates().len(), 1);
    }

    proptest! {
        #[test]
        fn predicate_order_is_stable(
            subject in prop::option::of("[a-z >]{1,10}"),
            minutes in prop::option::of(-10_000i64..100_000),
        ) {
            let mut config = Configuration::new();
            if let Some(s) = &subject {
                config.set("subjectContains", s.clone());
            }
            if let Some(m) = minutes {
                config.set("receivedXMinutesAgo", m.to_string());
            }
            let criteria = Criteria::build(&config, now()).unwrap();
            let predicates = criteria.predicates();

            prop_assert_eq!(&predicates[0], &SearchPredicate::Unread);
            let has_subject = subject.as_deref().is_some_and(|s| !s.trim().is_empty());
            let expected = 1 + usize::from(has_subject) + usize::from(minutes.is_some());
            prop_assert_eq!(predicates.len(), expected);
            if has_subject {
                prop_assert!(matches!(predicates[1], SearchPredicate::SubjectContains(_)));
            }
            if minutes.is_some() {
                prop_assert!(matches!(predicates.last(), Some(SearchPredicate::ReceivedAfter(_))));
            }
            prop_assert_eq!(criteria.descriptions().len(), predicates.len());
        }
    }
}

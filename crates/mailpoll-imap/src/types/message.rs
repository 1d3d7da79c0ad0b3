//! Message addressing: sequence numbers, UIDs, UID sets and flags.

use std::fmt;
use std::num::NonZeroU32;

macro_rules! message_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Wraps a raw value. Zero is never a valid identifier.
            #[must_use]
            pub const fn new(value: u32) -> Option<Self> {
                match NonZeroU32::new(value) {
                    Some(value) => Some(Self(value)),
                    None => None,
                }
            }

            /// The raw value.
            #[must_use]
            pub const fn get(self) -> u32 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

message_id!(
    /// Position of a message in the selected mailbox. Shifts on expunge.
    SeqNum
);

message_id!(
    /// Per-mailbox message identifier that survives expunges.
    Uid
);

/// UIDs addressed by one UID FETCH or UID STORE.
///
/// Iteration keeps first-insertion order; the wire form is sorted and
/// collapsed into `a:b` runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UidSet(Vec<Uid>);

impl UidSet {
    /// A set with one member.
    #[must_use]
    pub fn single(uid: Uid) -> Self {
        Self(vec![uid])
    }

    /// True when nothing would be addressed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Member count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Members in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[Uid] {
        &self.0
    }

    fn runs(&self) -> Vec<(u32, u32)> {
        let mut values: Vec<u32> = self.0.iter().map(|uid| uid.get()).collect();
        values.sort_unstable();

        let mut runs: Vec<(u32, u32)> = Vec::new();
        for value in values {
            match runs.last_mut() {
                Some((_, last)) if last.checked_add(1) == Some(value) => *last = value,
                _ => runs.push((value, value)),
            }
        }
        runs
    }
}

impl FromIterator<Uid> for UidSet {
    fn from_iter<I: IntoIterator<Item = Uid>>(iter: I) -> Self {
        let mut members: Vec<Uid> = Vec::new();
        for uid in iter {
            if !members.contains(&uid) {
                members.push(uid);
            }
        }
        Self(members)
    }
}

impl fmt::Display for UidSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (first, last)) in self.runs().into_iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if first == last {
                write!(f, "{first}")?;
            } else {
                write!(f, "{first}:{last}")?;
            }
        }
        Ok(())
    }
}

/// A message flag. System flags are the backslash-prefixed ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Flag {
    /// `\Seen`: the processed marker this crate sets.
    Seen,
    /// `\Answered`.
    Answered,
    /// `\Flagged`.
    Flagged,
    /// `\Deleted`.
    Deleted,
    /// `\Draft`.
    Draft,
    /// Anything else, kept verbatim (including `\Recent`).
    Keyword(String),
}

const SYSTEM_FLAGS: [(Flag, &str); 5] = [
    (Flag::Seen, "\\Seen"),
    (Flag::Answered, "\\Answered"),
    (Flag::Flagged, "\\Flagged"),
    (Flag::Deleted, "\\Deleted"),
    (Flag::Draft, "\\Draft"),
];

impl Flag {
    /// Reads a flag; system flag names are matched without regard to case.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        SYSTEM_FLAGS
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(s))
            .map_or_else(|| Self::Keyword(s.to_string()), |(flag, _)| flag.clone())
    }

    /// Wire spelling.
    #[must_use]
    pub fn as_str(&self) -> &str {
        if let Self::Keyword(keyword) = self {
            return keyword;
        }
        SYSTEM_FLAGS
            .iter()
            .find(|(flag, _)| flag == self)
            .map_or("", |(_, name)| *name)
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flags of one message, without duplicates, in the order the server sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags(Vec<Flag>);

impl Flags {
    /// No flags.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds `flag` if it is not there yet.
    pub fn insert(&mut self, flag: Flag) {
        if !self.contains(&flag) {
            self.0.push(flag);
        }
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, flag: &Flag) -> bool {
        self.0.contains(flag)
    }

    /// True once the message has been read.
    #[must_use]
    pub fn is_seen(&self) -> bool {
        self.contains(&Flag::Seen)
    }

    /// Flags in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Flag> {
        self.0.iter()
    }

    /// Flag count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True without any flag.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unwraps into the flag list.
    #[must_use]
    pub fn into_vec(self) -> Vec<Flag> {
        self.0
    }
}

impl FromIterator<Flag> for Flags {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        let mut flags = Self::new();
        iter.into_iter().for_each(|flag| flags.insert(flag));
        flags
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
    use super::*;

    fn uids(values: &[u32]) -> UidSet {
        values.iter().filter_map(|&v| Uid::new(v)).collect()
    }

    #[test]
    fn zero_is_rejected() {
        assert!(Uid::new(0).is_none());
        assert!(SeqNum::new(0).is_none());
        assert_eq!(Uid::new(4_000_000_000).unwrap().to_string(), "4000000000");
    }

    #[test]
    fn uid_set_collapses_runs() {
        assert_eq!(uids(&[7]).to_string(), "7");
        assert_eq!(uids(&[9, 1, 2, 3, 7, 10]).to_string(), "1:3,7,9:10");
        assert_eq!(uids(&[u32::MAX - 1, u32::MAX]).to_string(), "4294967294:4294967295");
    }

    #[test]
    fn uid_set_drops_duplicates_and_keeps_order() {
        let set = uids(&[5, 3, 5]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.as_slice()[0].get(), 5);
    }

    #[test]
    fn flags_parse_case_insensitively() {
        assert_eq!(Flag::parse("\\SEEN"), Flag::Seen);
        assert_eq!(Flag::parse("\\draft"), Flag::Draft);
        assert_eq!(Flag::parse("\\Recent"), Flag::Keyword("\\Recent".to_string()));
        assert_eq!(Flag::Deleted.as_str(), "\\Deleted");
        assert_eq!(Flag::Keyword("$Label1".to_string()).to_string(), "$Label1");
    }

    #[test]
    fn flags_are_deduplicated() {
        let flags: Flags = [Flag::Draft, Flag::Seen, Flag::Draft].into_iter().collect();
        assert_eq!(flags.len(), 2);
        assert!(flags.is_seen());
        assert_eq!(flags.into_vec(), vec![Flag::Draft, Flag::Seen]);
    }

    proptest::proptest! {
        #[test]
        fn wire_form_covers_every_uid(values in proptest::collection::vec(1u32..500, 1..40)) {
            let mut covered = Vec::new();
            for part in uids(&values).to_string().split(',') {
                match part.split_once(':') {
                    Some((a, b)) => {
                        let (a, b): (u32, u32) = (a.parse().unwrap(), b.parse().unwrap());
                        covered.extend(a..=b);
                    }
                    None => covered.push(part.parse().unwrap()),
                }
            }
            let mut expected = values.clone();
            expected.sort_unstable();
            expected.dedup();
            proptest::prop_assert_eq!(covered, expected);
        }
    }
}

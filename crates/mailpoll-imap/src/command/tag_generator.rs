//! Command tags.

/// Hands out `A0000`, `A0001`, ... for one connection.
#[derive(Debug, Clone, Default)]
pub struct TagGenerator {
    issued: u32,
}

impl TagGenerator {
    /// Letter every tag starts with.
    pub const PREFIX: char = 'A';

    /// The next unused tag. Numbers wider than four digits just grow.
    pub fn next_tag(&mut self) -> String {
        let tag = format!("{}{:04}", Self::PREFIX, self.issued);
        self.issued = self.issued.wrapping_add(1);
        tag
    }

    /// How many tags have been handed out.
    #[must_use]
    pub const fn issued(&self) -> u32 {
        self.issued
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

    #[test]
    fn first_tags() {
        let mut tags = TagGenerator::default();
        let first: Vec<String> = (0..3).map(|_| tags.next_tag()).collect();
        assert_eq!(first, ["A0000", "A0001", "A0002"]);
        assert_eq!(tags.issued(), 3);
    }

    #[test]
    fn past_four_digits() {
        let mut tags = TagGenerator { issued: 9_999 };
        assert_eq!(tags.next_tag(), "A9999");
        assert_eq!(tags.next_tag(), "A10000");
    }
}

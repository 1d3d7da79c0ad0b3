//! Matched messages and the properties handed to jobs.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

/// A message returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// UID within the selected folder.
    pub uid: u32,
    /// Sequence number at fetch time.
    pub sequence: u32,
    /// Decoded subject.
    pub subject: Option<String>,
    /// Formatted From addresses (`Name <mailbox@host>`).
    pub from: Vec<String>,
    /// Formatted Reply-To addresses.
    pub reply_to: Vec<String>,
    /// Formatted To addresses.
    pub to: Vec<String>,
    /// Formatted Cc addresses.
    pub cc: Vec<String>,
    /// Formatted Bcc addresses.
    pub bcc: Vec<String>,
    /// Date header, as sent.
    pub sent_date: Option<String>,
    /// Arrival time on the server (INTERNALDATE).
    pub received: Option<DateTime<FixedOffset>>,
    /// Message-ID header.
    pub message_id: Option<String>,
    /// RFC822 size in bytes.
    pub size: Option<u32>,
    /// Flags, e.g. `\Flagged`.
    pub flags: Vec<String>,
}

impl Message {
    /// Returns true if the message carries `\Seen`.
    #[must_use]
    pub fn is_seen(&self) -> bool {
        self.flags.iter().any(|f| f.eq_ignore_ascii_case("\\Seen"))
    }

    /// To, Cc and Bcc together.
    #[must_use]
    pub fn recipients(&self) -> Vec<String> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .cloned()
            .collect()
    }
}

/// Extracts the job parameters for a message.
///
/// Every key is prefixed with `prefix`. Absent attributes are omitted
/// rather than sent as empty strings.
#[must_use]
pub fn extract_properties(message: &Message, prefix: &str) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();
    let mut put = |key: &str, value: Option<String>| {
        if let Some(value) = value {
            props.insert(format!("{prefix}{key}"), value);
        }
    };

    put("subject", message.subject.clone());
    put("from", join(&message.from, ", "));
    put("replyTo", join(&message.reply_to, ", "));
    put("to", join(&message.to, ", "));
    put("cc", join(&message.cc, ", "));
    put("recipients", join(&message.recipients(), ", "));
    put("sentDate", message.sent_date.clone());
    put("receivedDate", message.received.map(|d| d.to_rfc2822()));
    put("messageId", message.message_id.clone());
    put(
        "messageNumber",
        (message.sequence > 0).then(|| message.sequence.to_string()),
    );
    put("uid", (message.uid > 0).then(|| message.uid.to_string()));
    put("size", message.size.map(|s| s.to_string()));
    put("flags", join(&message.flags, " "));

    props
}

fn join(values: &[String], separator: &str) -> Option<String> {
    (!values.is_empty()).then(|| values.join(separator))
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

    fn build_message() -> Message {
        Message {
            uid: 42,
            sequence: 3,
            subject: Some("jenkins > build #42".to_string()),
            from: vec!["Jenkins <ci@example.com>".to_string()],
            to: vec!["dev@example.com".to_string()],
            cc: vec!["Ops <ops@example.com>".to_string()],
            sent_date: Some("Sat, 7 Mar 2026 09:15:00 +0000".to_string()),
            received: DateTime::parse_from_rfc3339("2026-03-07T09:15:05+00:00").ok(),
            message_id: Some("<42@example.com>".to_string()),
            size: Some(2048),
            ..Message::default()
        }
    }

    #[test]
    fn every_key_is_prefixed() {
        let props = extract_properties(&build_message(), "pmt_");
        assert!(!props.is_empty());
        assert!(props.keys().all(|k| k.starts_with("pmt_")));
    }

    #[test]
    fn extracts_message_attributes() {
        let props = extract_properties(&build_message(), "pmt_");

        assert_eq!(props["pmt_subject"], "jenkins > build #42");
        assert_eq!(props["pmt_from"], "Jenkins <ci@example.com>");
        assert_eq!(props["pmt_recipients"], "dev@example.com, Ops <ops@example.com>");
        assert_eq!(props["pmt_receivedDate"], "Sat, 7 Mar 2026 09:15:05 +0000");
        assert_eq!(props["pmt_messageNumber"], "3");
        assert_eq!(props["pmt_uid"], "42");
        assert_eq!(props["pmt_size"], "2048");
    }

    #[test]
    fn absent_attributes_are_omitted() {
        let props = extract_properties(&build_message(), "pmt_");
        assert!(!props.contains_key("pmt_replyTo"));
        assert!(!props.contains_key("pmt_flags"));

        let props = extract_properties(&Message::default(), "pmt_");
        assert!(props.is_empty());
    }

    #[test]
    fn custom_prefix() {
        let props = extract_properties(&build_message(), "mail.");
        assert!(props.contains_key("mail.subject"));
    }

    #[test]
    fn seen_flag_detection() {
        let message = Message {
            flags: vec!["\\Flagged".to_string(), "\\SEEN".to_string()],
            ..Message::default()
        };
        assert!(message.is_seen());
        assert_eq!(extract_properties(&message, "p_")["p_flags"], "\\Flagged \\SEEN");
    }
}

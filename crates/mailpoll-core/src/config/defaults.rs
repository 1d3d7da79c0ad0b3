//! Default values and derived connection properties.

use super::{ConfigKey, Configuration};

/// Debug switches enabled for every cycle.
const DEBUG_FLAGS: [&str; 2] = ["mail.debug", "mail.debug.auth"];

/// Fills in defaults and derives the store-specific connection keys.
///
/// Only absent or blank keys are written, so applying this twice yields the
/// same configuration as applying it once.
pub fn apply_defaults(config: &mut Configuration) {
    for key in ConfigKey::ALL {
        if let Some(default) = key.default_value() {
            config.put_if_blank(key.as_str(), default);
        }
    }

    let store = config
        .get(ConfigKey::StoreName)
        .unwrap_or_default()
        .to_string();

    if let Some(host) = config.value(ConfigKey::Host).map(str::to_string) {
        config.put_if_blank(format!("mail.{store}.host"), host);
    }
    config.put_if_blank(format!("mail.{store}.port"), default_port(&store).to_string());

    for flag in DEBUG_FLAGS {
        config.put_if_blank(flag, "true");
    }
}

/// Port implied by a store name: secure stores (ending in `s`) use 993.
#[must_use]
pub fn default_port(store: &str) -> u16 {
    if store.to_ascii_lowercase().ends_with('s') {
        993
    } else {
        143
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
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn fills_every_default() {
        let mut config = Configuration::parse("host=mail.x.com").unwrap();
        apply_defaults(&mut config);

        assert_eq!(config.get("storeName"), Some("imaps"));
        assert_eq!(config.get("folder"), Some("INBOX"));
        assert_eq!(config.get("subjectContains"), Some("jenkins >"));
        assert_eq!(config.get("receivedXMinutesAgo"), Some("1440"));
        assert_eq!(config.get("mail.imaps.host"), Some("mail.x.com"));
        assert_eq!(config.get("mail.imaps.port"), Some("993"));
        assert_eq!(config.get("mail.debug"), Some("true"));
        assert_eq!(config.get("mail.debug.auth"), Some("true"));
    }

    #[test]
    fn blank_values_are_replaced() {
        let mut config = Configuration::parse("folder=\nstoreName= ").unwrap();
        apply_defaults(&mut config);
        assert_eq!(config.get("folder"), Some("INBOX"));
        assert_eq!(config.get("storeName"), Some("imaps"));
    }

    #[test]
    fn explicit_values_win() {
        let mut config = Configuration::parse(
            "storeName=imap\nhost=h\nmail.imap.port=1143\nmail.debug=false",
        )
        .unwrap();
        apply_defaults(&mut config);

        assert_eq!(config.get("mail.imap.host"), Some("h"));
        assert_eq!(config.get("mail.imap.port"), Some("1143"));
        assert_eq!(config.get("mail.debug"), Some("false"));
    }

    #[test]
    fn no_host_key_without_host() {
        let mut config = Configuration::new();
        apply_defaults(&mut config);
        assert_eq!(config.get("mail.imaps.host"), None);
        assert_eq!(config.get("mail.imaps.port"), Some("993"));
    }

    #[test]
    fn port_derivation() {
        assert_eq!(default_port("imaps"), 993);
        assert_eq!(default_port("IMAPS"), 993);
        assert_eq!(default_port("pop3s"), 993);
        assert_eq!(default_port("imap"), 143);
        assert_eq!(default_port(""), 143);
    }

    fn script_line() -> impl Strategy<Value = String> {
        let key = prop_oneof![
            Just("host".to_string()),
            Just("storeName".to_string()),
            Just("folder".to_string()),
            Just("subjectContains".to_string()),
            Just("mail.debug".to_string()),
            "[a-z]{1,6}",
        ];
        (key, "[ a-zA-Z0-9>.]{0,8}").prop_map(|(k, v)| format!("{k}={v}"))
    }

    proptest! {
        #[test]
        fn apply_defaults_is_idempotent(lines in prop::collection::vec(script_line(), 0..8)) {
            let mut once = Configuration::parse(&lines.join("\n")).unwrap();
            apply_defaults(&mut once);
            let mut twice = once.clone();
            apply_defaults(&mut twice);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn secure_store_names_get_993(stem in "[a-zA-Z0-9]{0,8}", upper in any::<bool>()) {
            let suffix = if upper { "S" } else { "s" };
            let mut config = Configuration::new();
            config.set("storeName", format!("{stem}{suffix}"));
            apply_defaults(&mut config);
            let key = format!("mail.{stem}{suffix}.port");
            prop_assert_eq!(config.get(&key), Some("993"));
        }

        #[test]
        fn other_store_names_get_143(stem in "[a-zA-Z0-9]{0,7}[a-rt-zA-RT-Z0-9]") {
            prop_assert_eq!(default_port(&stem), 143);
        }
    }
}

//! Required-field validation.

use super::{ConfigKey, Configuration};
use crate::{Error, Result};

/// Returns every required key that is absent or blank, in reporting order.
#[must_use]
pub fn missing_required(config: &Configuration) -> Vec<ConfigKey> {
    ConfigKey::REQUIRED
        .into_iter()
        .filter(|key| !config.has(key))
        .collect()
}

/// Checks that every required key is present.
///
/// # Errors
///
/// Returns [`Error::MissingRequiredFields`] listing all missing keys.
pub fn validate(config: &Configuration) -> Result<()> {
    let missing = missing_required(config);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingRequiredFields(missing))
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
    fn reports_every_missing_field() {
        let config = Configuration::parse("storeName=imaps\npassword=").unwrap();
        assert_eq!(
            missing_required(&config),
            vec![ConfigKey::Host, ConfigKey::Username, ConfigKey::Password]
        );
    }

    #[test]
    fn complete_configuration_validates() {
        let config =
            Configuration::parse("host=h\nstoreName=imaps\nusername=u\npassword=p").unwrap();
        assert!(validate(&config).is_ok());
    }

    proptest! {
        #[test]
        fn every_missing_field_is_reported(present in prop::collection::vec(any::<bool>(), 4)) {
            let mut config = Configuration::new();
            let mut expected = Vec::new();
            for (key, keep) in ConfigKey::REQUIRED.into_iter().zip(&present) {
                if *keep {
                    config.set(key.as_str(), "x");
                } else {
                    expected.push(key);
                }
            }
            prop_assert_eq!(missing_required(&config), expected);
        }
    }
}

//! Type tag to variant dispatch - the central extension point.

use grimward_domain::{GrantConfig, GrantKind};

use super::behavior::GrantBehavior;
use super::characteristic_grant::CharacteristicGrant;
use super::choice_grant::ChoiceGrant;
use super::item_grant::ItemGrant;
use super::resource_grant::ResourceGrant;
use super::skill_grant::SkillGrant;

/// Instantiate the behavior matching a configuration's type tag.
///
/// Unknown tags cannot reach this point: they are rejected when the wire
/// form is deserialized (see `migration::extract_grants`).
pub fn create_grant(config: GrantConfig) -> Box<dyn GrantBehavior> {
    match &config.kind {
        GrantKind::Item(_) => Box::new(ItemGrant::new(config)),
        GrantKind::Skill(_) => Box::new(SkillGrant::new(config)),
        GrantKind::Characteristic(_) => Box::new(CharacteristicGrant::new(config)),
        GrantKind::Resource(_) => Box::new(ResourceGrant::new(config)),
        GrantKind::Choice(_) => Box::new(ChoiceGrant::new(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grimward_domain::{CharacteristicGrantConfig, CharacteristicGrantEntry};

    #[test]
    fn test_dispatch_matches_type_tag() {
        let config = GrantConfig::new(GrantKind::Characteristic(CharacteristicGrantConfig {
            characteristics: vec![CharacteristicGrantEntry {
                key: "toughness".to_string(),
                value: 2,
                optional: false,
            }],
        }));
        let behavior = create_grant(config);
        assert_eq!(behavior.config().type_tag(), "characteristic");
        assert!(behavior.validate().is_empty());
    }
}

//! Feature definitions: the typed schema references of a twin's Feature.
//!
//! The correlator never looks inside these; they only shape the payload the
//! management client sends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::ValidationError;

/// One `namespace:name:version` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DefinitionIdentifier {
    namespace: String,
    name: String,
    version: String,
}

impl DefinitionIdentifier {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let id = Self {
            namespace: namespace.into(),
            name: name.into(),
            version: version.into(),
        };
        let valid = [&id.namespace, &id.name, &id.version]
            .iter()
            .all(|part| is_valid_part(part));
        if !valid {
            return Err(ValidationError::InvalidIdentifier(id.to_string()));
        }
        Ok(id)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

fn is_valid_part(part: &str) -> bool {
    !part.is_empty() && !part.contains(':') && !part.chars().any(char::is_whitespace)
}

impl fmt::Display for DefinitionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.name, self.version)
    }
}

impl FromStr for DefinitionIdentifier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(namespace), Some(name), Some(version), None) => {
                Self::new(namespace, name, version)
            }
            _ => Err(ValidationError::InvalidIdentifier(s.to_string())),
        }
    }
}

impl TryFrom<String> for DefinitionIdentifier {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DefinitionIdentifier> for String {
    fn from(id: DefinitionIdentifier) -> Self {
        id.to_string()
    }
}

/// Non-empty ordered list of identifiers describing a Feature's capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DefinitionIdentifier>", into = "Vec<DefinitionIdentifier>")]
pub struct FeatureDefinition(Vec<DefinitionIdentifier>);

impl FeatureDefinition {
    pub fn new(identifiers: Vec<DefinitionIdentifier>) -> Result<Self, ValidationError> {
        if identifiers.is_empty() {
            return Err(ValidationError::EmptyDefinition);
        }
        Ok(Self(identifiers))
    }

    /// Parse every entry as `namespace:name:version`.
    pub fn parse<I, S>(identifiers: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids = identifiers
            .into_iter()
            .map(|s| s.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(ids)
    }

    pub fn identifiers(&self) -> &[DefinitionIdentifier] {
        &self.0
    }
}

impl TryFrom<Vec<DefinitionIdentifier>> for FeatureDefinition {
    type Error = ValidationError;

    fn try_from(value: Vec<DefinitionIdentifier>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FeatureDefinition> for Vec<DefinitionIdentifier> {
    fn from(def: FeatureDefinition) -> Self {
        def.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_identifier() {
        let id: DefinitionIdentifier = "org.eclipse.ditto:fluxcapacitor:1.0.0".parse().unwrap();
        assert_eq!(id.namespace(), "org.eclipse.ditto");
        assert_eq!(id.name(), "fluxcapacitor");
        assert_eq!(id.version(), "1.0.0");
        assert_eq!(id.to_string(), "org.eclipse.ditto:fluxcapacitor:1.0.0");
    }

    #[rstest]
    #[case::empty("")]
    #[case::two_parts("ns:name")]
    #[case::four_parts("ns:name:1:extra")]
    #[case::empty_name("ns::1")]
    #[case::whitespace("ns:na me:1")]
    fn rejects_malformed_identifier(#[case] input: &str) {
        assert!(matches!(
            input.parse::<DefinitionIdentifier>(),
            Err(ValidationError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn definition_must_not_be_empty() {
        let empty: Vec<&str> = vec![];
        assert_eq!(FeatureDefinition::parse(empty), Err(ValidationError::EmptyDefinition));
    }

    #[test]
    fn definition_serializes_as_string_list() {
        let def = FeatureDefinition::parse(["ns:a:1", "ns:b:2.0"]).unwrap();
        let v = serde_json::to_value(&def).unwrap();
        assert_eq!(v, serde_json::json!(["ns:a:1", "ns:b:2.0"]));

        let back: FeatureDefinition = serde_json::from_value(v).unwrap();
        assert_eq!(back, def);
        assert_eq!(back.identifiers()[0].name(), "a");
    }

    #[test]
    fn deserializing_invalid_definition_fails() {
        assert!(serde_json::from_value::<FeatureDefinition>(serde_json::json!([])).is_err());
        assert!(serde_json::from_value::<FeatureDefinition>(serde_json::json!(["bad"])).is_err());
    }
}

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// The closed set of backend models an agent can be bound to.
///
/// The serialized form is the identifier the backend expects in its URL.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum ModelId {
    #[default]
    #[serde(rename = "gemini-2.5-flash-preview-04-17")]
    #[strum(serialize = "gemini-2.5-flash-preview-04-17")]
    Gemini25FlashPreview0417,
    #[serde(rename = "gemini-2.5-pro-exp-03-25")]
    #[strum(serialize = "gemini-2.5-pro-exp-03-25")]
    Gemini25ProExperimental0325,
    #[serde(rename = "gemini-2.0-flash")]
    #[strum(serialize = "gemini-2.0-flash")]
    Gemini20Flash,
    #[serde(rename = "gemini-2.0-flash-lite")]
    #[strum(serialize = "gemini-2.0-flash-lite")]
    Gemini20FlashLite,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_default_model() {
        assert_eq!(ModelId::default(), ModelId::Gemini25FlashPreview0417);
        assert_eq!(ModelId::default().as_ref(), "gemini-2.5-flash-preview-04-17");
    }

    #[test]
    fn test_serde_and_strum_agree() {
        for model in ModelId::iter() {
            let serialized = serde_json::to_value(model).unwrap();
            assert_eq!(serialized.as_str(), Some(model.as_ref()));
            assert_eq!(ModelId::from_str(&model.to_string()).unwrap(), model);
        }
    }

    #[test]
    fn test_unknown_model_rejected() {
        assert!(ModelId::from_str("gpt-4o").is_err());
        assert!(serde_json::from_str::<ModelId>("\"gpt-4o\"").is_err());
    }
}

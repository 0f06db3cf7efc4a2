use std::path::Path;

use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::ext::PathExt;
use crate::rules::{Declarations, Mode, RuleValue};

/// The parsed rules document: path declarations in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesFile {
    declarations: Declarations,
}

impl RulesFile {
    pub async fn read(path: &Path) -> Result<Self, RulesFileError> {
        debug!("Reading rules file: {}", path.best_effort_path_display());
        let bytes = fs::read(path).await.context(ReadSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        debug!("Successfully read rules file: {} bytes", bytes.len());

        let contents = String::from_utf8(bytes).context(Utf8Snafu {
            file_path: path.best_effort_path_display(),
        })?;
        contents.as_str().try_into()
    }

    pub fn declarations(&self) -> &Declarations {
        &self.declarations
    }

    fn parse_mapping(
        mapping: &LinkedHashMap<Yaml, Yaml>,
        parent: &str,
    ) -> Result<Declarations, RulesFileError> {
        mapping
            .iter()
            .map(|(key, value)| {
                let raw_path = Self::parse_key(key, parent)?;
                let full_path = Self::join(parent, &raw_path);
                let value = Self::parse_value(value, &full_path)?;
                Ok((raw_path, value))
            })
            .collect()
    }

    fn parse_key(key: &Yaml, parent: &str) -> Result<String, RulesFileError> {
        match key {
            Yaml::Value(Scalar::String(raw_path)) => Ok(raw_path.to_string()),
            other => InvalidKeySnafu {
                parent: parent.to_owned(),
                key: format!("{other:?}"),
            }
            .fail(),
        }
    }

    fn parse_value(value: &Yaml, full_path: &str) -> Result<RuleValue, RulesFileError> {
        match value {
            Yaml::Value(Scalar::String(token)) if token.trim().is_empty() => EmptyModeSnafu {
                rule_path: full_path.to_owned(),
            }
            .fail(),
            Yaml::Value(Scalar::String(token)) => Ok(RuleValue::Mode(Mode::from(token.trim()))),
            Yaml::Mapping(nested) => Ok(RuleValue::Nested(Self::parse_mapping(nested, full_path)?)),
            other => InvalidValueSnafu {
                rule_path: full_path.to_owned(),
                value: format!("{other:?}"),
            }
            .fail(),
        }
    }

    fn join(parent: &str, raw_path: &str) -> String {
        if parent.is_empty() {
            raw_path.to_owned()
        } else {
            format!("{parent}/{raw_path}")
        }
    }
}

impl TryFrom<&str> for RulesFile {
    type Error = RulesFileError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let document = documents.first().ok_or(RulesFileError::MalformedRules)?;

        let empty = LinkedHashMap::new();
        let top_level = match document {
            Yaml::Mapping(mapping) => mapping,
            Yaml::Value(Scalar::Null) => &empty,
            _ => return Err(RulesFileError::TopLevelNotMap),
        };

        let declarations = Self::parse_mapping(top_level, "")?;
        debug!("Parsed {} top-level rule declarations", declarations.len());
        Ok(RulesFile { declarations })
    }
}

#[derive(Debug, Snafu)]
pub enum RulesFileError {
    #[snafu(display("Failed to read the rules file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("The rules file {} is not valid UTF-8", file_path))]
    Utf8Error {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the rules file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted rules file"))]
    MalformedRules,
    #[snafu(display("Top level of the rules file should be a map"))]
    TopLevelNotMap,
    #[snafu(display(
        "Rule key {} under '{}' is not a path string; quote it to use it as a path",
        key,
        parent
    ))]
    InvalidKey { parent: String, key: String },
    #[snafu(display(
        "Rule '{}' must be a mode token or a nested map, got {}",
        rule_path,
        value
    ))]
    InvalidValue { rule_path: String, value: String },
    #[snafu(display("Rule '{}' has an empty mode", rule_path))]
    EmptyMode { rule_path: String },
}

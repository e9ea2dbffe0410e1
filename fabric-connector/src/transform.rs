//! Shared field-mapping evaluator for `ReplicationOps::transform`. Every
//! adapter's replication implementation delegates here instead of
//! re-implementing `MappingRule` evaluation (spec §3 `MappingRule`, §4.9
//! step 2 "Transform").

use crate::adapter::Row;
use fabric_types::errors::FabricError;
use fabric_types::relationship::{HashAlg, MappingRule, MaskStyle, Transform};
use serde_json::Value;
use sha2::{Digest, Sha256};

pub fn apply(row: Row, rules: &[MappingRule]) -> Result<Row, FabricError> {
    let mut out = Row::new();
    for rule in rules {
        let Some(value) = row.get(&rule.source_path) else {
            continue;
        };
        let transformed = apply_transform(value.clone(), &rule.transform)?;
        out.insert(rule.target_path.clone(), transformed);
    }
    Ok(out)
}

fn apply_transform(value: Value, transform: &Transform) -> Result<Value, FabricError> {
    match transform {
        Transform::Identity => Ok(value),
        Transform::Upper => Ok(string_map(value, |s| s.to_uppercase())),
        Transform::Lower => Ok(string_map(value, |s| s.to_lowercase())),
        Transform::Hash { alg } => Ok(string_map(value, |s| hash(s, *alg))),
        Transform::RegexReplace { pattern, replacement } => {
            let re = regex_lite::Regex::new(pattern)
                .map_err(|e| FabricError::internal(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())))?;
            Ok(string_map(value, |s| re.replace_all(&s, replacement.as_str()).into_owned()))
        }
        Transform::Cast { to } => cast(value, to),
        Transform::Mask { style } => Ok(string_map(value, |s| mask(&s, *style))),
    }
}

fn string_map(value: Value, f: impl FnOnce(String) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        other => other,
    }
}

fn hash(s: String, alg: HashAlg) -> String {
    match alg {
        HashAlg::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(s.as_bytes());
            hex::encode(hasher.finalize())
        }
        HashAlg::Md5 => format!("{:x}", md5::compute(s.as_bytes())),
    }
}

fn mask(s: &str, style: MaskStyle) -> String {
    match style {
        MaskStyle::Full => "*".repeat(s.chars().count()),
        MaskStyle::Partial => {
            let chars: Vec<char> = s.chars().collect();
            if chars.len() <= 2 {
                return "*".repeat(chars.len());
            }
            let mut masked: String = chars[..1].iter().collect();
            masked.push_str(&"*".repeat(chars.len() - 2));
            masked.push(chars[chars.len() - 1]);
            masked
        }
    }
}

fn cast(value: Value, to: &str) -> Result<Value, FabricError> {
    match to {
        "string" => Ok(Value::String(match value {
            Value::String(s) => s,
            other => other.to_string(),
        })),
        "int64" => match value {
            Value::Number(n) => Ok(Value::from(n.as_i64().unwrap_or_default())),
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| FabricError::internal(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))),
            other => Ok(other),
        },
        "float64" => match value {
            Value::Number(n) => Ok(Value::from(n.as_f64().unwrap_or_default())),
            Value::String(s) => s
                .parse::<f64>()
                .map(Value::from)
                .map_err(|e| FabricError::internal(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))),
            other => Ok(other),
        },
        other => Err(FabricError::unsupported(format!("cast to {other}"), "transform")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_partial_keeps_first_and_last() {
        assert_eq!(mask("secret", MaskStyle::Partial), "s****t");
    }

    #[test]
    fn apply_renames_and_transforms_fields() {
        let mut row = Row::new();
        row.insert("email".to_string(), Value::from("Jane@Example.com"));
        let rules = vec![MappingRule {
            source_path: "email".to_string(),
            target_path: "email_lower".to_string(),
            transform: Transform::Lower,
        }];
        let out = apply(row, &rules).unwrap();
        assert_eq!(out.get("email_lower").unwrap(), "jane@example.com");
    }
}

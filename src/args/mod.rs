//! Argument vectors from structured configuration.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{CommandError, Result};

/// A configuration value and the tokens it expands to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// Emit the bare key, untouched.
    Bare,
    Flag(bool),
    Scalar(String),
    List(Vec<String>),
    Map(IndexMap<String, String>),
}

/// Flag prefix and naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FlagStyle {
    pub bsd_style: bool,
    pub kebab_case_flags: bool,
}

impl Default for FlagStyle {
    fn default() -> Self { Self::gnu() }
}

impl FlagStyle {
    /// `--long` and `-s` flags, underscores rewritten to hyphens.
    pub fn gnu() -> Self { Self { bsd_style: false, kebab_case_flags: true } }

    /// Single dash for every flag.
    pub fn bsd() -> Self { Self { bsd_style: true, kebab_case_flags: true } }

    pub fn kebab(mut self, on: bool) -> Self { self.kebab_case_flags = on; self }
}

/// Insertion-ordered flag configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgConfig(pub IndexMap<String, ArgValue>);

impl ArgConfig {
    pub fn new() -> Self { ArgConfig(IndexMap::new()) }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Re-inserting an existing key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ArgValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ArgValue)> { self.0.iter() }

    pub fn to_args(&self, style: FlagStyle) -> Vec<String> { build(self, style) }

    /// Convert a JSON object into a configuration, keeping key order.
    pub fn from_json_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(obj) => {
                let mut cfg = ArgConfig::new();
                for (k, v) in obj {
                    let arg = ArgValue::from_json(&k, v)?;
                    cfg.0.insert(k, arg);
                }
                Ok(cfg)
            }
            other => Err(CommandError::InvalidValueKind { key: String::new(), kind: json_kind(&other) }),
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Self::from_json_value(serde_json::from_str(s)?)
    }
}

impl<'de> Deserialize<'de> for ArgConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ArgConfig::from_json_value(value).map_err(serde::de::Error::custom)
    }
}

impl<K: Into<String>, V: Into<ArgValue>> FromIterator<(K, V)> for ArgConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut cfg = ArgConfig::new();
        for (k, v) in iter { cfg.insert(k, v); }
        cfg
    }
}

impl ArgValue {
    /// Map a dynamic JSON value onto a conversion rule.
    pub fn from_json(key: &str, value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(ArgValue::Bare),
            Value::Bool(b) => Ok(ArgValue::Flag(b)),
            Value::String(s) => Ok(ArgValue::Scalar(s)),
            Value::Number(n) => Ok(ArgValue::Scalar(n.to_string())),
            Value::Array(items) => items
                .into_iter()
                .map(|v| json_scalar(key, v))
                .collect::<Result<Vec<_>>>()
                .map(ArgValue::List),
            Value::Object(obj) => obj
                .into_iter()
                .map(|(k, v)| json_scalar(key, v).map(|s| (k, s)))
                .collect::<Result<IndexMap<_, _>>>()
                .map(ArgValue::Map),
        }
    }
}

fn json_scalar(key: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(CommandError::InvalidValueKind {
            key: key.to_string(),
            kind: match other {
                Value::Null => "null element",
                Value::Array(_) => "nested array",
                _ => "nested object",
            },
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Flag token for `key`: prefix by style, body kebab-cased when enabled.
pub fn flag_token(key: &str, style: FlagStyle) -> String {
    let body = if style.kebab_case_flags { key.replace('_', "-") } else { key.to_string() };
    let prefix = if style.bsd_style || body.chars().count() == 1 { "-" } else { "--" };
    format!("{}{}", prefix, body)
}

/// Expand a configuration into a token sequence, in key order.
pub fn build(config: &ArgConfig, style: FlagStyle) -> Vec<String> {
    let mut out = Vec::new();
    for (key, value) in config.iter() {
        match value {
            ArgValue::Bare => out.push(key.clone()),
            ArgValue::Flag(false) => {}
            ArgValue::Flag(true) => out.push(flag_token(key, style)),
            ArgValue::Scalar(v) => {
                out.push(flag_token(key, style));
                out.push(v.clone());
            }
            ArgValue::List(items) => {
                let flag = flag_token(key, style);
                for v in items {
                    out.push(flag.clone());
                    out.push(v.clone());
                }
            }
            ArgValue::Map(pairs) => {
                let flag = flag_token(key, style);
                for (k, v) in pairs {
                    out.push(flag.clone());
                    out.push(format!("{}={}", k, v));
                }
            }
        }
    }
    out
}

/// Parse and expand a JSON configuration in one step.
pub fn build_json(config: Value, style: FlagStyle) -> Result<Vec<String>> {
    Ok(build(&ArgConfig::from_json_value(config)?, style))
}

impl From<()> for ArgValue {
    fn from(_: ()) -> Self { ArgValue::Bare }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self { ArgValue::Flag(b) }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self { ArgValue::Scalar(s.to_string()) }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self { ArgValue::Scalar(s) }
}

impl From<&String> for ArgValue {
    fn from(s: &String) -> Self { ArgValue::Scalar(s.clone()) }
}

impl From<char> for ArgValue {
    fn from(c: char) -> Self { ArgValue::Scalar(c.to_string()) }
}

macro_rules! scalar_from {
    ($($t:ty),*) => {
        $(impl From<$t> for ArgValue {
            fn from(v: $t) -> Self { ArgValue::Scalar(v.to_string()) }
        })*
    };
}

scalar_from!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(v: Option<T>) -> Self { v.map_or(ArgValue::Bare, Into::into) }
}

impl<T: ToString> From<Vec<T>> for ArgValue {
    fn from(v: Vec<T>) -> Self { ArgValue::List(v.iter().map(ToString::to_string).collect()) }
}

impl<T: ToString> From<&[T]> for ArgValue {
    fn from(v: &[T]) -> Self { ArgValue::List(v.iter().map(ToString::to_string).collect()) }
}

impl<T: ToString, const N: usize> From<[T; N]> for ArgValue {
    fn from(v: [T; N]) -> Self { ArgValue::List(v.iter().map(ToString::to_string).collect()) }
}

impl<K: ToString, V: ToString> From<IndexMap<K, V>> for ArgValue {
    fn from(m: IndexMap<K, V>) -> Self {
        ArgValue::Map(m.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }
}

impl<K: ToString, V: ToString> From<BTreeMap<K, V>> for ArgValue {
    fn from(m: BTreeMap<K, V>) -> Self {
        ArgValue::Map(m.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn gnu(cfg: ArgConfig) -> Vec<String> { build(&cfg, FlagStyle::gnu()) }

    #[test]
    fn boolean_flags() {
        assert_eq!(gnu(ArgConfig::new().with("verbose", true)), vec!["--verbose"]);
        assert_eq!(gnu(ArgConfig::new().with("v", true)), vec!["-v"]);
        assert!(gnu(ArgConfig::new().with("v", false)).is_empty());
    }

    #[test]
    fn list_values_repeat_the_flag() {
        let cfg = ArgConfig::new().with("tag", vec!["a", "b"]);
        assert_eq!(build(&cfg, FlagStyle::gnu()), vec!["--tag", "a", "--tag", "b"]);
        assert_eq!(build(&cfg, FlagStyle::bsd()), vec!["-tag", "a", "-tag", "b"]);
    }

    #[test]
    fn kebab_case_toggle() {
        let cfg = ArgConfig::new().with("enable_jit", true);
        assert_eq!(build(&cfg, FlagStyle::gnu()), vec!["--enable-jit"]);
        assert_eq!(build(&cfg, FlagStyle::gnu().kebab(false)), vec!["--enable_jit"]);
    }

    #[test]
    fn nested_map_becomes_key_value_pairs() {
        let mut labels = IndexMap::new();
        labels.insert("env", "test");
        labels.insert("arch", "amd64");
        let cfg = ArgConfig::new().with("label", labels);
        assert_eq!(gnu(cfg), vec!["--label", "env=test", "--label", "arch=amd64"]);
    }

    #[test]
    fn bare_keys_are_verbatim() {
        let cfg = ArgConfig::new()
            .with("docker", ())
            .with("build", ())
            .with("no_cache", true)
            .with("--raw_flag", ())
            .with(".", ());
        assert_eq!(gnu(cfg), vec!["docker", "build", "--no-cache", "--raw_flag", "."]);
    }

    #[test]
    fn dashed_key_with_value_is_prefixed_again() {
        let cfg = ArgConfig::new().with("-x", "1");
        assert_eq!(gnu(cfg), vec!["---x", "1"]);
    }

    #[test]
    fn bsd_single_char_and_scalars() {
        let cfg = ArgConfig::new().with("c", 9).with("level", 3.5).with("o", 'z');
        assert_eq!(build(&cfg, FlagStyle::bsd()), vec!["-c", "9", "-level", "3.5", "-o", "z"]);
    }

    #[test]
    fn single_char_after_kebab_is_short() {
        assert_eq!(flag_token("_", FlagStyle::gnu()), "--");
        assert_eq!(flag_token("_", FlagStyle::gnu().kebab(false)), "-_");
        assert_eq!(flag_token("ab", FlagStyle::gnu()), "--ab");
    }

    #[test]
    fn token_count_law() {
        let cfg = ArgConfig::new()
            .with("prog", ())
            .with("a", true)
            .with("bee", "x")
            .with("cee", ())
            .with("dee", true)
            .with("e", "y");
        let out = gnu(cfg);
        assert_eq!(out.len(), 2 + 2 + 2 * 2);
    }

    #[test]
    fn build_is_repeatable() {
        let cfg = ArgConfig::new()
            .with("zeta", "1")
            .with("alpha", vec![3, 2, 1])
            .with("mid", None::<String>);
        assert_eq!(gnu(cfg.clone()), gnu(cfg.clone()));
        assert_eq!(gnu(cfg), vec!["--zeta", "1", "--alpha", "3", "--alpha", "2", "--alpha", "1", "mid"]);
    }

    #[test]
    fn json_config_keeps_order() {
        let cfg = ArgConfig::from_json_value(json!({
            "docker": null,
            "build": null,
            "tag": ["img:1", "img:latest"],
            "build_arg": {"RUBY": "3.3", "JOBS": 4},
            "pull": true,
            "quiet": false,
            "file": "Dockerfile",
        }))
        .unwrap();
        assert_eq!(
            gnu(cfg),
            vec![
                "docker", "build", "--tag", "img:1", "--tag", "img:latest", "--build-arg", "RUBY=3.3",
                "--build-arg", "JOBS=4", "--pull", "--file", "Dockerfile",
            ]
        );
    }

    #[test]
    fn json_rejects_unconvertible_values() {
        let err = build_json(json!({"tag": [["a"]]}), FlagStyle::gnu()).unwrap_err();
        assert!(matches!(err, CommandError::InvalidValueKind { ref key, kind: "nested array" } if key == "tag"));

        let err = build_json(json!({"label": {"k": {"x": 1}}}), FlagStyle::gnu()).unwrap_err();
        assert!(matches!(err, CommandError::InvalidValueKind { kind: "nested object", .. }));

        let err = build_json(json!(["not", "a", "map"]), FlagStyle::gnu()).unwrap_err();
        assert!(matches!(err, CommandError::InvalidValueKind { kind: "array", .. }));
    }

    #[test]
    fn deserialize_style_and_config() {
        let style: FlagStyle = serde_json::from_str(r#"{"bsd_style": true}"#).unwrap();
        assert_eq!(style, FlagStyle::bsd());

        let cfg: ArgConfig = serde_json::from_str(r#"{"tar": null, "c": true, "f": "out.tar"}"#).unwrap();
        assert_eq!(build(&cfg, style), vec!["tar", "-c", "-f", "out.tar"]);

        let bad: std::result::Result<ArgConfig, _> = serde_json::from_str(r#"{"x": [null]}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn collect_from_pairs() {
        let cfg: ArgConfig = vec![("jobs", ArgValue::from(8)), ("keep_going", ArgValue::from(true))]
            .into_iter()
            .collect();
        assert_eq!(cfg.0.len(), 2);
        assert_eq!(gnu(cfg), vec!["--jobs", "8", "--keep-going"]);
    }
}

//! 快照脱敏

use serde_json::Value;

/// 脱敏后的占位值
pub const REDACTED: &str = "[REDACTED]";

const DEFAULT_KEYS: &[&str] = &[
    "password",
    "password_hash",
    "passwordhash",
    "token",
    "access_token",
    "accesstoken",
    "refresh_token",
    "refreshtoken",
    "secret",
    "authorization",
    "api_key",
    "apikey",
];

/// 凭据字段脱敏器
///
/// 键名比较大小写不敏感，对任意嵌套深度生效
#[derive(Debug, Clone)]
pub struct Redactor {
    keys: Vec<String>,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::with_extra_keys(&[])
    }
}

impl Redactor {
    pub fn with_extra_keys(extra: &[String]) -> Self {
        let keys = DEFAULT_KEYS
            .iter()
            .map(|k| k.to_string())
            .chain(extra.iter().map(|k| k.to_ascii_lowercase()))
            .collect();
        Self { keys }
    }

    pub fn is_sensitive(&self, key: &str) -> bool {
        let key = key.to_ascii_lowercase();
        self.keys.iter().any(|k| *k == key)
    }

    pub fn redact(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, child) in map.iter_mut() {
                    if self.is_sensitive(key) {
                        *child = Value::String(REDACTED.to_string());
                    } else {
                        self.redact(child);
                    }
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|item| self.redact(item)),
            _ => {}
        }
    }
}

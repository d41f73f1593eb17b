//! Layered loading: compiled defaults, then the JSON file merged over them
//! with [`deep_merge`], then environment overrides from
//! [`apply_env_overrides`].

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::KeeperSettings;

/// `~/.lease-keeper/settings.json`, falling back to `/tmp` without `HOME`.
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home)
        .join(".lease-keeper")
        .join("settings.json")
}

/// Settings from `~/.lease-keeper/settings.json` plus the environment.
pub fn load_settings() -> Result<KeeperSettings> {
    load_settings_from_path(&settings_path())
}

/// Settings from `path` plus the environment. A missing file means defaults;
/// malformed JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<KeeperSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

/// Defaults deep-merged with the file at `path`, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<KeeperSettings> {
    let defaults = serde_json::to_value(KeeperSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "merging settings file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "no settings file, defaults only");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Merge `source` into `target`. Objects merge key by key; any other value in
/// `source` (arrays included) replaces the target value. `null` in `source`
/// leaves the target untouched.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment overrides to loaded settings.
///
/// `lookup` resolves a variable name to its value; production passes
/// `std::env::var`, tests pass a map. Parsing rules:
/// - Integers must be valid and within the specified range
/// - Booleans accept: `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`
/// - Invalid values are ignored with a warning (fall back to file/default)
pub fn apply_env_overrides<F>(settings: &mut KeeperSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Account ─────────────────────────────────────────────────────
    if let Some(v) = env.string("PELLA_EMAIL") {
        settings.account.email = v;
    }
    if let Some(v) = env.string("GMAIL_APP_PASSWORD") {
        settings.account.mailbox_secret = v;
    }

    // ── Mail ────────────────────────────────────────────────────────
    if let Some(v) = env.string("KEEPER_IMAP_HOST") {
        settings.mail.imap_host = v;
    }
    if let Some(v) = env.u16("KEEPER_IMAP_PORT", 1, 65535) {
        settings.mail.imap_port = v;
    }
    if let Some(v) = env.string("KEEPER_MAIL_SENDER") {
        settings.mail.sender = v;
    }
    if let Some(v) = env.u32("KEEPER_MAIL_POLL_ROUNDS", 1, 1_000) {
        settings.mail.poll_rounds = v;
    }

    // ── Panel / browser ─────────────────────────────────────────────
    if let Some(v) = env.string("KEEPER_LEASE_ID") {
        settings.panel.lease_id = Some(v);
    }
    if let Some(v) = env.bool("KEEPER_HEADLESS") {
        settings.browser.headless = v;
    }
    if let Some(v) = env.string("CHROME_PATH") {
        settings.browser.chrome_path = Some(v);
    }
    if let Some(v) = env.string("KEEPER_ARTIFACT_DIR") {
        settings.artifact_dir = v;
    }

    // ── Notify ──────────────────────────────────────────────────────
    if let Some(v) = env.string("TELEGRAM_BOT_TOKEN") {
        settings.notify.telegram_bot_token = Some(v);
    }
    if let Some(v) = env.string("TELEGRAM_CHAT_ID") {
        settings.notify.telegram_chat_id = Some(v);
    }
    if let Some(v) = env.bool("KEEPER_PROGRESS_REPORTS") {
        settings.notify.progress = v;
    }
}

// ── Value parsers ───────────────────────────────────────────────────────────

/// `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`, any case.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `val` as a `u16` in `min..=max`.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// `val` as a `u32` in `min..=max`.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

// ── Env lookups ─────────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        let val = (self.lookup)(name)?;
        let result = parse_u16_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
        }
        result
    }

    fn u32(&self, name: &str, min: u32, max: u32) -> Option<u32> {
        let val = (self.lookup)(name)?;
        let result = parse_u32_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Password history: a packed sub-format inside one text record.
//!
//! The record text is laid out as:
//!
//! ```text
//! [enabled: 1 hex][max count: 2 hex][count: 2 hex]
//! ([time: 8 hex][length: 4 hex][password chars])*
//! ```
//!
//! Items are oldest-first and capped at the maximum count, oldest
//! evicted first.  When the flag is disabled the stored items are not
//! loaded, so a rewrite of a disabled history drops them.  A malformed
//! blob parses as a disabled, empty history rather than failing the
//! whole entry.

use chrono::{DateTime, TimeZone, Utc};

/// One historical password with the time it was first used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHistoryItem {
    pub time_first_used: DateTime<Utc>,
    pub historical_password: String,
}

/// Parsed view over the password-history record text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordHistory {
    enabled: bool,
    maximum_count: usize,
    items: Vec<PasswordHistoryItem>,
}

impl PasswordHistory {
    /// New enabled history with the given capacity and no items.
    pub fn new(maximum_count: usize) -> Self {
        Self {
            enabled: true,
            maximum_count,
            items: Vec::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable history keeping.  Disabling drops the stored
    /// items, matching how a disabled blob re-serializes.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.items.clear();
        }
    }

    pub fn maximum_count(&self) -> usize {
        self.maximum_count
    }

    /// Change the capacity, evicting oldest items if already over it.
    pub fn set_maximum_count(&mut self, maximum_count: usize) {
        self.maximum_count = maximum_count;
        self.evict();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[PasswordHistoryItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&PasswordHistoryItem> {
        self.items.get(index)
    }

    /// Remove all items, keeping the flag and capacity.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Append a password that is about to be replaced, evicting the
    /// oldest item when at capacity.
    pub fn push(&mut self, time_first_used: DateTime<Utc>, historical_password: &str) {
        self.items.push(PasswordHistoryItem {
            time_first_used,
            historical_password: historical_password.to_string(),
        });
        self.evict();
    }

    fn evict(&mut self) {
        while self.items.len() > self.maximum_count {
            self.items.remove(0);
        }
    }

    /// Parse the record text.  Malformed input yields the default
    /// (disabled, empty) history.
    pub fn parse(text: &str) -> Self {
        Self::try_parse(text).unwrap_or_default()
    }

    fn try_parse(text: &str) -> Option<Self> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() < 5 {
            return None;
        }

        let enabled = match chars[0] {
            '0' => false,
            '1' => true,
            _ => return None,
        };
        let maximum_count = hex_value(&chars[1..3])?;
        let count = hex_value(&chars[3..5])?;

        // A disabled history keeps its capacity but its items are not
        // loaded.
        if !enabled {
            return Some(Self {
                enabled,
                maximum_count,
                items: Vec::new(),
            });
        }

        let mut items = Vec::with_capacity(count);
        let mut pos = 5;
        for _ in 0..count {
            if chars.len() < pos + 12 {
                return None;
            }
            let seconds = hex_value(&chars[pos..pos + 8])? as i64;
            let length = hex_value(&chars[pos + 8..pos + 12])?;
            pos += 12;
            if chars.len() < pos + length {
                return None;
            }
            let historical_password: String = chars[pos..pos + length].iter().collect();
            pos += length;

            let time_first_used = Utc.timestamp_opt(seconds, 0).single()?;
            items.push(PasswordHistoryItem {
                time_first_used,
                historical_password,
            });
        }

        Some(Self {
            enabled,
            maximum_count,
            items,
        })
    }

    /// Serialize back to the record text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push(if self.enabled { '1' } else { '0' });
        out.push_str(&format!("{:02X}", self.maximum_count.min(0xFF)));
        out.push_str(&format!("{:02X}", self.items.len().min(0xFF)));
        for item in &self.items {
            let seconds = item.time_first_used.timestamp().max(0) as u64;
            out.push_str(&format!(
                "{:08X}{:04X}",
                seconds & 0xFFFF_FFFF,
                item.historical_password.chars().count().min(0xFFFF)
            ));
            out.push_str(&item.historical_password);
        }
        out
    }
}

fn hex_value(chars: &[char]) -> Option<usize> {
    let text: String = chars.iter().collect();
    usize::from_str_radix(&text, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_two_items() {
        // Enabled, capacity 2, two single-character passwords.
        let time_a = Utc.with_ymd_and_hms(2016, 6, 25, 20, 32, 15).unwrap();
        let time_b = Utc.with_ymd_and_hms(2016, 6, 25, 20, 32, 27).unwrap();
        let text = format!(
            "10202{:08X}{:04X}1{:08X}{:04X}2",
            time_a.timestamp(),
            1,
            time_b.timestamp(),
            1
        );

        let history = PasswordHistory::parse(&text);
        assert!(history.enabled());
        assert_eq!(history.maximum_count(), 2);
        assert_eq!(history.len(), 2);
        assert_eq!(history.get(0).unwrap().historical_password, "1");
        assert_eq!(history.get(0).unwrap().time_first_used, time_a);
        assert_eq!(history.get(1).unwrap().historical_password, "2");

        assert_eq!(PasswordHistory::parse(&history.to_text()), history);
    }

    #[test]
    fn push_evicts_oldest() {
        let mut history = PasswordHistory::new(2);
        let time = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
        history.push(time, "1");
        history.push(time, "2");
        history.push(time, "3");

        assert_eq!(history.len(), 2);
        assert_eq!(history.get(0).unwrap().historical_password, "2");
        assert_eq!(history.get(1).unwrap().historical_password, "3");
    }

    #[test]
    fn disabled_blob_drops_items() {
        let time = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
        let mut history = PasswordHistory::new(2);
        history.push(time, "old");
        history.set_enabled(false);

        let reparsed = PasswordHistory::parse(&history.to_text());
        assert!(!reparsed.enabled());
        assert_eq!(reparsed.maximum_count(), 2);
        assert_eq!(reparsed.len(), 0);
    }

    #[test]
    fn malformed_blob_is_default() {
        let history = PasswordHistory::parse("zzz");
        assert!(!history.enabled());
        assert_eq!(history.len(), 0);

        assert_eq!(PasswordHistory::parse(""), PasswordHistory::default());
    }

    #[test]
    fn clear_keeps_flag_and_capacity() {
        let time = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
        let mut history = PasswordHistory::new(2);
        history.push(time, "a");
        history.clear();
        assert!(history.enabled());
        assert_eq!(history.maximum_count(), 2);
        assert!(history.is_empty());
    }
}

//! Password-generation policies and their packed hex encodings.
//!
//! A per-entry policy (record 0x10) is packed as:
//!
//! ```text
//! [style: 4 hex][total length: 3 hex]
//! [min lowercase: 3 hex][min uppercase: 3 hex]
//! [min digits: 3 hex][min symbols: 3 hex]
//! ```
//!
//! with the special-symbol set stored separately in record 0x17.
//! The named-policy header (0x10) prepends a 2-hex policy count, and
//! each policy carries its name (2-hex length + text) and an inline
//! symbol set (2-hex length + text) after the packed body.  Hex is
//! written uppercase and parsed case-insensitively.

use std::ops::BitOr;

use crate::errors::{Result, VaultError};

/// Style bits of a password policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PasswordPolicyStyle(u16);

impl PasswordPolicyStyle {
    pub const USE_LOWERCASE: Self = Self(0x8000);
    pub const USE_UPPERCASE: Self = Self(0x4000);
    pub const USE_DIGITS: Self = Self(0x2000);
    pub const USE_SYMBOLS: Self = Self(0x1000);
    pub const USE_HEX_DIGITS: Self = Self(0x0800);
    pub const USE_EASY_VISION: Self = Self(0x0400);
    pub const MAKE_PRONOUNCEABLE: Self = Self(0x0200);

    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for PasswordPolicyStyle {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A password-generation rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub style: PasswordPolicyStyle,
    pub total_password_length: u16,
    pub minimum_lowercase_count: u16,
    pub minimum_uppercase_count: u16,
    pub minimum_digit_count: u16,
    pub minimum_symbol_count: u16,
    special_symbols: Vec<char>,
}

impl PasswordPolicy {
    pub fn new(total_password_length: u16) -> Self {
        Self {
            total_password_length,
            ..Self::default()
        }
    }

    pub fn special_symbol_set(&self) -> &[char] {
        &self.special_symbols
    }

    /// Replace the symbol set, dropping duplicates but keeping first
    /// occurrence order.
    pub fn set_special_symbol_set(&mut self, symbols: &[char]) {
        let mut unique = Vec::new();
        for &symbol in symbols {
            if !unique.contains(&symbol) {
                unique.push(symbol);
            }
        }
        self.special_symbols = unique;
    }

    /// Packed body without the symbol set (the per-entry record form).
    pub(crate) fn to_packed(&self) -> String {
        format!(
            "{:04X}{:03X}{:03X}{:03X}{:03X}{:03X}",
            self.style.bits(),
            self.total_password_length & 0xFFF,
            self.minimum_lowercase_count & 0xFFF,
            self.minimum_uppercase_count & 0xFFF,
            self.minimum_digit_count & 0xFFF,
            self.minimum_symbol_count & 0xFFF,
        )
    }

    /// Parse a packed body.  Returns the policy and the number of
    /// characters consumed.
    pub(crate) fn from_packed(chars: &[char]) -> Option<Self> {
        if chars.len() < 19 {
            return None;
        }
        let style = hex_u16(&chars[0..4])?;
        let total = hex_u16(&chars[4..7])?;
        let lower = hex_u16(&chars[7..10])?;
        let upper = hex_u16(&chars[10..13])?;
        let digits = hex_u16(&chars[13..16])?;
        let symbols = hex_u16(&chars[16..19])?;
        Some(Self {
            style: PasswordPolicyStyle::from_bits(style),
            total_password_length: total,
            minimum_lowercase_count: lower,
            minimum_uppercase_count: upper,
            minimum_digit_count: digits,
            minimum_symbol_count: symbols,
            special_symbols: Vec::new(),
        })
    }

    /// Number of characters the packed body occupies.
    pub(crate) const PACKED_LEN: usize = 19;
}

/// A reusable, named policy stored in the document header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPasswordPolicy {
    name: String,
    pub policy: PasswordPolicy,
}

impl NamedPasswordPolicy {
    pub fn new(name: &str, total_password_length: u16) -> Self {
        Self {
            name: name.to_string(),
            policy: PasswordPolicy::new(total_password_length),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Parse the named-policies header text.
///
/// A malformed blob yields an empty collection; characters after a
/// complete parse are ignored.
pub(crate) fn parse_named_policies(text: &str) -> Vec<NamedPasswordPolicy> {
    try_parse_named_policies(text).unwrap_or_default()
}

fn try_parse_named_policies(text: &str) -> Option<Vec<NamedPasswordPolicy>> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Some(Vec::new());
    }
    if chars.len() < 2 {
        return None;
    }

    let count = hex_u16(&chars[0..2])? as usize;
    let mut pos = 2;
    let mut policies = Vec::with_capacity(count);

    for _ in 0..count {
        if chars.len() < pos + 2 {
            return None;
        }
        let name_len = hex_u16(&chars[pos..pos + 2])? as usize;
        pos += 2;
        if chars.len() < pos + name_len {
            return None;
        }
        let name: String = chars[pos..pos + name_len].iter().collect();
        pos += name_len;

        if chars.len() < pos + PasswordPolicy::PACKED_LEN {
            return None;
        }
        let mut policy = PasswordPolicy::from_packed(&chars[pos..])?;
        pos += PasswordPolicy::PACKED_LEN;

        if chars.len() < pos + 2 {
            return None;
        }
        let symbol_len = hex_u16(&chars[pos..pos + 2])? as usize;
        pos += 2;
        if chars.len() < pos + symbol_len {
            return None;
        }
        let symbols: Vec<char> = chars[pos..pos + symbol_len].to_vec();
        pos += symbol_len;
        policy.set_special_symbol_set(&symbols);

        policies.push(NamedPasswordPolicy {
            name,
            policy,
        });
    }

    Some(policies)
}

/// Serialize named policies back into the header text.
pub(crate) fn encode_named_policies(policies: &[NamedPasswordPolicy]) -> Result<String> {
    if policies.len() > 0xFF {
        return Err(VaultError::Policy("too many named policies".into()));
    }
    let mut out = format!("{:02X}", policies.len());
    for named in policies {
        let name_len = named.name.chars().count();
        if name_len > 0xFF {
            return Err(VaultError::Policy(format!(
                "policy name '{}' is too long",
                named.name
            )));
        }
        out.push_str(&format!("{:02X}", name_len));
        out.push_str(&named.name);
        out.push_str(&named.policy.to_packed());
        let symbols = named.policy.special_symbol_set();
        out.push_str(&format!("{:02X}", symbols.len().min(0xFF)));
        out.extend(symbols.iter());
    }
    Ok(out)
}

fn hex_u16(chars: &[char]) -> Option<u16> {
    let text: String = chars.iter().collect();
    u16::from_str_radix(&text, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_bits() {
        let style = PasswordPolicyStyle::USE_UPPERCASE
            | PasswordPolicyStyle::USE_SYMBOLS
            | PasswordPolicyStyle::MAKE_PRONOUNCEABLE;
        assert_eq!(style.bits(), 0x5200);
        assert!(style.contains(PasswordPolicyStyle::USE_SYMBOLS));
        assert!(!style.contains(PasswordPolicyStyle::USE_LOWERCASE));
    }

    #[test]
    fn symbol_set_deduplicates() {
        let mut policy = PasswordPolicy::new(10);
        policy.set_special_symbol_set(&['A', 'B', 'B', 'A', 'a', 'b', 'b', 'a']);
        assert_eq!(policy.special_symbol_set(), ['A', 'B', 'a', 'b']);

        policy.set_special_symbol_set(&[]);
        assert!(policy.special_symbol_set().is_empty());
    }

    #[test]
    fn parse_single_named_policy() {
        let policies = parse_named_policies("0104Test020000a00100200300400");
        assert_eq!(policies.len(), 1);
        let named = &policies[0];
        assert_eq!(named.name(), "Test");
        assert_eq!(named.policy.style.bits(), 0x0200);
        assert_eq!(named.policy.total_password_length, 10);
        assert_eq!(named.policy.minimum_lowercase_count, 1);
        assert_eq!(named.policy.minimum_uppercase_count, 2);
        assert_eq!(named.policy.minimum_digit_count, 3);
        assert_eq!(named.policy.minimum_symbol_count, 4);
        assert!(named.policy.special_symbol_set().is_empty());
    }

    #[test]
    fn parse_with_symbols() {
        let policies = parse_named_policies("0104Test111101200100200300404@#$%");
        assert_eq!(policies.len(), 1);
        let named = &policies[0];
        assert_eq!(named.policy.style.bits(), 0x1111);
        assert_eq!(named.policy.total_password_length, 18);
        assert_eq!(named.policy.special_symbol_set(), ['@', '#', '$', '%']);
    }

    #[test]
    fn truncated_blob_is_empty() {
        assert!(parse_named_policies("0104Test020000a0010020030040").is_empty());
    }

    #[test]
    fn trailing_garbage_is_ignored() {
        let policies = parse_named_policies("0104Test020000a00100200300400+");
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].name(), "Test");
    }

    #[test]
    fn encode_named_policy() {
        let mut named = NamedPasswordPolicy::new("Test", 10);
        named.policy.style = PasswordPolicyStyle::from_bits(0x111);
        named.policy.minimum_lowercase_count = 1;
        named.policy.minimum_uppercase_count = 1;
        named.policy.minimum_digit_count = 1;
        named.policy.minimum_symbol_count = 1;
        named.policy.set_special_symbol_set(&['@']);

        assert_eq!(
            encode_named_policies(&[named]).unwrap(),
            "0104Test011100A00100100100101@"
        );
    }

    #[test]
    fn packed_entry_policy_roundtrip() {
        let mut policy = PasswordPolicy::new(80);
        policy.style = PasswordPolicyStyle::from_bits(0xF400);
        policy.minimum_lowercase_count = 7;
        policy.minimum_uppercase_count = 5;
        policy.minimum_digit_count = 8;
        policy.minimum_symbol_count = 6;

        let packed = policy.to_packed();
        assert_eq!(packed, "F400050007005008006");
        let chars: Vec<char> = packed.chars().collect();
        assert_eq!(PasswordPolicy::from_packed(&chars).unwrap(), policy);
    }
}

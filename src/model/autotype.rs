//! Autotype templates: the compact escape grammar stored in the
//! autotype record and its expansion against an entry's field values.
//!
//! A template such as `\u\t\p\n` tokenizes to
//! `UserName {Tab} Password {Enter}`; expansion replaces the field
//! commands with one token per character of the field value.  Escapes
//! that do not form a known command degrade to literal characters
//! rather than failing, matching how existing vaults behave.

/// What a token represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutotypeTokenKind {
    /// A literal character to type.
    Text,
    /// A special key such as `{Tab}` or `{Enter}`.
    Key,
    /// A command for the host application (field reference, wait, ...).
    Command,
}

/// One autotype token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutotypeToken {
    pub kind: AutotypeTokenKind,
    pub content: String,
}

impl AutotypeToken {
    fn text(c: char) -> Self {
        Self {
            kind: AutotypeTokenKind::Text,
            content: c.to_string(),
        }
    }

    fn key(content: &str) -> Self {
        Self {
            kind: AutotypeTokenKind::Key,
            content: content.to_string(),
        }
    }

    fn command(content: String) -> Self {
        Self {
            kind: AutotypeTokenKind::Command,
            content,
        }
    }
}

impl std::fmt::Display for AutotypeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.content)
    }
}

/// Field values an expansion draws from.
#[derive(Debug, Clone, Default)]
pub struct AutotypeContext {
    pub user_name: String,
    pub password: String,
    pub title: String,
    pub group: String,
    pub url: String,
    pub email: String,
    pub notes: String,
    pub credit_card_number: String,
    pub credit_card_expiration: String,
    pub credit_card_verification_value: String,
    pub credit_card_pin: String,
}

/// Tokenize a template without expanding field references.
///
/// `None` uses the default template `\u\t\p\n`.
pub fn unexpanded_tokens(template: Option<&str>) -> Vec<AutotypeToken> {
    let template = template.unwrap_or(r"\u\t\p\n");
    let chars: Vec<char> = template.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        if c != '\\' {
            tokens.push(AutotypeToken::text(c));
            pos += 1;
            continue;
        }
        // Hanging escape at the end stays a literal backslash.
        let Some(&next) = chars.get(pos + 1) else {
            tokens.push(AutotypeToken::text('\\'));
            pos += 1;
            continue;
        };
        pos += 2;

        match next {
            'u' => tokens.push(AutotypeToken::command("UserName".into())),
            'p' => tokens.push(AutotypeToken::command("Password".into())),
            '2' => tokens.push(AutotypeToken::command("TwoFactorCode".into())),
            'i' => tokens.push(AutotypeToken::command("Title".into())),
            'g' => tokens.push(AutotypeToken::command("Group".into())),
            'l' => tokens.push(AutotypeToken::command("Url".into())),
            'm' => tokens.push(AutotypeToken::command("Email".into())),
            'z' => tokens.push(AutotypeToken::command("Legacy".into())),
            'b' => tokens.push(AutotypeToken::key("{Backspace}")),
            't' => tokens.push(AutotypeToken::key("{Tab}")),
            's' => tokens.push(AutotypeToken::key("{ShiftTab}")),
            'n' => tokens.push(AutotypeToken::key("{Enter}")),
            '\\' => tokens.push(AutotypeToken::text('\\')),
            'c' => match chars.get(pos) {
                Some('n') => {
                    tokens.push(AutotypeToken::command("CreditCardNumber".into()));
                    pos += 1;
                }
                Some('t') => {
                    tokens.push(AutotypeToken::command("CreditCardNumberTabbed".into()));
                    pos += 1;
                }
                Some('e') => {
                    tokens.push(AutotypeToken::command("CreditCardExpiration".into()));
                    pos += 1;
                }
                Some('v') => {
                    tokens.push(AutotypeToken::command(
                        "CreditCardVerificationValue".into(),
                    ));
                    pos += 1;
                }
                Some('p') => {
                    tokens.push(AutotypeToken::command("CreditCardPin".into()));
                    pos += 1;
                }
                // Not a credit-card escape: both characters are literal.
                _ => tokens.push(AutotypeToken::text('c')),
            },
            'o' => {
                let digits = take_digits(&chars, &mut pos);
                if digits.is_empty() {
                    tokens.push(AutotypeToken::command("Notes".into()));
                } else {
                    tokens.push(AutotypeToken::command(format!("Notes:{digits}")));
                }
            }
            'd' | 'w' | 'W' => {
                let digits = take_digits(&chars, &mut pos);
                if digits.is_empty() {
                    // Mandatory number missing: the letter is literal.
                    tokens.push(AutotypeToken::text(next));
                } else {
                    let amount: u64 = digits.parse().unwrap_or(0);
                    let token = match next {
                        'd' => format!("Delay:{amount}"),
                        'w' => format!("Wait:{amount}"),
                        _ => format!("Wait:{}", amount * 1000),
                    };
                    tokens.push(AutotypeToken::command(token));
                }
            }
            other => tokens.push(AutotypeToken::text(other)),
        }
    }

    tokens
}

/// Expand field-reference commands against an entry's values.
pub fn expand_tokens(tokens: &[AutotypeToken], ctx: &AutotypeContext) -> Vec<AutotypeToken> {
    let mut out = Vec::new();
    for token in tokens {
        if token.kind != AutotypeTokenKind::Command {
            push_passthrough(&mut out, token);
            continue;
        }
        match token.content.as_str() {
            "UserName" => push_text(&mut out, &ctx.user_name),
            "Password" => push_text(&mut out, &ctx.password),
            "Title" => push_text(&mut out, &ctx.title),
            "Group" => push_text(&mut out, &ctx.group),
            "Url" => push_text(&mut out, &ctx.url),
            "Email" => push_text(&mut out, &ctx.email),
            "CreditCardExpiration" => push_text(&mut out, &ctx.credit_card_expiration),
            "CreditCardVerificationValue" => {
                push_text(&mut out, &ctx.credit_card_verification_value)
            }
            "CreditCardPin" => push_text(&mut out, &ctx.credit_card_pin),
            "CreditCardNumber" => {
                let digits: String = digits_of(&ctx.credit_card_number);
                push_text(&mut out, &digits);
            }
            "CreditCardNumberTabbed" => push_tabbed_number(&mut out, &ctx.credit_card_number),
            "Notes" => push_notes(&mut out, &ctx.notes, None),
            content if content.starts_with("Notes:") => {
                let line = content["Notes:".len()..].parse().ok();
                push_notes(&mut out, &ctx.notes, line);
            }
            // TwoFactorCode, Legacy, Wait:*, Delay:* are host concerns.
            _ => out.push(token.clone()),
        }
    }
    out
}

fn take_digits(chars: &[char], pos: &mut usize) -> String {
    let mut digits = String::new();
    while digits.len() < 3 {
        match chars.get(*pos) {
            Some(c) if c.is_ascii_digit() => {
                digits.push(*c);
                *pos += 1;
            }
            _ => break,
        }
    }
    digits
}

fn digits_of(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// Characters that would be interpreted by a SendKeys-style sender and
/// therefore get brace-wrapped when typed literally.
fn is_special(c: char) -> bool {
    matches!(c, '+' | '^' | '%' | '~' | '(' | ')' | '{' | '}' | '[' | ']')
}

fn char_token(c: char) -> AutotypeToken {
    if is_special(c) {
        AutotypeToken::key(&format!("{{{c}}}"))
    } else {
        AutotypeToken::text(c)
    }
}

fn push_text(out: &mut Vec<AutotypeToken>, text: &str) {
    for c in text.chars() {
        out.push(char_token(c));
    }
}

fn push_passthrough(out: &mut Vec<AutotypeToken>, token: &AutotypeToken) {
    if token.kind == AutotypeTokenKind::Text {
        for c in token.content.chars() {
            out.push(char_token(c));
        }
    } else {
        out.push(token.clone());
    }
}

fn push_tabbed_number(out: &mut Vec<AutotypeToken>, number: &str) {
    let digits = digits_of(number);
    if digits.is_empty() {
        return;
    }
    // Group from the right in fours: a 15-digit number starts with a
    // group of three.
    let first = match digits.len() % 4 {
        0 => 4,
        n => n,
    };
    let mut start = 0;
    let chars: Vec<char> = digits.chars().collect();
    let mut len = first;
    while start < chars.len() {
        if start > 0 {
            out.push(AutotypeToken::key("{Tab}"));
        }
        for &c in &chars[start..(start + len).min(chars.len())] {
            out.push(char_token(c));
        }
        start += len;
        len = 4;
    }
}

fn push_notes(out: &mut Vec<AutotypeToken>, notes: &str, line: Option<usize>) {
    let normalized = notes.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    match line {
        None => {
            for (i, text) in lines.iter().enumerate() {
                if i > 0 {
                    out.push(AutotypeToken::key("{Enter}"));
                }
                push_text(out, text);
            }
        }
        Some(n) => {
            if n >= 1 {
                if let Some(text) = lines.get(n - 1) {
                    push_text(out, text);
                }
            }
        }
    }
}

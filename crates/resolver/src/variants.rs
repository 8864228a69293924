//! Candidate search strings for one recorded title.
//!
//! Recorded titles are noisy: accents, parenthetical alternate-language
//! titles, edition suffixes, roman-numeral sequels. Each rule below rewrites
//! the *original* title independently and appends its result, so earlier
//! entries are higher-confidence queries and the whole list is a fixed
//! function of the input.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Explicit overrides for titles whose recorded form defeats search
/// entirely (romanized Japanese, alternate-script originals, …), mapping
/// the recorded title to the catalog's canonical title.
pub type TitleAliases = HashMap<String, String>;

// Edition/remaster suffixes stripped from the end, longest first so the
// compound forms win.
static EDITION_SUFFIXES: &[&str] = &[
    "game of the year edition",
    "definitive edition",
    "complete edition",
    "enhanced edition",
    "anniversary edition",
    "collector's edition",
    "deluxe edition",
    "game of the year",
    "director's cut",
    "remastered",
    "complete",
    "edition",
    "goty",
    "hd",
];

static ARABIC_ROMAN: &[(&str, &str)] = &[
    ("2", "II"),
    ("3", "III"),
    ("4", "IV"),
    ("5", "V"),
    ("6", "VI"),
    ("7", "VII"),
    ("8", "VIII"),
    ("9", "IX"),
    ("10", "X"),
];

static RE_PAREN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^)]+)\)").unwrap());

static RE_PAREN_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\([^)]*\)").unwrap());

/// Produce the ordered, distinct list of search strings for `raw`.
///
/// The first element is always the unmodified title; empty rewrites and
/// exact repeats (case-sensitive) are dropped.
pub fn generate(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    let mut variants = Vec::new();

    push_unique(&mut variants, raw);
    push_unique(&mut variants, &fold_diacritics(raw));

    // Base title before a colon subtitle.
    if let Some((base, subtitle)) = raw.split_once(':') {
        let base = base.trim();
        if !base.is_empty() && !subtitle.trim().is_empty() {
            push_unique(&mut variants, base);
            push_unique(&mut variants, &fold_diacritics(base));
        }
    }

    // Parenthetical content, treated as an alternate-language title.
    if let Some(caps) = RE_PAREN.captures(raw) {
        let inner = caps[1].trim().to_string();
        push_unique(&mut variants, &inner);
        if let Some(base) = before_separator(&inner) {
            push_unique(&mut variants, base.trim());
        }
    }

    // Text before a " - " or ": " separator outside parentheses.
    if let Some(base) = before_separator(raw) {
        push_unique(&mut variants, base.trim());
    }

    // Parenthetical content stripped entirely.
    push_unique(&mut variants, &collapse_spaces(&RE_PAREN_BLOCK.replace_all(raw, "")));

    push_unique(&mut variants, &strip_edition_suffixes(raw));
    push_unique(&mut variants, &swap_numerals(raw));

    // Leading article removed.
    if let Some(rest) = strip_leading_the(raw) {
        push_unique(&mut variants, rest);
    }

    push_unique(&mut variants, &strip_punctuation(raw));

    variants
}

/// [`generate`], with the alias table consulted: a known alias slots in
/// right after the unmodified title as the highest-confidence rewrite.
pub fn generate_with_aliases(raw: &str, aliases: &TitleAliases) -> Vec<String> {
    let mut variants = generate(raw);
    if let Some(alias) = aliases.get(raw.trim()) {
        if !variants.iter().any(|v| v == alias) {
            let at = 1.min(variants.len());
            variants.insert(at, alias.clone());
        }
    }
    variants
}

fn push_unique(list: &mut Vec<String>, candidate: &str) {
    if candidate.is_empty() {
        return;
    }
    if list.iter().any(|v| v == candidate) {
        return;
    }
    list.push(candidate.to_string());
}

/// Map accented characters to their closest unaccented equivalent.
///
/// Covers the Latin-1 and Latin Extended-A letters that actually occur in
/// exported tracking data (French, Polish, Spanish, Portuguese, Nordic).
pub fn fold_diacritics(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ą' => out.push('a'),
            'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ą' => out.push('A'),
            'ç' | 'ć' | 'č' => out.push('c'),
            'Ç' | 'Ć' | 'Č' => out.push('C'),
            'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => out.push('e'),
            'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ę' | 'Ě' => out.push('E'),
            'ì' | 'í' | 'î' | 'ï' | 'ī' => out.push('i'),
            'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' => out.push('I'),
            'ñ' | 'ń' => out.push('n'),
            'Ñ' | 'Ń' => out.push('N'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => out.push('o'),
            'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' => out.push('O'),
            'ù' | 'ú' | 'û' | 'ü' | 'ū' => out.push('u'),
            'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ū' => out.push('U'),
            'ý' | 'ÿ' => out.push('y'),
            'Ý' => out.push('Y'),
            'ś' | 'š' => out.push('s'),
            'Ś' | 'Š' => out.push('S'),
            'ź' | 'ż' | 'ž' => out.push('z'),
            'Ź' | 'Ż' | 'Ž' => out.push('Z'),
            'ł' => out.push('l'),
            'Ł' => out.push('L'),
            'đ' => out.push('d'),
            'Đ' => out.push('D'),
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("Ae"),
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("Oe"),
            'ß' => out.push_str("ss"),
            _ => out.push(c),
        }
    }
    out
}

/// Text before the first " - " or ": " separator at parenthesis depth zero.
fn before_separator(s: &str) -> Option<&str> {
    let mut depth = 0u32;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ':' if depth == 0 && s[i..].starts_with(": ") && i > 0 => {
                return Some(&s[..i]);
            }
            '-' if depth == 0 && s[..i].ends_with(' ') && s[i..].starts_with("- ") => {
                return Some(s[..i].trim_end());
            }
            _ => {}
        }
    }
    None
}

/// Strip known edition/remaster suffixes (and their joining separators)
/// from the end, repeating until none remain.
fn strip_edition_suffixes(s: &str) -> String {
    let mut out = s.trim().to_string();
    loop {
        let mut stripped = false;
        for suffix in EDITION_SUFFIXES {
            if let Some(cut) = suffix_start_ignore_case(&out, suffix) {
                if cut == 0 {
                    continue;
                }
                // Whole words only: "Incomplete" keeps its tail.
                let boundary = out[..cut]
                    .ends_with(|c: char| c.is_whitespace() || matches!(c, '-' | ':' | '–'));
                if !boundary {
                    continue;
                }
                out.truncate(cut);
                let trimmed = out
                    .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '-' | ':' | '–' | ','))
                    .len();
                out.truncate(trimmed);
                stripped = true;
                break;
            }
        }
        if !stripped || out.is_empty() {
            return out;
        }
    }
}

/// Byte offset where an ASCII `suffix` starts at the end of `s`, compared
/// case-insensitively, or `None`.
fn suffix_start_ignore_case(s: &str, suffix: &str) -> Option<usize> {
    let n = suffix.chars().count();
    let mut start = None;
    let mut count = 0;
    for (i, _) in s.char_indices().rev() {
        count += 1;
        if count == n {
            start = Some(i);
            break;
        }
    }
    let start = start?;
    if s[start..].eq_ignore_ascii_case(suffix) {
        Some(start)
    } else {
        None
    }
}

/// Swap whole-word arabic digits 2–10 with roman numerals and vice versa,
/// preserving trailing punctuation on the token ("3:" → "III:").
fn swap_numerals(s: &str) -> String {
    s.split(' ')
        .map(|token| {
            let word = token.trim_end_matches([':', ',', '.', ';']);
            let tail = &token[word.len()..];
            for (arabic, roman) in ARABIC_ROMAN {
                if word == *arabic {
                    return format!("{roman}{tail}");
                }
                if word == *roman {
                    return format!("{arabic}{tail}");
                }
            }
            token.to_string()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_leading_the(s: &str) -> Option<&str> {
    s.strip_prefix("The ").or_else(|| s.strip_prefix("the "))
}

/// Alphanumerics and single spaces only.
fn strip_punctuation(s: &str) -> String {
    let kept: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    collapse_spaces(&kept)
}

fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ─── Tests ───────────────────────────────────────────────────────────────────

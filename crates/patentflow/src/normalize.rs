//! Assignee name normalization and name-variant generation.
//!
//! Normalized form: uppercase words separated by single spaces, with
//! punctuation removed, `&` spelled `AND`, a leading `THE` dropped and
//! trailing legal-entity suffixes stripped.

use std::collections::HashSet;

/// Legal-entity suffixes removed from the end of a name, possibly repeatedly
/// ("ACME HOLDINGS CO LTD" → "ACME HOLDINGS").
const LEGAL_SUFFIXES: &[&str] = &[
    "INC",
    "INCORPORATED",
    "CORP",
    "CORPORATION",
    "CO",
    "COMPANY",
    "LLC",
    "LLP",
    "LP",
    "LTD",
    "LIMITED",
    "PLC",
    "GMBH",
    "AG",
    "SA",
    "SAS",
    "NV",
    "BV",
    "KK",
    "PTY",
    "SRL",
    "SPA",
    "AB",
    "OY",
];

/// Corporate descriptors dropped from the end of a name to form a shorter
/// lookup variant ("ACME HOLDINGS" → "ACME"). Not stripped by normalization
/// because they are often part of the registered assignee name.
const DESCRIPTOR_SUFFIXES: &[&str] = &[
    "HOLDINGS",
    "HOLDING",
    "GROUP",
    "INTERNATIONAL",
    "TECHNOLOGIES",
    "TECHNOLOGY",
    "SYSTEMS",
    "LABS",
    "LABORATORIES",
    "BIO",
    "THERAPEUTICS",
];

/// Second-level labels that are part of a public suffix ("co.uk").
const DOMAIN_SECOND_LEVEL: &[&str] = &["co", "com", "org", "net", "ac", "gov"];

/// Normalizes an assignee or company name.
///
/// Returns an empty string for names consisting only of punctuation or
/// legal suffixes.
pub fn normalize_name(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch == '&' {
            cleaned.push_str(" AND ");
        } else if ch == '\'' || ch == '\u{2019}' {
            // "Moody's" → "MOODYS"
        } else if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_uppercase());
        } else if ch.is_alphanumeric() {
            cleaned.extend(ch.to_uppercase());
        } else {
            cleaned.push(' ');
        }
    }

    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    if words.len() > 1 && words[0] == "THE" {
        words.remove(0);
    }
    while words.len() > 1 {
        match words.last() {
            Some(last) if LEGAL_SUFFIXES.contains(last) => {
                words.pop();
            }
            _ => break,
        }
    }
    if words.len() == 1 && LEGAL_SUFFIXES.contains(&words[0]) {
        words.clear();
    }

    words.join(" ")
}

/// Splits a normalized name into its word tokens.
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

/// Heuristic: a single token containing a dot and no spaces is a domain.
pub fn looks_like_domain(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty()
        && !value.contains(char::is_whitespace)
        && value.contains('.')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '/' | ':'))
}

/// Derives candidate company names from a domain or URL.
///
/// `https://www.grail-bio.com/about` yields `GRAIL BIO` and `GRAILBIO`.
pub fn domain_name_guesses(domain: &str) -> Vec<String> {
    let host = domain
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split(['/', ':'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    let labels: Vec<&str> = host
        .split('.')
        .filter(|l| !l.is_empty() && *l != "www")
        .collect();
    if labels.len() < 2 {
        return Vec::new();
    }

    // Drop the TLD, and the public second level for hosts like "acme.co.uk".
    let mut end = labels.len() - 1;
    if end >= 2 && DOMAIN_SECOND_LEVEL.contains(&labels[end - 1]) {
        end -= 1;
    }
    let Some(label) = labels.get(end - 1) else {
        return Vec::new();
    };

    let mut guesses = Vec::new();
    let spaced = normalize_name(&label.replace('-', " "));
    if !spaced.is_empty() {
        guesses.push(spaced.clone());
    }
    let joined = spaced.replace(' ', "");
    if !joined.is_empty() && joined != spaced {
        guesses.push(joined);
    }
    guesses
}

/// Expands caller-supplied names and domains into an ordered, de-duplicated
/// list of normalized variants.
///
/// Order: every normalized input name first (in input order), then derived
/// forms (space-collapsed, descriptor-stripped), then domain guesses.
/// Duplicates keep their first position.
pub fn expand_variants(inputs: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut variants = Vec::new();
    let mut push = |v: String, variants: &mut Vec<String>| {
        if !v.is_empty() && seen.insert(v.clone()) {
            variants.push(v);
        }
    };

    let (domains, names): (Vec<&String>, Vec<&String>) =
        inputs.iter().partition(|i| looks_like_domain(i));

    let normalized: Vec<String> = names.iter().map(|n| normalize_name(n)).collect();
    for name in &normalized {
        push(name.clone(), &mut variants);
    }

    for name in &normalized {
        if name.contains(' ') {
            push(name.replace(' ', ""), &mut variants);
        }
        if let Some(shorter) = strip_descriptor(name) {
            push(shorter, &mut variants);
        }
    }

    for domain in domains {
        for guess in domain_name_guesses(domain) {
            push(guess, &mut variants);
        }
    }

    variants
}

/// Drops trailing corporate descriptors, keeping at least one word.
fn strip_descriptor(normalized: &str) -> Option<String> {
    let mut words = tokens(normalized);
    let before = words.len();
    while words.len() > 1 {
        match words.last() {
            Some(last) if DESCRIPTOR_SUFFIXES.contains(last) => {
                words.pop();
            }
            _ => break,
        }
    }
    (words.len() < before).then(|| words.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation_and_suffixes() {
        assert_eq!(normalize_name("Grail, Inc."), "GRAIL");
        assert_eq!(normalize_name("GRAIL LLC"), "GRAIL");
        assert_eq!(normalize_name("Acme Holdings Co., Ltd."), "ACME HOLDINGS");
        assert_eq!(normalize_name("The Procter & Gamble Company"), "PROCTER AND GAMBLE");
        assert_eq!(normalize_name("Moody's Corp"), "MOODYS");
        assert_eq!(normalize_name("  illumina   inc "), "ILLUMINA");
    }

    #[test]
    fn test_normalize_keeps_single_word_names() {
        // A lone "THE" survives; a lone legal suffix does not.
        assert_eq!(normalize_name("The"), "THE");
        assert_eq!(normalize_name("Inc."), "");
        assert_eq!(normalize_name("---"), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["Grail, Inc.", "Siemens Aktiengesellschaft", "3M Co", "Société Générale SA"] {
            let once = normalize_name(raw);
            assert_eq!(normalize_name(&once), once);
        }
    }

    #[test]
    fn test_looks_like_domain() {
        assert!(looks_like_domain("grail.com"));
        assert!(looks_like_domain("https://www.grail.com/"));
        assert!(!looks_like_domain("Grail Inc."));
        assert!(!looks_like_domain("GRAIL"));
    }

    #[test]
    fn test_domain_name_guesses() {
        assert_eq!(domain_name_guesses("grail.com"), vec!["GRAIL"]);
        assert_eq!(
            domain_name_guesses("https://www.grail-bio.com/about"),
            vec!["GRAIL BIO", "GRAILBIO"]
        );
        assert_eq!(domain_name_guesses("acme.co.uk"), vec!["ACME"]);
        assert!(domain_name_guesses("localhost").is_empty());
    }

    #[test]
    fn test_expand_variants_order_and_dedup() {
        let variants = expand_variants(&[
            "Grail, Inc.".to_string(),
            "GRAIL".to_string(),
            "grail.com".to_string(),
        ]);
        assert_eq!(variants, vec!["GRAIL"]);
    }

    #[test]
    fn test_expand_variants_derived_forms() {
        let variants = expand_variants(&["Grail Bio".to_string(), "illumina.com".to_string()]);
        assert_eq!(variants, vec!["GRAIL BIO", "GRAILBIO", "GRAIL", "ILLUMINA"]);
    }

    #[test]
    fn test_strip_descriptor() {
        assert_eq!(strip_descriptor("ACME HOLDINGS GROUP"), Some("ACME".to_string()));
        assert_eq!(strip_descriptor("HOLDINGS"), None);
        assert_eq!(strip_descriptor("ACME"), None);
    }

    #[test]
    fn test_expand_variants_empty_input() {
        assert!(expand_variants(&[]).is_empty());
        assert!(expand_variants(&["Inc.".to_string()]).is_empty());
    }
}

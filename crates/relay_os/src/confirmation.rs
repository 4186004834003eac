#![forbid(unsafe_code)]

/// Matched as a case-insensitive prefix of the trimmed reply, so "yes please"
/// and "okay send it" both confirm.
pub const AFFIRMATIVE_PREFIXES: &[&str] = &[
    "yes", "yeah", "yep", "yup", "confirm", "send", "do it", "go", "ok", "okay",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationReply {
    Affirmative,
    Declined,
}

pub fn classify_confirmation(reply: &str) -> ConfirmationReply {
    let reply = reply.trim().to_lowercase();
    if AFFIRMATIVE_PREFIXES
        .iter()
        .any(|prefix| reply.starts_with(prefix))
    {
        ConfirmationReply::Affirmative
    } else {
        ConfirmationReply::Declined
    }
}

/// Picks a display name out of a trailing `to <name>` clause.
///
/// Only letters, spaces, apostrophes, dots and hyphens may follow `to`, and
/// the name must start with a letter. Everything after the last `to` is
/// taken, so "to Mama now" yields "Mama now".
pub fn trailing_recipient_name(utterance: &str) -> Option<String> {
    let text = utterance
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ','));
    let lower = text.to_ascii_lowercase();
    let bytes = lower.as_bytes();

    // Walk `to` candidates right to left; the first clean tail wins.
    let mut search_end = lower.len();
    while let Some(at) = lower[..search_end].rfind("to") {
        search_end = at;
        let starts_word = at == 0 || !bytes[at - 1].is_ascii_alphanumeric();
        let rest = &text[at + 2..];
        if !starts_word || !rest.starts_with(char::is_whitespace) {
            continue;
        }
        let name = rest.trim();
        let first_is_letter = name.chars().next().is_some_and(char::is_alphabetic);
        if first_is_letter
            && name
                .chars()
                .all(|c| c.is_alphabetic() || c.is_whitespace() || matches!(c, '\'' | '.' | '-'))
        {
            return Some(name.split_whitespace().collect::<Vec<_>>().join(" "));
        }
        return None;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_confirm_01_affirmative_vocabulary_is_prefix_matched() {
        for reply in [
            "yes", "Yes please", "YEAH", "yep", "yup", "confirm", "send it", "do it now",
            "go ahead", "ok", "Okay",
        ] {
            assert_eq!(
                classify_confirmation(reply),
                ConfirmationReply::Affirmative,
                "{reply}"
            );
        }
    }

    #[test]
    fn at_confirm_02_anything_else_declines() {
        for reply in ["no", "nope", "cancel", "", "   ", "wait"] {
            assert_eq!(
                classify_confirmation(reply),
                ConfirmationReply::Declined,
                "{reply}"
            );
        }
    }

    #[test]
    fn at_confirm_03_trailing_name_is_extracted() {
        assert_eq!(
            trailing_recipient_name("send 500 on 0712345678 to Mama Mboga."),
            Some("Mama Mboga".to_string())
        );
        assert_eq!(
            trailing_recipient_name("send 500 to O'Brien"),
            Some("O'Brien".to_string())
        );
        assert_eq!(
            trailing_recipient_name("send 500 to mama now"),
            Some("mama now".to_string())
        );
    }

    #[test]
    fn at_confirm_04_numbers_and_missing_clause_yield_nothing() {
        assert_eq!(trailing_recipient_name("send 500 to 0712345678"), None);
        assert_eq!(trailing_recipient_name("pay till 522533 200"), None);
        assert_eq!(trailing_recipient_name("send 500 toMama"), None);
    }
}

#![forbid(unsafe_code)]

use regex::{Captures, Regex};
use relay_kernel_contracts::intent::TransactionIntent;
use tracing::debug;

const AMOUNT: &str = r"(?P<amt>\d+(?:\.\d{1,2})?)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Pochi,
    SendMoney,
    Till,
    Paybill,
    Withdraw,
    NamedPayment,
}

/// Rule-based utterance classifier for deployments without an NLU service.
/// Rules are tried in order; the catch-all `pay <name> <amount>` is last.
#[derive(Debug, Clone)]
pub struct KeywordIntentParser {
    currency_prefix: Regex,
    currency_words: Regex,
    thousands: Regex,
    rules: Vec<(Rule, Regex)>,
}

impl KeywordIntentParser {
    pub fn new() -> Result<Self, regex::Error> {
        let rule = |pattern: String| Regex::new(&format!("(?i)^{pattern}$"));
        Ok(Self {
            currency_prefix: Regex::new(r"(?i)\b(?:kes|kshs?)\.?\s*(\d)")?,
            currency_words: Regex::new(r"(?i)\b(?:kes|kshs?|shillings?|bob)\b")?,
            thousands: Regex::new(r"(\d),(\d{3})")?,
            rules: vec![
                (
                    Rule::Pochi,
                    rule(format!(r"(?:send\s+)?pochi\s+{AMOUNT}\s+to\s+(?P<who>.+)"))?,
                ),
                (
                    Rule::Pochi,
                    rule(format!(
                        r"send\s+{AMOUNT}\s+to\s+pochi(?:\s+la\s+biashara)?\s+(?P<who>.+)"
                    ))?,
                ),
                (
                    Rule::SendMoney,
                    rule(format!(
                        r"(?:send|tuma)\s+{AMOUNT}\s+(?:on|at)\s+(?P<who>\+?\d[\d ]*\d)\s+to\s+.+"
                    ))?,
                ),
                (
                    Rule::SendMoney,
                    rule(format!(r"(?:send|tuma)\s+{AMOUNT}\s+(?:to\s+)?(?P<who>.+)"))?,
                ),
                (
                    Rule::Till,
                    rule(format!(
                        r"(?:pay\s+)?(?:till|buy\s+goods)(?:\s+number)?\s+(?P<till>\d+)\s+(?:amount\s+)?{AMOUNT}"
                    ))?,
                ),
                (
                    Rule::Paybill,
                    rule(format!(
                        r"(?:pay\s*bill)(?:\s+number)?\s+(?P<biz>\d+)\s+account(?:\s+number)?\s+(?P<acct>\S+)\s+(?:amount\s+)?{AMOUNT}"
                    ))?,
                ),
                (
                    Rule::Withdraw,
                    rule(format!(
                        r"withdraw\s+{AMOUNT}\s+(?:from\s+)?agent(?:\s+number)?\s+(?P<agent>\d+)\s+store(?:\s+number)?\s+(?P<store>\d+)"
                    ))?,
                ),
                (
                    Rule::NamedPayment,
                    rule(format!(r"pay\s+(?P<name>.+?)\s+{AMOUNT}"))?,
                ),
            ],
        })
    }

    pub fn parse(&self, utterance: &str) -> Option<TransactionIntent> {
        let text = self.normalize(utterance);
        if text.is_empty() {
            return None;
        }
        for (rule, re) in &self.rules {
            if let Some(caps) = re.captures(&text) {
                if let Some(intent) = build_intent(*rule, &caps) {
                    debug!(mode = intent.mode_name(), "utterance classified");
                    return Some(intent);
                }
            }
        }
        debug!("utterance not classified");
        None
    }

    fn normalize(&self, utterance: &str) -> String {
        let text = utterance
            .trim()
            .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ','));
        let text = self.thousands.replace_all(text, "$1$2");
        let text = self.currency_prefix.replace_all(&text, "$1");
        let text = self.currency_words.replace_all(&text, " ");
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

fn build_intent(rule: Rule, caps: &Captures<'_>) -> Option<TransactionIntent> {
    let group = |name: &str| caps.name(name).map(|m| m.as_str().trim().to_string());
    let amount = group("amt");
    let intent = match rule {
        Rule::Pochi => TransactionIntent::Pochi {
            amount: amount?,
            phone: group("who")?,
        },
        Rule::SendMoney => TransactionIntent::SendMoney {
            amount: amount?,
            phone: group("who")?,
        },
        Rule::Till => TransactionIntent::Till {
            amount: amount?,
            till_number: group("till")?,
        },
        Rule::Paybill => TransactionIntent::Paybill {
            amount: amount?,
            business_number: group("biz")?,
            account_number: group("acct")?,
        },
        Rule::Withdraw => TransactionIntent::Withdraw {
            amount: amount?,
            agent_number: group("agent")?,
            store_number: group("store")?,
        },
        Rule::NamedPayment => TransactionIntent::NamedPayment {
            amount: amount?,
            name: group("name")?,
        },
    };
    Some(intent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<TransactionIntent> {
        KeywordIntentParser::new().unwrap().parse(text)
    }

    #[test]
    fn at_parser_01_send_money_to_literal_number() {
        assert_eq!(
            parse("send 500 to 0712345678"),
            Some(TransactionIntent::SendMoney {
                amount: "500".into(),
                phone: "0712345678".into(),
            })
        );
        assert_eq!(
            parse("Send KES 1,500 shillings to Mama."),
            Some(TransactionIntent::SendMoney {
                amount: "1500".into(),
                phone: "Mama".into(),
            })
        );
    }

    #[test]
    fn at_parser_02_pay_unknown_name_is_named_payment_with_case_kept() {
        assert_eq!(
            parse("pay KFC 300"),
            Some(TransactionIntent::NamedPayment {
                amount: "300".into(),
                name: "KFC".into(),
            })
        );
    }

    #[test]
    fn at_parser_03_till_paybill_withdraw_forms() {
        assert_eq!(
            parse("pay till 522533 200"),
            Some(TransactionIntent::Till {
                amount: "200".into(),
                till_number: "522533".into(),
            })
        );
        assert_eq!(
            parse("buy goods 522533 amount ksh200"),
            Some(TransactionIntent::Till {
                amount: "200".into(),
                till_number: "522533".into(),
            })
        );
        assert_eq!(
            parse("paybill 888880 account 12345 1000"),
            Some(TransactionIntent::Paybill {
                amount: "1000".into(),
                business_number: "888880".into(),
                account_number: "12345".into(),
            })
        );
        assert_eq!(
            parse("withdraw 2000 from agent 123456 store 001"),
            Some(TransactionIntent::Withdraw {
                amount: "2000".into(),
                agent_number: "123456".into(),
                store_number: "001".into(),
            })
        );
    }

    #[test]
    fn at_parser_04_pochi_forms() {
        let expected = Some(TransactionIntent::Pochi {
            amount: "250".into(),
            phone: "0712345678".into(),
        });
        assert_eq!(parse("pochi 250 to 0712345678"), expected);
        assert_eq!(parse("send 250 to pochi 0712345678"), expected);
    }

    #[test]
    fn at_parser_05_unrelated_speech_is_not_classified() {
        assert_eq!(parse("what's the weather like"), None);
        assert_eq!(parse("send money"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn at_parser_06_number_then_name_keeps_the_number_as_recipient() {
        assert_eq!(
            parse("send 500 on 0712 345 678 to Mama Mboga"),
            Some(TransactionIntent::SendMoney {
                amount: "500".into(),
                phone: "0712 345 678".into(),
            })
        );
    }
}

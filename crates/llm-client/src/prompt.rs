//! Prompt templates for value-investing commentary.

use valuation_core::{DisplayMap, UNKNOWN_PLACEHOLDER};

use crate::chat::ChatMessage;

pub const PERSONA: &str = "You are Warren Buffett.";

/// Display keys in the order they are presented, with human labels.
const FIELD_LABELS: &[(&str, &str)] = &[
    ("name", "Company"),
    ("price_to_earnings", "P/E"),
    ("return_on_equity", "Return on equity"),
    ("free_cash_flow", "Free cash flow"),
    ("trailing_eps", "Trailing EPS"),
    ("total_debt", "Total debt"),
    ("current_price", "Current price"),
    ("currency", "Currency"),
    ("beta", "Beta"),
    ("is_stable", "Stable"),
    ("moat_score", "Moat score (0-2)"),
    ("intrinsic_value", "Intrinsic value estimate"),
    ("method", "Valuation method"),
];

fn field_lines(data: &DisplayMap) -> String {
    FIELD_LABELS
        .iter()
        .map(|(key, label)| {
            format!("- {}: {}", label, data.get(key).unwrap_or(UNKNOWN_PLACEHOLDER))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// System persona plus a user message listing every field for one ticker.
pub fn assessment_prompt(ticker: &str, data: &DisplayMap) -> Vec<ChatMessage> {
    let user = format!(
        "Assess the following stock using Warren Buffett's method.\n\n\
         - Ticker: {ticker}\n{fields}\n\n\
         Values marked {na} are unavailable; do not guess them.\n\
         Apply Buffett's principles: economic moat, margin of safety, sound finances and \
         trustworthy management. Would you buy this stock? Explain why.",
        ticker = ticker,
        fields = field_lines(data),
        na = UNKNOWN_PLACEHOLDER,
    );
    vec![ChatMessage::system(PERSONA), ChatMessage::user(user)]
}

/// Ranks several tickers against each other.
pub fn screening_prompt(rows: &[DisplayMap]) -> Vec<ChatMessage> {
    let sections = rows
        .iter()
        .map(|row| {
            format!(
                "## {}\n{}",
                row.get("ticker").unwrap_or(UNKNOWN_PLACEHOLDER),
                field_lines(row)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let user = format!(
        "Screen the following {count} stocks as a value investor.\n\n{sections}\n\n\
         Values marked {na} are unavailable. Rank the stocks from most to least attractive \
         for a long-term holder and give one short reason for each.",
        count = rows.len(),
        sections = sections,
        na = UNKNOWN_PLACEHOLDER,
    );
    vec![ChatMessage::system(PERSONA), ChatMessage::user(user)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatRole;
    use valuation_core::{MetricsRecord, ValuationResult};

    fn sample(ticker: &str) -> DisplayMap {
        let mut metrics = MetricsRecord::unknown(ticker);
        metrics.return_on_equity = Some(0.31);
        let valuation = ValuationResult {
            moat_score: 1,
            is_stable: true,
            intrinsic_value: None,
            method: None,
        };
        DisplayMap::from_parts(&metrics, &valuation)
    }

    #[test]
    fn test_assessment_prompt_shape() {
        let messages = assessment_prompt("PG", &sample("PG"));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[0].content, PERSONA);
        assert_eq!(messages[1].role, ChatRole::User);

        let user = &messages[1].content;
        assert!(user.contains("- Ticker: PG"));
        assert!(user.contains("- Return on equity: 0.31"));
        assert!(user.contains("- Intrinsic value estimate: N/A"));
        assert!(user.contains("- Stable: Yes"));
        assert!(user.contains("margin of safety"));
    }

    #[test]
    fn test_assessment_prompt_tolerates_missing_keys() {
        let messages = assessment_prompt("XYZ", &DisplayMap::new());
        assert!(messages[1].content.contains("- P/E: N/A"));
    }

    #[test]
    fn test_screening_prompt_lists_every_ticker() {
        let rows = vec![sample("KO"), sample("PEP"), sample("JNJ")];
        let messages = screening_prompt(&rows);
        let user = &messages[1].content;
        assert!(user.contains("following 3 stocks"));
        assert!(user.contains("## KO"));
        assert!(user.contains("## PEP"));
        assert!(user.contains("## JNJ"));
    }
}

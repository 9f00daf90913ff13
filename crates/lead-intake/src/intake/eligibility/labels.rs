/// Display labels for revenue/income bracket codes.
const REVENUE_LABELS: [(&str, &str); 9] = [
    ("<10", "up to R$10 million"),
    ("10-80", "R$10 to R$80 million"),
    (">80", "R$80 to R$300 million"),
    (">300", "above R$300 million"),
    ("nao_tem", "no revenue or provable income yet"),
    ("ate_5k", "up to R$5,000"),
    ("5k_15k", "R$5,000 to R$15,000"),
    ("15k_50k", "R$15,000 to R$50,000"),
    ("acima_50k", "above R$50,000"),
];

/// Human-readable range for a bracket code; unknown codes render as-is.
pub fn revenue_label(code: &str) -> &str {
    REVENUE_LABELS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, label)| *label)
        .unwrap_or(code)
}

#[cfg(test)]
mod tests {
    use super::revenue_label;

    #[test]
    fn maps_known_codes_and_passes_through_unknown() {
        assert_eq!(revenue_label("<10"), "up to R$10 million");
        assert_eq!(revenue_label("acima_50k"), "above R$50,000");
        assert_eq!(revenue_label("1bi+"), "1bi+");
    }
}

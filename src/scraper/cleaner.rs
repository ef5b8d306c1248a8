//! Text → typed-value cleaning for scraped KRX/Naver cells.

// ── Code normalization ────────────────────────────────────────────────────────

/// Zero-pad an issue code to 6 characters.
///
/// KRX CSVs and Naver hrefs both carry the code as text, but intermediate
/// tooling (spreadsheets in particular) loves to strip leading zeros. Every
/// loader runs codes through here before they become join keys; "5930" and
/// "005930" must compare equal afterwards.
pub fn pad_code(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.len() >= 6 {
        trimmed.to_string()
    } else {
        format!("{:0>6}", trimmed)
    }
}

// ── Numeric parsers ───────────────────────────────────────────────────────────

/// Parse a price/amount cell: strip thousands separators and junk.
/// "1,234.56" → 1234.56 | "-" → None
pub fn parse_price(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s == "N/A" || s == "-" || s == "—" {
        return None;
    }
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().ok()
}

/// Parse a percent cell. "+13.25%" → 13.25 | "-2.1" → -2.1
pub fn parse_pct(s: &str) -> Option<f64> {
    let s = s.trim().replace('%', "").replace(',', "").replace('+', "");
    if s.is_empty() || s == "N/A" || s == "-" {
        return None;
    }
    s.parse().ok()
}

/// Parse an integer count (volume, shares outstanding) with separators.
pub fn parse_count(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() || s == "N/A" || s == "-" {
        return None;
    }
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    cleaned.parse().ok()
}

/// Normalize a Naver price-diff cell: the site renders direction as the words
/// 상승/하락/보합 plus whitespace around the number.
pub fn clean_price_diff(s: &str) -> String {
    let replaced = s
        .replace("상승", "+ ")
        .replace("하락", "- ")
        .replace("보합", "");
    clean_text(&replaced)
}

/// Collapse the whitespace noise in a scraped text cell.
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_code() {
        assert_eq!(pad_code("5930"), "005930");
        assert_eq!(pad_code("005930"), "005930");
        assert_eq!(pad_code(" 35720 "), "035720");
        assert_eq!(pad_code("0"), "000000");
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("1,234.56"), Some(1234.56));
        assert_eq!(parse_price("53,100"), Some(53100.0));
        assert_eq!(parse_price("-"), None);
        assert_eq!(parse_price(""), None);
    }

    #[test]
    fn test_parse_pct() {
        assert_eq!(parse_pct("+13.25%"), Some(13.25));
        assert_eq!(parse_pct("-2.10%"), Some(-2.1));
        assert_eq!(parse_pct("15"), Some(15.0));
        assert_eq!(parse_pct("N/A"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("12,345,678"), Some(12_345_678));
        assert_eq!(parse_count("-"), None);
    }

    #[test]
    fn test_clean_price_diff() {
        assert_eq!(clean_price_diff("상승\n\t 1,200"), "+ 1,200");
        assert_eq!(clean_price_diff("하락 300"), "- 300");
        assert_eq!(clean_price_diff("보합 0"), "0");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  이차전지   관련주 \n"), "이차전지 관련주");
    }
}

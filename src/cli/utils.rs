use chrono::{DateTime, Local};

pub fn truncate(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > max_len {
        let truncated: String = chars[..max_len.saturating_sub(3)].iter().collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

/// Render a Slack `ts` ("1700000000.000100") as local time
pub fn format_ts(ts: &str) -> String {
    let secs = ts
        .split('.')
        .next()
        .and_then(|s| s.parse::<i64>().ok());
    match secs.and_then(|s| DateTime::from_timestamp(s, 0)) {
        Some(time) => time
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        None => ts.to_string(),
    }
}

/// Collapse whitespace and Slack's escaped entities for one-line display
pub fn flatten_text(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer sentence", 10), "a longe...");
    }

    #[test]
    fn test_format_ts_falls_back_to_raw() {
        assert_eq!(format_ts("not-a-ts"), "not-a-ts");
        assert_ne!(format_ts("1700000000.000100"), "1700000000.000100");
    }

    #[test]
    fn test_flatten_text() {
        assert_eq!(flatten_text("a\n  b &amp; &lt;c&gt;"), "a b & <c>");
    }
}

use std::cmp::Ordering;

/// Format a phone number for display.
/// Ten-digit numbers (optionally prefixed by a country code of 1) become
/// (XXX) XXX-XXXX; anything else is shown as given.
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    let national = match digits.len() {
        10 => &digits[..],
        11 if digits.starts_with('1') => &digits[1..],
        _ => return phone.to_string(),
    };
    format!("({}) {}-{}", &national[0..3], &national[3..6], &national[6..10])
}

/// Truncate to `max_len` characters, ending with "..." when cut
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Case-insensitive ordering used by the table sorts
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_phone() {
        assert_eq!(format_phone("5551234567"), "(555) 123-4567");
        assert_eq!(format_phone("15551234567"), "(555) 123-4567");
        assert_eq!(format_phone("555-123-4567"), "(555) 123-4567");
        assert_eq!(format_phone("+44 20 7946 0958"), "+44 20 7946 0958");
        assert_eq!(format_phone("123"), "123");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Pharmacié", 9), "Pharmacié");
        assert_eq!(truncate_string("Hi there", 2), "Hi");
    }

    #[test]
    fn test_cmp_ignore_case() {
        assert_eq!(cmp_ignore_case("apple", "Banana"), Ordering::Less);
        assert_eq!(cmp_ignore_case("Zed", "alpha"), Ordering::Greater);
        assert_eq!(cmp_ignore_case("same", "same"), Ordering::Equal);
        assert_ne!(cmp_ignore_case("Same", "same"), Ordering::Equal);
    }
}

//! 出生日期格式化
//!
//! 网站的日期框只接受 `DD/MM/YYYY`，配置里的日期写法五花八门。

/// 把常见写法统一成 `DD/MM/YYYY`，无法识别时原样（去空白）返回
///
/// - `7/6/1995` → `07/06/1995`
/// - `1995-06-07` → `07/06/1995`
/// - 8 位数字：以 19/20 开头按 `YYYYMMDD`，否则按 `DDMMYYYY`
pub fn normalize_date(raw: &str) -> String {
    let value = raw.trim();
    if value.is_empty() {
        return String::new();
    }

    if value.contains('/') {
        let parts: Vec<&str> = value.split('/').collect();
        if let [dd, mm, yyyy] = parts.as_slice() {
            if dd.len() <= 2 && mm.len() <= 2 && yyyy.len() >= 4 && yyyy.is_ascii() {
                let year = &yyyy[yyyy.len() - 4..];
                return format!("{:0>2}/{:0>2}/{}", dd, mm, year);
            }
        }
    }

    if value.contains('-') {
        let parts: Vec<&str> = value.split('-').collect();
        if let [yyyy, mm, dd] = parts.as_slice() {
            if yyyy.len() == 4 {
                return format!("{:0>2}/{:0>2}/{}", dd, mm, yyyy);
            }
        }
    }

    let digits = digits_only(value);
    if digits.len() == 8 {
        let (dd, mm, yyyy) = if digits.starts_with("19") || digits.starts_with("20") {
            (&digits[6..8], &digits[4..6], &digits[0..4])
        } else {
            (&digits[0..2], &digits[2..4], &digits[4..8])
        };
        return format!("{}/{}/{}", dd, mm, yyyy);
    }

    value.to_string()
}

/// 只保留 ASCII 数字（掩码输入框逐位键入用）
pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_representations_agree() {
        for raw in ["1995-06-07", "07/06/1995", "07061995", "19950607", " 7/6/1995 "] {
            assert_eq!(normalize_date(raw), "07/06/1995", "input: {}", raw);
        }
    }

    #[test]
    fn test_slash_form_keeps_last_four_year_digits() {
        assert_eq!(normalize_date("1/2/01995"), "01/02/1995");
    }

    #[test]
    fn test_unrecognized_input_is_trimmed_only() {
        assert_eq!(normalize_date(" June 7 "), "June 7");
        assert_eq!(normalize_date("1995/06"), "1995/06");
        assert_eq!(normalize_date(""), "");
    }

    #[test]
    fn test_day_first_hyphen_falls_through_to_digit_run() {
        assert_eq!(normalize_date("07-06-1995"), "07/06/1995");
    }

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("07/06/1995"), "07061995");
    }
}

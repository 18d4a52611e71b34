/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Splits a list of the form `key:value,key:value` into pairs.
///
/// Whitespace around entries is ignored, as are empty entries. Only the first `:` separates key from value, so values
/// may themselves contain colons. Entries without a separator, or with an empty key, are returned in the `Err` variant
/// so the caller can decide how loudly to complain.
pub fn parse_key_value_list(value: &str) -> Result<Vec<(String, String)>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
            _ => Err(entry.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boolean_flags() {
        assert!(parse_boolean_flag(Some("Yes".into()), false));
        assert!(!parse_boolean_flag(Some(" off ".into()), true));
        assert!(parse_boolean_flag(Some("maybe".into()), true));
        assert!(!parse_boolean_flag(None, false));
    }

    #[test]
    fn key_value_lists() {
        let pairs = parse_key_value_list("13800000000:pass:word, 13900000000:abc,,").unwrap();
        assert_eq!(pairs, vec![
            ("13800000000".to_string(), "pass:word".to_string()),
            ("13900000000".to_string(), "abc".to_string())
        ]);
        assert_eq!(parse_key_value_list("").unwrap(), vec![]);
        assert_eq!(parse_key_value_list("a:b,oops").unwrap_err(), "oops");
    }
}

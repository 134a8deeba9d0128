//! Platform version validation

use ci_lifecycle_core::LifecycleError;

/// Check that `version` is numeric as a whole.
///
/// The entire string must convert to a finite number: a decimal float, or
/// an unsigned `0x`/`0o`/`0b` integer literal. Surrounding whitespace,
/// trailing letters, `NaN` and infinities are all rejected.
pub fn validate_version(version: &str) -> Result<(), LifecycleError> {
    if is_numeric(version) {
        Ok(())
    } else {
        Err(LifecycleError::InvalidArgument(format!(
            "version needs to be numeric but is {}",
            version
        )))
    }
}

fn is_numeric(s: &str) -> bool {
    if s.is_empty() || s.trim() != s {
        return false;
    }
    if let Some(valid) = radix_literal(s) {
        return valid;
    }
    s.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

/// `Some(valid)` when `s` carries a radix prefix, `None` otherwise
fn radix_literal(s: &str) -> Option<bool> {
    let radix = match s.get(..2)?.to_ascii_lowercase().as_str() {
        "0x" => 16,
        "0o" => 8,
        "0b" => 2,
        _ => return None,
    };
    let digits = &s[2..];
    Some(!digits.is_empty() && digits.chars().all(|c| c.is_digit(radix)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_versions_pass() {
        for v in ["30", "28", "0", "30.5", "-1", "+7", "1e2", ".5"] {
            assert!(validate_version(v).is_ok(), "{v} should be numeric");
        }
    }

    #[test]
    fn test_radix_literals_pass() {
        for v in ["0x1E", "0X1e", "0b11", "0B0", "0o7", "0O17"] {
            assert!(validate_version(v).is_ok(), "{v} should be numeric");
        }
    }

    #[test]
    fn test_non_numeric_versions_fail_with_message() {
        for v in [
            "", " ", "\t", "30a", "R", "30 ", " 30", "3 0", "NaN", "inf", "infinity", "0x", "0b2",
            "0o8", "0x1G", "-0x1E", "+0b1", " 0x1E",
        ] {
            let err = validate_version(v).unwrap_err();
            assert_eq!(err.to_string(), format!("version needs to be numeric but is {}", v));
        }
    }
}

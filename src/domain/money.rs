use thiserror::Error;

/// Money is stored as integer minor units (cents) so that running balances
/// sum exactly. 100 cents = 1 whole currency unit, so 2500 = "25.00".
pub type Cents = i64;

/// Format cents for display.
/// Example: 2500 -> "25.00", -70 -> "-0.70"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a decimal amount string into cents.
/// Example: "25.00" -> 2500, "7.5" -> 750, "120" -> 12000
///
/// At most two decimal places are accepted. Amounts entered with
/// sub-cent precision are rejected rather than silently rounded.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let cents = match digits.split_once('.') {
        None => parse_units(digits)? * 100,
        Some((whole, frac)) => {
            if frac.len() > 2 {
                return Err(ParseCentsError::TooManyDecimals);
            }
            let units = if whole.is_empty() {
                0
            } else {
                parse_units(whole)?
            };
            // "7.5" means 50 cents, not 5
            let frac_cents = match frac.len() {
                0 => 0,
                1 => parse_units(frac)? * 10,
                _ => parse_units(frac)?,
            };
            units * 100 + frac_cents
        }
    };

    Ok(if negative { -cents } else { cents })
}

fn parse_units(s: &str) -> Result<i64, ParseCentsError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseCentsError::InvalidFormat);
    }
    s.parse().map_err(|_| ParseCentsError::InvalidFormat)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCentsError {
    #[error("invalid money format")]
    InvalidFormat,
    #[error("amounts support at most two decimal places")]
    TooManyDecimals,
}

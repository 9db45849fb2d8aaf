/// Extracts the first run of ASCII digits from free-form price text.
///
/// Lossy on purpose: `"150-200"` yields `150`, text without digits yields `0`.
/// Runs too long for `u64` saturate instead of failing.
pub fn parse_price(text: &str) -> u64 {
    text.chars()
        .skip_while(|ch| !ch.is_ascii_digit())
        .map_while(|ch| ch.to_digit(10))
        .fold(0u64, |value, digit| value.saturating_mul(10).saturating_add(u64::from(digit)))
}

use url::Url;

/// Display profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

const REFERRAL_PARAM: &str = "ref";
const MAX_REFERRAL_LEN: usize = 128;

/// Extracts a referral code from a landing link (`...?ref=CODE`) or a bare code.
///
/// Returns `None` for links without the parameter and for input that is not a
/// plausible code.
pub fn referral_code(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        return url
            .query_pairs()
            .find(|(name, _)| name == REFERRAL_PARAM)
            .map(|(_, value)| value.trim().to_string())
            .filter(|code| is_plausible_code(code));
    }
    let code = trimmed.strip_prefix("ref=").unwrap_or(trimmed);
    is_plausible_code(code).then(|| code.to_string())
}

fn is_plausible_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_REFERRAL_LEN
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '=' | '+' | '/' | '.'))
}

use std::fmt;

/// A secret credential that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// Linear accepts either a personal API key or an OAuth access token,
/// and they are sent differently in the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinearToken {
    PersonalApiKey(Token),
    OAuthAccessToken(Token),
}

impl LinearToken {
    pub fn authorization_header(&self) -> String {
        match self {
            Self::PersonalApiKey(token) => token.as_str().to_owned(),
            Self::OAuthAccessToken(token) => format!("Bearer {}", token.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::from("ghp_secret");
        assert_eq!(format!("{token:?}"), "Token(<redacted>)");
        assert_eq!(token.as_str(), "ghp_secret");
    }

    #[test]
    fn test_linear_authorization_header() {
        let key = LinearToken::PersonalApiKey(Token::from("lin_api_123"));
        let oauth = LinearToken::OAuthAccessToken(Token::from("lin_oauth_456"));

        assert_eq!(key.authorization_header(), "lin_api_123");
        assert_eq!(oauth.authorization_header(), "Bearer lin_oauth_456");
        assert!(!format!("{oauth:?}").contains("lin_oauth_456"));
    }
}

//! Message bodies for the two token-bearing emails.
use super::OutboundEmail;

pub const VERIFY_PATH: &str = "/auth/verify";
pub const RESET_PATH: &str = "/auth/reset";

pub const VERIFY_SUBJECT: &str = "Verify your email";
pub const RESET_SUBJECT: &str = "Reset your password";

/// `{app_url}{path}?token={token}`; tokens are base64url so need no escaping.
pub fn build_link(app_url: &str, path: &str, token: &str) -> String {
    format!("{}{path}?token={token}", app_url.trim_end_matches('/'))
}

pub fn verification_email(to: &str, link: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: VERIFY_SUBJECT.to_string(),
        html: format!(r#"<p>Verify your email:</p><p><a href="{link}">{link}</a></p>"#),
    }
}

pub fn password_reset_email(to: &str, link: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: RESET_SUBJECT.to_string(),
        html: format!(r#"<p>Reset your password:</p><p><a href="{link}">{link}</a></p>"#),
    }
}

/// Pull the token back out of a rendered body
pub fn extract_token(html: &str) -> Option<&str> {
    let start = html.find("?token=")? + "?token=".len();
    let rest = &html[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    Some(&rest[..end]).filter(|token| !token.is_empty())
}

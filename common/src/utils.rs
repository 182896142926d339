/// Canonical form used for storage and comparison of email addresses.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

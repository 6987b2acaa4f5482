use uuid::Uuid;

/// Subject line of the registration confirmation email.
pub const REGISTRATION_SUBJECT: &str = "IRISART | Registration confirmation";

/// Builds the confirmation link for `code`.
pub fn confirmation_link(confirmation_url: &str, code: Uuid) -> String {
    let separator = if confirmation_url.contains('?') { '&' } else { '?' };
    format!("{confirmation_url}{separator}code={code}")
}

/// Renders the HTML body of the registration confirmation email.
pub fn registration(confirmation_url: &str, code: Uuid) -> String {
    let link = confirmation_link(confirmation_url, code);
    format!(
        r#"<h1>Thank you for your registration</h1>
<p>To finish registration please follow the link below:
    <a href="{link}">complete registration</a>
</p>
<p>The link is valid for 90 minutes.</p>"#
    )
}

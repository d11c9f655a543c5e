/// Email template functions
///
/// This module provides functions to generate the emails the application
/// sends: account and subscription verification, password reset, newsletter
/// issues and comment-report notices.
use super::{send_email, EmailConfig, EmailResult};

/// Send an account email-verification link after registration.
pub async fn send_account_verification_email(
    config: &EmailConfig,
    to: &str,
    username: &str,
    token: &str,
    base_url: &str,
) -> EmailResult<()> {
    let confirm_link = format!(
        "{}/api/v1/auth/confirm-email?email={}&token={}",
        base_url, to, token
    );

    let body_text = format!(
        r#"Hello {},

Welcome to Vitablog! Please confirm your email address.

Click the link below to verify your account:
{}

If you did not create an account, please ignore this email.

---
Vitablog
"#,
        username, confirm_link
    );

    send_email(config, to, "Confirm your Vitablog account", &body_text, None).await
}

/// Send a newsletter subscription confirmation link.
pub async fn send_subscription_verification_email(
    config: &EmailConfig,
    to: &str,
    token: &str,
    base_url: &str,
) -> EmailResult<()> {
    let confirm_link = format!(
        "{}/api/v1/subscribers/confirm?email={}&token={}",
        base_url, to, token
    );

    let body_text = format!(
        r#"Hello,

Thanks for subscribing to the Vitablog newsletter.

Click the link below to confirm your subscription:
{}

If you did not subscribe, please ignore this email and nothing will be sent.

---
Vitablog
"#,
        confirm_link
    );

    let body_html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Confirm your subscription</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2>Confirm your subscription</h2>
        <p>Thanks for subscribing to the Vitablog newsletter.</p>
        <p style="margin: 30px 0;">
            <a href="{}"
               style="background-color: #2e7d32; color: white; padding: 12px 24px;
                      text-decoration: none; border-radius: 4px; display: inline-block;">
                Confirm Subscription
            </a>
        </p>
        <p>Or copy and paste this link into your browser:</p>
        <p style="word-break: break-all; color: #2e7d32;">{}</p>
        <hr style="margin: 30px 0; border: none; border-top: 1px solid #ddd;">
        <p style="color: #666; font-size: 0.9em;">
            If you did not subscribe, please ignore this email.
        </p>
    </div>
</body>
</html>"#,
        confirm_link, confirm_link
    );

    send_email(
        config,
        to,
        "Confirm your Vitablog newsletter subscription",
        &body_text,
        Some(&body_html),
    )
    .await
}

/// Send a password reset email
pub async fn send_password_reset_email(
    config: &EmailConfig,
    to: &str,
    username: &str,
    reset_token: &str,
    base_url: &str,
) -> EmailResult<()> {
    let reset_link = format!("{}/password-reset/{}", base_url, reset_token);

    let body_text = format!(
        r#"Hello {},

You have requested to reset your password.

Click the link below to reset your password:
{}

This link will expire in 1 hour.

If you did not request a password reset, please ignore this email.

---
Vitablog
"#,
        username, reset_link
    );

    send_email(config, to, "Reset your Vitablog password", &body_text, None).await
}

/// Notify a comment's author that their comment was reported.
///
/// Callers treat this as best-effort: failures are logged and never fail
/// the report itself.
pub async fn send_comment_report_notice(
    config: &EmailConfig,
    to: &str,
    username: &str,
    comment_excerpt: &str,
    reason: &str,
) -> EmailResult<()> {
    let body_text = format!(
        r#"Hello {},

One of your comments was reported by another reader (reason: {}).

> {}

A moderator will review the report. No action is needed from you.

---
Vitablog
"#,
        username, reason, comment_excerpt
    );

    send_email(
        config,
        to,
        "One of your comments was reported",
        &body_text,
        None,
    )
    .await
}

/// Send one newsletter issue to one subscriber, with their personal
/// unsubscribe link.
pub async fn send_newsletter_issue(
    config: &EmailConfig,
    to: &str,
    subject: &str,
    body: &str,
    unsubscribe_token: &str,
    base_url: &str,
) -> EmailResult<()> {
    let unsubscribe_link = format!(
        "{}/api/v1/subscribers/unsubscribe?email={}&token={}",
        base_url, to, unsubscribe_token
    );

    let body_text = format!(
        r#"{}

---
You are receiving this because you subscribed to the Vitablog newsletter.
Unsubscribe: {}
"#,
        body, unsubscribe_link
    );

    send_email(config, to, subject, &body_text, None).await
}

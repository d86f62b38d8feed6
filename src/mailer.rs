use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::error::MailError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub notification_type: String,
    pub request_number: String,
    pub loan_number: String,
    pub recipient: String,
    pub template_name: String,
    pub body: String,
}

/// Outbound email delivery. Returns the provider message id.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<String, MailError>;
}

/// Logs the message instead of delivering it.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<String, MailError> {
        info!(
            notification_type = %message.notification_type,
            request_number = %message.request_number,
            loan_number = %message.loan_number,
            recipient = %message.recipient,
            template_name = %message.template_name,
            "Email send skipped, logging only"
        );
        Ok(format!("mock-message-id-{}", Utc::now().timestamp_millis()))
    }
}

/// Fills `{loanNumber}`, `{requestNumber}` and `{notificationType}` placeholders.
///
/// Single pass: substituted values are copied verbatim and never rescanned.
/// Unknown `{...}` sequences are left as they are.
pub fn render_template(
    template: &str,
    notification_type: &str,
    request_number: &str,
    loan_number: &str,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let value = tail.find('}').and_then(|end| {
            let placeholder = match &tail[1..end] {
                "loanNumber" => loan_number,
                "requestNumber" => request_number,
                "notificationType" => notification_type,
                _ => return None,
            };
            Some((placeholder, end + 1))
        });

        match value {
            Some((placeholder, consumed)) => {
                out.push_str(placeholder);
                rest = &tail[consumed..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_returns_mock_id() {
        let message = EmailMessage {
            notification_type: "Repurchase".into(),
            request_number: "REQ-1".into(),
            loan_number: "LOAN-1".into(),
            recipient: "desk@example.com".into(),
            template_name: "repurchase-notice".into(),
            body: "hello".into(),
        };
        let id = LogMailer.send(&message).await.unwrap();
        assert!(id.starts_with("mock-message-id-"));
    }

    #[test]
    fn render_fills_placeholders() {
        let body = render_template(
            "{notificationType}: loan {loanNumber} ({requestNumber})",
            "Repurchase",
            "REQ-7",
            "LOAN-7",
        );
        assert_eq!(body, "Repurchase: loan LOAN-7 (REQ-7)");
    }

    #[test]
    fn render_does_not_expand_inserted_values() {
        let body = render_template(
            "loan {loanNumber} / {requestNumber} / {other} {",
            "Reclass",
            "REQ-7",
            "L-{requestNumber}",
        );
        assert_eq!(body, "loan L-{requestNumber} / REQ-7 / {other} {");
    }
}

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{WorkflowSteps, require};
use crate::error::{MailError, StepError};
use crate::mailer::{EmailMessage, render_template};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationInput {
    #[serde(default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub loan_number: Option<String>,
    #[serde(default)]
    pub request_number: Option<String>,
    #[serde(default)]
    pub template_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOutput {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct Validated<'a> {
    notification_type: &'a str,
    loan_number: &'a str,
    request_number: &'a str,
    template_name: &'a str,
}

fn validate(input: &NotificationInput) -> Result<Validated<'_>, StepError> {
    Ok(Validated {
        notification_type: require(&input.notification_type, "notificationType")?,
        loan_number: require(&input.loan_number, "loanNumber")?,
        request_number: require(&input.request_number, "requestNumber")?,
        template_name: require(&input.template_name, "templateName")?,
    })
}

impl WorkflowSteps {
    /// Sends a templated email. Delivery problems never fail the step: they
    /// come back as `sent: false` with the error in `messageId`.
    pub async fn send_notification(&self, input: NotificationInput) -> NotificationOutput {
        let fields = match validate(&input) {
            Ok(fields) => fields,
            Err(err) => {
                warn!(error = %err, "Notification step rejected");
                return NotificationOutput {
                    success: false,
                    request_number: input.request_number.clone(),
                    loan_number: input.loan_number.clone(),
                    notification_type: input.notification_type.clone(),
                    sent: None,
                    message_id: None,
                    error: Some(err.to_string()),
                };
            }
        };

        let (sent, message_id) = match self.deliver(&fields).await {
            Ok(id) => {
                info!(
                    request_number = fields.request_number,
                    notification_type = fields.notification_type,
                    message_id = %id,
                    "Notification sent"
                );
                (true, id)
            }
            Err(err) => {
                error!(
                    request_number = fields.request_number,
                    notification_type = fields.notification_type,
                    error = %err,
                    "Error sending notification"
                );
                (false, format!("Error: {err}"))
            }
        };

        NotificationOutput {
            success: true,
            request_number: input.request_number.clone(),
            loan_number: input.loan_number.clone(),
            notification_type: input.notification_type.clone(),
            sent: Some(sent),
            message_id: Some(message_id),
            error: None,
        }
    }

    async fn deliver(&self, fields: &Validated<'_>) -> Result<String, MailError> {
        let recipient = self
            .parameters
            .notification_email(fields.notification_type)
            .await?;
        let template = self.parameters.email_template(fields.template_name).await?;
        let body = render_template(
            &template,
            fields.notification_type,
            fields.request_number,
            fields.loan_number,
        );

        let message = EmailMessage {
            notification_type: fields.notification_type.to_string(),
            request_number: fields.request_number.to_string(),
            loan_number: fields.loan_number.to_string(),
            recipient,
            template_name: fields.template_name.to_string(),
            body,
        };
        self.mailer.send(&message).await
    }
}

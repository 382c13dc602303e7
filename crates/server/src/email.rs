use crate::config::EmailServerConfig;
use lettre::message::Mailboxes;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use selfservice_core::resource::{
    ActionRequest, ActionResponse, ResourceError, ResourceResult, SingletonResourceProvider,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Action handled by the email service
pub const SEND_ACTION: &str = "send";

/// A plain-text message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid address '{address}'")]
    Address {
        address: String,
        source: lettre::address::AddressError,
    },

    #[error("Failed to build message")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP delivery failed")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Delivers messages to a mail server
#[async_trait::async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), TransportError>;
}

/// SMTP delivery, optionally over STARTTLS and with credentials
pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    pub fn new(config: &EmailServerConfig) -> Result<Self, TransportError> {
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let mut builder = builder.port(config.port);
        match (&config.username, &config.password) {
            (Some(username), password) => {
                builder = builder.credentials(Credentials::new(
                    username.clone(),
                    password.clone().unwrap_or_default(),
                ));
            }
            (None, Some(_)) => {
                tracing::warn!(
                    "emailserver.password is set without emailserver.username; connecting without credentials"
                );
            }
            (None, None) => {}
        }

        tracing::info!(
            "Mail transport configured for {}:{} (starttls: {})",
            config.host,
            config.port,
            config.starttls
        );

        Ok(Self {
            mailer: builder.build(),
        })
    }
}

fn parse_addresses(address: &str) -> Result<Mailboxes, TransportError> {
    address
        .parse::<Mailboxes>()
        .map_err(|source| TransportError::Address {
            address: address.to_string(),
            source,
        })
}

#[async_trait::async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: EmailMessage) -> Result<(), TransportError> {
        let from = parse_addresses(&message.from)?
            .into_single()
            .ok_or_else(|| TransportError::Address {
                address: message.from.clone(),
                source: lettre::address::AddressError::MissingParts,
            })?;

        let mut builder = Message::builder().from(from).subject(message.subject);
        for recipient in parse_addresses(&message.to)? {
            builder = builder.to(recipient);
        }

        let email = builder.body(message.body)?;
        self.mailer.send(email).await?;

        Ok(())
    }
}

/// Singleton resource exposing the `send` action
pub struct EmailService {
    transport: Arc<dyn MailTransport>,
}

impl EmailService {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    async fn send_email(&self, document: &Value) -> ResourceResult<Value> {
        let to = required_field(document, "to")?;
        let from = required_field(document, "from")?;
        let subject = required_field(document, "subject")?;
        let body = required_field(document, "message")?;

        let message = EmailMessage {
            to,
            from,
            subject,
            body,
        };

        if let Err(e) = self.transport.send(message).await {
            tracing::warn!("Failed to send email: {}", e);
            return Err(ResourceError::internal(e));
        }

        tracing::info!("Email sent");
        Ok(json!({ "status": "okay" }))
    }
}

fn required_field(document: &Value, field: &str) -> ResourceResult<String> {
    document
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ResourceError::bad_request(format!("Field {} is not specified", field)))
}

#[async_trait::async_trait]
impl SingletonResourceProvider for EmailService {
    async fn action_instance(&self, request: ActionRequest) -> ResourceResult<ActionResponse> {
        if request.action != SEND_ACTION {
            return Err(ResourceError::unknown_action(&request.action));
        }

        let response = self.send_email(&request.content).await?;
        Ok(ActionResponse::new(response))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test_support::capture_logs;
    use selfservice_core::resource::{PatchRequest, ReadRequest, UpdateRequest};
    use std::sync::Mutex;

    /// Records messages instead of delivering them
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        pub(crate) sent: Mutex<Vec<EmailMessage>>,
        pub(crate) fail: bool,
    }

    impl RecordingTransport {
        pub(crate) fn failing() -> Self {
            Self {
                sent: Mutex::default(),
                fail: true,
            }
        }
    }

    #[async_trait::async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, message: EmailMessage) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::Message(lettre::error::Error::MissingFrom));
            }
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn full_request() -> Value {
        json!({
            "to": "jake.feasel@forgerock.com",
            "from": "noreply@example.com",
            "subject": "Reset your password",
            "message": "Follow the link to reset your password."
        })
    }

    fn send(content: Value) -> ActionRequest {
        ActionRequest::new("/email", SEND_ACTION, content)
    }

    #[tokio::test]
    async fn test_send_returns_okay() {
        let transport = Arc::new(RecordingTransport::default());
        let service = EmailService::new(transport.clone());

        let response = service.action_instance(send(full_request())).await.unwrap();
        assert_eq!(response.content, json!({ "status": "okay" }));

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "jake.feasel@forgerock.com");
        assert_eq!(sent[0].body, "Follow the link to reset your password.");
    }

    #[tokio::test]
    async fn test_first_missing_field_wins() {
        let transport = Arc::new(RecordingTransport::default());
        let service = EmailService::new(transport.clone());

        for field in ["to", "from", "subject", "message"] {
            let mut content = full_request();
            content.as_object_mut().unwrap().remove(field);

            let error = service.action_instance(send(content)).await.unwrap_err();
            assert!(matches!(error, ResourceError::BadRequest(_)));
            assert_eq!(error.to_string(), format!("Field {} is not specified", field));
        }

        // Everything missing reports the first field in declaration order
        let error = service.action_instance(send(json!({}))).await.unwrap_err();
        assert_eq!(error.to_string(), "Field to is not specified");

        let mut content = full_request();
        content["subject"] = json!("");
        content["message"] = json!("");
        let error = service.action_instance(send(content)).await.unwrap_err();
        assert_eq!(error.to_string(), "Field subject is not specified");

        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_server_error() {
        let service = EmailService::new(Arc::new(RecordingTransport::failing()));

        let error = service.action_instance(send(full_request())).await.unwrap_err();
        assert!(matches!(error, ResourceError::InternalServerError { .. }));
        assert!(error.is_server_error());
        assert!(!error.is_client_error());
        assert!(std::error::Error::source(&error).is_some());
    }

    #[tokio::test]
    async fn test_other_operations_unsupported() {
        let service = EmailService::new(Arc::new(RecordingTransport::default()));

        let error = service
            .action_instance(ActionRequest::new("/email", "sendLater", full_request()))
            .await
            .unwrap_err();
        assert!(matches!(error, ResourceError::NotSupported(_)));
        assert_eq!(error.to_string(), "Unknown action sendLater");

        assert!(matches!(
            service.read_instance(ReadRequest::new("/email")).await,
            Err(ResourceError::NotSupported(_))
        ));
        assert!(matches!(
            service
                .patch_instance(PatchRequest::new("/email", vec![]))
                .await,
            Err(ResourceError::NotSupported(_))
        ));
        assert!(matches!(
            service
                .update_instance(UpdateRequest::new("/email", json!({})))
                .await,
            Err(ResourceError::NotSupported(_))
        ));
    }

    #[tokio::test]
    async fn test_password_without_username_is_reported() {
        let config = EmailServerConfig {
            password: Some("secret".to_string()),
            starttls: false,
            ..Default::default()
        };

        let logs = capture_logs(|| {
            SmtpMailTransport::new(&config).unwrap();
        });
        assert!(logs.contains("WARN"));
        assert!(logs.contains("emailserver.password is set without emailserver.username"));
        assert!(!logs.contains("secret"));

        let config = EmailServerConfig {
            username: Some("mailer".to_string()),
            password: Some("secret".to_string()),
            starttls: false,
            ..Default::default()
        };
        let logs = capture_logs(|| {
            SmtpMailTransport::new(&config).unwrap();
        });
        assert!(!logs.contains("WARN"));
    }

    #[tokio::test]
    async fn test_smtp_transport_rejects_bad_address_before_connecting() {
        let config = EmailServerConfig {
            starttls: false,
            ..Default::default()
        };
        let transport = SmtpMailTransport::new(&config).unwrap();

        let result = transport
            .send(EmailMessage {
                to: "jake.feasel@forgerock.com".to_string(),
                from: "not-an-address".to_string(),
                subject: "Hello".to_string(),
                body: "Hello".to_string(),
            })
            .await;
        assert!(matches!(result, Err(TransportError::Address { .. })));
    }
}

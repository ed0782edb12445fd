//! SMS alerts to the committee via Amazon SNS.

use aws_sdk_sns::Client as SnsClient;
use log::{info, warn};

use crate::model::{common::Phone, db::Emergency};

/// The SMS sent to committee members when an emergency is reported.
pub fn emergency_message(emergency: &Emergency, room: Option<&str>) -> String {
    let place = room.map(|room| format!(" in {room}")).unwrap_or_default();
    format!(
        "EMERGENCY ({}){place}: {} (reported by {} at {})",
        emergency.kind,
        emergency.note,
        emergency.by,
        emergency.time.format("%H:%M UTC"),
    )
}

/// Text `message` to each phone. Failures are logged, never returned, so an
/// unreachable SMS gateway cannot fail the request that raised the alert.
/// Returns how many messages were accepted.
pub async fn alert(sender: &SnsClient, phones: &[Phone], message: &str) -> usize {
    let mut sent = 0;
    for phone in phones {
        let result = sender
            .publish()
            .phone_number(phone.e164())
            .message(message)
            .send()
            .await;
        match result {
            Ok(_) => sent += 1,
            Err(e) => warn!("Failed to send SMS alert to {}: {e}", phone.e164()),
        }
    }
    info!("Sent {sent} of {} SMS alerts", phones.len());
    sent
}

/// An SNS client pointed at a port nothing listens on.
#[cfg(test)]
pub(crate) fn unreachable_sender() -> SnsClient {
    use aws_sdk_sns::config::{retry::RetryConfig, BehaviorVersion, Credentials, Region};

    let config = aws_sdk_sns::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("eu-west-2"))
        .credentials_provider(Credentials::new("test", "test", None, None, "test"))
        .endpoint_url("http://127.0.0.1:9")
        .retry_config(RetryConfig::disabled())
        .build();
    SnsClient::from_conf(config)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::model::{db::NewEmergency, mongodb::Id};

    use super::*;

    #[rocket::async_test]
    async fn failed_alerts_are_swallowed() {
        log4rs_test_utils::test_logging::init_logging_once_for(
            ["community_backend"],
            None,
            None,
        );

        let phones = vec![Phone::example(), Phone::example()];
        let sent = alert(&unreachable_sender(), &phones, "test alert").await;
        assert_eq!(sent, 0);

        assert_eq!(alert(&unreachable_sender(), &[], "nobody").await, 0);
    }

    #[test]
    fn message_format() {
        let emergency = Emergency {
            id: Id::new(),
            emergency: NewEmergency {
                kind: "fire".to_string(),
                time: Utc.with_ymd_and_hms(2024, 5, 1, 21, 7, 0).unwrap(),
                note: "Smoke on 12F".to_string(),
                by: "rita@x.org".to_string(),
            },
        };
        assert_eq!(
            emergency_message(&emergency, Some("12F-3")),
            "EMERGENCY (fire) in 12F-3: Smoke on 12F (reported by rita@x.org at 21:07 UTC)"
        );
        assert_eq!(
            emergency_message(&emergency, None),
            "EMERGENCY (fire): Smoke on 12F (reported by rita@x.org at 21:07 UTC)"
        );
    }
}

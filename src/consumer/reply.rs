//! Correlated replies on the default exchange.

use tracing::debug;

use crate::constants::topology::DEFAULT_EXCHANGE;
use crate::messaging::{BrokerProvider, MessagingResult, OutboundMessage, ResponseEnvelope};

/// Publish `envelope` to `reply_to`, echoing the request's correlation id
pub async fn publish_reply(
    transport: &BrokerProvider,
    reply_to: &str,
    correlation_id: &str,
    envelope: &ResponseEnvelope,
) -> MessagingResult<()> {
    let message = OutboundMessage::json(reply_to, envelope.to_bytes()?)
        .with_correlation_id(correlation_id)
        .with_timestamp(envelope.timestamp());

    transport.publish(DEFAULT_EXCHANGE, message).await?;
    debug!(
        reply_to = %reply_to,
        success = envelope.is_success(),
        "Reply published"
    );
    Ok(())
}

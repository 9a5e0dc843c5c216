//! NATS reply publisher for scored batches

use crate::service::ErrorBody;
use crate::types::prediction::PredictionResponse;
use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

/// Producer for publishing batch outcomes to reply subjects
#[derive(Clone)]
pub struct ReplyProducer {
    client: Client,
}

impl ReplyProducer {
    /// Create a new reply producer
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Publish a prediction response
    pub async fn publish_response(&self, reply: Subject, response: &PredictionResponse) -> Result<()> {
        let payload = serde_json::to_vec(response)?;
        self.client.publish(reply.clone(), payload.into()).await?;

        debug!(
            reply = %reply,
            rows = response.stats.total,
            "Published prediction response"
        );

        Ok(())
    }

    /// Publish an error body
    pub async fn publish_error(&self, reply: Subject, body: &ErrorBody) -> Result<()> {
        let payload = serde_json::to_vec(body)?;
        self.client.publish(reply.clone(), payload.into()).await?;

        debug!(
            reply = %reply,
            status = body.status,
            "Published error reply"
        );

        Ok(())
    }
}

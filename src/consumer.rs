//! NATS consumer for incoming banknote batches

use crate::producer::ReplyProducer;
use crate::service::{ErrorBody, ScoringService};
use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use tracing::{debug, info, warn};

/// Consumer for receiving CSV batches from NATS
pub struct BatchConsumer {
    client: Client,
    subject: String,
    queue_group: String,
}

impl BatchConsumer {
    /// Create a new batch consumer
    pub fn new(client: Client, subject: &str, queue_group: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
            queue_group: queue_group.to_string(),
        }
    }

    /// Subscribe to the request subject within the queue group
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self
            .client
            .queue_subscribe(self.subject.clone(), self.queue_group.clone())
            .await?;
        info!(
            subject = %self.subject,
            queue_group = %self.queue_group,
            "Subscribed to batch subject"
        );
        Ok(subscriber)
    }

    /// Score every incoming batch and reply with the outcome.
    ///
    /// A worker slot is taken before the next message is pulled, so a burst
    /// stays queued on the subscription instead of in spawned tasks.
    pub async fn serve(self, service: ScoringService, producer: ReplyProducer) -> Result<()> {
        let mut subscription = self.subscribe().await?;

        loop {
            let permit = service.acquire().await?;
            let Some(message) = subscription.next().await else {
                break;
            };

            let service = service.clone();
            let producer = producer.clone();

            tokio::spawn(async move {
                let outcome = service
                    .score_with_permit(permit, message.payload.to_vec())
                    .await;

                let Some(reply) = message.reply else {
                    debug!(ok = outcome.is_ok(), "Batch without reply subject, outcome dropped");
                    return;
                };

                let published = match &outcome {
                    Ok(response) => producer.publish_response(reply, response).await,
                    Err(e) => producer.publish_error(reply, &ErrorBody::from_error(e)).await,
                };

                if let Err(e) = published {
                    warn!(error = %e, "Failed to publish reply");
                }
            });
        }

        info!(subject = %self.subject, "Batch subscription closed");
        Ok(())
    }
}

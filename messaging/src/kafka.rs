use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::{EventPublisher, PublishError};
use async_trait::async_trait;
use contracts::Envelope;
use futures::StreamExt;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::{Message as _, Offset};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const SEND_TIMEOUT: Duration = Duration::from_secs(5);
const REWIND_BACKOFF: Duration = Duration::from_secs(1);

/// Publishes envelopes to the topic named by their contract type, keyed by
/// the dedup key so all deliveries for one correlation id land on the same
/// partition.
pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl KafkaPublisher {
    pub fn new(producer: FutureProducer) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(&self, envelope: &Envelope) -> Result<(), PublishError> {
        let json = serde_json::to_string(envelope)?;
        let record = FutureRecord::to(envelope.topic())
            .payload(&json)
            .key(&envelope.dedup_key);

        self.producer
            .send(record, SEND_TIMEOUT)
            .await
            .map_err(|(e, _)| PublishError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// What the consumer loop does with a message after dispatch. Commit is
/// offset-based: committing any later message also commits everything
/// before it on the partition, so a transiently failed message must never
/// be left behind an advancing offset — it has to be rewound to, not
/// skipped.
#[derive(Debug)]
enum Disposition {
    /// Done with the message; safe to move the committed offset past it.
    Commit,
    /// Not retryable; forward raw to the dead-letter topic, then commit.
    DeadLetter(String),
    /// Retryable; seek back to this message so nothing later on the
    /// partition can commit past it.
    Rewind(String),
}

fn disposition(outcome: DispatchOutcome) -> Disposition {
    match outcome {
        DispatchOutcome::Handled(kind) => {
            info!(%kind, "message handled");
            Disposition::Commit
        }
        DispatchOutcome::Ignored(kind) => {
            debug!(%kind, "no handler registered, skipping");
            Disposition::Commit
        }
        DispatchOutcome::DeadLetter(reason) => Disposition::DeadLetter(reason),
        DispatchOutcome::Retry(kind, reason) => Disposition::Rewind(format!("{}: {}", kind, reason)),
    }
}

/// Consumer loop: one message per dispatch, async commit after handling.
/// Undecodable or rejected deliveries are forwarded raw to the service's
/// dead-letter topic; a transient handler failure rewinds the partition to
/// the failed message so it is dispatched again, and the loop never
/// commits an offset past it in the meantime.
pub async fn run_consumer(
    consumer: StreamConsumer,
    dispatcher: Dispatcher,
    producer: FutureProducer,
    dead_letter_topic: String,
) {
    let mut stream = consumer.stream();

    while let Some(message) = stream.next().await {
        match message {
            Ok(m) => {
                let outcome = match m.payload() {
                    Some(payload) => dispatcher.dispatch(payload).await,
                    None => {
                        warn!("message without payload, skipping");
                        commit(&consumer, &m);
                        continue;
                    }
                };

                match disposition(outcome) {
                    Disposition::Commit => commit(&consumer, &m),
                    Disposition::DeadLetter(reason) => {
                        warn!(%reason, "routing message to dead-letter topic");
                        if let Some(payload) = m.payload() {
                            send_dead_letter(&producer, &dead_letter_topic, payload).await;
                        }
                        commit(&consumer, &m);
                    }
                    Disposition::Rewind(reason) => {
                        error!(%reason, "handler failed, rewinding for redelivery");
                        tokio::time::sleep(REWIND_BACKOFF).await;
                        if let Err(e) = consumer.seek(
                            m.topic(),
                            m.partition(),
                            Offset::Offset(m.offset()),
                            SEND_TIMEOUT,
                        ) {
                            error!("Error seeking back to failed message: {}", e);
                        }
                    }
                }
            }
            Err(e) => error!("Error receiving message: {}", e),
        }
    }
}

fn commit(consumer: &StreamConsumer, m: &rdkafka::message::BorrowedMessage<'_>) {
    if let Err(e) = consumer.commit_message(m, CommitMode::Async) {
        error!("Error committing message: {}", e);
    }
}

async fn send_dead_letter(producer: &FutureProducer, topic: &str, raw: &[u8]) {
    let record = FutureRecord::<(), _>::to(topic).payload(raw);
    if let Err((e, _)) = producer.send(record, SEND_TIMEOUT).await {
        error!("Failed to publish dead letter: {}", e);
    }
}

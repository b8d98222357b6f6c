use anyhow::Result;
use clap::Parser;
use contracts::MessageKind;
use messaging::Dispatcher;
use notification_service::api;
use notification_service::channel::{NotificationChannel, SimulatedChannel};
use notification_service::handlers::{
    BookingCreatedHandler, PaymentProcessedHandler, SendNotificationHandler,
};
use notification_service::store::{MemoryNotificationStore, NotificationStore};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::FutureProducer;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "notification-service")]
struct Args {
    #[arg(long, env = "KAFKA_BROKERS", default_value = "localhost:9092")]
    kafka_brokers: String,

    #[arg(long, default_value = "booking-events")]
    booking_topic: String,

    #[arg(long, default_value = "payment-events")]
    payment_topic: String,

    #[arg(long, default_value = "notification-commands")]
    command_topic: String,

    #[arg(long, default_value = "notification-service-dead-letter")]
    dead_letter_topic: String,

    #[arg(long, env = "PORT", default_value = "3003")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let producer: FutureProducer = ClientConfig::new()
        .set("bootstrap.servers", &args.kafka_brokers)
        .set("message.timeout.ms", "5000")
        .create()?;

    let consumer: StreamConsumer = ClientConfig::new()
        .set("group.id", "notification-service")
        .set("bootstrap.servers", &args.kafka_brokers)
        .set("enable.partition.eof", "false")
        .set("session.timeout.ms", "6000")
        .set("enable.auto.commit", "false")
        .create()?;

    consumer.subscribe(&[
        args.booking_topic.as_str(),
        args.payment_topic.as_str(),
        args.command_topic.as_str(),
    ])?;

    let store: Arc<dyn NotificationStore> = Arc::new(MemoryNotificationStore::new());
    let channel: Arc<dyn NotificationChannel> = Arc::new(SimulatedChannel::new());

    let dispatcher = Dispatcher::new()
        .register(
            MessageKind::BookingCreated,
            Arc::new(BookingCreatedHandler::new(store.clone(), channel.clone())),
        )
        .register(
            MessageKind::PaymentProcessed,
            Arc::new(PaymentProcessedHandler::new(store.clone(), channel.clone())),
        )
        .register(
            MessageKind::SendNotification,
            Arc::new(SendNotificationHandler::new(store.clone(), channel.clone())),
        );

    let dead_letter_topic = args.dead_letter_topic.clone();
    tokio::spawn(async move {
        messaging::run_consumer(consumer, dispatcher, producer, dead_letter_topic).await;
    });

    let state = api::AppState { store };
    let app = api::create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;

    info!("Notification service listening on port {}", args.port);
    axum::serve(listener, app).await?;

    Ok(())
}

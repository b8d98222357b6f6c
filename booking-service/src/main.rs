use anyhow::Result;
use booking_service::api;
use booking_service::handlers::{BookingCommands, PaymentProcessedHandler};
use booking_service::outbox::OutboxProcessor;
use booking_service::store::{BookingStore, MemoryBookingStore};
use clap::Parser;
use contracts::MessageKind;
use messaging::{Dispatcher, KafkaPublisher};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::FutureProducer;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "booking-service")]
struct Args {
    #[arg(long, env = "KAFKA_BROKERS", default_value = "localhost:9092")]
    kafka_brokers: String,

    #[arg(long, default_value = "payment-events")]
    payment_topic: String,

    #[arg(long, default_value = "booking-service-dead-letter")]
    dead_letter_topic: String,

    #[arg(long, env = "PORT", default_value = "3001")]
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
        .set("group.id", "booking-service")
        .set("bootstrap.servers", &args.kafka_brokers)
        .set("enable.partition.eof", "false")
        .set("session.timeout.ms", "6000")
        .set("enable.auto.commit", "false")
        .create()?;

    consumer.subscribe(&[&args.payment_topic])?;

    let store: Arc<dyn BookingStore> = Arc::new(MemoryBookingStore::new());
    let publisher = Arc::new(KafkaPublisher::new(producer.clone()));

    let outbox = OutboxProcessor::new(store.clone(), publisher);
    tokio::spawn(async move {
        outbox.run().await;
    });

    let dispatcher = Dispatcher::new().register(
        MessageKind::PaymentProcessed,
        Arc::new(PaymentProcessedHandler::new(store.clone())),
    );
    let dead_letter_topic = args.dead_letter_topic.clone();
    let dl_producer = producer.clone();
    tokio::spawn(async move {
        messaging::run_consumer(consumer, dispatcher, dl_producer, dead_letter_topic).await;
    });

    let state = api::AppState {
        commands: Arc::new(BookingCommands::new(store)),
    };
    let app = api::create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;

    info!("Booking service listening on port {}", args.port);
    axum::serve(listener, app).await?;

    Ok(())
}

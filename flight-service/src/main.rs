use anyhow::Result;
use clap::Parser;
use contracts::MessageKind;
use flight_service::api;
use flight_service::handlers::{BookingCreatedHandler, FlightCommands};
use flight_service::store::{FlightStore, MemoryFlightStore};
use messaging::{Dispatcher, KafkaPublisher};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::FutureProducer;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "flight-service")]
struct Args {
    #[arg(long, env = "KAFKA_BROKERS", default_value = "localhost:9092")]
    kafka_brokers: String,

    #[arg(long, default_value = "booking-events")]
    booking_topic: String,

    #[arg(long, default_value = "flight-service-dead-letter")]
    dead_letter_topic: String,

    #[arg(long, env = "PORT", default_value = "3000")]
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
        .set("group.id", "flight-service")
        .set("bootstrap.servers", &args.kafka_brokers)
        .set("enable.partition.eof", "false")
        .set("session.timeout.ms", "6000")
        .set("enable.auto.commit", "false")
        .create()?;

    consumer.subscribe(&[&args.booking_topic])?;

    let store: Arc<dyn FlightStore> = Arc::new(MemoryFlightStore::new());
    let publisher = Arc::new(KafkaPublisher::new(producer.clone()));

    let dispatcher = Dispatcher::new().register(
        MessageKind::BookingCreated,
        Arc::new(BookingCreatedHandler::new(store.clone(), publisher)),
    );
    let dead_letter_topic = args.dead_letter_topic.clone();
    let dl_producer = producer.clone();
    tokio::spawn(async move {
        messaging::run_consumer(consumer, dispatcher, dl_producer, dead_letter_topic).await;
    });

    let state = api::AppState {
        commands: Arc::new(FlightCommands::new(store)),
    };
    let app = api::create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;

    info!("Flight service listening on port {}", args.port);
    axum::serve(listener, app).await?;

    Ok(())
}

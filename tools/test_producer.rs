//! Test Batch Producer
//!
//! Generates random banknote batches and sends them to the service over NATS
//! request/reply for load testing.

use banknote_authenticator::service::ErrorBody;
use banknote_authenticator::{FeatureRow, PredictionResponse};
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Banknote batch generator for testing
struct BanknoteGenerator {
    rng: rand::rngs::ThreadRng,
}

impl BanknoteGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Generate a note with genuine-like geometry
    fn generate_genuine(&mut self) -> FeatureRow {
        FeatureRow {
            diagonal: self.rng.gen_range(171.4..172.6),
            height_left: self.rng.gen_range(103.4..104.5),
            height_right: self.rng.gen_range(103.2..104.4),
            margin_low: self.rng.gen_range(3.5..4.8),
            margin_up: self.rng.gen_range(2.7..3.4),
            length: self.rng.gen_range(112.5..113.9),
        }
    }

    /// Generate a note with counterfeit-like geometry: wider low margin, shorter
    fn generate_fake(&mut self) -> FeatureRow {
        FeatureRow {
            diagonal: self.rng.gen_range(171.3..172.5),
            height_left: self.rng.gen_range(103.6..104.8),
            height_right: self.rng.gen_range(103.6..104.7),
            margin_low: self.rng.gen_range(4.1..6.3),
            margin_up: self.rng.gen_range(2.9..3.8),
            length: self.rng.gen_range(110.4..112.8),
        }
    }

    /// Generate a `;`-delimited batch with a header row
    fn generate_batch(&mut self, rows: usize, fake_rate: f64) -> anyhow::Result<(Vec<u8>, usize)> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_writer(Vec::new());
        let mut fakes = 0;

        for _ in 0..rows {
            let row = if self.rng.gen_bool(fake_rate) {
                fakes += 1;
                self.generate_fake()
            } else {
                self.generate_genuine()
            };
            writer.serialize(row)?;
        }

        Ok((writer.into_inner()?, fakes))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Batch Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("banknotes.predict");
    let batches: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);
    let rows_per_batch: usize = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(50);
    let fake_rate: f64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(0.33);
    let delay_ms: u64 = args.get(6).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        batches = batches,
        rows_per_batch = rows_per_batch,
        fake_rate = fake_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(batches, rows_per_batch, fake_rate).await;
        }
    };

    let mut generator = BanknoteGenerator::new();
    let mut sent_fakes = 0;
    let mut reported_fakes = 0;

    for i in 0..batches {
        let (payload, fakes) = generator.generate_batch(rows_per_batch, fake_rate)?;
        sent_fakes += fakes;

        let start = Instant::now();
        let reply = client.request(subject.to_string(), payload.into()).await?;
        let latency = start.elapsed();

        match serde_json::from_slice::<PredictionResponse>(&reply.payload) {
            Ok(response) => {
                reported_fakes += response.stats.fake;
                info!(
                    batch = i + 1,
                    generated_fakes = fakes,
                    genuine = response.stats.genuine,
                    fake = response.stats.fake,
                    fake_percentage = response.stats.fake_percentage,
                    latency_ms = latency.as_millis() as u64,
                    "Batch scored"
                );
            }
            Err(_) => match serde_json::from_slice::<ErrorBody>(&reply.payload) {
                Ok(body) => warn!(batch = i + 1, status = body.status, detail = %body.detail, "Batch rejected"),
                Err(e) => warn!(batch = i + 1, error = %e, "Unreadable reply"),
            },
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} batches ({} generated fakes, {} reported fakes)",
        batches, sent_fakes, reported_fakes
    );

    Ok(())
}

async fn run_dry_mode(batches: u64, rows_per_batch: usize, fake_rate: f64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = BanknoteGenerator::new();

    for i in 0..batches.min(3) {
        let (payload, fakes) = generator.generate_batch(rows_per_batch.min(5), fake_rate)?;
        info!(
            "Sample batch {} ({} fakes):\n{}",
            i + 1,
            fakes,
            String::from_utf8_lossy(&payload)
        );
    }

    Ok(())
}

// rust/lifeline-store/src/bin/seed.rs
// Populate the input tables with a randomized local-development scenario

use chrono::Utc;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(
    name = "seed-store",
    about = "Seed the shared store with hospitals, patients, and ambulances"
)]
struct Args {
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[arg(long, default_value_t = 5)]
    hospitals: u32,

    #[arg(long, default_value_t = 20)]
    patients: u32,

    #[arg(long, default_value_t = 10)]
    ambulances: u32,

    /// Center of the scenario; defaults to Lisbon.
    #[arg(long, default_value_t = 38.7223)]
    center_lat: f64,

    #[arg(long, default_value_t = -9.1393)]
    center_lon: f64,

    /// Fixed RNG seed for reproducible scenarios.
    #[arg(long)]
    seed: Option<u64>,

    /// Truncate the input tables before seeding.
    #[arg(long)]
    reset: bool,
}

fn jitter(rng: &mut StdRng, center: f64) -> f64 {
    center + rng.gen_range(-0.15..0.15)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&args.database_url)
        .await?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if args.reset {
        sqlx::query("TRUNCATE hospitals, patients, ambulances")
            .execute(&pool)
            .await?;
    }

    for index in 0..args.hospitals {
        let bed_capacity: i32 = rng.gen_range(5..=40);
        let used_beds = rng.gen_range(0..=bed_capacity);
        sqlx::query(
            "INSERT INTO hospitals (id, name, bed_capacity, used_beds, lat, lon) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(format!("Hospital {}", index + 1))
        .bind(bed_capacity)
        .bind(used_beds)
        .bind(jitter(&mut rng, args.center_lat))
        .bind(jitter(&mut rng, args.center_lon))
        .execute(&pool)
        .await?;
    }

    for _ in 0..args.patients {
        sqlx::query(
            "INSERT INTO patients (id, lat, lon, treatment_deadline_minutes, registered_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(jitter(&mut rng, args.center_lat))
        .bind(jitter(&mut rng, args.center_lon))
        .bind(rng.gen_range(15..=120i32))
        .bind(Utc::now())
        .execute(&pool)
        .await?;
    }

    for _ in 0..args.ambulances {
        sqlx::query(
            "INSERT INTO ambulances (id, lat, lon, assigned_patient_id) \
             VALUES ($1, $2, $3, NULL)",
        )
        .bind(Uuid::new_v4())
        .bind(jitter(&mut rng, args.center_lat))
        .bind(jitter(&mut rng, args.center_lon))
        .execute(&pool)
        .await?;
    }

    println!(
        "seeded {} hospitals, {} patients, {} ambulances",
        args.hospitals, args.patients, args.ambulances
    );
    Ok(())
}

//! Demo account seed script
//!
//! Seeds the configured Postgres database with one parent account, two
//! children, a driver with a vehicle, and a short trail of positions so the
//! live map has something to show.
//!
//! Usage:
//!   DATABASE_URL=... JWT_SECRET=... ./seed-demo [--email demo@busline.app] [--password Demo2024!]

use anyhow::{Context, Result};
use clap::Parser;

use busline_api::{
    config::Config,
    db,
    error::AppError,
    models::{
        account::RegisterRequest,
        child::CreateChildRequest,
        driver::CreateDriverRequest,
    },
    services::{
        auth::AuthService,
        locations::{JitterSource, LocationFeed},
        profiles::ProfileService,
    },
    store::{PgStore, Store},
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "seed-demo", about = "Seed a demo parent account into the busline database")]
struct Args {
    /// Email of the demo parent
    #[arg(long, default_value = "demo@busline.app")]
    email: String,

    /// Password of the demo parent
    #[arg(long, default_value = "Demo2024!")]
    password: String,

    /// VIN of the demo bus
    #[arg(long, default_value = "1HGCM82633A004352")]
    vin: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL required")?;

    let pool = db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    db::run_migrations(&pool).await?;
    let store = Arc::new(PgStore::new(pool));

    println!("=== Seed Demo Account ===");

    let grant = match AuthService::register(
        store.as_ref(),
        &config,
        &RegisterRequest {
            name: "Demo Parent".into(),
            email: args.email.clone(),
            password: args.password.clone(),
            child: Some(CreateChildRequest {
                name: "Timmy".into(),
                age: 9,
                grade: "4th".into(),
                school: "Lincoln Elementary".into(),
            }),
        },
    )
    .await
    {
        Ok(grant) => grant,
        Err(AppError::DuplicateEmail) => {
            println!("Account {} already exists, nothing to do.", args.email);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let account_id = grant.account_id;
    println!("  Account: {} ({})", args.email, account_id);

    ProfileService::add_child(
        store.as_ref(),
        account_id,
        &CreateChildRequest {
            name: "Sally".into(),
            age: 7,
            grade: "2nd".into(),
            school: "Lincoln Elementary".into(),
        },
    )
    .await?;

    let driver = ProfileService::add_driver(
        store.as_ref(),
        account_id,
        &CreateDriverRequest {
            name: "Sam Rivera".into(),
            license_number: "D1234567".into(),
            phone_number: "555-0100".into(),
            vin: args.vin.clone(),
        },
    )
    .await?;
    let vehicle = driver
        .vehicles
        .first()
        .context("driver was created without a vehicle")?;
    println!("  Driver: {} / vehicle {}", driver.driver.name, vehicle.id);

    let feed = LocationFeed::new(
        store.clone() as Arc<dyn Store>,
        Arc::new(JitterSource::new(config.reference_point(), config.jitter_spread)),
    );
    let origin = config.reference_point();
    for step in 0..5 {
        let offset = step as f64 * 0.002;
        feed.record(vehicle.id, origin.latitude + offset, origin.longitude + offset)
            .await?;
    }
    println!("  Recorded 5 positions");

    println!("=== Done ===");
    Ok(())
}

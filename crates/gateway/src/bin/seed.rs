use std::sync::Arc;

use survey_gateway::config::{GatewayConfig, StoreMode};
use survey_gateway::http::open_store;
use survey_gateway::seed::{SeedOutcome, seed_sample_data};
use survey_service::{ResponseService, SurveyService, SystemClock};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match GatewayConfig::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("STARTUP_ERROR {}", err);
            std::process::exit(1);
        }
    };

    if config.store_mode == StoreMode::Memory {
        eprintln!(
            "STARTUP_ERROR ERR_INVALID_CONFIG: seeding a memory store has no lasting effect; set SURVEY_STORE_MODE=postgres"
        );
        std::process::exit(1);
    }

    let store = match open_store(&config).await {
        Ok(store) => store,
        Err(err) => {
            eprintln!("STARTUP_ERROR {}", err);
            std::process::exit(1);
        }
    };

    let clock = Arc::new(SystemClock);
    let surveys = SurveyService::new(store.clone(), clock.clone());
    let responses = ResponseService::new(store, clock);

    match seed_sample_data(&surveys, &responses).await {
        Ok(SeedOutcome::Seeded { surveys, responses }) => {
            println!("Created {} surveys and {} responses", surveys, responses);
        }
        Ok(SeedOutcome::Skipped { existing_surveys }) => {
            println!(
                "Store already holds {} surveys; sample data not created",
                existing_surveys
            );
        }
        Err(err) => {
            eprintln!("SEED_ERROR {}", err);
            std::process::exit(1);
        }
    }
}

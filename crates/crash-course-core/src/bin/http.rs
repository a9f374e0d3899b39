#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;

    use crash_course::{PlannerConfig, Syllabus, http_api, load_planner_config, load_syllabus_from_json};
    use tracing::info;
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer())
        .init();

    let addr: SocketAddr = std::env::var("CRASH_COURSE_HTTP_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;

    let syllabus = match std::env::var("CRASH_COURSE_SYLLABUS") {
        Ok(path) => {
            let syllabus = load_syllabus_from_json(&path)?;
            info!(%path, topics = syllabus.topic_count(), "preloaded syllabus");
            syllabus
        }
        Err(_) => Syllabus::new(),
    };
    let config = match std::env::var("CRASH_COURSE_CONFIG") {
        Ok(path) => load_planner_config(&path)?,
        Err(_) => PlannerConfig::default(),
    };

    #[allow(unused_mut)]
    let mut state = http_api::AppState::with_config(syllabus, config);
    #[cfg(feature = "sqlite")]
    if let Ok(path) = std::env::var("CRASH_COURSE_DB") {
        state = state.with_store(crash_course::SqliteStore::new(&path)?)?;
        info!(%path, "writing changes through to sqlite");
    }

    http_api::serve(addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}

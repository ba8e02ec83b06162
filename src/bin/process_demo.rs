// src/bin/process_demo.rs
// End-to-end demo: seed a store with two articles and two businesses, run
// the worker over them, and print the resulting recommendations.
//
// Run with: cargo run --bin process_demo
// Config is read from ./config (override with SCOUT_CONFIG_DIR).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use event_scout::augment::DisabledProvider;
use event_scout::config::{self, ConfigHandle, ConfigSnapshot};
use event_scout::store::{Datastore, MemoryStore};
use event_scout::types::{Business, BusinessKeyword};
use event_scout::{Article, Pipeline, Worker, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let snapshot = match ConfigSnapshot::load(1) {
        Ok(s) => s,
        Err(e) => {
            info!(error = %e, "config not found, using built-in defaults");
            ConfigSnapshot::builtin()
        }
    };
    let handle = ConfigHandle::new(snapshot);
    config::start_reload_thread(
        handle.clone(),
        PathBuf::from(config::DEFAULT_CONFIG_DIR),
        Duration::from_secs(30),
    );

    let store = Arc::new(MemoryStore::new());
    seed(store.as_ref()).await?;

    let pipeline = Arc::new(Pipeline::new(
        store.clone(),
        handle,
        Arc::new(DisabledProvider),
    ));
    let worker = Worker::new(
        pipeline,
        store.clone(),
        WorkerConfig {
            debounce: Duration::from_millis(100),
            ..WorkerConfig::default()
        },
    );

    let (tx, rx) = mpsc::channel(16);
    let handle = worker.spawn(rx);
    for id in [1u64, 2] {
        tx.send(id).await?;
    }
    drop(tx);
    handle.await?;

    for id in [1u64, 2] {
        let recs = store.recommendations_for_article(id).await?;
        println!("\narticle {id}: {} recommendation(s)", recs.len());
        for r in recs {
            println!(
                "  [business {} | {} | {:?}] {} (confidence {:.2}, impact {:.2}, effort {:.2})",
                r.business_id,
                r.category,
                r.priority,
                r.title,
                r.confidence_score,
                r.impact_score,
                r.effort_score
            );
        }
    }
    Ok(())
}

async fn seed(store: &MemoryStore) -> anyhow::Result<()> {
    store
        .put_article(Article::new(
            1,
            "Partido de fútbol Colombia vs Brasil en Medellín",
            "La selección Colombia enfrentará a Brasil el próximo domingo 26 de octubre \
             a las 4pm en el Estadio Atanasio Girardot de Medellín. Se esperan 35.000 \
             asistentes para este partido histórico con boletería agotada.",
            Utc::now() - ChronoDuration::days(1),
        ))
        .await?;
    store
        .put_article(Article::new(
            2,
            "Festival gastronómico en El Poblado",
            "Del 20 al 22 de marzo de 2026 llega una nueva edición del festival \
             gastronómico con degustación de cocina local en El Poblado, Medellín. \
             Los organizadores esperan 3.000 visitantes durante todo el día.",
            Utc::now() - ChronoDuration::days(2),
        ))
        .await?;

    let mut tribuna = Business::new(1, "La Tribuna", "pub", "Medellín");
    tribuna.screen_broadcast = true;
    tribuna.keywords = vec![BusinessKeyword {
        keyword: "futbol".into(),
        weight: 0.8,
        negative: false,
    }];
    store.put_business(tribuna).await?;

    let mut andino = Business::new(2, "Café Andino", "restaurant", "Medellín");
    andino.neighborhood = Some("El Poblado".into());
    store.put_business(andino).await?;
    Ok(())
}

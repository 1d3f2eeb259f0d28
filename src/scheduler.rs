// src/scheduler.rs

use crate::cache::TtlCache;
use crate::dashboard::{DashboardSnapshot, build_dashboard};
use crate::time::Clock;
use crate::types::RawRows;
use crate::{config::Config, storage::Storage};
use anyhow::Result;
use chrono_tz::Tz;
use std::{sync::Arc, time::Instant};
use tokio::time::interval;
use tracing::{debug, error, info};

const ROWS_CACHE_KEY: &str = "raw-rows";

/// Grava o snapshot em `snapshot_path` (JSON indentado) ou imprime na saída padrão.
async fn publish(snapshot: &DashboardSnapshot, config: &Config) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    match config.snapshot_path.as_deref() {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            debug!("Snapshot gravado em {}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Loop principal: a cada intervalo lê as linhas (com cache), recalcula e publica o snapshot.
/// Com `run_once`, executa um único ciclo e retorna o erro, se houver.
pub async fn run_refresh_loop(
    config: Arc<Config>,
    storage: Arc<Storage>,
    clock: Arc<dyn Clock>,
    tz: Tz,
) -> Result<()> {
    let mut cache: TtlCache<RawRows, Arc<dyn Clock>> = TtlCache::new(Arc::clone(&clock));
    let mut ticker = interval(config.refresh_interval());
    let mut cycle_number: u64 = 0;

    loop {
        ticker.tick().await;
        cycle_number += 1;
        let cycle_start = Instant::now();
        let now = clock.now();

        info!("[CICLO {}] Iniciando recálculo em {}.", cycle_number, now);

        // 1. Leitura das linhas
        let rows = match cache
            .get_or_load(ROWS_CACHE_KEY, config.cache_ttl(), || storage.load_rows())
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                error!("[CICLO {}] Erro ao ler o banco: {:?}", cycle_number, e);
                if config.run_once {
                    return Err(e);
                }
                continue;
            }
        };

        // 2. Pipeline
        let snapshot = build_dashboard(&rows, now, tz);
        info!(
            "[CICLO {}] Status: {} | {} semana(s) | {} descarte(s).",
            cycle_number,
            snapshot.status.title,
            snapshot.weeks.len(),
            snapshot.diagnostics.len()
        );

        // 3. Publicação
        if let Err(e) = publish(&snapshot, &config).await {
            error!("[CICLO {}] Erro ao publicar snapshot: {:?}", cycle_number, e);
            if config.run_once {
                return Err(e);
            }
        }

        info!(
            "[CICLO {}] Fim do ciclo. Duração: {:?}",
            cycle_number,
            cycle_start.elapsed()
        );

        if config.run_once {
            return Ok(());
        }
    }
}

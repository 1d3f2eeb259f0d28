use anyhow::Result;
use std::sync::Arc;
use svitlo_timeline::time::{Clock, ManualClock, SystemClock};
use svitlo_timeline::{config, scheduler, storage};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializa o sistema de logging (tracing)
    tracing_subscriber::fmt::init();

    // Carrega e valida a configuração (Arc para compartilhamento com o loop)
    let config: Arc<config::Config> = Arc::new(config::Config::load()?);
    if let Err(e) = config.validate() {
        anyhow::bail!("Configuração inválida: {}", e);
    }
    let tz = config.time_zone().map_err(anyhow::Error::msg)?;
    info!("Configuração carregada (fuso {})", tz);

    // Relógio fixo quando now_override está presente
    let clock: Arc<dyn Clock> = match config.fixed_now().map_err(anyhow::Error::msg)? {
        Some(now) => {
            info!("Usando instante fixo {}", now);
            Arc::new(ManualClock::new(now))
        }
        None => Arc::new(SystemClock),
    };

    // Conecta ao banco de dados (somente leitura)
    let storage: Arc<storage::Storage> =
        Arc::new(storage::Storage::connect(&config.database_url).await?);
    info!("Banco de dados conectado");

    scheduler::run_refresh_loop(config, storage, clock, tz).await
}

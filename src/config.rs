use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use config as config_crate;
use serde::Deserialize;
use std::time::Duration;

fn default_timezone() -> String {
    "Europe/Kyiv".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_refresh_interval_secs() -> u64 {
    60
}

/// Configuração operacional do serviço.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// URL de conexão com o banco PostgreSQL (somente leitura).
    pub database_url: String,
    /// Fuso IANA usado para dias e frações de hora.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Validade do cache das linhas em segundos. Zero desliga o cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Intervalo entre recálculos em segundos.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Onde gravar o snapshot JSON; sem valor, vai para a saída padrão.
    #[serde(default)]
    pub snapshot_path: Option<String>,
    /// Calcula um snapshot e encerra.
    #[serde(default)]
    pub run_once: bool,
    /// Instante fixo (RFC 3339) no lugar do relógio do sistema.
    #[serde(default)]
    pub now_override: Option<String>,
}

impl Config {
    /// Lê `config.*` (opcional) e variáveis `SVITLO_*`, que têm precedência.
    pub fn load() -> anyhow::Result<Self> {
        let settings = config_crate::Config::builder()
            .add_source(config_crate::File::with_name("config").required(false))
            .add_source(config_crate::Environment::with_prefix("SVITLO"))
            .build()?;
        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let settings = config_crate::Config::builder()
            .add_source(config_crate::File::from_str(raw, config_crate::FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database_url.trim().is_empty() {
            return Err("database_url não pode ser vazio".into());
        }
        if self.refresh_interval_secs == 0 {
            return Err("refresh_interval_secs deve ser maior que zero".into());
        }
        self.time_zone()?;
        self.fixed_now()?;
        Ok(())
    }

    pub fn time_zone(&self) -> Result<Tz, String> {
        self.timezone
            .trim()
            .parse::<Tz>()
            .map_err(|_| format!("timezone desconhecido: {:?}", self.timezone))
    }

    /// Instante de `now_override`, se configurado.
    pub fn fixed_now(&self) -> Result<Option<DateTime<Utc>>, String> {
        self.now_override
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|at| at.with_timezone(&Utc))
                    .map_err(|e| format!("now_override inválido ({raw:?}): {e}"))
            })
            .transpose()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

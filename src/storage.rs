use crate::types::{ActualOutageRow, PlanRow, RawRows};
use anyhow::Result;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;
use tracing::debug;

/// Acesso somente leitura às tabelas `schedules` e `outages`.
pub struct Storage {
    pool: Pool,
}

impl Storage {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pg_config: tokio_postgres::Config = database_url.parse()?;
        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager).max_size(10).build()?;

        // Falha cedo se o banco estiver inacessível
        let client = pool.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok(Self { pool })
    }

    /// Planos por dia, em ordem de data. A linha sentinela `__init__` fica de fora.
    pub async fn list_schedules(&self) -> Result<Vec<PlanRow>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT schedule_date::text AS schedule_date,
                       status::text AS status,
                       outages_json::text AS outages_json
                FROM schedules
                WHERE schedule_date::text <> '__init__'
                ORDER BY schedule_date
                "#,
                &[],
            )
            .await?;
        let plans = rows
            .into_iter()
            .map(PlanRow::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    /// Faltas observadas em segundos unix, em ordem de início.
    pub async fn list_actual_outages(&self) -> Result<Vec<ActualOutageRow>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT FLOOR(start_ts)::bigint AS start_ts,
                       FLOOR(end_ts)::bigint AS end_ts
                FROM outages
                ORDER BY start_ts
                "#,
                &[],
            )
            .await?;
        let outages = rows
            .into_iter()
            .map(ActualOutageRow::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(outages)
    }

    /// Lê as duas tabelas como um snapshot único.
    pub async fn load_rows(&self) -> Result<RawRows> {
        let plans = self.list_schedules().await?;
        let actuals = self.list_actual_outages().await?;
        debug!(
            "Linhas lidas: {} plano(s), {} falta(s)",
            plans.len(),
            actuals.len()
        );
        Ok(RawRows { plans, actuals })
    }
}

use std::time::Duration;

use anyhow::{Context, Result};
use diesel::{
    Connection, PgConnection, RunQueryDsl,
    connection::CacheSize,
    r2d2::{ConnectionManager, CustomizeConnection, Error as R2d2Error, Pool},
};
use rand::Rng;
use tracing::{error, info, warn};

#[derive(Debug, Default)]
struct DisablePreparedStatements;

impl CustomizeConnection<PgConnection, R2d2Error> for DisablePreparedStatements {
    fn on_acquire(&self, conn: &mut PgConnection) -> std::result::Result<(), R2d2Error> {
        conn.set_prepared_statement_cache_size(CacheSize::Disabled);
        Ok(())
    }
}

pub type PgPoolSquad = Pool<ConnectionManager<PgConnection>>;

#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

/// Builds the pool without opening a connection, so startup does not depend on
/// the database being reachable.
pub fn establish_connection(database_url: &str, settings: &PoolSettings) -> Result<PgPoolSquad> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(settings.max_connections)
        .connection_timeout(settings.connect_timeout)
        .connection_customizer(Box::new(DisablePreparedStatements::default()))
        .build_unchecked(manager);
    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Exponential delay for a zero-based attempt, plus up to 25% jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self
            .initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.min(16)));
        let jitter_ceiling = (base.as_millis() as u64 / 4).max(1);
        let jitter = rand::thread_rng().gen_range(0..jitter_ceiling);
        base + Duration::from_millis(jitter)
    }
}

/// Probes the database with `SELECT 1` until it answers or the attempts run out.
/// Returns whether the database became reachable; callers keep serving either way.
pub async fn wait_for_database(pool: &PgPoolSquad, policy: &RetryPolicy) -> bool {
    let attempts = policy.attempts.max(1);

    for attempt in 0..attempts {
        let probe_pool = pool.clone();
        let outcome = tokio::task::spawn_blocking(move || probe(&probe_pool)).await;

        match outcome {
            Ok(Ok(())) => {
                info!(attempt = attempt + 1, "database: connection established");
                return true;
            }
            Ok(Err(err)) => {
                warn!(attempt = attempt + 1, attempts, error = ?err, "database: probe failed");
            }
            Err(err) => {
                warn!(attempt = attempt + 1, attempts, error = ?err, "database: probe task aborted");
            }
        }

        if attempt + 1 < attempts {
            tokio::time::sleep(policy.delay_for(attempt)).await;
        }
    }

    error!(attempts, "database: unreachable after startup retries, continuing degraded");
    false
}

fn probe(pool: &PgPoolSquad) -> Result<()> {
    let mut conn = pool.get().context("checkout connection")?;
    diesel::sql_query("SELECT 1")
        .execute(&mut conn)
        .context("run probe query")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_with_bounded_jitter() {
        let policy = RetryPolicy {
            attempts: 5,
            initial_backoff: Duration::from_millis(100),
        };

        for attempt in 0..4 {
            let base = 100u64 * 2u64.pow(attempt);
            let delay = policy.delay_for(attempt).as_millis() as u64;
            assert!(delay >= base, "attempt {attempt}: {delay} < {base}");
            assert!(delay < base + base / 4 + 1, "attempt {attempt}: {delay} too large");
        }
    }
}

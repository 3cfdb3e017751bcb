use std::sync::Arc;

use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, PooledConnection},
};

use crate::{
    auth::jwt::JwtService,
    config::AppConfig,
    db::PgPool,
    error::{AppError, AppResult},
};

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub jwt: JwtService,
}

impl AppState {
    /// The JWT service is derived from the same config the state carries.
    pub fn from_config(pool: PgPool, config: AppConfig) -> anyhow::Result<Self> {
        let jwt = JwtService::from_config(&config)?;
        Ok(Self {
            pool,
            config: Arc::new(config),
            jwt,
        })
    }

    pub fn db(&self) -> AppResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| AppError::internal(format!("database pool error: {err}")))
    }
}

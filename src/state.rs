use std::sync::Arc;

use tracing::warn;

use crate::auth::{
    repo::{PgUserStore, UserStore},
    services::Authenticator,
};
use crate::config::{AppConfig, StoreBackend};
use crate::db;
use crate::memory::{MemoryAppointmentStore, MemoryUserStore};
use crate::scheduling::{
    repo::{AppointmentStore, PgAppointmentStore},
    services::Scheduler,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub authenticator: Authenticator,
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (users, appointments): (Arc<dyn UserStore>, Arc<dyn AppointmentStore>) =
            match config.store_backend {
                StoreBackend::Postgres => {
                    let pool = db::connect(&config).await?;
                    db::migrate(&pool).await?;
                    (
                        Arc::new(PgUserStore::new(pool.clone())),
                        Arc::new(PgAppointmentStore::new(pool)),
                    )
                }
                StoreBackend::Memory => {
                    warn!("using in-memory stores; data is lost on restart");
                    (
                        Arc::new(MemoryUserStore::default()),
                        Arc::new(MemoryAppointmentStore::default()),
                    )
                }
            };

        Ok(Self::from_parts(config, users, appointments))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        appointments: Arc<dyn AppointmentStore>,
    ) -> Self {
        Self {
            authenticator: Authenticator::new(users.clone()),
            scheduler: Arc::new(Scheduler::new(appointments.clone())),
            config,
            users,
            appointments,
        }
    }

    /// In-memory state with fixed JWT settings, for tests.
    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            bind_addr: ([127, 0, 0, 1], 0).into(),
            store_backend: StoreBackend::Memory,
            database_url: None,
            db_max_connections: 1,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            bootstrap_admin: None,
        });

        Self::from_parts(
            config,
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryAppointmentStore::default()),
        )
    }
}

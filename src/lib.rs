#[macro_use]
extern crate rocket;

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod request_logger;
pub mod routes;
pub mod store;

use crate::auth::{AuthConfig, AuthState};
use crate::db::CardsDb;
use crate::request_logger::RequestLogger;
use crate::store::PgAccountStore;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket, Route};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_okapi::{
    openapi_get_routes,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::{Arc, Once};

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

/// Every API route, plus the generated `openapi.json`. Mounted under `/api/v1`.
pub fn api_routes() -> Vec<Route> {
    openapi_get_routes![
        // Health routes
        routes::health::health_check,
        // Account routes
        auth::routes::register,
        auth::routes::login,
        auth::routes::logout,
        auth::routes::list_users,
        auth::routes::get_user,
        auth::routes::update_user,
        auth::routes::toggle_business,
        auth::routes::change_role,
    ]
}

fn cors_options() -> CorsOptions {
    // The session travels in a cookie, so browsers must be allowed to send credentials.
    let allowed_origins = match std::env::var("CARDS_CORS_ORIGIN") {
        Ok(origin) => AllowedOrigins::some_exact(&[origin]),
        Err(_) => AllowedOrigins::all(),
    };

    CorsOptions::default()
        .allowed_origins(allowed_origins)
        .allowed_methods(
            vec![
                Method::Get,
                Method::Post,
                Method::Put,
                Method::Delete,
                Method::Patch,
            ]
            .into_iter()
            .map(From::from)
            .collect(),
        )
        .allow_credentials(true)
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    let cors = cors_options().to_cors().expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(CardsDb::init())
        .attach(cors)
        // Run database migrations on startup
        .attach(AdHoc::try_on_ignite(
            "Run Migrations",
            |rocket| async move {
                match CardsDb::fetch(&rocket) {
                    Some(db) => {
                        let pool = (**db).clone();
                        match db::run_migrations(&pool).await {
                            Ok(_) => {
                                log::info!("database migrations successful");
                                Ok(rocket)
                            }
                            Err(e) => {
                                log::error!("database migrations failed: {}", e);
                                Err(rocket)
                            }
                        }
                    }
                    None => {
                        log::error!("database pool not available for migrations");
                        Err(rocket)
                    }
                }
            },
        ))
        // Configuration is read once here and handed to the services explicitly.
        .attach(AdHoc::try_on_ignite(
            "Authentication State",
            |rocket| async move {
                let pool = match CardsDb::fetch(&rocket) {
                    Some(db) => (**db).clone(),
                    None => {
                        log::error!("database pool not available for account store");
                        return Err(rocket);
                    }
                };

                let state = AuthConfig::from_env().and_then(|config| {
                    log::info!(
                        "auth configured: cookie '{}' (secure: {}), session ttl {}s",
                        config.session_cookie_name,
                        config.cookie_secure,
                        config.session_ttl_secs
                    );
                    AuthState::from_config(config, Arc::new(PgAccountStore::new(pool)))
                });

                match state {
                    Ok(state) => Ok(rocket.manage(state)),
                    Err(e) => {
                        log::error!("failed to initialise authentication: {}", e);
                        Err(rocket)
                    }
                }
            },
        ))
        .register("/", error::catchers())
        .mount("/api/v1", api_routes())
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use std::sync::Arc;

    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};

    use crate::auth::passwords::HashCost;
    use crate::auth::{AuthConfig, AuthState, PasswordService, TokenService};
    use crate::store::{AccountStore, MemoryAccountStore};

    pub use database::{TestDatabase, TestDatabaseError};

    /// Token secret used by test auth states; distinct from the cookie key.
    pub const TEST_TOKEN_SECRET: &str = "cards-api-test-token-secret";

    /// 512-bit cookie encryption key for test Rocket instances.
    pub const TEST_COOKIE_KEY: &str =
        "GtzjX5sWje2JRYR6+a4Xy8CEKlY38pAZfs1LPSiDkdCCzIECCWHTqq0OBYMcWGZGd8tpCbMpPf//4cxT162ZHA==";

    /// Cheap argon2 parameters so tests do not spend seconds hashing.
    pub const TEST_HASH_COST: HashCost = HashCost {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };

    /// Auth state over the given store with test secrets and cheap hashing.
    pub fn auth_state_with_store(store: Arc<dyn AccountStore>) -> AuthState {
        let config = AuthConfig {
            hash_cost: TEST_HASH_COST,
            ..AuthConfig::with_secret(TEST_TOKEN_SECRET)
        };
        let password_service =
            PasswordService::with_cost(config.hash_cost).expect("valid test hash cost");
        let token_service =
            TokenService::from_config(&config).expect("valid test token secret");
        AuthState::new(config, password_service, token_service, store)
    }

    /// Auth state backed by a fresh in-memory store.
    pub fn memory_auth_state() -> AuthState {
        auth_state_with_store(Arc::new(MemoryAccountStore::new()))
    }

    pub mod database {
        use rocket_db_pools::sqlx::postgres::PgPoolOptions;
        use rocket_db_pools::sqlx::{self, PgPool};
        use testcontainers::{
            ContainerAsync, ImageExt, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use testcontainers_modules::postgres::Postgres;
        use thiserror::Error;

        use crate::db::MIGRATOR;

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Disposable migrated Postgres instance for integration tests.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            container: Option<ContainerAsync<Postgres>>,
        }

        impl TestDatabase {
            /// Launch a Postgres container and apply every migration.
            pub async fn new() -> Result<Self, TestDatabaseError> {
                let container = Postgres::default().with_tag("16-alpine").start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(&url)
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                MIGRATOR.run(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    container: Some(container),
                })
            }

            /// Cloneable connection pool for use in tests and Rocket state.
            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            /// Convenience method returning a clone of the pooled connection handle.
            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Close pool connections and stop the container.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }
                if let Some(container) = self.container.take() {
                    drop(container);
                }
                Ok(())
            }
        }
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        auth_state: Option<AuthState>,
    }

    impl Default for TestRocketBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled,
        /// and a fixed cookie key.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false))
                .merge(("secret_key", TEST_COOKIE_KEY));

            Self {
                figment,
                mounts: Vec::new(),
                auth_state: None,
            }
        }

        /// Mount routes under `/api/v1`.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api/v1".to_string(), routes));
            self
        }

        /// Mount every application route under `/api/v1`.
        pub fn mount_all_routes(self) -> Self {
            self.mount_api_routes(crate::api_routes())
        }

        /// Manage the authentication state routes and guards read from.
        pub fn manage_auth_state(mut self, state: AuthState) -> Self {
            self.auth_state = Some(state);
            self
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment).register("/", crate::error::catchers());

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(state) = self.auth_state {
                rocket = rocket.manage(state);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}

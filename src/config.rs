use anyhow::{bail, Context, Result};
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

/// Which persistence engine backs the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" => Ok(Self::Memory),
            other => bail!("Unknown STORAGE_BACKEND '{}'", other),
        }
    }
}

/// Dev-only signing secret, refused in staging and prod
const DEV_JWT_SECRET: &str = "tenderhub-dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // Storage
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub database_connect_timeout_seconds: u64,
    pub run_migrations: bool,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Tokens
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_ttl_seconds: i64,

    // Accounts
    pub admin_emails: Vec<String>,

    // Reference values
    pub reference_values_strict: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        // Storage
        let storage_backend = StorageBackend::from_str(
            &env::var("STORAGE_BACKEND").unwrap_or_else(|_| "postgres".to_string()),
        )?;
        let database_url = match storage_backend {
            StorageBackend::Postgres => {
                Some(env::var("DATABASE_URL").context("DATABASE_URL must be set")?)
            }
            StorageBackend::Memory => env::var("DATABASE_URL").ok(),
        };
        let database_max_connections = parse_var("DATABASE_MAX_CONNECTIONS", 10);
        let database_connect_timeout_seconds = parse_var("DATABASE_CONNECT_TIMEOUT_SECONDS", 30);
        let run_migrations = parse_var("RUN_MIGRATIONS", true);

        // CORS
        let cors_allow_origins = split_list(
            &env::var("CORS_ALLOW_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string()),
        );

        // Tokens
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if env.is_dev() => DEV_JWT_SECRET.to_string(),
            Err(_) => bail!("JWT_SECRET must be set outside dev"),
        };
        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "tenderhub".to_string());
        let jwt_ttl_seconds = parse_var("JWT_TTL_SECONDS", 3600); // 1 hour default

        // Accounts
        let admin_emails = split_list(&env::var("ADMIN_EMAILS").unwrap_or_default())
            .into_iter()
            .map(|email| email.to_lowercase())
            .collect();

        let reference_values_strict = parse_var("REFERENCE_VALUES_STRICT", false);

        Ok(Settings {
            env,
            server_addr,
            storage_backend,
            database_url,
            database_max_connections,
            database_connect_timeout_seconds,
            run_migrations,
            cors_allow_origins,
            jwt_secret,
            jwt_issuer,
            jwt_ttl_seconds,
            admin_emails,
            reference_values_strict,
        })
    }

    /// Settings for an in-memory instance, used by tests and local demos
    pub fn in_memory() -> Self {
        Self {
            env: Environment::Dev,
            server_addr: "127.0.0.1:0".to_string(),
            storage_backend: StorageBackend::Memory,
            database_url: None,
            database_max_connections: 1,
            database_connect_timeout_seconds: 0,
            run_migrations: false,
            cors_allow_origins: vec!["http://localhost:3000".to_string()],
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_issuer: "tenderhub".to_string(),
            jwt_ttl_seconds: 3600,
            admin_emails: Vec::new(),
            reference_values_strict: false,
        }
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.admin_emails.iter().any(|e| *e == email)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

//! Warden administrative permission report.

#![forbid(unsafe_code)]

mod fixed_roles;

use std::env;
use std::io::Write;
use std::sync::Arc;

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;
use warden_application::{AccessControlService, Requester, RoleRegistry, group_scopes_by_action};
use warden_core::{AppError, AppResult, OrgId, UserId};
use warden_domain::{Permission, actions, scopes};
use warden_infrastructure::PostgresAccessControlStore;

static MIGRATOR: Migrator = sqlx::migrate!("../../crates/infrastructure/migrations");

#[derive(Debug, Clone)]
struct ReportConfig {
    database_url: String,
    org_id: OrgId,
    action_prefix: String,
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ReportConfig::load()?;
    let pool = connect_pool(&config).await?;
    MIGRATOR
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    let mut service = AccessControlService::new(
        Arc::new(PostgresAccessControlStore::new(pool)),
        Arc::new(RoleRegistry::new()),
    );
    service.declare_fixed_roles(fixed_roles::declarations())?;
    service.register_fixed_roles()?;

    info!(
        org_id = %config.org_id,
        action_prefix = %config.action_prefix,
        "warden-report started"
    );

    let requester = reporting_requester(config.org_id);
    let summary = service
        .get_simplified_users_permissions(&requester, config.org_id, &config.action_prefix)
        .await?;

    info!(users = summary.len(), "simplified permissions resolved");

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &summary)
        .map_err(|error| AppError::Internal(format!("failed to serialize report: {error}")))?;
    writeln!(stdout)
        .map_err(|error| AppError::Internal(format!("failed to write report: {error}")))?;

    Ok(())
}

/// Server administrator allowed to read every user's permissions in the org.
fn reporting_requester(org_id: OrgId) -> Requester {
    let permissions = group_scopes_by_action(&[Permission::new(
        actions::USERS_PERMISSIONS_READ,
        scopes::USERS_ALL,
    )]);

    Requester::new(org_id, UserId::default())
        .with_grafana_admin(true)
        .with_permissions(org_id, permissions)
}

async fn connect_pool(config: &ReportConfig) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.database_url.as_str())
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

impl ReportConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let org_id = parse_env_i64("REPORT_ORG_ID", 1)?;
        let action_prefix = env::var("REPORT_ACTION_PREFIX")
            .map(|value| value.trim().to_owned())
            .unwrap_or_else(|_| "teams".to_owned());
        let max_connections = parse_env_u32("DATABASE_MAX_CONNECTIONS", 5)?;

        if org_id <= 0 {
            return Err(AppError::Validation(
                "REPORT_ORG_ID must be greater than zero".to_owned(),
            ));
        }

        if action_prefix.is_empty() {
            return Err(AppError::Validation(
                "REPORT_ACTION_PREFIX must not be empty".to_owned(),
            ));
        }

        if max_connections == 0 {
            return Err(AppError::Validation(
                "DATABASE_MAX_CONNECTIONS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            org_id: OrgId::new(org_id),
            action_prefix,
            max_connections,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_i64(name: &str, default: i64) -> AppResult<i64> {
    match env::var(name) {
        Ok(value) => value.trim().parse::<i64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> AppResult<u32> {
    match env::var(name) {
        Ok(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

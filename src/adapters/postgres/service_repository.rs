//! PostgreSQL implementation of ServiceRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::billing::{NewService, Service, ServiceStatus};
use crate::domain::foundation::{
    CustomerId, DomainError, ErrorCode, PackageId, RouterId, ServiceId, TenantId, Timestamp,
};
use crate::domain::tenancy::TenantScope;
use crate::ports::ServiceRepository;

use super::{scope_binds, storage_error};

/// PostgreSQL implementation of the ServiceRepository port.
pub struct PostgresServiceRepository {
    pool: PgPool,
}

impl PostgresServiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a service.
#[derive(Debug, sqlx::FromRow)]
struct ServiceRow {
    id: i64,
    customer_id: i64,
    package_id: i64,
    router_id: i64,
    monthly_fee: Decimal,
    status: String,
    tenant_id: Option<i64>,
    next_invoice_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ServiceRow> for Service {
    type Error = DomainError;

    fn try_from(row: ServiceRow) -> Result<Self, Self::Error> {
        Ok(Service {
            id: ServiceId::from_i64(row.id),
            customer_id: CustomerId::from_i64(row.customer_id),
            package_id: PackageId::from_i64(row.package_id),
            router_id: RouterId::from_i64(row.router_id),
            monthly_fee: row.monthly_fee,
            status: parse_status(&row.status)?,
            tenant: row
                .tenant_id
                .map(TenantId::new)
                .transpose()
                .map_err(DomainError::from)?,
            next_invoice_date: Timestamp::from_datetime(row.next_invoice_date),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn parse_status(s: &str) -> Result<ServiceStatus, DomainError> {
    match s {
        "pending" => Ok(ServiceStatus::Pending),
        "active" => Ok(ServiceStatus::Active),
        "isolated" => Ok(ServiceStatus::Isolated),
        "suspended" => Ok(ServiceStatus::Suspended),
        "terminated" => Ok(ServiceStatus::Terminated),
        "provisioning_failed" => Ok(ServiceStatus::ProvisioningFailed),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid service status value: {}", s),
        )),
    }
}

fn render_status(status: ServiceStatus) -> &'static str {
    match status {
        ServiceStatus::Pending => "pending",
        ServiceStatus::Active => "active",
        ServiceStatus::Isolated => "isolated",
        ServiceStatus::Suspended => "suspended",
        ServiceStatus::Terminated => "terminated",
        ServiceStatus::ProvisioningFailed => "provisioning_failed",
    }
}

const SELECT_COLUMNS: &str = "id, customer_id, package_id, router_id, monthly_fee, status, tenant_id, next_invoice_date, created_at";

#[async_trait]
impl ServiceRepository for PostgresServiceRepository {
    async fn insert(&self, new: NewService) -> Result<Service, DomainError> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!(
            r#"
            INSERT INTO services
                (customer_id, package_id, router_id, monthly_fee, status, tenant_id, next_invoice_date, created_at)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6, NOW())
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(new.customer_id.as_i64())
        .bind(new.package_id.as_i64())
        .bind(new.router_id.as_i64())
        .bind(new.monthly_fee)
        .bind(new.tenant.map(|t| t.as_i64()))
        .bind(new.next_invoice_date.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;

        Service::try_from(row)
    }

    async fn update(&self, service: &Service) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE services
            SET status = $2, next_invoice_date = $3
            WHERE id = $1
            "#,
        )
        .bind(service.id.as_i64())
        .bind(render_status(service.status))
        .bind(service.next_invoice_date.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        scope: &TenantScope,
        id: ServiceId,
    ) -> Result<Option<Service>, DomainError> {
        let (unrestricted, tenant) = scope_binds(scope);

        let row = sqlx::query_as::<_, ServiceRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM services
            WHERE id = $1
              AND (CASE WHEN $2 THEN TRUE
                        WHEN $3::BIGINT IS NULL THEN FALSE
                        ELSE tenant_id = $3 END)
            "#
        ))
        .bind(id.as_i64())
        .bind(unrestricted)
        .bind(tenant)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(Service::try_from).transpose()
    }

    async fn list_for_customer(
        &self,
        scope: &TenantScope,
        customer_id: CustomerId,
    ) -> Result<Vec<Service>, DomainError> {
        let (unrestricted, tenant) = scope_binds(scope);

        let rows = sqlx::query_as::<_, ServiceRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM services
            WHERE customer_id = $1
              AND (CASE WHEN $2 THEN TRUE
                        WHEN $3::BIGINT IS NULL THEN FALSE
                        ELSE tenant_id = $3 END)
            ORDER BY id
            "#
        ))
        .bind(customer_id.as_i64())
        .bind(unrestricted)
        .bind(tenant)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(Service::try_from).collect()
    }

    async fn list_billable(
        &self,
        scope: &TenantScope,
        now: &Timestamp,
    ) -> Result<Vec<Service>, DomainError> {
        let (unrestricted, tenant) = scope_binds(scope);

        let rows = sqlx::query_as::<_, ServiceRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM services
            WHERE status = 'active'
              AND next_invoice_date <= $1
              AND (CASE WHEN $2 THEN TRUE
                        WHEN $3::BIGINT IS NULL THEN FALSE
                        ELSE tenant_id = $3 END)
            ORDER BY id
            "#
        ))
        .bind(now.as_datetime())
        .bind(unrestricted)
        .bind(tenant)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(Service::try_from).collect()
    }
}

//! HTTP handlers for the billing API.
//!
//! These handlers connect axum routes to application-layer command and
//! query handlers. Every handler receives the acting principal from the
//! [`RequestPrincipal`] extractor and passes it down explicitly.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::billing::{
    CreatePaymentLinkCommand, CreatePaymentLinkError, CreatePaymentLinkHandler,
    CreateServiceCommand, CreateServiceHandler, GetInvoiceHandler, GetInvoiceQuery,
    OpenTicketCommand, OpenTicketHandler, RegisterCustomerCommand, RegisterCustomerHandler,
    RunBillingCycleCommand, RunBillingCycleHandler,
};
use crate::domain::billing::InvoiceLifecycleManager;
use crate::domain::foundation::{
    CustomerId, DomainError, ErrorCode, InvoiceId, PackageId, RouterId, Timestamp,
};
use crate::domain::tenancy::TenantScope;
use crate::ports::{
    CustomerRepository, GatewayKind, GatewayRegistry, InvoiceRepository, PaymentRepository,
    ServiceRepository, TicketRepository,
};

use super::super::{ErrorResponse, RequestPrincipal};
use super::dto::{
    CreatePaymentLinkRequest, CreateServiceRequest, CustomerResponse, InvoiceResponse,
    OpenTicketRequest, PaymentLinkResponse, RegisterCustomerRequest, ServiceResponse,
    SweepResponse, TicketResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all billing dependencies.
#[derive(Clone)]
pub struct BillingAppState {
    pub customers: Arc<dyn CustomerRepository>,
    pub services: Arc<dyn ServiceRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub tickets: Arc<dyn TicketRepository>,
    pub gateways: Arc<GatewayRegistry>,
    pub lifecycle: Arc<InvoiceLifecycleManager>,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn register_customer_handler(&self) -> RegisterCustomerHandler {
        RegisterCustomerHandler::new(self.customers.clone())
    }

    pub fn create_service_handler(&self) -> CreateServiceHandler {
        CreateServiceHandler::new(self.customers.clone(), self.services.clone())
    }

    pub fn open_ticket_handler(&self) -> OpenTicketHandler {
        OpenTicketHandler::new(self.customers.clone(), self.tickets.clone())
    }

    pub fn get_invoice_handler(&self) -> GetInvoiceHandler {
        GetInvoiceHandler::new(self.invoices.clone(), self.payments.clone())
    }

    pub fn create_payment_link_handler(&self) -> CreatePaymentLinkHandler {
        CreatePaymentLinkHandler::new(self.invoices.clone(), self.gateways.clone())
    }

    pub fn run_billing_cycle_handler(&self) -> RunBillingCycleHandler {
        RunBillingCycleHandler::new(self.lifecycle.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /customers - register a subscriber.
pub async fn register_customer(
    State(state): State<BillingAppState>,
    RequestPrincipal(principal): RequestPrincipal,
    Json(request): Json<RegisterCustomerRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.register_customer_handler();
    let customer = handler
        .handle(RegisterCustomerCommand {
            name: request.name,
            email: request.email,
            phone: request.phone,
            principal,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(CustomerResponse::from(customer))))
}

/// POST /services - subscribe a customer to a package.
pub async fn create_service(
    State(state): State<BillingAppState>,
    RequestPrincipal(principal): RequestPrincipal,
    Json(request): Json<CreateServiceRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.create_service_handler();
    let service = handler
        .handle(CreateServiceCommand {
            customer_id: CustomerId::from_i64(request.customer_id),
            package_id: PackageId::from_i64(request.package_id),
            router_id: RouterId::from_i64(request.router_id),
            monthly_fee: request.monthly_fee,
            principal,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ServiceResponse::from(service))))
}

/// POST /tickets - open a support ticket.
pub async fn open_ticket(
    State(state): State<BillingAppState>,
    RequestPrincipal(principal): RequestPrincipal,
    Json(request): Json<OpenTicketRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.open_ticket_handler();
    let ticket = handler
        .handle(OpenTicketCommand {
            customer_id: CustomerId::from_i64(request.customer_id),
            subject: request.subject,
            body: request.body,
            principal,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TicketResponse::from(ticket))))
}

/// GET /invoices/:id - scoped invoice view with payment attempts.
pub async fn get_invoice(
    State(state): State<BillingAppState>,
    RequestPrincipal(principal): RequestPrincipal,
    Path(invoice_id): Path<i64>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.get_invoice_handler();
    let view = handler
        .handle(GetInvoiceQuery {
            invoice_id: InvoiceId::from_i64(invoice_id),
            principal,
        })
        .await?;

    Ok(Json(InvoiceResponse::from(view)))
}

/// POST /invoices/:id/payment-link - request a checkout link.
pub async fn create_payment_link(
    State(state): State<BillingAppState>,
    RequestPrincipal(principal): RequestPrincipal,
    Path(invoice_id): Path<i64>,
    Json(request): Json<CreatePaymentLinkRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let gateway = match request.gateway.as_deref() {
        None => None,
        Some(raw) => Some(raw.parse::<GatewayKind>().map_err(|_| {
            BillingApiError::bad_request("UNKNOWN_GATEWAY", format!("'{}' is not a supported gateway", raw))
        })?),
    };

    let handler = state.create_payment_link_handler();
    let link = handler
        .handle(CreatePaymentLinkCommand {
            invoice_id: InvoiceId::from_i64(invoice_id),
            gateway,
            principal,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(PaymentLinkResponse::from(link))))
}

/// POST /invoices/:id/cancel - manually void an invoice.
pub async fn cancel_invoice(
    State(state): State<BillingAppState>,
    RequestPrincipal(principal): RequestPrincipal,
    Path(invoice_id): Path<i64>,
) -> Result<impl IntoResponse, BillingApiError> {
    let scope = TenantScope::for_principal(&principal);
    let invoice = state
        .lifecycle
        .cancel_invoice(&scope, InvoiceId::from_i64(invoice_id))
        .await?;

    Ok(Json(InvoiceResponse::without_payments(invoice)))
}

/// POST /billing-cycle/run - trigger one billing sweep.
pub async fn run_billing_cycle(
    State(state): State<BillingAppState>,
    RequestPrincipal(principal): RequestPrincipal,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.run_billing_cycle_handler();
    let summary = handler
        .handle(RunBillingCycleCommand {
            now: Timestamp::now(),
            principal,
        })
        .await?;

    Ok(Json(SweepResponse::from(summary)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain and gateway errors to HTTP
/// responses.
pub struct BillingApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl BillingApiError {
    fn bad_request(code: &str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse::new(code, message),
        }
    }
}

impl From<DomainError> for BillingApiError {
    fn from(err: DomainError) -> Self {
        let status = if err.code.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            match err.code {
                ErrorCode::ValidationFailed | ErrorCode::EmptyField | ErrorCode::InvalidFormat => {
                    StatusCode::BAD_REQUEST
                }
                ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
                ErrorCode::Forbidden => StatusCode::FORBIDDEN,
                ErrorCode::InvoiceAlreadyPaid | ErrorCode::InvalidStateTransition => {
                    StatusCode::CONFLICT
                }
                ErrorCode::GatewayNotConfigured => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        };

        Self {
            status,
            body: ErrorResponse::new(err.code.to_string(), err.message),
        }
    }
}

impl From<CreatePaymentLinkError> for BillingApiError {
    fn from(err: CreatePaymentLinkError) -> Self {
        match err {
            CreatePaymentLinkError::Domain(domain) => domain.into(),
            CreatePaymentLinkError::Gateway(gateway) => Self {
                status: StatusCode::BAD_GATEWAY,
                body: ErrorResponse::new("GATEWAY_ERROR", gateway.to_string()),
            },
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

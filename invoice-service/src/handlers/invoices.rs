use crate::dtos::{InvoiceListResponse, ListInvoicesParams};
use crate::extraction::{assemble, classify, extract};
use crate::middleware::UserId;
use crate::models::{InvoiceRecord, ListInvoicesFilter, User};
use crate::services::metrics::{ERRORS_TOTAL, PIPELINE_DURATION, UPLOADS_TOTAL};
use crate::startup::{AppState, MAX_UPLOAD_BYTES};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

async fn resolve_user(state: &AppState, user_id: UserId) -> Result<User, AppError> {
    state
        .db
        .get_user(user_id.0)
        .await?
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Unknown user")))
}

/// Fetch an invoice the caller is allowed to see. Membership failures are
/// indistinguishable from missing invoices on purpose.
async fn resolve_visible_invoice(
    state: &AppState,
    user: &User,
    invoice_id: Uuid,
) -> Result<InvoiceRecord, AppError> {
    let not_found = || AppError::NotFound(anyhow::anyhow!("Invoice #{} not found", invoice_id));

    let record = state
        .db
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(not_found)?;

    state
        .db
        .company_for_user(user, record.invoice.company_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(record)
}

pub async fn upload_invoice(
    State(state): State<AppState>,
    user_id: UserId,
    Path(company_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let user = resolve_user(&state, user_id).await?;
    let company = state
        .db
        .company_for_user(&user, company_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
        })?
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file uploaded")))?;

    let original_name = field.file_name().unwrap_or("unnamed.pdf").to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e)))?
        .to_vec();

    if data.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "File too large (max {}MB)",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }

    tracing::info!(
        company_id = %company.company_id,
        filename = %original_name,
        size = data.len(),
        "Invoice upload started"
    );

    let timer = PIPELINE_DURATION
        .with_label_values(&["acquisition"])
        .start_timer();
    let text = match state.acquisition.extract_text(&data).await {
        Ok(text) => text,
        Err(e) => {
            UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
            ERRORS_TOTAL.with_label_values(&["acquisition"]).inc();
            return Err(e);
        }
    };
    timer.observe_duration();

    // Classification is triage only; it never rejects an upload.
    let category = classify(&text);
    if category != "fatura" {
        tracing::warn!(category = %category, filename = %original_name, "Uploaded document does not look like a bill");
    }

    let timer = PIPELINE_DURATION
        .with_label_values(&["extraction"])
        .start_timer();
    let fields = match extract(&text) {
        Ok(fields) => fields,
        Err(e) => {
            UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
            ERRORS_TOTAL.with_label_values(&["extraction"]).inc();
            tracing::warn!(error = %e, filename = %original_name, "Document rejected");
            return Err(e.into());
        }
    };
    timer.observe_duration();

    let storage_key = format!("{}/{}.pdf", company.company_id, Uuid::new_v4());
    let aggregate = assemble(fields, &company, &user, &original_name, &storage_key);

    // The stored blob must exist before any record that points at it.
    state.storage.upload(&storage_key, data).await.map_err(|e| {
        tracing::error!(storage_key = %storage_key, error = %e, "Failed to store uploaded file");
        e
    })?;

    let record = state.db.create_invoice(&aggregate).await.map_err(|e| {
        UPLOADS_TOTAL.with_label_values(&["failed"]).inc();
        ERRORS_TOTAL.with_label_values(&["persistence"]).inc();
        e
    })?;

    UPLOADS_TOTAL.with_label_values(&["parsed"]).inc();

    tracing::info!(
        invoice_id = %record.invoice.invoice_id,
        reference_month = %record.invoice.reference_month,
        total_amount = %record.invoice.total_amount,
        "Invoice upload completed"
    );

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    user_id: UserId,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = resolve_user(&state, user_id).await?;
    let record = resolve_visible_invoice(&state, &user, invoice_id).await?;
    Ok(Json(record))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    user_id: UserId,
    Query(params): Query<ListInvoicesParams>,
) -> Result<impl IntoResponse, AppError> {
    let user = resolve_user(&state, user_id).await?;

    let requested_companies = parse_id_list(params.company_ids.as_deref())?;
    let company_ids = if user.is_admin() {
        requested_companies
    } else {
        // Non-admin listings never leave the caller's own companies.
        let member_ids = state.db.member_company_ids(user.user_id).await?;
        match requested_companies {
            Some(requested) => Some(
                requested
                    .into_iter()
                    .filter(|id| member_ids.contains(id))
                    .collect(),
            ),
            None => Some(member_ids),
        }
    };

    let user_ids = if user.is_admin() {
        parse_id_list(params.user_ids.as_deref())?
    } else {
        None
    };

    let filter = ListInvoicesFilter {
        initial_date: params.initial_date,
        final_date: params.final_date,
        min_amount: params.min_amount,
        max_amount: params.max_amount,
        company_ids,
        user_ids,
        page: params.page.unwrap_or(1).max(1),
        limit: params.limit.unwrap_or(10).clamp(1, 100),
    };

    let (list, total_items) = state.db.list_invoices(&filter).await?;
    let total_pages = (total_items + filter.limit - 1) / filter.limit;

    Ok(Json(InvoiceListResponse {
        current_page: filter.page,
        total_pages,
        total_per_page: filter.limit,
        total_items,
        list,
    }))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    user_id: UserId,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = resolve_user(&state, user_id).await?;
    resolve_visible_invoice(&state, &user, invoice_id).await?;

    state.db.soft_delete_invoice(invoice_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_invoice(
    State(state): State<AppState>,
    user_id: UserId,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = resolve_user(&state, user_id).await?;
    let record = resolve_visible_invoice(&state, &user, invoice_id).await?;

    let data = state
        .storage
        .download(&record.invoice.path)
        .await
        .map_err(|e| {
            tracing::error!(
                invoice_id = %invoice_id,
                path = %record.invoice.path,
                error = %e,
                "Failed to download stored file"
            );
            e
        })?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", record.invoice.name),
            ),
        ],
        data,
    ))
}

fn parse_id_list(raw: Option<&str>) -> Result<Option<Vec<Uuid>>, AppError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Uuid>()
                .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid id '{}'", s)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(if ids.is_empty() { None } else { Some(ids) })
}

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::payments::{
        CreatePaymentRequest, InitiatePaymentRequest, InitiatePaymentResponse, PaymentCallbackQuery,
        PaymentCompleted, PaymentList, PaymentQuery, UpdatePaymentRequest,
    },
    entity::{
        orders::{ActiveModel as OrderActive, Entity as Orders, Model as OrderModel},
        payments::{ActiveModel, Column, Entity as Payments, Model as PaymentModel},
        users::Entity as Users,
    },
    error::{AppError, AppResult, ValidationErrors},
    middleware::auth::{AuthUser, ensure_admin},
    models::{OrderStatus, Payment, PaymentMethod, PaymentState, PaymentStatus},
    notify::OrderConfirmation,
    payments::CreateRemoteOrder,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Marks the order paid and moves a pending order into processing.
async fn settle_order(txn: &DatabaseTransaction, order_id: Uuid) -> AppResult<OrderModel> {
    let order = Orders::find_by_id(order_id)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    let now = Utc::now();
    let was_pending = order.status == OrderStatus::Pending.as_str();
    let mut active: OrderActive = order.into();
    active.payment_status = Set(PaymentStatus::Paid.as_str().into());
    active.paid_at = Set(Some(now.into()));
    if was_pending {
        active.status = Set(OrderStatus::Processing.as_str().into());
    }
    active.updated_at = Set(now.into());
    Ok(active.update(txn).await?)
}

async fn find_payment(state: &AppState, id: Uuid) -> AppResult<PaymentModel> {
    Payments::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))
}

pub async fn initiate_payment(
    state: &AppState,
    user: &AuthUser,
    payload: InitiatePaymentRequest,
) -> AppResult<ApiResponse<InitiatePaymentResponse>> {
    let order = Orders::find_by_id(payload.order_id)
        .one(&state.orm)
        .await?
        .filter(|o| user.is_admin() || o.user_id == user.user_id)
        .ok_or_else(|| AppError::not_found("Order"))?;

    if order.payment_status == PaymentStatus::Paid.as_str() {
        return Err(AppError::Validation(ValidationErrors::single(
            "order_id",
            "The order has already been paid.",
        )));
    }
    if order.total_amount <= 0 {
        return Err(AppError::BadRequest(
            "Amount must be greater than zero.".into(),
        ));
    }

    let remote = state
        .payments
        .create_order(CreateRemoteOrder {
            amount: order.total_amount,
            currency: state.config.paypal.currency.clone(),
            reference_id: order.id.to_string(),
            return_url: state.config.payment_return_url.clone(),
            cancel_url: state.config.payment_cancel_url.clone(),
        })
        .await?;

    let approval_url = remote.approval_url.ok_or_else(|| {
        AppError::Upstream(format!("no approval link for remote order {}", remote.id))
    })?;

    let payment = ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        payment_method: Set(PaymentMethod::Paypal.as_str().into()),
        amount: Set(order.total_amount),
        status: Set(PaymentState::Pending.as_str().into()),
        transaction_id: Set(Some(remote.id.clone())),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(
        order_id = %order.id,
        transaction_id = %remote.id,
        status = %remote.status,
        "payment initiated"
    );
    audit::record(
        &state.pool,
        Some(user.user_id),
        "payment_initiate",
        "payments",
        serde_json::json!({ "payment_id": payment.id, "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment initiated",
        InitiatePaymentResponse {
            approval_url,
            transaction_id: remote.id,
            payment: payment.into(),
        },
        Some(Meta::empty()),
    ))
}

/// Capture after the buyer approved. Only one caller can move a payment out
/// of `pending`, so repeated redirects never capture twice.
pub async fn payment_success(
    state: &AppState,
    query: PaymentCallbackQuery,
) -> AppResult<ApiResponse<PaymentCompleted>> {
    let remote_id = query
        .remote_id()
        .ok_or_else(|| AppError::BadRequest("Missing payment token.".into()))?
        .to_string();

    let claimed: Option<Uuid> = sqlx::query_scalar(
        r#"
        UPDATE payments
        SET status = 'capturing', updated_at = now()
        WHERE transaction_id = $1 AND status = 'pending'
        RETURNING id
        "#,
    )
    .bind(&remote_id)
    .fetch_optional(&state.pool)
    .await?;

    let payment_id = match claimed {
        Some(id) => id,
        None => {
            let status: Option<String> =
                sqlx::query_scalar("SELECT status FROM payments WHERE transaction_id = $1")
                    .bind(&remote_id)
                    .fetch_optional(&state.pool)
                    .await?;
            return Err(match status.as_deref() {
                None => AppError::not_found("Payment"),
                Some("completed") => AppError::BadRequest("Payment is already completed.".into()),
                Some(other) => AppError::Conflict(format!("Payment is {other}.")),
            });
        }
    };

    let capture = match state.payments.capture_order(&remote_id).await {
        Ok(capture) if capture.status.eq_ignore_ascii_case("COMPLETED") => capture,
        outcome => {
            let reason = match outcome {
                Ok(capture) => format!("capture returned status {}", capture.status),
                Err(err) => err.to_string(),
            };
            tracing::warn!(%remote_id, %reason, "payment capture failed");
            if let Err(err) = sqlx::query(
                "UPDATE payments SET status = 'pending', updated_at = now() \
                 WHERE id = $1 AND status = 'capturing'",
            )
            .bind(payment_id)
            .execute(&state.pool)
            .await
            {
                tracing::error!(error = %err, %payment_id, "failed to release payment claim");
            }
            return Err(AppError::Upstream(reason));
        }
    };

    let settled = async {
        let txn = state.orm.begin().await?;
        let claimed = Payments::find_by_id(payment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("Payment"))?;
        let mut active: ActiveModel = claimed.into();
        active.status = Set(PaymentState::Completed.as_str().into());
        active.updated_at = Set(Utc::now().into());
        let payment = active.update(&txn).await?;
        let order = settle_order(&txn, payment.order_id).await?;
        txn.commit().await?;
        Ok::<_, AppError>((payment, order))
    }
    .await;
    let (payment, order) = match settled {
        Ok(settled) => settled,
        Err(err) => {
            // money was taken; the row stays `capturing` until an admin updates it
            tracing::error!(
                error = %err,
                %payment_id,
                %remote_id,
                capture_id = %capture.id,
                "payment captured but not recorded"
            );
            return Err(err);
        }
    };

    tracing::info!(
        %payment_id,
        order_id = %order.id,
        capture_id = %capture.id,
        "payment completed"
    );
    audit::record(
        &state.pool,
        Some(order.user_id),
        "payment_complete",
        "payments",
        serde_json::json!({ "payment_id": payment.id, "order_id": order.id }),
    )
    .await;

    notify_customer(state, &order).await;

    Ok(ApiResponse::success(
        "Payment completed successfully",
        PaymentCompleted {
            payment: payment.into(),
        },
        Some(Meta::empty()),
    ))
}

async fn notify_customer(state: &AppState, order: &OrderModel) {
    let customer = match Users::find_by_id(order.user_id).one(&state.orm).await {
        Ok(Some(user)) => user,
        Ok(None) => return,
        Err(err) => {
            tracing::warn!(error = %err, order_id = %order.id, "could not load customer");
            return;
        }
    };

    let confirmation = OrderConfirmation {
        order_id: order.id,
        email: customer.email,
        total_amount: order.total_amount,
    };
    if let Err(err) = state.notifier.order_confirmed(&confirmation).await {
        tracing::warn!(error = %err, order_id = %order.id, "order confirmation failed");
    }
}

pub async fn payment_cancel(
    state: &AppState,
    query: PaymentCallbackQuery,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if let Some(remote_id) = query.remote_id() {
        let cancelled = sqlx::query(
            "UPDATE payments SET status = 'cancelled', updated_at = now() \
             WHERE transaction_id = $1 AND status = 'pending'",
        )
        .bind(remote_id)
        .execute(&state.pool)
        .await?
        .rows_affected();
        tracing::info!(%remote_id, cancelled, "payment canceled by user");
    } else {
        tracing::info!("payment canceled by user without token");
    }

    Err(AppError::BadRequest(
        "Payment was canceled by the user.".into(),
    ))
}

pub async fn list_payments(
    state: &AppState,
    user: &AuthUser,
    query: PaymentQuery,
) -> AppResult<ApiResponse<PaymentList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(Column::Status.eq(status.as_str()));
    }
    if let Some(order_id) = query.order_id {
        condition = condition.add(Column::OrderId.eq(order_id));
    }

    let finder = Payments::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Payment::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Payments", PaymentList { items }, Some(meta)))
}

pub async fn get_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    ensure_admin(user)?;
    let payment = find_payment(state, id).await?;
    Ok(ApiResponse::success("Payment", payment.into(), Some(Meta::empty())))
}

pub async fn create_payment(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePaymentRequest,
) -> AppResult<ApiResponse<Payment>> {
    ensure_admin(user)?;

    let order = Orders::find_by_id(payload.order_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    let amount = payload.amount.unwrap_or(order.total_amount);
    if amount <= 0 {
        return Err(AppError::Validation(ValidationErrors::single(
            "amount",
            "Amount must be greater than zero.",
        )));
    }
    let transaction_id = payload
        .transaction_id
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if let Some(tx) = &transaction_id {
        let taken = Payments::find()
            .filter(Column::TransactionId.eq(tx.as_str()))
            .count(&state.orm)
            .await?;
        if taken > 0 {
            return Err(AppError::Validation(ValidationErrors::single(
                "transaction_id",
                "The transaction id has already been taken.",
            )));
        }
    }
    let status = payload.status.unwrap_or(PaymentState::Pending);

    let txn = state.orm.begin().await?;
    let payment = ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        payment_method: Set(payload.payment_method.as_str().into()),
        amount: Set(amount),
        status: Set(status.as_str().into()),
        transaction_id: Set(transaction_id),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;
    if status == PaymentState::Completed {
        settle_order(&txn, order.id).await?;
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "payment_create",
        "payments",
        serde_json::json!({ "payment_id": payment.id, "order_id": order.id, "status": status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment created",
        payment.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdatePaymentRequest,
) -> AppResult<ApiResponse<Payment>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let existing = Payments::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?;
    let mut active: ActiveModel = existing.into();
    active.status = Set(payload.status.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let payment = active.update(&txn).await?;
    if payload.status == PaymentState::Completed {
        settle_order(&txn, payment.order_id).await?;
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "payment_update",
        "payments",
        serde_json::json!({ "payment_id": payment.id, "status": payload.status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment updated",
        payment.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let payment = find_payment(state, id).await?;
    Payments::delete_by_id(payment.id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "payment_delete",
        "payments",
        serde_json::json!({ "payment_id": payment.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

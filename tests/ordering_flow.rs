mod common;

use std::sync::{Arc, atomic::Ordering};

use food_delivery_api::{
    dto::{
        auth::RegisterRequest,
        cart::AddToCartRequest,
        menus::CreateMenuRequest,
        order_items::{CreateOrderItemRequest, UpdateOrderItemRequest},
        orders::{CreateOrderRequest, OrderLine, UpdateOrderRequest},
        payments::{InitiatePaymentRequest, PaymentCallbackQuery},
        restaurants::{CreateRestaurantRequest, RestaurantQuery},
    },
    entity::{AuditLogs, audit_logs},
    error::AppError,
    middleware::auth::AuthUser,
    models::Role,
    services::{
        auth_service, cart_service, like_service, menu_service, order_item_service, order_service,
        payment_service, restaurant_service,
    },
    state::AppState,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use common::{FakeGateway, RecordingNotifier, VanishingGateway};

async fn register(state: &AppState, name: &str, role: Role) -> anyhow::Result<AuthUser> {
    let resp = auth_service::register_user(
        state,
        RegisterRequest {
            name: name.into(),
            email: format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4().simple()),
            password: "password123".into(),
            role: Some(role),
        },
    )
    .await?;
    let user = resp.data.expect("auth payload").user;
    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}

async fn register_admin(state: &AppState) -> anyhow::Result<AuthUser> {
    let user = register(state, "Admin", Role::Customer).await?;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;
    Ok(AuthUser {
        user_id: user.user_id,
        role: Role::Admin,
    })
}

/// Opens a restaurant for `owner` with one menu per `(name, price)`.
async fn open_restaurant(
    state: &AppState,
    owner: &AuthUser,
    menus: &[(&str, i64)],
) -> anyhow::Result<Vec<Uuid>> {
    let restaurant = restaurant_service::create_restaurant(
        state,
        owner,
        CreateRestaurantRequest {
            name: format!("Dar {}", Uuid::new_v4().simple()),
            address: "2 Rue du Test".into(),
            phone: "0600000001".into(),
            city: "Rabat".into(),
            user_id: None,
        },
    )
    .await?
    .data
    .expect("restaurant");

    let mut ids = Vec::with_capacity(menus.len());
    for (name, price) in menus {
        let menu = menu_service::create_menu(
            state,
            owner,
            CreateMenuRequest {
                restaurant_id: restaurant.id,
                name: (*name).into(),
                price: *price,
                description: None,
                category: None,
                image_path: None,
            },
        )
        .await?
        .data
        .expect("menu");
        ids.push(menu.id);
    }
    Ok(ids)
}

async fn order_total(state: &AppState, user: &AuthUser, order_id: Uuid) -> anyhow::Result<i64> {
    Ok(order_service::get_order(state, user, order_id)
        .await?
        .data
        .expect("order")
        .order
        .total_amount)
}

fn callback(token: &str) -> PaymentCallbackQuery {
    PaymentCallbackQuery {
        token: Some(token.to_string()),
        order_id: None,
    }
}

// Owner publishes a menu -> customer fills the cart, orders and pays through the fake gateway.
#[tokio::test]
async fn cart_order_and_payment_flow() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests.");
        return Ok(());
    };

    let gateway = Arc::new(FakeGateway::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let state = common::db_state(&database_url, gateway.clone(), notifier.clone()).await?;

    let owner = register(&state, "Owner", Role::Restaurant).await?;
    let customer = register(&state, "Customer", Role::Customer).await?;
    let stranger = register(&state, "Stranger", Role::Customer).await?;

    let restaurant = restaurant_service::create_restaurant(
        &state,
        &owner,
        CreateRestaurantRequest {
            name: format!("Dar Test {}", Uuid::new_v4().simple()),
            address: "1 Rue du Test".into(),
            phone: "0600000000".into(),
            city: "rabat".into(),
            user_id: None,
        },
    )
    .await?
    .data
    .expect("restaurant");
    assert_eq!(restaurant.city, "Rabat");

    // city filter matches the canonical name, and `%` is not a wildcard
    let city_query = |city: &str| RestaurantQuery {
        page: None,
        per_page: None,
        q: Some(restaurant.name.clone()),
        city: Some(city.into()),
    };
    let found = restaurant_service::list_restaurants(&state, city_query("RABAT"))
        .await?
        .data
        .expect("restaurants");
    assert_eq!(found.items.len(), 1);
    assert_eq!(found.items[0].id, restaurant.id);
    let wildcard = restaurant_service::list_restaurants(&state, city_query("%"))
        .await?
        .data
        .expect("restaurants");
    assert!(wildcard.items.is_empty());

    let mut menu_ids = Vec::new();
    for (name, price) in [("Tagine", 1500), ("Tea", 800)] {
        let menu = menu_service::create_menu(
            &state,
            &owner,
            CreateMenuRequest {
                restaurant_id: restaurant.id,
                name: name.into(),
                price,
                description: None,
                category: Some("Test".into()),
                image_path: Some("menus/test.jpg".into()),
            },
        )
        .await?
        .data
        .expect("menu");
        assert_eq!(
            menu.image_url.as_deref(),
            Some("http://localhost:3000/storage/menus/test.jpg")
        );
        menu_ids.push(menu.id);
    }
    let (tagine, tea) = (menu_ids[0], menu_ids[1]);

    // customers cannot manage menus
    let denied = menu_service::create_menu(
        &state,
        &customer,
        CreateMenuRequest {
            restaurant_id: restaurant.id,
            name: "Sneaky".into(),
            price: 1,
            description: None,
            category: None,
            image_path: None,
        },
    )
    .await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    // likes are idempotent
    like_service::like_menu(&state, &customer, tea).await?;
    let again = like_service::like_menu(&state, &customer, tea).await?;
    assert_eq!(again.message, "Menu item already liked");
    assert_eq!(again.data.expect("like").likes_count, 1);
    let liked = like_service::liked_menus(&state, &customer).await?.data.expect("likes");
    assert_eq!(liked.items.len(), 1);
    assert_eq!(liked.items[0].menu.id, tea);

    // adding the same menu twice increments one row
    for quantity in [2, 1] {
        cart_service::add_to_cart(
            &state,
            &customer,
            AddToCartRequest {
                menu_id: tagine,
                quantity,
            },
        )
        .await?;
    }
    let cart = cart_service::list_cart(&state, &customer).await?.data.expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(cart.total, 4500);
    let count = cart_service::cart_count(&state, &customer).await?.data.expect("count");
    assert_eq!(count.count, 1);

    // explicit order: total is Σ price × quantity
    let placed = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            items: vec![
                OrderLine {
                    menu_id: tagine,
                    quantity: 2,
                },
                OrderLine {
                    menu_id: tea,
                    quantity: 3,
                },
            ],
            user_id: None,
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(placed.order.total_amount, 1500 * 2 + 800 * 3);
    assert_eq!(placed.order.status, "pending");
    assert_eq!(placed.items.len(), 2);

    let audited = AuditLogs::find()
        .filter(audit_logs::Column::UserId.eq(customer.user_id))
        .filter(audit_logs::Column::Action.eq("order_create"))
        .count(&state.orm)
        .await?;
    assert_eq!(audited, 1);

    // missing and foreign orders are both 404
    let missing = order_service::get_order(&state, &customer, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
    let foreign = order_service::get_order(&state, &stranger, placed.order.id).await;
    assert!(matches!(foreign, Err(AppError::NotFound(_))));

    // the restaurant sees orders that contain its menus
    let seen = order_service::get_order(&state, &owner, placed.order.id).await?;
    assert_eq!(seen.data.expect("order").order.id, placed.order.id);

    // checkout drains the cart
    let checked_out = order_service::checkout(&state, &customer)
        .await?
        .data
        .expect("checkout");
    assert_eq!(checked_out.order.total_amount, 4500);
    let cart = cart_service::list_cart(&state, &customer).await?.data.expect("cart");
    assert!(cart.items.is_empty());
    let empty = order_service::checkout(&state, &customer).await;
    assert!(matches!(empty, Err(AppError::Validation(_))));

    // pay for the explicit order
    let initiated = payment_service::initiate_payment(
        &state,
        &customer,
        InitiatePaymentRequest {
            order_id: placed.order.id,
        },
    )
    .await?
    .data
    .expect("initiated");
    assert!(initiated.approval_url.contains(&initiated.transaction_id));
    assert_eq!(initiated.payment.status, "pending");
    assert_eq!(initiated.payment.amount, placed.order.total_amount);

    let completed = payment_service::payment_success(&state, callback(&initiated.transaction_id))
        .await?
        .data
        .expect("completed");
    assert_eq!(completed.payment.status, "completed");

    let order = order_service::get_order(&state, &customer, placed.order.id)
        .await?
        .data
        .expect("order")
        .order;
    assert_eq!(order.payment_status, "paid");
    assert_eq!(order.status, "processing");
    assert!(order.paid_at.is_some());

    // a second redirect must not capture again
    let replay = payment_service::payment_success(&state, callback(&initiated.transaction_id)).await;
    match replay {
        Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Payment is already completed."),
        other => panic!("expected 400, got {other:?}"),
    }
    assert_eq!(gateway.captures.load(Ordering::SeqCst), 1);

    let sent = notifier.sent.lock().expect("notifier lock");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].order_id, placed.order.id);
    drop(sent);

    // paying twice is refused
    let repay = payment_service::initiate_payment(
        &state,
        &customer,
        InitiatePaymentRequest {
            order_id: placed.order.id,
        },
    )
    .await;
    assert!(matches!(repay, Err(AppError::Validation(_))));

    // the owner moves the order along
    let shipped = order_service::update_order(
        &state,
        &owner,
        placed.order.id,
        UpdateOrderRequest {
            status: "shipped".into(),
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(shipped.order.status, "shipped");

    // ordered menus cannot be deleted
    let blocked = menu_service::delete_menu(&state, &owner, tagine).await;
    assert!(matches!(blocked, Err(AppError::Conflict(_))));

    Ok(())
}

#[tokio::test]
async fn cancel_callback_reports_bad_request() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests.");
        return Ok(());
    };

    let state = common::db_state(
        &database_url,
        Arc::new(FakeGateway::default()),
        Arc::new(RecordingNotifier::default()),
    )
    .await?;

    let result = payment_service::payment_cancel(&state, callback("UNKNOWN-TOKEN")).await;
    match result {
        Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Payment was canceled by the user."),
        other => panic!("expected 400, got {other:?}"),
    }

    let unknown = payment_service::payment_success(&state, callback("UNKNOWN-TOKEN")).await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn order_item_changes_recompute_the_total() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests.");
        return Ok(());
    };

    let state = common::db_state(
        &database_url,
        Arc::new(FakeGateway::default()),
        Arc::new(RecordingNotifier::default()),
    )
    .await?;

    let admin = register_admin(&state).await?;
    let owner = register(&state, "Owner", Role::Restaurant).await?;
    let customer = register(&state, "Customer", Role::Customer).await?;
    let menus = open_restaurant(&state, &owner, &[("Harira", 1500), ("Msemen", 800)]).await?;
    let (harira, msemen) = (menus[0], menus[1]);

    let order = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            items: vec![OrderLine {
                menu_id: harira,
                quantity: 1,
            }],
            user_id: None,
        },
    )
    .await?
    .data
    .expect("order")
    .order;
    assert_eq!(order.total_amount, 1500);

    // only admins manage order items
    let denied = order_item_service::create_order_item(
        &state,
        &customer,
        CreateOrderItemRequest {
            order_id: order.id,
            menu_id: msemen,
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let item = order_item_service::create_order_item(
        &state,
        &admin,
        CreateOrderItemRequest {
            order_id: order.id,
            menu_id: msemen,
            quantity: 2,
        },
    )
    .await?
    .data
    .expect("order item");
    assert_eq!(item.price, 800);
    assert_eq!(order_total(&state, &customer, order.id).await?, 1500 + 800 * 2);

    order_item_service::update_order_item(
        &state,
        &admin,
        item.id,
        UpdateOrderItemRequest { quantity: 1 },
    )
    .await?;
    assert_eq!(order_total(&state, &customer, order.id).await?, 1500 + 800);

    let zero = order_item_service::update_order_item(
        &state,
        &admin,
        item.id,
        UpdateOrderItemRequest { quantity: 0 },
    )
    .await;
    assert!(matches!(zero, Err(AppError::Validation(_))));

    order_item_service::delete_order_item(&state, &admin, item.id).await?;
    assert_eq!(order_total(&state, &customer, order.id).await?, 1500);
    let gone = order_item_service::get_order_item(&state, &admin, item.id).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn failed_capture_releases_the_payment_for_retry() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests.");
        return Ok(());
    };

    let gateway = Arc::new(FakeGateway::failing(1));
    let notifier = Arc::new(RecordingNotifier::default());
    let state = common::db_state(&database_url, gateway.clone(), notifier.clone()).await?;

    let admin = register_admin(&state).await?;
    let owner = register(&state, "Owner", Role::Restaurant).await?;
    let customer = register(&state, "Customer", Role::Customer).await?;
    let menus = open_restaurant(&state, &owner, &[("Pastilla", 4200)]).await?;

    let order = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            items: vec![OrderLine {
                menu_id: menus[0],
                quantity: 1,
            }],
            user_id: None,
        },
    )
    .await?
    .data
    .expect("order")
    .order;

    let initiated = payment_service::initiate_payment(
        &state,
        &customer,
        InitiatePaymentRequest { order_id: order.id },
    )
    .await?
    .data
    .expect("initiated");

    // processor declines: 502 and the payment is pending again
    let declined = payment_service::payment_success(&state, callback(&initiated.transaction_id)).await;
    assert!(matches!(declined, Err(AppError::Upstream(_))));
    let payment = payment_service::get_payment(&state, &admin, initiated.payment.id)
        .await?
        .data
        .expect("payment");
    assert_eq!(payment.status, "pending");
    let order_now = order_service::get_order(&state, &customer, order.id)
        .await?
        .data
        .expect("order")
        .order;
    assert_eq!(order_now.payment_status, "unpaid");
    assert!(notifier.sent.lock().expect("notifier lock").is_empty());

    // the buyer retries and the second capture goes through
    let completed = payment_service::payment_success(&state, callback(&initiated.transaction_id))
        .await?
        .data
        .expect("completed");
    assert_eq!(completed.payment.status, "completed");
    assert_eq!(gateway.captures.load(Ordering::SeqCst), 2);
    let order_now = order_service::get_order(&state, &customer, order.id)
        .await?
        .data
        .expect("order")
        .order;
    assert_eq!(order_now.payment_status, "paid");
    assert_eq!(order_now.status, "processing");

    Ok(())
}

#[tokio::test]
async fn capture_that_cannot_be_recorded_is_reported() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests.");
        return Ok(());
    };

    let mut state = common::db_state(
        &database_url,
        Arc::new(FakeGateway::default()),
        Arc::new(RecordingNotifier::default()),
    )
    .await?;
    let gateway = Arc::new(VanishingGateway {
        inner: FakeGateway::default(),
        pool: state.pool.clone(),
    });
    state.payments = gateway.clone();

    let owner = register(&state, "Owner", Role::Restaurant).await?;
    let customer = register(&state, "Customer", Role::Customer).await?;
    let menus = open_restaurant(&state, &owner, &[("Rfissa", 3000)]).await?;
    let order = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            items: vec![OrderLine {
                menu_id: menus[0],
                quantity: 1,
            }],
            user_id: None,
        },
    )
    .await?
    .data
    .expect("order")
    .order;
    let initiated = payment_service::initiate_payment(
        &state,
        &customer,
        InitiatePaymentRequest { order_id: order.id },
    )
    .await?
    .data
    .expect("initiated");

    let result = payment_service::payment_success(&state, callback(&initiated.transaction_id)).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(gateway.inner.captures.load(Ordering::SeqCst), 1);

    // the order is left untouched for manual reconciliation
    let order_now = order_service::get_order(&state, &customer, order.id)
        .await?
        .data
        .expect("order")
        .order;
    assert_eq!(order_now.payment_status, "unpaid");
    assert_eq!(order_now.status, "pending");

    Ok(())
}

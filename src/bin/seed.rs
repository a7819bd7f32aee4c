use food_delivery_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    models::Role,
    services::auth_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "Admin", "admin@example.com", "admin123", Role::Admin).await?;
    let owner_id = ensure_user(
        &pool,
        "Dar Tajine Owner",
        "owner@example.com",
        "owner1234",
        Role::Restaurant,
    )
    .await?;
    let customer_id = ensure_user(
        &pool,
        "Customer",
        "customer@example.com",
        "customer123",
        Role::Customer,
    )
    .await?;

    let city = config
        .allowed_cities
        .first()
        .cloned()
        .unwrap_or_else(|| "Rabat".to_string());
    let restaurant_id = ensure_restaurant(&pool, owner_id, "Dar Tajine", &city).await?;
    seed_menus(&pool, restaurant_id).await?;

    println!(
        "Seed completed. Admin ID: {admin_id}, Owner ID: {owner_id}, Customer ID: {customer_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (id, name, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(id)
}

async fn ensure_restaurant(
    pool: &sqlx::PgPool,
    owner_id: Uuid,
    name: &str,
    city: &str,
) -> anyhow::Result<Uuid> {
    let existing: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM restaurants WHERE user_id = $1 AND name = $2")
            .bind(owner_id)
            .bind(name)
            .fetch_optional(pool)
            .await?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO restaurants (user_id, name, address, phone, city)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(owner_id)
    .bind(name)
    .bind("12 Avenue Mohammed V")
    .bind("0600000000")
    .bind(city)
    .fetch_one(pool)
    .await?;

    println!("Seeded restaurant {name}");
    Ok(id)
}

async fn seed_menus(pool: &sqlx::PgPool, restaurant_id: Uuid) -> anyhow::Result<()> {
    let menus = vec![
        ("Chicken Tagine", "Preserved lemon and olives", 8500, "Tagine"),
        ("Lamb Couscous", "Seven vegetables", 9500, "Couscous"),
        ("Harira", "Tomato and lentil soup", 2500, "Soup"),
        ("Mint Tea", "Served hot", 1000, "Drinks"),
    ];

    for (name, desc, price, category) in menus {
        sqlx::query(
            r#"
            INSERT INTO menus (restaurant_id, name, price, description, category)
            SELECT $1, $2, $3, $4, $5
            WHERE NOT EXISTS (
                SELECT 1 FROM menus WHERE restaurant_id = $1 AND name = $2
            )
            "#,
        )
        .bind(restaurant_id)
        .bind(name)
        .bind(price as i64)
        .bind(desc)
        .bind(category)
        .execute(pool)
        .await?;
    }

    println!("Seeded menus");
    Ok(())
}

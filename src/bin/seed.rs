use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use storefront_settlement::{
    config::AppConfig,
    db::{DbPool, create_pool, orm_from_pool, run_migrations},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&orm_from_pool(pool.clone())).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin", "email").await?;
    let email_id = ensure_user(&pool, "email@example.com", "user", "email").await?;
    let sms_id = ensure_user(&pool, "sms@example.com", "user", "sms").await?;
    let push_id = ensure_user(&pool, "push@example.com", "user", "push").await?;
    seed_products(&pool).await?;

    println!(
        "Seed completed. Admin ID: {admin_id}, email user: {email_id}, sms user: {sms_id}, push user: {push_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &DbPool,
    email: &str,
    role: &str,
    notification_type: &str,
) -> anyhow::Result<Uuid> {
    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, role, notification_type)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE
            SET role = EXCLUDED.role, notification_type = EXCLUDED.notification_type
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(role)
    .bind(notification_type)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role}, notifications={notification_type})");
    Ok(user_id)
}

async fn seed_products(pool: &DbPool) -> anyhow::Result<()> {
    let products: [(&str, Decimal, Decimal); 4] = [
        ("Chess", dec!(19.99), dec!(0)),
        ("Go", dec!(34.50), dec!(0.10)),
        ("Backgammon", dec!(24.00), dec!(0)),
        ("Mahjong", dec!(59.90), dec!(0.25)),
    ];

    for (name, price, discount) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price, discount)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(price)
        .bind(discount)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

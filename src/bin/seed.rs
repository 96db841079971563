//! One-shot seeding for a fresh install: the admin account, the service
//! catalogue and a default open schedule for the next 90 days (Tue-Sat,
//! 10:00-13:00 and 14:00-20:00, 30-minute slots; Sun/Mon disabled so the
//! admin sees them as explicitly closed).
//!
//! Usage: `seed` with DATABASE_URL set; SEED_ADMIN_EMAIL / SEED_ADMIN_PASSWORD
//! override the defaults.

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHasher};
use chrono::{Datelike, Duration, Weekday};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    let email =
        std::env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());
    let password = std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());

    let existing: Option<Uuid> =
        sqlx::query_scalar("SELECT admin_user_id FROM admin_user WHERE email = $1")
            .bind(&email)
            .fetch_optional(&pool)
            .await?;
    if existing.is_none() {
        println!("Creating admin user: {email}");
        let salt = SaltString::generate(&mut OsRng);
        let phc = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("argon2 hash error: {e}"))?
            .to_string();
        sqlx::query("INSERT INTO admin_user (email, password_hash) VALUES ($1, $2)")
            .bind(&email)
            .bind(&phc)
            .execute(&pool)
            .await?;
    } else {
        println!("Admin user already exists");
    }

    let service_count: i64 = sqlx::query_scalar("SELECT count(*) FROM service")
        .fetch_one(&pool)
        .await?;
    if service_count == 0 {
        println!("Seeding services...");
        let services: [(&str, i32, f64); 5] = [
            ("Corte Mujer", 60, 15000.0),
            ("Corte Hombre", 30, 10000.0),
            ("Color", 120, 35000.0),
            ("Brushing", 45, 8000.0),
            ("Nutrición", 45, 12000.0),
        ];
        for (name, duration_min, price) in services {
            sqlx::query("INSERT INTO service (name, duration_min, price) VALUES ($1, $2, $3)")
                .bind(name)
                .bind(duration_min)
                .bind(price)
                .execute(&pool)
                .await?;
        }
    } else {
        println!("Services already exist.");
    }

    let start_date = chrono::Utc::now().date_naive();
    let mut seeded = 0;
    for i in 0..90i64 {
        let date = start_date + Duration::days(i);
        let exists: Option<Uuid> = sqlx::query_scalar(
            "SELECT availability_day_id FROM availability_day WHERE date = $1 AND staff_id IS NULL",
        )
        .bind(date)
        .fetch_optional(&pool)
        .await?;
        if exists.is_some() {
            continue;
        }

        let closed = matches!(date.weekday(), Weekday::Sun | Weekday::Mon);
        let day_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO availability_day (date, enabled, slot_size_min, staff_id)
            VALUES ($1, $2, 30, NULL)
            RETURNING availability_day_id
            "#,
        )
        .bind(date)
        .bind(!closed)
        .fetch_one(&pool)
        .await?;

        if !closed {
            for (position, (start, end)) in
                [("10:00", "13:00"), ("14:00", "20:00")].into_iter().enumerate()
            {
                sqlx::query(
                    r#"
                    INSERT INTO availability_range (availability_day_id, position, start_time, end_time)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(day_id)
                .bind(position as i32)
                .bind(start)
                .bind(end)
                .execute(&pool)
                .await?;
            }
        }
        seeded += 1;
    }
    println!("Seeded {seeded} new days.");

    Ok(())
}

//! Seed script for development: populates a fresh database with sample data
//! and prints bearer tokens for the seeded users.
//!
//! Usage: `cargo run --bin seed`
//!
//! Requires `DATABASE_URL` and `JWT_SECRET` environment variables (reads .env).

use anyhow::Context;
use chrono::{Duration, Utc};
use learnhub::config::AppConfig;
use learnhub::db;
use learnhub::services::auth;
use sqlx::PgPool;
use uuid::Uuid;

const ADMIN_EMAIL: &str = "admin@learnhub.local";
const MEMBER_EMAIL: &str = "learner@learnhub.local";

struct SeedTrack {
    slug: &'static str,
    title: &'static str,
    description: &'static str,
    published_days_ago: i64,
    sections: &'static [(&'static str, &'static [&'static str])],
}

const TRACKS: &[SeedTrack] = &[
    SeedTrack {
        slug: "rust-fundamentals",
        title: "Rust Fundamentals",
        description: "Ownership, borrowing and the type system for beginners.",
        published_days_ago: 90,
        sections: &[
            ("Getting set up", &["Installing the toolchain", "Hello, Cargo"]),
            ("Ownership", &["Moves and copies", "Borrowing", "Lifetimes"]),
        ],
    },
    SeedTrack {
        slug: "async-services",
        title: "Async Services with Tokio",
        description: "Build network services with tasks, channels and timeouts.",
        published_days_ago: 3,
        sections: &[("Runtime", &["Tasks", "Channels", "Select and timeouts"])],
    },
    SeedTrack {
        slug: "postgres-in-practice",
        title: "Postgres in Practice",
        description: "Schema design, indexing and transactions.",
        published_days_ago: 20,
        sections: &[("Schema", &["Tables and keys", "Indexes"])],
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("DATABASE_URL and JWT_SECRET must be set")?;
    let pool = db::create_pool(&config.database_url, 5).await?;
    db::run_migrations(&pool).await?;

    println!("=== LearnHub Seed Script ===");

    let admin_id = seed_user(&pool, ADMIN_EMAIL, "Platform Admin", "Admin").await?;
    let member_id = seed_user(&pool, MEMBER_EMAIL, "Sample Learner", "Member").await?;
    let track_ids = seed_tracks(&pool).await?;
    seed_progress(&pool, member_id, &track_ids).await?;
    seed_referrals(&pool, member_id).await?;

    println!("\n=== Seed complete! ===");
    for (label, email) in [("admin", ADMIN_EMAIL), ("member", MEMBER_EMAIL)] {
        let user = auth::find_user_by_email(&pool, email).await?;
        let token = auth::issue_access_token(
            &user,
            &config.jwt_secret,
            config.jwt_access_token_expiry_secs,
        )?;
        println!("{label} token ({email}): {}", token.access_token);
    }
    println!("admin id: {admin_id}");

    Ok(())
}

async fn seed_user(
    pool: &PgPool,
    email: &str,
    display_name: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO users (email, display_name, role)
        VALUES ($1, $2, $3::user_role)
        ON CONFLICT (email) DO UPDATE SET display_name = EXCLUDED.display_name
        RETURNING id
        "#,
    )
    .bind(email)
    .bind(display_name)
    .bind(role)
    .fetch_one(pool)
    .await?;
    println!("[done] User {email} ({role})");
    Ok(id)
}

async fn seed_tracks(pool: &PgPool) -> anyhow::Result<Vec<Uuid>> {
    let mut ids = Vec::with_capacity(TRACKS.len());

    for track in TRACKS {
        if let Some(id) = sqlx::query_scalar::<_, Uuid>("SELECT id FROM tracks WHERE slug = $1")
            .bind(track.slug)
            .fetch_optional(pool)
            .await?
        {
            println!("[skip] Track {} already exists", track.slug);
            ids.push(id);
            continue;
        }

        let mut tx = pool.begin().await?;
        let track_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO tracks (slug, title, description, is_published, published_at)
            VALUES ($1, $2, $3, true, $4)
            RETURNING id
            "#,
        )
        .bind(track.slug)
        .bind(track.title)
        .bind(track.description)
        .bind(Utc::now() - Duration::days(track.published_days_ago))
        .fetch_one(&mut *tx)
        .await?;

        let mut lesson_position = 0;
        for (section_position, (section_title, lessons)) in track.sections.iter().enumerate() {
            let section_id = sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO track_sections (track_id, title, position) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(track_id)
            .bind(*section_title)
            .bind(section_position as i32)
            .fetch_one(&mut *tx)
            .await?;

            for lesson_title in lessons.iter() {
                lesson_position += 1;
                sqlx::query(
                    r#"
                    INSERT INTO lessons (track_id, section_id, title, position, duration_minutes)
                    VALUES ($1, $2, $3, $4, 15)
                    "#,
                )
                .bind(track_id)
                .bind(section_id)
                .bind(*lesson_title)
                .bind(lesson_position)
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;

        println!("[done] Track {} with {lesson_position} lessons", track.slug);
        ids.push(track_id);
    }

    Ok(ids)
}

/// Enroll the member in the first track and complete a lesson per day for a short streak.
async fn seed_progress(pool: &PgPool, member_id: Uuid, track_ids: &[Uuid]) -> anyhow::Result<()> {
    let Some(&track_id) = track_ids.first() else {
        return Ok(());
    };

    let inserted = sqlx::query(
        r#"
        INSERT INTO enrollments (user_id, track_id, started_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, track_id) DO NOTHING
        "#,
    )
    .bind(member_id)
    .bind(track_id)
    .bind(Utc::now() - Duration::days(12))
    .execute(pool)
    .await?
    .rows_affected();

    if inserted == 0 {
        println!("[skip] Member progress already seeded");
        return Ok(());
    }

    let lesson_ids = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM lessons WHERE track_id = $1 ORDER BY position LIMIT 3",
    )
    .bind(track_id)
    .fetch_all(pool)
    .await?;

    for (days_ago, lesson_id) in lesson_ids.iter().rev().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO lesson_progress (user_id, lesson_id, completed_at, time_spent_ms)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, lesson_id) DO NOTHING
            "#,
        )
        .bind(member_id)
        .bind(lesson_id)
        .bind(Utc::now() - Duration::days(days_ago as i64))
        .bind(600_000i64)
        .execute(pool)
        .await?;
    }

    let quiz_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO quizzes (lesson_id, title) VALUES ($1, 'Ownership check') RETURNING id",
    )
    .bind(lesson_ids.first().copied())
    .fetch_one(pool)
    .await?;

    for (score, passed) in [(55, false), (80, true), (92, true)] {
        sqlx::query(
            "INSERT INTO quiz_attempts (user_id, quiz_id, score_pct, passed) VALUES ($1, $2, $3, $4)",
        )
        .bind(member_id)
        .bind(quiz_id)
        .bind(score)
        .bind(passed)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        UPDATE enrollments
        SET progress_pct = (
            SELECT ROUND(100.0 * COUNT(lp.id) / NULLIF((SELECT COUNT(*) FROM lessons WHERE track_id = $2), 0))::int
            FROM lesson_progress lp
            INNER JOIN lessons l ON l.id = lp.lesson_id
            WHERE lp.user_id = $1 AND l.track_id = $2 AND lp.completed_at IS NOT NULL
        )
        WHERE user_id = $1 AND track_id = $2
        "#,
    )
    .bind(member_id)
    .bind(track_id)
    .execute(pool)
    .await?;

    println!("[done] Member enrolled with {} completed lessons", lesson_ids.len());
    Ok(())
}

/// Referred users for the member: three payable ($10, $20, $15), one qualified, one pending.
async fn seed_referrals(pool: &PgPool, referrer_id: Uuid) -> anyhow::Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM referrals WHERE referrer_id = $1")
        .bind(referrer_id)
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        println!("[skip] Referrals already exist ({existing})");
        return Ok(());
    }

    let referrals = [
        ("PAYABLE", 1000i64, 60i64),
        ("PAYABLE", 2000, 55),
        ("PAYABLE", 1500, 45),
        ("QUALIFIED", 1000, 10),
        ("PENDING", 0, 2),
    ];

    for (n, (status, cents, days_ago)) in referrals.into_iter().enumerate() {
        let referred_id = seed_user(
            pool,
            &format!("referred{n}@learnhub.local"),
            &format!("Referred Learner {n}"),
            "Member",
        )
        .await?;
        let signed_up_at = Utc::now() - Duration::days(days_ago);
        let qualified_at = (status != "PENDING").then(|| signed_up_at + Duration::days(1));

        sqlx::query(
            r#"
            INSERT INTO referrals (referrer_id, referred_user_id, status, commission_cents,
                                   signed_up_at, qualified_at)
            VALUES ($1, $2, $3::referral_status, $4, $5, $6)
            "#,
        )
        .bind(referrer_id)
        .bind(referred_id)
        .bind(status)
        .bind(cents)
        .bind(signed_up_at)
        .bind(qualified_at)
        .execute(pool)
        .await?;
    }

    println!("[done] Created {} referrals", referrals.len());
    Ok(())
}

//! Track completion certificates.
//!
//! A certificate is issued once per user and track, when the track's derived
//! progress reaches 100. Its code is a short, deterministic digest of the
//! holder, the track and the issue time.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::learning::{Certificate, CertificateWithTrack};

const CODE_PREFIX: &str = "LH-";
const CODE_HEX_LEN: usize = 12;

/// Compute the public verification code for a certificate.
pub fn generate_code(user_id: Uuid, track_id: Uuid, issued_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(
        format!(
            "CERT:{user_id}:{track_id}:{}",
            issued_at.to_rfc3339_opts(SecondsFormat::Micros, true)
        )
        .as_bytes(),
    );
    let digest = hex::encode(hasher.finalize());
    format!("{CODE_PREFIX}{}", digest[..CODE_HEX_LEN].to_uppercase())
}

/// Issue a certificate inside an open transaction, or return the existing one.
pub async fn issue(
    conn: &mut PgConnection,
    user_id: Uuid,
    track_id: Uuid,
    issued_at: DateTime<Utc>,
) -> Result<Certificate, AppError> {
    if let Some(existing) = sqlx::query_as::<_, Certificate>(
        "SELECT * FROM certificates WHERE user_id = $1 AND track_id = $2",
    )
    .bind(user_id)
    .bind(track_id)
    .fetch_optional(&mut *conn)
    .await?
    {
        return Ok(existing);
    }

    let code = generate_code(user_id, track_id, issued_at);
    let certificate = sqlx::query_as::<_, Certificate>(
        r#"
        INSERT INTO certificates (user_id, track_id, code, issued_at)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(track_id)
    .bind(&code)
    .bind(issued_at)
    .fetch_one(&mut *conn)
    .await?;

    tracing::info!(%user_id, %track_id, code = %certificate.code, "Issued certificate");
    Ok(certificate)
}

/// Certificates held by a user, newest first.
pub async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<CertificateWithTrack>, AppError> {
    let rows = sqlx::query_as::<_, CertificateWithTrack>(
        r#"
        SELECT c.id, c.track_id, t.title AS track_title, c.code, c.issued_at
        FROM certificates c
        INNER JOIN tracks t ON t.id = c.track_id
        WHERE c.user_id = $1
        ORDER BY c.issued_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Look up a certificate by its public code.
pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<CertificateWithTrack, AppError> {
    sqlx::query_as::<_, CertificateWithTrack>(
        r#"
        SELECT c.id, c.track_id, t.title AS track_title, c.code, c.issued_at
        FROM certificates c
        INNER JOIN tracks t ON t.id = c.track_id
        WHERE c.code = $1
        "#,
    )
    .bind(code.trim().to_uppercase())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Certificate '{code}' not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn issued() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn same_inputs_same_code() {
        let user = Uuid::new_v4();
        let track = Uuid::new_v4();
        assert_eq!(
            generate_code(user, track, issued()),
            generate_code(user, track, issued())
        );
    }

    #[test]
    fn different_track_different_code() {
        let user = Uuid::new_v4();
        assert_ne!(
            generate_code(user, Uuid::new_v4(), issued()),
            generate_code(user, Uuid::new_v4(), issued())
        );
    }

    #[test]
    fn code_is_prefixed_uppercase_hex() {
        let code = generate_code(Uuid::nil(), Uuid::nil(), issued());
        assert!(code.starts_with("LH-"));
        let hex_part = &code[3..];
        assert_eq!(hex_part.len(), 12);
        assert!(hex_part
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }
}

//! Learner-side records: enrollments, lesson progress, certificates, quiz attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// -- Enrollment --

/// A user's registration in a track. `progress_pct` is a cache of the
/// lesson-progress count and is rewritten on every completion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub track_id: Uuid,
    pub progress_pct: i32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

// -- Lesson Progress --

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LessonProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_spent_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CompleteLesson {
    #[validate(range(min = 0, max = 86_400_000))]
    pub time_spent_ms: Option<i64>,
}

// -- Certificates --

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Certificate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub track_id: Uuid,
    pub code: String,
    pub issued_at: DateTime<Utc>,
}

/// Certificate joined with its track title for display.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CertificateWithTrack {
    pub id: Uuid,
    pub track_id: Uuid,
    pub track_title: String,
    pub code: String,
    pub issued_at: DateTime<Utc>,
}

// -- Quiz Attempts --

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub score_pct: i32,
    pub passed: bool,
    pub attempted_at: DateTime<Utc>,
}

//! Track catalog: tracks, their ordered sections, and lessons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Track {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lightweight track row for catalog listings.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrackSummary {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub lesson_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrackSection {
    pub id: Uuid,
    pub track_id: Uuid,
    pub title: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    pub id: Uuid,
    pub track_id: Uuid,
    pub section_id: Option<Uuid>,
    pub title: String,
    pub position: i32,
    pub duration_minutes: Option<i32>,
}

/// A section with its lessons in display order.
#[derive(Debug, Clone, Serialize)]
pub struct SectionWithLessons {
    #[serde(flatten)]
    pub section: TrackSection,
    pub lessons: Vec<Lesson>,
}

/// Full track view: sections in order, plus lessons that belong to no section.
#[derive(Debug, Clone, Serialize)]
pub struct TrackDetail {
    #[serde(flatten)]
    pub track: Track,
    pub sections: Vec<SectionWithLessons>,
    pub unsectioned_lessons: Vec<Lesson>,
    pub total_lessons: usize,
}

impl TrackDetail {
    /// Group lessons under their sections. Both inputs are expected in position order.
    pub fn assemble(track: Track, sections: Vec<TrackSection>, lessons: Vec<Lesson>) -> Self {
        let total_lessons = lessons.len();
        let mut grouped: Vec<SectionWithLessons> = sections
            .into_iter()
            .map(|section| SectionWithLessons {
                section,
                lessons: Vec::new(),
            })
            .collect();
        let mut unsectioned_lessons = Vec::new();

        for lesson in lessons {
            let slot = lesson
                .section_id
                .and_then(|sid| grouped.iter_mut().find(|s| s.section.id == sid));
            match slot {
                Some(section) => section.lessons.push(lesson),
                None => unsectioned_lessons.push(lesson),
            }
        }

        Self {
            track,
            sections: grouped,
            unsectioned_lessons,
            total_lessons,
        }
    }
}

/// Published track the learner might enroll in next.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecommendationCandidate {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Track {
        Track {
            id: Uuid::new_v4(),
            slug: "options-basics".to_string(),
            title: "Options Basics".to_string(),
            description: None,
            is_published: true,
            published_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn lesson(track_id: Uuid, section_id: Option<Uuid>, position: i32) -> Lesson {
        Lesson {
            id: Uuid::new_v4(),
            track_id,
            section_id,
            title: format!("Lesson {position}"),
            position,
            duration_minutes: Some(10),
        }
    }

    #[test]
    fn assemble_groups_lessons_by_section_in_order() {
        let t = track();
        let s1 = TrackSection {
            id: Uuid::new_v4(),
            track_id: t.id,
            title: "Intro".to_string(),
            position: 0,
        };
        let s2 = TrackSection {
            id: Uuid::new_v4(),
            track_id: t.id,
            title: "Greeks".to_string(),
            position: 1,
        };
        let lessons = vec![
            lesson(t.id, Some(s1.id), 0),
            lesson(t.id, Some(s2.id), 1),
            lesson(t.id, Some(s1.id), 2),
            lesson(t.id, None, 3),
        ];

        let detail = TrackDetail::assemble(t, vec![s1, s2], lessons);
        assert_eq!(detail.total_lessons, 4);
        assert_eq!(detail.sections[0].lessons.len(), 2);
        assert_eq!(detail.sections[0].lessons[1].position, 2);
        assert_eq!(detail.sections[1].lessons.len(), 1);
        assert_eq!(detail.unsectioned_lessons.len(), 1);
    }

    #[test]
    fn lesson_with_unknown_section_is_unsectioned() {
        let t = track();
        let lessons = vec![lesson(t.id, Some(Uuid::new_v4()), 0)];
        let detail = TrackDetail::assemble(t, Vec::new(), lessons);
        assert_eq!(detail.unsectioned_lessons.len(), 1);
    }
}

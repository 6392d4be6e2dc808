//! Points, streaks, levels and badges

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use crate::model::{Badge, Gamification, NotificationType, PointsAward};
use crate::Result;
use super::notify::insert_notification;
use super::sqlite::SqliteStore;

/// Points per level
pub const POINTS_PER_LEVEL: i64 = 100;

#[derive(Debug, Clone, Copy)]
enum Threshold {
    Points(i64),
    Streak(i64),
    Level(i64),
}

struct BadgeRule {
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    threshold: Threshold,
}

const BADGE_RULES: &[BadgeRule] = &[
    BadgeRule { name: "Century", description: "Earned 100 points", icon: "🏆", threshold: Threshold::Points(100) },
    BadgeRule { name: "Champion", description: "Earned 500 points", icon: "🏅", threshold: Threshold::Points(500) },
    BadgeRule { name: "Legend", description: "Earned 1000 points", icon: "👑", threshold: Threshold::Points(1000) },
    BadgeRule { name: "Week Warrior", description: "7-day learning streak", icon: "🔥", threshold: Threshold::Streak(7) },
    BadgeRule { name: "Month Master", description: "30-day learning streak", icon: "⭐", threshold: Threshold::Streak(30) },
    BadgeRule { name: "Rising Star", description: "Reached Level 5", icon: "🌟", threshold: Threshold::Level(5) },
    BadgeRule { name: "Superstar", description: "Reached Level 10", icon: "💫", threshold: Threshold::Level(10) },
];

/// Level reached with `total_points`
pub fn level_for(total_points: i64) -> i64 {
    total_points.div_euclid(POINTS_PER_LEVEL) + 1
}

/// Streak after activity on `today`, given the previous activity date
pub fn next_streak(last_activity: Option<NaiveDate>, current: i64, today: NaiveDate) -> i64 {
    match last_activity {
        None => 1,
        Some(last) => match (today - last).num_days() {
            1 => current + 1,
            d if d > 1 => 1,
            _ => current,
        },
    }
}

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Add points inside the caller's transaction.
///
/// Returns `None` when the user has no gamification row.
pub(super) fn award_points(
    conn: &Connection,
    student_id: i64,
    points: i64,
    reason: &str,
    today: NaiveDate,
) -> Result<Option<PointsAward>> {
    let row: Option<(Option<NaiveDate>, i64, i64, i64)> = conn
        .query_row(
            r#"
            SELECT last_activity_date, current_streak, longest_streak, total_points
            FROM student_gamification WHERE student_id = ?1
            "#,
            [student_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?;

    let Some((last_activity, current_streak, longest_streak, total_points)) = row else {
        tracing::debug!("No gamification record for user {}, skipping {} points", student_id, points);
        return Ok(None);
    };

    let current_streak = next_streak(last_activity, current_streak, today);
    let longest_streak = longest_streak.max(current_streak);
    let total_points = total_points + points;
    let level = level_for(total_points);

    conn.execute(
        r#"
        UPDATE student_gamification
        SET total_points = ?1, current_streak = ?2, longest_streak = ?3,
            last_activity_date = ?4, level = ?5, updated_at = CURRENT_TIMESTAMP
        WHERE student_id = ?6
        "#,
        params![total_points, current_streak, longest_streak, today, level, student_id],
    )?;
    tracing::debug!("Awarded {} points to student {} ({})", points, student_id, reason);

    let new_badges = award_badges(conn, student_id, total_points, current_streak, level)?;

    Ok(Some(PointsAward { total_points, current_streak, longest_streak, level, new_badges }))
}

fn award_badges(conn: &Connection, student_id: i64, total_points: i64, streak: i64, level: i64) -> Result<Vec<String>> {
    let mut earned = Vec::new();
    for rule in BADGE_RULES {
        let reached = match rule.threshold {
            Threshold::Points(n) => total_points >= n,
            Threshold::Streak(n) => streak >= n,
            Threshold::Level(n) => level >= n,
        };
        if !reached || has_badge(conn, student_id, rule.name)? {
            continue;
        }

        conn.execute(
            "INSERT INTO badges (student_id, badge_name, badge_description, badge_icon) VALUES (?1, ?2, ?3, ?4)",
            params![student_id, rule.name, rule.description, rule.icon],
        )?;
        insert_notification(
            conn,
            student_id,
            "New Badge Earned!",
            &format!("Congratulations! You earned the '{}' badge: {}", rule.name, rule.description),
            NotificationType::Achievement,
        )?;
        tracing::info!("Student {} earned badge {}", student_id, rule.name);
        earned.push(rule.name.to_string());
    }
    Ok(earned)
}

fn has_badge(conn: &Connection, student_id: i64, name: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM badges WHERE student_id = ?1 AND badge_name = ?2",
            params![student_id, name],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

impl SqliteStore {
    /// Add points for activity today
    pub fn add_points(&self, student_id: i64, points: i64, reason: &str) -> Result<Option<PointsAward>> {
        self.add_points_on(student_id, points, reason, today())
    }

    /// Add points for activity on a given day
    pub fn add_points_on(
        &self,
        student_id: i64,
        points: i64,
        reason: &str,
        day: NaiveDate,
    ) -> Result<Option<PointsAward>> {
        let tx = self.immediate()?;
        let award = award_points(&tx, student_id, points, reason, day)?;
        tx.commit()?;
        Ok(award)
    }

    pub fn gamification(&self, student_id: i64) -> Result<Option<Gamification>> {
        self.conn
            .query_row(
                r#"
                SELECT id, student_id, total_points, current_streak, longest_streak,
                       last_activity_date, level, created_at, updated_at
                FROM student_gamification WHERE student_id = ?1
                "#,
                [student_id],
                row_to_gamification,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Badges of a student, newest first
    pub fn badges(&self, student_id: i64) -> Result<Vec<Badge>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, student_id, badge_name, badge_description, badge_icon, earned_at
            FROM badges WHERE student_id = ?1
            ORDER BY earned_at DESC, id DESC
            "#,
        )?;
        let badges = stmt
            .query_map([student_id], |row| {
                Ok(Badge {
                    id: row.get(0)?,
                    student_id: row.get(1)?,
                    badge_name: row.get(2)?,
                    badge_description: row.get(3)?,
                    badge_icon: row.get(4)?,
                    earned_at: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(badges)
    }
}

fn row_to_gamification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Gamification> {
    Ok(Gamification {
        id: row.get(0)?,
        student_id: row.get(1)?,
        total_points: row.get(2)?,
        current_streak: row.get(3)?,
        longest_streak: row.get(4)?,
        last_activity_date: row.get(5)?,
        level: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewUser, Role};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn store_with_student() -> (SqliteStore, i64) {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .create_user(&NewUser::new("Sam", "sam@school.test", "h", Role::Student).in_class("8C"))
            .unwrap();
        (store, id)
    }

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(0), 1);
        assert_eq!(level_for(99), 1);
        assert_eq!(level_for(100), 2);
        assert_eq!(level_for(450), 5);
    }

    #[test]
    fn test_next_streak() {
        assert_eq!(next_streak(None, 0, day(10)), 1);
        assert_eq!(next_streak(Some(day(9)), 3, day(10)), 4);
        assert_eq!(next_streak(Some(day(10)), 3, day(10)), 3);
        assert_eq!(next_streak(Some(day(5)), 3, day(10)), 1);
    }

    #[test]
    fn test_streak_progression() {
        let (store, id) = store_with_student();
        let a = store.add_points_on(id, 10, "test", day(1)).unwrap().unwrap();
        assert_eq!(a.current_streak, 1);
        let a = store.add_points_on(id, 10, "test", day(1)).unwrap().unwrap();
        assert_eq!(a.current_streak, 1);
        let a = store.add_points_on(id, 10, "test", day(2)).unwrap().unwrap();
        assert_eq!(a.current_streak, 2);
        let a = store.add_points_on(id, 10, "test", day(5)).unwrap().unwrap();
        assert_eq!(a.current_streak, 1);
        assert_eq!(a.longest_streak, 2);
        assert_eq!(a.total_points, 40);

        let game = store.gamification(id).unwrap().unwrap();
        assert_eq!(game.last_activity_date, Some(day(5)));
        assert_eq!(game.longest_streak, 2);
    }

    #[test]
    fn test_point_badges_awarded_once() {
        let (store, id) = store_with_student();
        let a = store.add_points_on(id, 95, "test", day(1)).unwrap().unwrap();
        assert!(a.new_badges.is_empty());
        assert_eq!(a.level, 1);

        let a = store.add_points_on(id, 10, "test", day(1)).unwrap().unwrap();
        assert_eq!(a.new_badges, vec!["Century"]);
        assert_eq!(a.level, 2);

        let a = store.add_points_on(id, 10, "test", day(1)).unwrap().unwrap();
        assert!(a.new_badges.is_empty());

        let a = store.add_points_on(id, 400, "test", day(1)).unwrap().unwrap();
        assert_eq!(a.new_badges, vec!["Champion", "Rising Star"]);

        let badges = store.badges(id).unwrap();
        assert_eq!(badges.len(), 3);
        assert_eq!(badges[0].badge_name, "Rising Star");
        assert_eq!(badges[0].badge_icon.as_deref(), Some("🌟"));

        let notes = store.notifications(id, true).unwrap();
        assert_eq!(notes.len(), 3);
        assert!(notes.iter().all(|n| n.notification_type == NotificationType::Achievement));
        assert!(notes.iter().any(|n| n.message == "Congratulations! You earned the 'Century' badge: Earned 100 points"));
    }

    #[test]
    fn test_week_warrior() {
        let (store, id) = store_with_student();
        let mut last = None;
        for d in 1..=7 {
            last = store.add_points_on(id, 1, "daily", day(d)).unwrap();
        }
        let award = last.unwrap();
        assert_eq!(award.current_streak, 7);
        assert_eq!(award.new_badges, vec!["Week Warrior"]);
    }

    #[test]
    fn test_no_gamification_row_is_noop() {
        let (store, _) = store_with_student();
        let teacher = store
            .create_user(&NewUser::new("T", "t@school.test", "h", Role::Teacher))
            .unwrap();
        assert!(store.add_points(teacher, 50, "test").unwrap().is_none());
        assert!(store.gamification(teacher).unwrap().is_none());
    }
}

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{now, opt_date, parse_enum, ts_value, uuid_value, Database};
use crate::error::CoreError;
use crate::models::{CreateGoalInput, Goal, GoalCategory, GoalFilter, GoalStatus, UpdateGoalInput};

impl Database {
    pub fn create_goal(&self, user_id: Uuid, input: CreateGoalInput) -> Result<Goal, CoreError> {
        self.with_conn(|conn| insert_goal(conn, user_id, &input))
    }

    pub fn get_goal(&self, user_id: Uuid, id: Uuid) -> Result<Option<Goal>, CoreError> {
        self.with_conn(|conn| fetch_goal(conn, user_id, id))
    }

    pub fn list_goals(&self, user_id: Uuid, filter: &GoalFilter) -> Result<Vec<Goal>, CoreError> {
        self.with_conn(|conn| {
            let mut conditions = vec!["user_id = ?".to_string()];
            let mut values: Vec<Box<dyn rusqlite::types::ToSql>> =
                vec![Box::new(user_id.to_string())];

            if let Some(category) = filter.category {
                conditions.push("category = ?".to_string());
                values.push(Box::new(category.as_str().to_string()));
            }
            if let Some(status) = filter.status {
                conditions.push("status = ?".to_string());
                values.push(Box::new(status.as_str().to_string()));
            }
            if let Some(date) = filter.active_on {
                conditions.push("(start_date IS NULL OR start_date <= ?)".to_string());
                values.push(Box::new(date.to_string()));
                conditions.push("(end_date IS NULL OR end_date >= ?)".to_string());
                values.push(Box::new(date.to_string()));
            }

            let sql = format!(
                "SELECT * FROM goals WHERE {} ORDER BY created_at",
                conditions.join(" AND ")
            );
            let params_refs: Vec<&dyn rusqlite::types::ToSql> =
                values.iter().map(AsRef::as_ref).collect();

            let mut stmt = conn.prepare(&sql)?;
            let goals = stmt
                .query_map(params_refs.as_slice(), goal_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(goals)
        })
    }

    /// Partial update. Returns the updated goal, or `None` if no goal with
    /// this id belongs to the user.
    pub fn update_goal(
        &self,
        user_id: Uuid,
        id: Uuid,
        updates: UpdateGoalInput,
    ) -> Result<Option<Goal>, CoreError> {
        self.with_conn(|conn| {
            let mut sets: Vec<String> = Vec::new();
            let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(ref title) = updates.title {
                sets.push("title = ?".to_string());
                values.push(Box::new(title.clone()));
            }
            if let Some(ref description) = updates.description {
                sets.push("description = ?".to_string());
                values.push(Box::new(description.clone()));
            }
            if let Some(category) = updates.category {
                sets.push("category = ?".to_string());
                values.push(Box::new(category.as_str().to_string()));
            }
            if let Some(status) = updates.status {
                sets.push("status = ?".to_string());
                values.push(Box::new(status.as_str().to_string()));
            }
            if let Some(start_date) = updates.start_date {
                sets.push("start_date = ?".to_string());
                values.push(Box::new(start_date.to_string()));
            }
            if let Some(end_date) = updates.end_date {
                sets.push("end_date = ?".to_string());
                values.push(Box::new(end_date.to_string()));
            }

            if sets.is_empty() {
                return fetch_goal(conn, user_id, id);
            }

            sets.push("updated_at = ?".to_string());
            values.push(Box::new(now()));
            values.push(Box::new(id.to_string()));
            values.push(Box::new(user_id.to_string()));

            let sql = format!(
                "UPDATE goals SET {} WHERE id = ? AND user_id = ?",
                sets.join(", ")
            );
            let params_refs: Vec<&dyn rusqlite::types::ToSql> =
                values.iter().map(AsRef::as_ref).collect();
            let changed = conn.execute(&sql, params_refs.as_slice())?;

            if changed == 0 {
                return Ok(None);
            }
            fetch_goal(conn, user_id, id)
        })
    }

    /// Delete a goal. Junction rows and task groups cascade; tasks survive.
    pub fn delete_goal(&self, user_id: Uuid, id: Uuid) -> Result<bool, CoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM goals WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Get or create the Daily goal for one calendar date. Daily goals group
    /// a day's ad hoc tasks and are titled with the ISO date.
    pub fn daily_goal(&self, user_id: Uuid, date: NaiveDate) -> Result<Goal, CoreError> {
        self.with_tx(|tx| {
            let existing = tx
                .query_row(
                    "SELECT * FROM goals
                     WHERE user_id = ?1 AND category = 'Daily' AND start_date = ?2",
                    params![user_id.to_string(), date.to_string()],
                    goal_from_row,
                )
                .optional()?;
            if let Some(goal) = existing {
                return Ok(goal);
            }

            tracing::debug!(%user_id, %date, "creating daily goal");
            let input = CreateGoalInput {
                title: date.to_string(),
                description: None,
                category: GoalCategory::Daily,
                status: None,
                start_date: Some(date),
                end_date: Some(date),
            };
            insert_goal(tx, user_id, &input)
        })
    }
}

fn insert_goal(conn: &Connection, user_id: Uuid, input: &CreateGoalInput) -> Result<Goal, CoreError> {
    let id = Uuid::new_v4();
    let ts = now();
    let status = input.status.unwrap_or(GoalStatus::Active);

    conn.execute(
        "INSERT INTO goals (id, user_id, title, description, category, status,
         start_date, end_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            id.to_string(),
            user_id.to_string(),
            input.title,
            input.description,
            input.category.as_str(),
            status.as_str(),
            input.start_date.map(|d| d.to_string()),
            input.end_date.map(|d| d.to_string()),
            ts,
        ],
    )?;

    fetch_goal(conn, user_id, id)?.ok_or(CoreError::NotFound("Goal"))
}

pub(crate) fn fetch_goal(
    conn: &Connection,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<Goal>, CoreError> {
    let goal = conn
        .query_row(
            "SELECT * FROM goals WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id.to_string()],
            goal_from_row,
        )
        .optional()?;
    Ok(goal)
}

pub(crate) fn goal_from_row(row: &Row) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: uuid_value(&row.get::<_, String>("id")?)?,
        user_id: uuid_value(&row.get::<_, String>("user_id")?)?,
        title: row.get("title")?,
        description: row.get("description")?,
        category: parse_enum(
            "goal category",
            &row.get::<_, String>("category")?,
            GoalCategory::from_str,
        )?,
        status: parse_enum(
            "goal status",
            &row.get::<_, String>("status")?,
            GoalStatus::from_str,
        )?,
        start_date: opt_date(row.get("start_date")?)?,
        end_date: opt_date(row.get("end_date")?)?,
        created_at: ts_value(&row.get::<_, String>("created_at")?)?,
        updated_at: ts_value(&row.get::<_, String>("updated_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let user_id = Uuid::new_v4();
        db.upsert_user(user_id, "test@example.com").unwrap();
        (db, user_id)
    }

    fn goal_input(title: &str, category: GoalCategory) -> CreateGoalInput {
        CreateGoalInput {
            title: title.to_string(),
            description: None,
            category,
            status: None,
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn test_create_and_get_goal() {
        let (db, user_id) = setup();
        let goal = db
            .create_goal(user_id, goal_input("Ship v1", GoalCategory::Quarterly))
            .unwrap();
        assert_eq!(goal.status, GoalStatus::Active);

        let found = db.get_goal(user_id, goal.id).unwrap().unwrap();
        assert_eq!(found.title, "Ship v1");
        assert_eq!(found.category, GoalCategory::Quarterly);
    }

    #[test]
    fn test_get_goal_scoped_to_user() {
        let (db, user_id) = setup();
        let other = Uuid::new_v4();
        db.upsert_user(other, "other@example.com").unwrap();
        let goal = db
            .create_goal(user_id, goal_input("Private", GoalCategory::Main))
            .unwrap();
        assert!(db.get_goal(other, goal.id).unwrap().is_none());
    }

    #[test]
    fn test_list_goals_filter_category_and_status() {
        let (db, user_id) = setup();
        db.create_goal(user_id, goal_input("Year", GoalCategory::Yearly))
            .unwrap();
        let done = db
            .create_goal(user_id, goal_input("Week", GoalCategory::Weekly))
            .unwrap();
        db.update_goal(
            user_id,
            done.id,
            UpdateGoalInput {
                status: Some(GoalStatus::Done),
                title: None,
                description: None,
                category: None,
                start_date: None,
                end_date: None,
            },
        )
        .unwrap();

        let yearly = db
            .list_goals(
                user_id,
                &GoalFilter {
                    category: Some(GoalCategory::Yearly),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(yearly.len(), 1);
        assert_eq!(yearly[0].title, "Year");

        let done_goals = db
            .list_goals(
                user_id,
                &GoalFilter {
                    status: Some(GoalStatus::Done),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(done_goals.len(), 1);
        assert_eq!(done_goals[0].title, "Week");
    }

    #[test]
    fn test_list_goals_active_on_date_range() {
        let (db, user_id) = setup();
        let mut input = goal_input("January push", GoalCategory::Monthly);
        input.start_date = NaiveDate::from_ymd_opt(2026, 1, 1);
        input.end_date = NaiveDate::from_ymd_opt(2026, 1, 31);
        db.create_goal(user_id, input).unwrap();
        db.create_goal(user_id, goal_input("Open-ended", GoalCategory::Main))
            .unwrap();

        let mid_january = db
            .list_goals(
                user_id,
                &GoalFilter {
                    active_on: NaiveDate::from_ymd_opt(2026, 1, 15),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(mid_january.len(), 2);

        let february = db
            .list_goals(
                user_id,
                &GoalFilter {
                    active_on: NaiveDate::from_ymd_opt(2026, 2, 15),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(february.len(), 1);
        assert_eq!(february[0].title, "Open-ended");
    }

    #[test]
    fn test_update_goal_partial() {
        let (db, user_id) = setup();
        let goal = db
            .create_goal(user_id, goal_input("Draft", GoalCategory::Weekly))
            .unwrap();
        let updated = db
            .update_goal(
                user_id,
                goal.id,
                UpdateGoalInput {
                    title: Some("Final".to_string()),
                    description: None,
                    category: None,
                    status: None,
                    start_date: None,
                    end_date: None,
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.category, GoalCategory::Weekly);
    }

    #[test]
    fn test_update_goal_missing_returns_none() {
        let (db, user_id) = setup();
        let result = db
            .update_goal(user_id, Uuid::new_v4(), UpdateGoalInput {
                title: Some("x".to_string()),
                description: None,
                category: None,
                status: None,
                start_date: None,
                end_date: None,
            })
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_delete_goal() {
        let (db, user_id) = setup();
        let goal = db
            .create_goal(user_id, goal_input("Gone", GoalCategory::Daily))
            .unwrap();
        assert!(db.delete_goal(user_id, goal.id).unwrap());
        assert!(db.get_goal(user_id, goal.id).unwrap().is_none());
        assert!(!db.delete_goal(user_id, goal.id).unwrap());
    }

    #[test]
    fn test_daily_goal_get_or_create() {
        let (db, user_id) = setup();
        let date = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();

        let first = db.daily_goal(user_id, date).unwrap();
        assert_eq!(first.category, GoalCategory::Daily);
        assert_eq!(first.title, "2026-08-05");
        assert_eq!(first.start_date, Some(date));
        assert_eq!(first.end_date, Some(date));

        let second = db.daily_goal(user_id, date).unwrap();
        assert_eq!(second.id, first.id);

        let next_day = db
            .daily_goal(user_id, NaiveDate::from_ymd_opt(2026, 8, 6).unwrap())
            .unwrap();
        assert_ne!(next_day.id, first.id);
    }
}

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{now, ts_value, uuid_value, Database};
use crate::error::CoreError;
use crate::models::{CreateTaskGroupInput, TaskGroup, UpdateTaskGroupInput};

impl Database {
    pub fn create_group(
        &self,
        user_id: Uuid,
        input: CreateTaskGroupInput,
    ) -> Result<TaskGroup, CoreError> {
        self.with_conn(|conn| {
            let owned: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM goals WHERE id = ?1 AND user_id = ?2",
                    params![input.goal_id.to_string(), user_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            if owned.is_none() {
                return Err(CoreError::NotFound("Goal"));
            }

            let id = Uuid::new_v4();
            let ts = now();
            conn.execute(
                "INSERT INTO task_groups (id, user_id, goal_id, title, order_index,
                 created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    id.to_string(),
                    user_id.to_string(),
                    input.goal_id.to_string(),
                    input.title,
                    input.order_index.unwrap_or(0),
                    ts,
                ],
            )?;
            fetch_group(conn, user_id, id)?.ok_or(CoreError::NotFound("Task group"))
        })
    }

    pub fn get_group(&self, user_id: Uuid, id: Uuid) -> Result<Option<TaskGroup>, CoreError> {
        self.with_conn(|conn| fetch_group(conn, user_id, id))
    }

    pub fn list_groups(
        &self,
        user_id: Uuid,
        goal_id: Option<Uuid>,
    ) -> Result<Vec<TaskGroup>, CoreError> {
        self.with_conn(|conn| {
            let mut sql =
                String::from("SELECT * FROM task_groups WHERE user_id = ?1");
            let mut values: Vec<Box<dyn rusqlite::types::ToSql>> =
                vec![Box::new(user_id.to_string())];
            if let Some(goal_id) = goal_id {
                sql.push_str(" AND goal_id = ?2");
                values.push(Box::new(goal_id.to_string()));
            }
            sql.push_str(" ORDER BY order_index, created_at");

            let params_refs: Vec<&dyn rusqlite::types::ToSql> =
                values.iter().map(AsRef::as_ref).collect();
            let mut stmt = conn.prepare(&sql)?;
            let groups = stmt
                .query_map(params_refs.as_slice(), group_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(groups)
        })
    }

    pub fn update_group(
        &self,
        user_id: Uuid,
        id: Uuid,
        updates: UpdateTaskGroupInput,
    ) -> Result<Option<TaskGroup>, CoreError> {
        self.with_conn(|conn| {
            let mut sets: Vec<String> = Vec::new();
            let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(ref title) = updates.title {
                sets.push("title = ?".to_string());
                values.push(Box::new(title.clone()));
            }
            if let Some(order_index) = updates.order_index {
                sets.push("order_index = ?".to_string());
                values.push(Box::new(order_index));
            }

            if sets.is_empty() {
                return fetch_group(conn, user_id, id);
            }

            sets.push("updated_at = ?".to_string());
            values.push(Box::new(now()));
            values.push(Box::new(id.to_string()));
            values.push(Box::new(user_id.to_string()));

            let sql = format!(
                "UPDATE task_groups SET {} WHERE id = ? AND user_id = ?",
                sets.join(", ")
            );
            let params_refs: Vec<&dyn rusqlite::types::ToSql> =
                values.iter().map(AsRef::as_ref).collect();
            let changed = conn.execute(&sql, params_refs.as_slice())?;

            if changed == 0 {
                return Ok(None);
            }
            fetch_group(conn, user_id, id)
        })
    }

    /// Delete a group. Tasks in the group stay; their group_id goes NULL.
    pub fn delete_group(&self, user_id: Uuid, id: Uuid) -> Result<bool, CoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM task_groups WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }
}

fn fetch_group(
    conn: &Connection,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<TaskGroup>, CoreError> {
    let group = conn
        .query_row(
            "SELECT * FROM task_groups WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id.to_string()],
            group_from_row,
        )
        .optional()?;
    Ok(group)
}

fn group_from_row(row: &Row) -> rusqlite::Result<TaskGroup> {
    Ok(TaskGroup {
        id: uuid_value(&row.get::<_, String>("id")?)?,
        user_id: uuid_value(&row.get::<_, String>("user_id")?)?,
        goal_id: uuid_value(&row.get::<_, String>("goal_id")?)?,
        title: row.get("title")?,
        order_index: row.get("order_index")?,
        created_at: ts_value(&row.get::<_, String>("created_at")?)?,
        updated_at: ts_value(&row.get::<_, String>("updated_at")?)?,
    })
}

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{now, opt_uuid, parse_enum, ts_value, uuid_value, Database};
use crate::error::CoreError;
use crate::models::{
    CreateTaskInput, EffortLevel, Task, TaskOrder, TaskStatus, UpdateTaskInput,
};

impl Database {
    /// Create a task, its subtasks, and an optional goal link in one
    /// transaction. Referenced parent, group, and goal rows must exist and
    /// belong to the user.
    pub fn create_task(&self, user_id: Uuid, input: CreateTaskInput) -> Result<Task, CoreError> {
        self.with_tx(|tx| {
            if let Some(parent_id) = input.parent_id {
                ensure_owned(tx, "tasks", "Task", user_id, parent_id)?;
            }
            if let Some(group_id) = input.group_id {
                ensure_owned(tx, "task_groups", "Task group", user_id, group_id)?;
            }
            if let Some(goal_id) = input.goal_id {
                ensure_owned(tx, "goals", "Goal", user_id, goal_id)?;
            }

            let id = Uuid::new_v4();
            let ts = now();
            tx.execute(
                "INSERT INTO tasks (id, user_id, parent_id, group_id, title, description,
                 status, effort, priority, order_index, is_template, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
                params![
                    id.to_string(),
                    user_id.to_string(),
                    input.parent_id.map(|p| p.to_string()),
                    input.group_id.map(|g| g.to_string()),
                    input.title,
                    input.description,
                    input.status.unwrap_or(TaskStatus::Todo).as_str(),
                    input.effort.map(|e| e.as_str()),
                    input.priority.map(|p| p.as_str()),
                    input.order_index.unwrap_or(0),
                    input.is_template,
                    ts,
                ],
            )?;

            for (i, subtask) in input.new_subtasks.iter().enumerate() {
                tx.execute(
                    "INSERT INTO tasks (id, user_id, parent_id, title, description,
                     effort, priority, order_index, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                    params![
                        Uuid::new_v4().to_string(),
                        user_id.to_string(),
                        id.to_string(),
                        subtask.title,
                        subtask.description,
                        subtask.effort.map(|e| e.as_str()),
                        subtask.priority.map(|p| p.as_str()),
                        subtask.order_index.unwrap_or(i as i64),
                        now(),
                    ],
                )?;
            }

            if let Some(goal_id) = input.goal_id {
                tx.execute(
                    "INSERT OR IGNORE INTO task_goals (task_id, goal_id) VALUES (?1, ?2)",
                    params![id.to_string(), goal_id.to_string()],
                )?;
            }

            fetch_task(tx, user_id, id)?.ok_or(CoreError::NotFound("Task"))
        })
    }

    pub fn get_task(&self, user_id: Uuid, id: Uuid) -> Result<Option<Task>, CoreError> {
        self.with_conn(|conn| fetch_task(conn, user_id, id))
    }

    /// Partial update, last write wins. Returns `None` when no task with
    /// this id belongs to the user.
    pub fn update_task(
        &self,
        user_id: Uuid,
        id: Uuid,
        updates: UpdateTaskInput,
    ) -> Result<Option<Task>, CoreError> {
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
            if let Some(status) = updates.status {
                sets.push("status = ?".to_string());
                values.push(Box::new(status.as_str().to_string()));
            }
            if let Some(effort) = updates.effort {
                sets.push("effort = ?".to_string());
                values.push(Box::new(effort.as_str().to_string()));
            }
            if let Some(priority) = updates.priority {
                sets.push("priority = ?".to_string());
                values.push(Box::new(priority.as_str().to_string()));
            }
            if let Some(completed) = updates.completed {
                sets.push("completed = ?".to_string());
                values.push(Box::new(completed));
            }
            if let Some(group_id) = updates.group_id {
                sets.push("group_id = ?".to_string());
                values.push(Box::new(group_id.to_string()));
            }
            if let Some(order_index) = updates.order_index {
                sets.push("order_index = ?".to_string());
                values.push(Box::new(order_index));
            }
            if let Some(is_template) = updates.is_template {
                sets.push("is_template = ?".to_string());
                values.push(Box::new(is_template));
            }

            if sets.is_empty() {
                return fetch_task(conn, user_id, id);
            }

            sets.push("updated_at = ?".to_string());
            values.push(Box::new(now()));
            values.push(Box::new(id.to_string()));
            values.push(Box::new(user_id.to_string()));

            let sql = format!(
                "UPDATE tasks SET {} WHERE id = ? AND user_id = ?",
                sets.join(", ")
            );
            let params_refs: Vec<&dyn rusqlite::types::ToSql> =
                values.iter().map(AsRef::as_ref).collect();
            let changed = conn.execute(&sql, params_refs.as_slice())?;

            if changed == 0 {
                return Ok(None);
            }
            fetch_task(conn, user_id, id)
        })
    }

    /// Delete a task. Subtasks cascade through the parent FK.
    pub fn delete_task(&self, user_id: Uuid, id: Uuid) -> Result<bool, CoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn list_subtasks(&self, user_id: Uuid, parent_id: Uuid) -> Result<Vec<Task>, CoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks WHERE parent_id = ?1 AND user_id = ?2
                 ORDER BY order_index, created_at",
            )?;
            let tasks = stmt
                .query_map(
                    params![parent_id.to_string(), user_id.to_string()],
                    task_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Apply a batch of order-index updates in one transaction. Every row
    /// update is scoped to the requesting user; returns how many entries
    /// matched an owned task.
    pub fn reorder_tasks(&self, user_id: Uuid, order: &[TaskOrder]) -> Result<usize, CoreError> {
        self.with_tx(|tx| {
            let ts = now();
            let mut matched = 0;
            for entry in order {
                matched += tx.execute(
                    "UPDATE tasks SET order_index = ?1, updated_at = ?2
                     WHERE id = ?3 AND user_id = ?4",
                    params![
                        entry.order_index,
                        ts,
                        entry.id.to_string(),
                        user_id.to_string()
                    ],
                )?;
            }
            Ok(matched)
        })
    }

    /// Copy a task and its direct subtasks. Duplicating a template yields a
    /// regular task that records its origin in `template_id`.
    pub fn duplicate_task(&self, user_id: Uuid, id: Uuid) -> Result<Option<Task>, CoreError> {
        self.with_tx(|tx| {
            let Some(source) = fetch_task(tx, user_id, id)? else {
                return Ok(None);
            };

            let new_id = Uuid::new_v4();
            let ts = now();
            let template_id = if source.is_template {
                Some(source.id)
            } else {
                source.template_id
            };

            tx.execute(
                "INSERT INTO tasks (id, user_id, parent_id, group_id, title, description,
                 status, effort, priority, order_index, template_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
                params![
                    new_id.to_string(),
                    user_id.to_string(),
                    source.parent_id.map(|p| p.to_string()),
                    source.group_id.map(|g| g.to_string()),
                    source.title,
                    source.description,
                    source.status.as_str(),
                    source.effort.map(|e| e.as_str()),
                    source.priority.map(|p| p.as_str()),
                    source.order_index,
                    template_id.map(|t| t.to_string()),
                    ts,
                ],
            )?;

            let mut stmt = tx.prepare(
                "SELECT * FROM tasks WHERE parent_id = ?1 AND user_id = ?2
                 ORDER BY order_index, created_at",
            )?;
            let subtasks = stmt
                .query_map(params![id.to_string(), user_id.to_string()], task_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            for subtask in subtasks {
                tx.execute(
                    "INSERT INTO tasks (id, user_id, parent_id, title, description,
                     status, effort, priority, order_index, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                    params![
                        Uuid::new_v4().to_string(),
                        user_id.to_string(),
                        new_id.to_string(),
                        subtask.title,
                        subtask.description,
                        subtask.status.as_str(),
                        subtask.effort.map(|e| e.as_str()),
                        subtask.priority.map(|p| p.as_str()),
                        subtask.order_index,
                        now(),
                    ],
                )?;
            }

            fetch_task(tx, user_id, new_id)
        })
    }

    /// Link a task to a goal through the junction table. Linking an
    /// already-linked pair is a no-op.
    pub fn link_goal(&self, user_id: Uuid, task_id: Uuid, goal_id: Uuid) -> Result<(), CoreError> {
        self.with_conn(|conn| {
            ensure_owned(conn, "tasks", "Task", user_id, task_id)?;
            ensure_owned(conn, "goals", "Goal", user_id, goal_id)?;
            conn.execute(
                "INSERT OR IGNORE INTO task_goals (task_id, goal_id) VALUES (?1, ?2)",
                params![task_id.to_string(), goal_id.to_string()],
            )?;
            Ok(())
        })
    }

    pub fn unlink_goal(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        goal_id: Uuid,
    ) -> Result<bool, CoreError> {
        self.with_conn(|conn| {
            ensure_owned(conn, "tasks", "Task", user_id, task_id)?;
            let changed = conn.execute(
                "DELETE FROM task_goals WHERE task_id = ?1 AND goal_id = ?2",
                params![task_id.to_string(), goal_id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Tasks linked to a goal through the junction table.
    pub fn tasks_for_goal(&self, user_id: Uuid, goal_id: Uuid) -> Result<Vec<Task>, CoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.* FROM tasks t
                 JOIN task_goals tg ON tg.task_id = t.id
                 WHERE tg.goal_id = ?1 AND t.user_id = ?2
                 ORDER BY t.order_index, t.created_at",
            )?;
            let tasks = stmt
                .query_map(
                    params![goal_id.to_string(), user_id.to_string()],
                    task_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }
}

/// Verify that a row exists in `table` and belongs to the user.
fn ensure_owned(
    conn: &Connection,
    table: &str,
    kind: &'static str,
    user_id: Uuid,
    id: Uuid,
) -> Result<(), CoreError> {
    let sql = format!("SELECT 1 FROM {table} WHERE id = ?1 AND user_id = ?2");
    let found: Option<i64> = conn
        .query_row(
            &sql,
            params![id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    if found.is_none() {
        return Err(CoreError::NotFound(kind));
    }
    Ok(())
}

pub(crate) fn fetch_task(
    conn: &Connection,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<Task>, CoreError> {
    let task = conn
        .query_row(
            "SELECT * FROM tasks WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id.to_string()],
            task_from_row,
        )
        .optional()?;
    Ok(task)
}

pub(crate) fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    let effort: Option<String> = row.get("effort")?;
    let priority: Option<String> = row.get("priority")?;
    Ok(Task {
        id: uuid_value(&row.get::<_, String>("id")?)?,
        user_id: uuid_value(&row.get::<_, String>("user_id")?)?,
        parent_id: opt_uuid(row.get("parent_id")?)?,
        group_id: opt_uuid(row.get("group_id")?)?,
        title: row.get("title")?,
        description: row.get("description")?,
        status: parse_enum(
            "task status",
            &row.get::<_, String>("status")?,
            TaskStatus::from_str,
        )?,
        effort: effort
            .as_deref()
            .map(|s| parse_enum("effort", s, EffortLevel::from_str))
            .transpose()?,
        priority: priority
            .as_deref()
            .map(|s| parse_enum("priority", s, EffortLevel::from_str))
            .transpose()?,
        completed: row.get("completed")?,
        order_index: row.get("order_index")?,
        is_template: row.get("is_template")?,
        template_id: opt_uuid(row.get("template_id")?)?,
        created_at: ts_value(&row.get::<_, String>("created_at")?)?,
        updated_at: ts_value(&row.get::<_, String>("updated_at")?)?,
    })
}

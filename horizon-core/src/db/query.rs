//! Translation of [`TaskQuery`] into SQL.
//!
//! Filters name fields from a fixed allow-list; anything else is silently
//! ignored. All conditions are ANDed, set membership is expressed with
//! IN/NOT IN, and the `goal_id` pseudo-field becomes an EXISTS check
//! against the task_goals junction table.

use rusqlite::types::ToSql;
use serde_json::Value;
use uuid::Uuid;

use super::tasks::task_from_row;
use super::Database;
use crate::error::CoreError;
use crate::models::{FilterConditions, TaskListResult, TaskQuery};

const DEFAULT_LIMIT: u32 = 100;

/// Allow-listed filter and sort columns.
fn column_for(field: &str) -> Option<&'static str> {
    match field {
        "status" => Some("status"),
        "effort" => Some("effort"),
        "priority" => Some("priority"),
        "completed" => Some("completed"),
        "group_id" => Some("group_id"),
        "parent_id" => Some("parent_id"),
        "is_template" => Some("is_template"),
        "template_id" => Some("template_id"),
        "order_index" => Some("order_index"),
        "created_at" => Some("created_at"),
        _ => None,
    }
}

fn bind_value(value: &Value) -> Box<dyn ToSql> {
    match value {
        Value::Null => Box::new(None::<String>),
        Value::Bool(b) => Box::new(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Box::new(i),
            None => Box::new(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => Box::new(s.clone()),
        other => Box::new(other.to_string()),
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_set(
    column: &str,
    list: &[Value],
    negated: bool,
    conditions: &mut Vec<String>,
    values: &mut Vec<Box<dyn ToSql>>,
) {
    if list.is_empty() {
        // IN () matches nothing; NOT IN () matches everything.
        if !negated {
            conditions.push("0 = 1".to_string());
        }
        return;
    }
    let placeholders = vec!["?"; list.len()].join(", ");
    let op = if negated { "NOT IN" } else { "IN" };
    conditions.push(format!("{column} {op} ({placeholders})"));
    for value in list {
        values.push(bind_value(value));
    }
}

fn push_conditions(
    column: &str,
    c: &FilterConditions,
    conditions: &mut Vec<String>,
    values: &mut Vec<Box<dyn ToSql>>,
) {
    if let Some(ref v) = c.eq {
        conditions.push(format!("{column} = ?"));
        values.push(bind_value(v));
    }
    if let Some(ref v) = c.neq {
        conditions.push(format!("{column} != ?"));
        values.push(bind_value(v));
    }
    if let Some(ref list) = c.any_of {
        push_set(column, list, false, conditions, values);
    }
    if let Some(ref list) = c.nin {
        push_set(column, list, true, conditions, values);
    }
    if let Some(ref v) = c.gt {
        conditions.push(format!("{column} > ?"));
        values.push(bind_value(v));
    }
    if let Some(ref v) = c.gte {
        conditions.push(format!("{column} >= ?"));
        values.push(bind_value(v));
    }
    if let Some(ref v) = c.lt {
        conditions.push(format!("{column} < ?"));
        values.push(bind_value(v));
    }
    if let Some(ref v) = c.lte {
        conditions.push(format!("{column} <= ?"));
        values.push(bind_value(v));
    }
    if let Some(ref term) = c.contains {
        conditions.push(format!("{column} LIKE '%' || ? || '%' ESCAPE '\\'"));
        values.push(Box::new(escape_like(term)));
    }
    if let Some(is_null) = c.is {
        if is_null {
            conditions.push(format!("{column} IS NULL"));
        } else {
            conditions.push(format!("{column} IS NOT NULL"));
        }
    }
}

/// The "linked to goal X" predicate: an existence check against the
/// junction table rather than a column comparison.
fn push_goal_conditions(
    c: &FilterConditions,
    conditions: &mut Vec<String>,
    values: &mut Vec<Box<dyn ToSql>>,
) {
    const LINK: &str =
        "SELECT 1 FROM task_goals WHERE task_goals.task_id = tasks.id AND task_goals.goal_id";

    if let Some(ref v) = c.eq {
        conditions.push(format!("EXISTS ({LINK} = ?)"));
        values.push(bind_value(v));
    }
    if let Some(ref v) = c.neq {
        conditions.push(format!("NOT EXISTS ({LINK} = ?)"));
        values.push(bind_value(v));
    }
    if let Some(ref list) = c.any_of {
        if list.is_empty() {
            conditions.push("0 = 1".to_string());
        } else {
            let placeholders = vec!["?"; list.len()].join(", ");
            conditions.push(format!("EXISTS ({LINK} IN ({placeholders}))"));
            for value in list {
                values.push(bind_value(value));
            }
        }
    }
    if let Some(ref list) = c.nin {
        if !list.is_empty() {
            let placeholders = vec!["?"; list.len()].join(", ");
            conditions.push(format!("NOT EXISTS ({LINK} IN ({placeholders}))"));
            for value in list {
                values.push(bind_value(value));
            }
        }
    }
}

impl Database {
    /// Run a structured task query, scoped to the user. Returns the
    /// requested page and the total match count.
    pub fn query_tasks(
        &self,
        user_id: Uuid,
        query: &TaskQuery,
    ) -> Result<TaskListResult, CoreError> {
        self.with_conn(|conn| {
            let mut conditions = vec!["user_id = ?".to_string()];
            let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];

            for filter in &query.filters {
                if filter.field == "goal_id" {
                    push_goal_conditions(&filter.conditions, &mut conditions, &mut values);
                } else if let Some(column) = column_for(&filter.field) {
                    push_conditions(column, &filter.conditions, &mut conditions, &mut values);
                }
                // Unknown fields fall through untouched.
            }

            if let Some(ref search) = query.search {
                for term in search.split_whitespace() {
                    conditions.push(
                        "(title LIKE '%' || ? || '%' ESCAPE '\\' \
                         OR description LIKE '%' || ? || '%' ESCAPE '\\')"
                            .to_string(),
                    );
                    let escaped = escape_like(term);
                    values.push(Box::new(escaped.clone()));
                    values.push(Box::new(escaped));
                }
            }

            let where_clause = conditions.join(" AND ");

            let count_sql = format!("SELECT COUNT(*) FROM tasks WHERE {where_clause}");
            let count_params: Vec<&dyn ToSql> = values.iter().map(AsRef::as_ref).collect();
            let total: u32 = conn.query_row(&count_sql, count_params.as_slice(), |row| row.get(0))?;

            let mut order_terms: Vec<String> = query
                .sort
                .iter()
                .filter_map(|s| {
                    column_for(&s.field).map(|col| format!("{col} {}", s.direction.as_sql()))
                })
                .collect();
            if order_terms.is_empty() {
                order_terms.push("order_index ASC".to_string());
                order_terms.push("created_at ASC".to_string());
            }

            let data_sql = format!(
                "SELECT * FROM tasks WHERE {where_clause} ORDER BY {} LIMIT ? OFFSET ?",
                order_terms.join(", ")
            );
            let mut data_values = values;
            data_values.push(Box::new(query.limit.unwrap_or(DEFAULT_LIMIT)));
            data_values.push(Box::new(query.offset.unwrap_or(0)));
            let data_params: Vec<&dyn ToSql> = data_values.iter().map(AsRef::as_ref).collect();

            let mut stmt = conn.prepare(&data_sql)?;
            let tasks = stmt
                .query_map(data_params.as_slice(), task_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(TaskListResult { tasks, total })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CreateGoalInput, CreateTaskInput, GoalCategory, SortDirection, SortOption,
        TaskFieldFilter, TaskStatus, UpdateTaskInput,
    };
    use serde_json::json;

    fn setup() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let user_id = Uuid::new_v4();
        db.upsert_user(user_id, "test@example.com").unwrap();
        (db, user_id)
    }

    fn task(db: &Database, user_id: Uuid, title: &str) -> crate::models::Task {
        db.create_task(
            user_id,
            CreateTaskInput {
                parent_id: None,
                group_id: None,
                goal_id: None,
                title: title.to_string(),
                description: None,
                status: None,
                effort: None,
                priority: None,
                order_index: None,
                is_template: false,
                new_subtasks: vec![],
            },
        )
        .unwrap()
    }

    fn filter(field: &str, conditions: serde_json::Value) -> TaskFieldFilter {
        let mut object = serde_json::Map::new();
        object.insert("field".to_string(), json!(field));
        if let serde_json::Value::Object(map) = conditions {
            object.extend(map);
        }
        serde_json::from_value(serde_json::Value::Object(object)).unwrap()
    }

    fn query_with(filters: Vec<TaskFieldFilter>) -> TaskQuery {
        TaskQuery {
            filters,
            ..Default::default()
        }
    }

    #[test]
    fn test_status_eq_returns_only_matching() {
        let (db, user_id) = setup();
        task(&db, user_id, "Open");
        let started = task(&db, user_id, "Started");
        db.update_task(
            user_id,
            started.id,
            UpdateTaskInput {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
        )
        .unwrap();

        let result = db
            .query_tasks(
                user_id,
                &query_with(vec![filter("status", json!({"eq": "todo"}))]),
            )
            .unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.tasks[0].title, "Open");
        assert!(result.tasks.iter().all(|t| t.status == TaskStatus::Todo));
    }

    #[test]
    fn test_status_in_set() {
        let (db, user_id) = setup();
        for (title, status) in [
            ("A", TaskStatus::Todo),
            ("B", TaskStatus::Blocked),
            ("C", TaskStatus::Completed),
        ] {
            let t = task(&db, user_id, title);
            db.update_task(
                user_id,
                t.id,
                UpdateTaskInput {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .unwrap();
        }

        let result = db
            .query_tasks(
                user_id,
                &query_with(vec![filter(
                    "status",
                    json!({"in": ["todo", "blocked"]}),
                )]),
            )
            .unwrap();
        assert_eq!(result.total, 2);

        let result = db
            .query_tasks(
                user_id,
                &query_with(vec![filter("status", json!({"nin": ["completed"]}))]),
            )
            .unwrap();
        assert_eq!(result.total, 2);
    }

    #[test]
    fn test_same_field_conditions_are_anded() {
        let (db, user_id) = setup();
        let a = task(&db, user_id, "A");
        let b = task(&db, user_id, "B");
        let c = task(&db, user_id, "C");
        for (t, idx) in [(&a, 1), (&b, 5), (&c, 9)] {
            db.update_task(
                user_id,
                t.id,
                UpdateTaskInput {
                    order_index: Some(idx),
                    ..Default::default()
                },
            )
            .unwrap();
        }

        let result = db
            .query_tasks(
                user_id,
                &query_with(vec![filter("order_index", json!({"gt": 1, "lt": 9}))]),
            )
            .unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.tasks[0].title, "B");
    }

    #[test]
    fn test_unknown_field_is_ignored() {
        let (db, user_id) = setup();
        task(&db, user_id, "Kept");

        let result = db
            .query_tasks(
                user_id,
                &query_with(vec![filter("no_such_field", json!({"eq": "x"}))]),
            )
            .unwrap();
        assert_eq!(result.total, 1);
    }

    #[test]
    fn test_is_null_check() {
        let (db, user_id) = setup();
        let goal = db
            .create_goal(
                user_id,
                CreateGoalInput {
                    title: "Goal".to_string(),
                    description: None,
                    category: GoalCategory::Weekly,
                    status: None,
                    start_date: None,
                    end_date: None,
                },
            )
            .unwrap();
        let group = db
            .create_group(
                user_id,
                crate::models::CreateTaskGroupInput {
                    goal_id: goal.id,
                    title: "Bucket".to_string(),
                    order_index: None,
                },
            )
            .unwrap();

        task(&db, user_id, "Loose");
        db.create_task(
            user_id,
            CreateTaskInput {
                parent_id: None,
                group_id: Some(group.id),
                goal_id: None,
                title: "Grouped".to_string(),
                description: None,
                status: None,
                effort: None,
                priority: None,
                order_index: None,
                is_template: false,
                new_subtasks: vec![],
            },
        )
        .unwrap();

        let ungrouped = db
            .query_tasks(
                user_id,
                &query_with(vec![filter("group_id", json!({"is": true}))]),
            )
            .unwrap();
        assert_eq!(ungrouped.total, 1);
        assert_eq!(ungrouped.tasks[0].title, "Loose");

        let grouped = db
            .query_tasks(
                user_id,
                &query_with(vec![filter("group_id", json!({"is": false}))]),
            )
            .unwrap();
        assert_eq!(grouped.total, 1);
        assert_eq!(grouped.tasks[0].title, "Grouped");
    }

    #[test]
    fn test_contains_substring_case_insensitive() {
        let (db, user_id) = setup();
        let started = task(&db, user_id, "Started");
        db.update_task(
            user_id,
            started.id,
            UpdateTaskInput {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
        )
        .unwrap();
        task(&db, user_id, "Open");

        let result = db
            .query_tasks(
                user_id,
                &query_with(vec![filter("status", json!({"contains": "PROGRESS"}))]),
            )
            .unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.tasks[0].title, "Started");
    }

    #[test]
    fn test_search_case_insensitive() {
        let (db, user_id) = setup();
        task(&db, user_id, "Quarterly REVIEW prep");
        task(&db, user_id, "Unrelated");

        let result = db
            .query_tasks(
                user_id,
                &TaskQuery {
                    search: Some("review".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.tasks[0].title, "Quarterly REVIEW prep");
    }

    #[test]
    fn test_search_terms_are_anded_across_title_and_description() {
        let (db, user_id) = setup();
        let both = task(&db, user_id, "Write report");
        db.update_task(
            user_id,
            both.id,
            UpdateTaskInput {
                description: Some("quarterly numbers".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        task(&db, user_id, "Write notes");
        task(&db, user_id, "Read quarterly digest");

        // Each term may match title OR description, but every term must hit.
        let result = db
            .query_tasks(
                user_id,
                &TaskQuery {
                    search: Some("report quarterly".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.tasks[0].title, "Write report");
    }

    #[test]
    fn test_linked_goal_predicate() {
        let (db, user_id) = setup();
        let goal = db
            .create_goal(
                user_id,
                CreateGoalInput {
                    title: "Target".to_string(),
                    description: None,
                    category: GoalCategory::Monthly,
                    status: None,
                    start_date: None,
                    end_date: None,
                },
            )
            .unwrap();
        let linked = task(&db, user_id, "Linked");
        db.link_goal(user_id, linked.id, goal.id).unwrap();
        task(&db, user_id, "Unlinked");

        let result = db
            .query_tasks(
                user_id,
                &query_with(vec![filter(
                    "goal_id",
                    json!({"eq": goal.id.to_string()}),
                )]),
            )
            .unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.tasks[0].title, "Linked");

        let inverse = db
            .query_tasks(
                user_id,
                &query_with(vec![filter(
                    "goal_id",
                    json!({"neq": goal.id.to_string()}),
                )]),
            )
            .unwrap();
        assert_eq!(inverse.total, 1);
        assert_eq!(inverse.tasks[0].title, "Unlinked");
    }

    #[test]
    fn test_default_sort_is_order_index_then_created_at() {
        let (db, user_id) = setup();
        let b = task(&db, user_id, "Second");
        let a = task(&db, user_id, "First");
        db.update_task(
            user_id,
            a.id,
            UpdateTaskInput {
                order_index: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
        db.update_task(
            user_id,
            b.id,
            UpdateTaskInput {
                order_index: Some(1),
                ..Default::default()
            },
        )
        .unwrap();

        let result = db.query_tasks(user_id, &TaskQuery::default()).unwrap();
        assert_eq!(result.tasks[0].title, "First");
        assert_eq!(result.tasks[1].title, "Second");
    }

    #[test]
    fn test_explicit_sort_descending() {
        let (db, user_id) = setup();
        for (title, idx) in [("Low", 1), ("High", 9)] {
            let t = task(&db, user_id, title);
            db.update_task(
                user_id,
                t.id,
                UpdateTaskInput {
                    order_index: Some(idx),
                    ..Default::default()
                },
            )
            .unwrap();
        }

        let result = db
            .query_tasks(
                user_id,
                &TaskQuery {
                    sort: vec![SortOption {
                        field: "order_index".to_string(),
                        direction: SortDirection::Desc,
                    }],
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(result.tasks[0].title, "High");
    }

    #[test]
    fn test_pagination_keeps_total() {
        let (db, user_id) = setup();
        for i in 0..5 {
            task(&db, user_id, &format!("Task {i}"));
        }

        let page = db
            .query_tasks(
                user_id,
                &TaskQuery {
                    limit: Some(2),
                    offset: Some(2),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.tasks.len(), 2);
    }

    #[test]
    fn test_query_scoped_to_user() {
        let (db, user_id) = setup();
        let other = Uuid::new_v4();
        db.upsert_user(other, "other@example.com").unwrap();
        task(&db, user_id, "Mine");
        task(&db, other, "Theirs");

        let result = db.query_tasks(user_id, &TaskQuery::default()).unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.tasks[0].title, "Mine");
    }
}

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{now, ts_value, uuid_value, Database};
use crate::error::CoreError;
use crate::models::{CreateEnergyInput, EnergyReading, UpdateEnergyInput};

/// Levels are a 1-10 scale, checked here and by the schema constraint.
fn check_level(level: i64) -> Result<(), CoreError> {
    if !(1..=10).contains(&level) {
        return Err(CoreError::Invalid(format!(
            "energy level must be between 1 and 10, got {level}"
        )));
    }
    Ok(())
}

impl Database {
    pub fn create_reading(
        &self,
        user_id: Uuid,
        input: CreateEnergyInput,
    ) -> Result<EnergyReading, CoreError> {
        check_level(input.level)?;
        self.with_conn(|conn| {
            let id = Uuid::new_v4();
            let recorded_at = input
                .recorded_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(now);
            conn.execute(
                "INSERT INTO energy_readings (id, user_id, level, note, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.to_string(),
                    user_id.to_string(),
                    input.level,
                    input.note,
                    recorded_at,
                ],
            )?;
            fetch_reading(conn, user_id, id)?.ok_or(CoreError::NotFound("Energy reading"))
        })
    }

    pub fn get_reading(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<EnergyReading>, CoreError> {
        self.with_conn(|conn| fetch_reading(conn, user_id, id))
    }

    /// Readings in a time range, newest first. Open bounds are allowed.
    pub fn list_readings(
        &self,
        user_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<EnergyReading>, CoreError> {
        self.with_conn(|conn| {
            let mut conditions = vec!["user_id = ?".to_string()];
            let mut values: Vec<Box<dyn rusqlite::types::ToSql>> =
                vec![Box::new(user_id.to_string())];
            if let Some(from) = from {
                conditions.push("recorded_at >= ?".to_string());
                values.push(Box::new(from.to_rfc3339()));
            }
            if let Some(to) = to {
                conditions.push("recorded_at <= ?".to_string());
                values.push(Box::new(to.to_rfc3339()));
            }

            let sql = format!(
                "SELECT * FROM energy_readings WHERE {} ORDER BY recorded_at DESC",
                conditions.join(" AND ")
            );
            let params_refs: Vec<&dyn rusqlite::types::ToSql> =
                values.iter().map(AsRef::as_ref).collect();
            let mut stmt = conn.prepare(&sql)?;
            let readings = stmt
                .query_map(params_refs.as_slice(), reading_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(readings)
        })
    }

    pub fn update_reading(
        &self,
        user_id: Uuid,
        id: Uuid,
        updates: UpdateEnergyInput,
    ) -> Result<Option<EnergyReading>, CoreError> {
        if let Some(level) = updates.level {
            check_level(level)?;
        }
        self.with_conn(|conn| {
            let mut sets: Vec<String> = Vec::new();
            let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(level) = updates.level {
                sets.push("level = ?".to_string());
                values.push(Box::new(level));
            }
            if let Some(ref note) = updates.note {
                sets.push("note = ?".to_string());
                values.push(Box::new(note.clone()));
            }

            if sets.is_empty() {
                return fetch_reading(conn, user_id, id);
            }

            values.push(Box::new(id.to_string()));
            values.push(Box::new(user_id.to_string()));
            let sql = format!(
                "UPDATE energy_readings SET {} WHERE id = ? AND user_id = ?",
                sets.join(", ")
            );
            let params_refs: Vec<&dyn rusqlite::types::ToSql> =
                values.iter().map(AsRef::as_ref).collect();
            let changed = conn.execute(&sql, params_refs.as_slice())?;

            if changed == 0 {
                return Ok(None);
            }
            fetch_reading(conn, user_id, id)
        })
    }

    pub fn delete_reading(&self, user_id: Uuid, id: Uuid) -> Result<bool, CoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM energy_readings WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }
}

fn fetch_reading(
    conn: &Connection,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<EnergyReading>, CoreError> {
    let reading = conn
        .query_row(
            "SELECT * FROM energy_readings WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id.to_string()],
            reading_from_row,
        )
        .optional()?;
    Ok(reading)
}

fn reading_from_row(row: &Row) -> rusqlite::Result<EnergyReading> {
    Ok(EnergyReading {
        id: uuid_value(&row.get::<_, String>("id")?)?,
        user_id: uuid_value(&row.get::<_, String>("user_id")?)?,
        level: row.get("level")?,
        note: row.get("note")?,
        recorded_at: ts_value(&row.get::<_, String>("recorded_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn setup() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let user_id = Uuid::new_v4();
        db.upsert_user(user_id, "test@example.com").unwrap();
        (db, user_id)
    }

    fn reading_at(level: i64, ts: DateTime<Utc>) -> CreateEnergyInput {
        CreateEnergyInput {
            level,
            note: None,
            recorded_at: Some(ts),
        }
    }

    #[test]
    fn test_level_bounds() {
        let (db, user_id) = setup();
        let ok = db
            .create_reading(
                user_id,
                CreateEnergyInput {
                    level: 10,
                    note: Some("peak".to_string()),
                    recorded_at: None,
                },
            )
            .unwrap();
        assert_eq!(ok.level, 10);

        let err = db
            .create_reading(
                user_id,
                CreateEnergyInput {
                    level: 11,
                    note: None,
                    recorded_at: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Invalid(_)));

        let err = db
            .create_reading(
                user_id,
                CreateEnergyInput {
                    level: 0,
                    note: None,
                    recorded_at: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Invalid(_)));
    }

    #[test]
    fn test_list_readings_range_and_order() {
        let (db, user_id) = setup();
        let morning = Utc.with_ymd_and_hms(2026, 8, 5, 8, 0, 0).unwrap();
        let noon = Utc.with_ymd_and_hms(2026, 8, 5, 12, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2026, 8, 5, 20, 0, 0).unwrap();
        db.create_reading(user_id, reading_at(4, morning)).unwrap();
        db.create_reading(user_id, reading_at(8, noon)).unwrap();
        db.create_reading(user_id, reading_at(3, evening)).unwrap();

        let all = db.list_readings(user_id, None, None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].level, 3);
        assert_eq!(all[2].level, 4);

        let until_noon = db.list_readings(user_id, None, Some(noon)).unwrap();
        assert_eq!(until_noon.len(), 2);

        let from_noon = db.list_readings(user_id, Some(noon), None).unwrap();
        assert_eq!(from_noon.len(), 2);
    }

    #[test]
    fn test_update_and_delete_reading() {
        let (db, user_id) = setup();
        let reading = db
            .create_reading(
                user_id,
                CreateEnergyInput {
                    level: 5,
                    note: None,
                    recorded_at: None,
                },
            )
            .unwrap();

        let updated = db
            .update_reading(
                user_id,
                reading.id,
                UpdateEnergyInput {
                    level: Some(7),
                    note: Some("after coffee".to_string()),
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.level, 7);
        assert_eq!(updated.note.as_deref(), Some("after coffee"));

        assert!(db.delete_reading(user_id, reading.id).unwrap());
        assert!(db.get_reading(user_id, reading.id).unwrap().is_none());
    }
}

//! Daily eco-tasks: small self-reported habits worth a few points, each
//! claimable once per UTC day.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::ledger::{self, AwardSource, PointScope};
use crate::service::EcoService;

/// A task with the caller's state for today.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub id: String,
    pub title: String,
    pub points: i64,
    pub completed_today: bool,
}

/// A recorded completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompletion {
    pub task_id: String,
    pub day: i64,
    pub points: i64,
    pub completed_at: i64,
}

fn task_points(conn: &Connection, task_id: &str) -> Result<i64> {
    conn.query_row(
        "SELECT points FROM tasks WHERE id = ?",
        params![task_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
}

impl EcoService {
    /// Mark a task done for today and award its points.
    pub fn complete_task(&self, user_id: &str, task_id: &str) -> Result<TaskCompletion> {
        let now = crate::time::now_timestamp();
        let day = crate::time::day_number(now);
        let completion = self.db().write(|tx| {
            crate::profiles::load_profile(tx, user_id)?;
            let points = task_points(tx, task_id)?;

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO task_completions (user_id, task_id, day, points, completed_at)
                 VALUES (?, ?, ?, ?, ?)",
                params![user_id, task_id, day, points, now],
            )?;
            if inserted == 0 {
                return Err(Error::TaskAlreadyCompleted);
            }

            ledger::award_points(tx, user_id, points, PointScope::global(), AwardSource::Task(task_id), now)?;
            ledger::touch_streak(tx, user_id, now)?;
            tracing::info!(user_id = user_id, task_id = task_id, points = points, "Task completed");
            Ok(TaskCompletion {
                task_id: task_id.to_string(),
                day,
                points,
                completed_at: now,
            })
        })?;

        self.refresh_badges(user_id);
        Ok(completion)
    }

    /// Every task with today's completion flag for the user.
    pub fn list_tasks(&self, user_id: &str) -> Result<Vec<TaskStatus>> {
        let day = crate::time::day_number(crate::time::now_timestamp());
        self.db().read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.title, t.points,
                        EXISTS(SELECT 1 FROM task_completions c
                               WHERE c.task_id = t.id AND c.user_id = ?1 AND c.day = ?2)
                 FROM tasks t
                 ORDER BY t.rowid",
            )?;
            let rows = stmt.query_map(params![user_id, day], |row| {
                Ok(TaskStatus {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    points: row.get(2)?,
                    completed_today: row.get(3)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }
}

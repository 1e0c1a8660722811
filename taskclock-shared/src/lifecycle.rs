/// Task status state machine
///
/// ```text
/// CREATED ──▶ IN_PROGRESS ──▶ DONE
/// ```
///
/// [`compute_status_transition`] validates a requested status against the
/// task's current one and produces the [`TaskDelta`] to store. It never reads
/// the clock itself: `now` is sampled once by the command, so `done_at` and
/// `spent_time` always agree.

use crate::error::{CommandError, CommandResult};
use crate::models::task::{Task, TaskDelta, TaskStatus};
use crate::time::elapsed;
use chrono::{DateTime, Utc};

/// Computes the partial update for moving `task` to `requested` at `now`
///
/// # Errors
///
/// - `SameStatus` if the task already has `requested` status
/// - `InvalidTransition` for any jump other than CREATED → IN_PROGRESS or
///   IN_PROGRESS → DONE
/// - `MissingBeginAt` if an IN_PROGRESS task has no start time
pub fn compute_status_transition(
    task: &Task,
    requested: TaskStatus,
    now: DateTime<Utc>,
) -> CommandResult<TaskDelta> {
    if requested == task.status {
        return Err(CommandError::SameStatus);
    }

    if !task.status.can_transition_to(requested) {
        return Err(CommandError::InvalidTransition {
            from: task.status,
            to: requested,
        });
    }

    match requested {
        TaskStatus::InProgress => Ok(TaskDelta {
            status: TaskStatus::InProgress,
            begin_at: Some(now),
            done_at: None,
            spent_time: None,
        }),
        TaskStatus::Done => {
            let spent = elapsed(task.begin_at, Some(now)).map_err(|_| CommandError::MissingBeginAt)?;

            Ok(TaskDelta {
                status: TaskStatus::Done,
                begin_at: None,
                done_at: Some(now),
                spent_time: Some(spent),
            })
        }
        // can_transition_to never admits CREATED as a target
        TaskStatus::Created => Err(CommandError::InvalidTransition {
            from: task.status,
            to: requested,
        }),
    }
}

/// Time aggregation
///
/// Sums how long tasks have been worked on, optionally restricted to a
/// trailing window ([`TimeFilter`]).
///
/// # Contribution of one task
///
/// ```text
/// no begin_at                      → 0
/// end = done_at, or now if unset
///
/// unbounded:  IN_PROGRESS          → now − begin_at
///             DONE                 → spent_time (frozen at completion)
///             CREATED              → 0
///
/// windowed:   start = max(begin_at, window_start)
///             start ≥ end          → 0
///             otherwise            → end − start
/// ```
///
/// Contributions are independent, so the total over a union of disjoint task
/// sets is the sum of the totals.
///
/// # Example
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use taskclock_shared::aggregation::project_time_spent;
/// use taskclock_shared::time::TimeFilter;
///
/// let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
/// assert_eq!(project_time_spent(&[], Some(TimeFilter::Week), now), 0);
/// ```

use crate::models::project::ProjectSnapshot;
use crate::models::task::{Task, TaskStatus};
use crate::time::{elapsed, format_duration, TimeFilter, TimeSpent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Worked milliseconds of one task
pub fn task_time_spent(task: &Task, window_start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    let Some(begin_at) = task.begin_at else {
        return 0;
    };
    let end = task.done_at.unwrap_or(now);

    match window_start {
        None => match task.status {
            TaskStatus::InProgress => elapsed(Some(begin_at), Some(now)).unwrap_or(0),
            TaskStatus::Done => task.spent_time.unwrap_or(0).max(0),
            TaskStatus::Created => 0,
        },
        Some(window_start) => {
            let start = begin_at.max(window_start);
            if start >= end {
                0
            } else {
                elapsed(Some(start), Some(end)).unwrap_or(0)
            }
        }
    }
}

/// Worked milliseconds summed over `tasks`
pub fn project_time_spent<'a, I>(tasks: I, filter: Option<TimeFilter>, now: DateTime<Utc>) -> i64
where
    I: IntoIterator<Item = &'a Task>,
{
    let window_start = TimeFilter::window_start(filter, now);

    tasks
        .into_iter()
        .map(|task| task_time_spent(task, window_start, now))
        .sum()
}

/// Time spent on a whole project
pub fn project_time(project: &ProjectSnapshot, filter: Option<TimeFilter>, now: DateTime<Utc>) -> TimeSpent {
    format_duration(project_time_spent(&project.tasks, filter, now))
}

/// Worked milliseconds of the tasks `dev_id` performs in `project`
pub fn developer_project_time(
    project: &ProjectSnapshot,
    dev_id: Uuid,
    filter: Option<TimeFilter>,
    now: DateTime<Utc>,
) -> i64 {
    project_time_spent(project.tasks_performed_by(dev_id), filter, now)
}

/// One line of a developer's time report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeveloperProjectTime {
    /// Project ID
    pub project_id: Uuid,

    /// Project title
    pub project_name: String,

    /// Time spent by the developer on the project
    pub time_spent: TimeSpent,
}

/// Per-project time report for a developer
///
/// `projects` are expected to be the projects the developer is a member of;
/// the order of the report follows them.
pub fn developer_time_report(
    projects: &[ProjectSnapshot],
    dev_id: Uuid,
    filter: Option<TimeFilter>,
    now: DateTime<Utc>,
) -> Vec<DeveloperProjectTime> {
    projects
        .iter()
        .map(|project| DeveloperProjectTime {
            project_id: project.id(),
            project_name: project.project.title.clone(),
            time_spent: format_duration(developer_project_time(project, dev_id, filter, now)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::Project;
    use crate::time::{MS_PER_HOUR, MS_PER_MINUTE};
    use chrono::{Duration, TimeZone};

    fn day(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, h, 0, 0).unwrap()
    }

    fn task(status: TaskStatus, begin_at: Option<DateTime<Utc>>, done_at: Option<DateTime<Utc>>) -> Task {
        let spent_time = match (begin_at, done_at) {
            (Some(b), Some(d)) => Some((d - b).num_milliseconds()),
            _ => None,
        };

        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::nil(),
            title: "t".to_string(),
            description: None,
            deadline: day(30, 0),
            initiator_id: Uuid::nil(),
            performer_id: None,
            status,
            begin_at,
            done_at,
            spent_time,
            created_at: day(1, 0),
            updated_at: day(1, 0),
        }
    }

    #[test]
    fn test_unstarted_tasks_contribute_nothing() {
        let now = day(10, 12);
        let tasks = vec![task(TaskStatus::Created, None, None)];

        assert_eq!(project_time_spent(&tasks, None, now), 0);
        assert_eq!(project_time_spent(&tasks, Some(TimeFilter::Month), now), 0);
    }

    #[test]
    fn test_unbounded_in_progress() {
        let now = day(10, 12);
        let tasks = vec![task(TaskStatus::InProgress, Some(now - Duration::hours(26)), None)];

        assert_eq!(project_time_spent(&tasks, None, now), 26 * MS_PER_HOUR);
    }

    #[test]
    fn test_unbounded_done_uses_frozen_value() {
        let now = day(10, 12);
        let mut done = task(TaskStatus::Done, Some(day(1, 10)), Some(day(1, 12)));
        // A frozen value wins over the timestamps
        done.spent_time = Some(90 * MS_PER_MINUTE);

        assert_eq!(project_time_spent([&done], None, now), 90 * MS_PER_MINUTE);
    }

    #[test]
    fn test_window_clips_old_tasks() {
        // Done on day 1, window starts day 3
        let now = day(10, 0);
        let tasks = vec![task(TaskStatus::Done, Some(day(1, 10)), Some(day(1, 12)))];

        assert_eq!(TimeFilter::Week.start(now), day(3, 0));
        assert_eq!(project_time_spent(&tasks, Some(TimeFilter::Week), now), 0);
        assert_eq!(project_time_spent(&tasks, None, now), 2 * MS_PER_HOUR);
    }

    #[test]
    fn test_window_clips_partially() {
        // Started 30h ago, still running: only the last 24h count for HOUR
        let now = day(10, 12);
        let tasks = vec![task(TaskStatus::InProgress, Some(now - Duration::hours(30)), None)];

        assert_eq!(project_time_spent(&tasks, Some(TimeFilter::Hour), now), 24 * MS_PER_HOUR);
        assert_eq!(project_time_spent(&tasks, Some(TimeFilter::Week), now), 30 * MS_PER_HOUR);
    }

    #[test]
    fn test_windowed_matches_frozen_when_window_does_not_clip() {
        let now = day(10, 12);
        let done = task(TaskStatus::Done, Some(day(8, 9)), Some(day(8, 17)));

        let frozen = project_time_spent([&done], None, now);
        let windowed = project_time_spent([&done], Some(TimeFilter::Week), now);

        assert_eq!(frozen, 8 * MS_PER_HOUR);
        assert_eq!(windowed, frozen);
    }

    #[test]
    fn test_additivity() {
        let now = day(10, 12);
        let a = vec![
            task(TaskStatus::Done, Some(day(1, 10)), Some(day(1, 12))),
            task(TaskStatus::InProgress, Some(day(9, 8)), None),
        ];
        let b = vec![
            task(TaskStatus::Done, Some(day(5, 10)), Some(day(6, 11))),
            task(TaskStatus::Created, None, None),
            task(TaskStatus::InProgress, Some(day(10, 11)), None),
        ];
        let all: Vec<Task> = a.iter().chain(b.iter()).cloned().collect();

        for filter in [None, Some(TimeFilter::Hour), Some(TimeFilter::Week), Some(TimeFilter::Month)] {
            let total = project_time_spent(&all, filter, now);
            assert_eq!(
                total,
                project_time_spent(&a, filter, now) + project_time_spent(&b, filter, now),
                "filter {:?}",
                filter
            );
            assert!(total >= 0);
        }
    }

    #[test]
    fn test_developer_report() {
        let now = day(10, 12);
        let dev = Uuid::new_v4();
        let other = Uuid::new_v4();

        let mut mine = task(TaskStatus::Done, Some(day(10, 9)), Some(day(10, 11)));
        mine.performer_id = Some(dev);
        let mut theirs = task(TaskStatus::Done, Some(day(10, 8)), Some(day(10, 12)));
        theirs.performer_id = Some(other);

        let project = ProjectSnapshot {
            project: Project {
                id: Uuid::new_v4(),
                title: "Apollo".to_string(),
                description: None,
                author_id: other,
                created_at: day(1, 0),
                updated_at: day(1, 0),
            },
            member_ids: [dev, other].into_iter().collect(),
            tasks: vec![mine, theirs],
        };

        assert_eq!(developer_project_time(&project, dev, None, now), 2 * MS_PER_HOUR);
        assert_eq!(
            project_time(&project, None, now),
            TimeSpent { days: 0, hours: 6, minutes: 0 }
        );

        let report = developer_time_report(std::slice::from_ref(&project), dev, Some(TimeFilter::Hour), now);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].project_name, "Apollo");
        assert_eq!(report[0].time_spent, TimeSpent { days: 0, hours: 2, minutes: 0 });
    }
}

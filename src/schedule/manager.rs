use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::time::{Duration, sleep};
use tracing::{error, info, warn};

use crate::models::{Data, Error};
use super::{Schedule, ScheduleType};
use super::birthday_tasks::{
    run_birthday_check, run_birthday_role_update, run_birthday_role_update_all_guilds,
};

const RETRY_DELAY: Duration = Duration::from_secs(60);

/// Run stored schedules as they come due, reloading them on every configuration change
pub fn start_schedule_manager(
    http: Arc<serenity::Http>,
    cache: Arc<serenity::Cache>,
    data: Arc<Data>,
) {
    tokio::spawn(async move {
        info!("Schedule manager started");
        let mut reload_rx = data.schedule_reload_tx.subscribe();

        loop {
            let schedules = match data.db.get_all_schedules().await {
                Ok(schedules) => schedules,
                Err(e) => {
                    error!("Failed to load schedules from database: {}", e);
                    sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            let now = Utc::now();
            let Some((fires_at, due)) = find_due_schedules(&schedules, now) else {
                info!("No schedules to run, waiting for configuration");
                if reload_rx.changed().await.is_err() {
                    break;
                }
                continue;
            };
            let wait = (fires_at - now).to_std().unwrap_or_default();

            info!(
                "{} schedule(s) due at {}, in {} minutes",
                due.len(),
                fires_at,
                wait.as_secs() / 60
            );

            tokio::select! {
                _ = sleep(wait) => {
                    for schedule in &due {
                        if let Err(e) = run_schedule(&http, &cache, &data, schedule).await {
                            error!("Failed to run {:?} schedule {}: {}", schedule.schedule_type, schedule.id, e);
                        }
                    }
                    // step past the firing second so the same occurrence isn't picked again
                    sleep(Duration::from_secs(1)).await;
                }
                changed = reload_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    info!("Schedules changed, reloading");
                }
            }
        }

        info!("Schedule manager stopped");
    });
}

/// Earliest firing instant after `now` and every enabled schedule due at it
fn find_due_schedules(
    schedules: &[Schedule],
    now: DateTime<Utc>,
) -> Option<(DateTime<Utc>, Vec<Schedule>)> {
    let upcoming: Vec<(DateTime<Utc>, &Schedule)> = schedules
        .iter()
        .filter(|schedule| schedule.enabled)
        .filter_map(|schedule| match schedule.next_run(now) {
            Ok(next) => next.map(|at| (at, schedule)),
            Err(e) => {
                warn!(
                    "Skipping schedule {} with invalid cron '{}': {}",
                    schedule.id, schedule.cron_expression, e
                );
                None
            }
        })
        .collect();

    let fires_at = upcoming.iter().map(|(at, _)| *at).min()?;
    let due = upcoming
        .into_iter()
        .filter(|(at, _)| *at == fires_at)
        .map(|(_, schedule)| schedule.clone())
        .collect();

    Some((fires_at, due))
}

/// Run a scheduled task based on its type
async fn run_schedule(
    http: &Arc<serenity::Http>,
    cache: &Arc<serenity::Cache>,
    data: &Data,
    schedule: &Schedule,
) -> Result<(), Error> {
    match (&schedule.schedule_type, schedule.guild_id) {
        (ScheduleType::Birthday, Some(guild_id)) => run_birthday_check(http, data, guild_id).await,
        (ScheduleType::Birthday, None) => {
            warn!("Birthday schedule {} has no guild, skipping", schedule.id);
            Ok(())
        }
        (ScheduleType::BirthdayRole, Some(guild_id)) => {
            run_birthday_role_update(http, data, guild_id).await
        }
        (ScheduleType::BirthdayRole, None) => {
            run_birthday_role_update_all_guilds(http, cache, data).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule(id: i32, cron_expression: &str, enabled: bool) -> Schedule {
        Schedule {
            id,
            guild_id: None,
            schedule_type: ScheduleType::Birthday,
            cron_expression: cron_expression.to_string(),
            enabled,
        }
    }

    fn ids(due: &[Schedule]) -> Vec<i32> {
        due.iter().map(|schedule| schedule.id).collect()
    }

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, second).unwrap()
    }

    #[test]
    fn test_due_schedules_skip_disabled_and_invalid() {
        let schedules = vec![
            schedule(1, "0 * * * * *", false),
            schedule(2, "not a cron", true),
            schedule(3, "0 0 0 * * *", true),
        ];
        let (fires_at, due) = find_due_schedules(&schedules, at(12, 0, 0)).unwrap();
        assert_eq!(ids(&due), vec![3]);
        assert_eq!(fires_at, Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_due_schedules_pick_soonest() {
        let schedules = vec![
            schedule(1, "0 0 0 1 1 *", true),
            schedule(2, "* * * * * *", true),
        ];
        let (fires_at, due) = find_due_schedules(&schedules, at(12, 0, 0)).unwrap();
        assert_eq!(ids(&due), vec![2]);
        assert_eq!(fires_at, at(12, 0, 1));
        assert!(find_due_schedules(&[], at(12, 0, 0)).is_none());
    }

    #[test]
    fn test_guilds_sharing_a_cron_all_run() {
        let schedules = vec![
            schedule(1, "0 0 8 * * *", true),
            schedule(2, "0 0 8 * * *", true),
            schedule(3, "0 30 8 * * *", true),
            schedule(4, "0 0 8 * * *", true),
        ];

        // replay the manager loop for a day: fire everything due, then step one second past it
        let mut now = at(7, 59, 0);
        let end = now + chrono::Duration::hours(24);
        let mut fired = Vec::new();
        while let Some((fires_at, due)) = find_due_schedules(&schedules, now) {
            if fires_at > end {
                break;
            }
            fired.extend(due.iter().map(|schedule| (schedule.id, fires_at)));
            now = fires_at + chrono::Duration::seconds(1);
        }

        assert_eq!(
            fired,
            vec![(1, at(8, 0, 0)), (2, at(8, 0, 0)), (4, at(8, 0, 0)), (3, at(8, 30, 0))]
        );
    }
}

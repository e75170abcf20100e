use crate::core::event::{Outcome, RaceEvent, RaceScript};
use std::cmp::Ordering;

/// TimelineEvent is the internal, processable form of a script event. In contrast to `RaceEvent` it
/// contains the synthetic `StrayedEnd` marker that closes a stray window and never leaves the
/// simulation core.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    JoinedGroup { group_id: String },
    LeftGroup,
    Strayed,
    StrayedEnd,
    Overshot { distance: f64 },
    Lost,
    Returned,
    Accident,
    Death,
    MiracleFinish,
}

impl TimelineEvent {
    /// Tie-break rank for events sharing a timestamp (lower is processed first). Pauses are lifted
    /// before new pauses or terminal conditions are evaluated, distance changes come after all
    /// pause bookkeeping.
    fn rank(&self) -> u8 {
        match self {
            TimelineEvent::StrayedEnd => 0,
            TimelineEvent::Returned => 1,
            TimelineEvent::Lost | TimelineEvent::Accident | TimelineEvent::Death => 2,
            TimelineEvent::Strayed => 3,
            TimelineEvent::Overshot { .. } => 4,
            TimelineEvent::JoinedGroup { .. }
            | TimelineEvent::LeftGroup
            | TimelineEvent::MiracleFinish => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub t: f64,
    pub event: TimelineEvent,
}

/// normalize converts the events of a script into a timeline sorted by time. Every `Strayed` event
/// gets a companion `StrayedEnd` marker at `t + duration`. Entries with equal timestamps are
/// ordered by their tie-break rank and keep their input order within the same rank.
///
/// Events with a non-finite timestamp are dropped. Stray windows without positive duration are
/// dropped as well since they cannot pause anything.
pub fn normalize(script: &RaceScript) -> Vec<TimelineEntry> {
    let mut timeline = Vec::with_capacity(script.events.len() + 4);

    for event in script.events.iter() {
        let t = event.t();
        if !t.is_finite() {
            continue;
        }

        let converted = match event {
            RaceEvent::JoinedGroup { group_id, .. } => TimelineEvent::JoinedGroup {
                group_id: group_id.to_owned(),
            },
            RaceEvent::LeftGroup { .. } => TimelineEvent::LeftGroup,
            RaceEvent::Strayed { duration, .. } => {
                if !(duration.is_finite() && *duration > 0.0) {
                    continue;
                }
                timeline.push(TimelineEntry {
                    t: t + duration,
                    event: TimelineEvent::StrayedEnd,
                });
                TimelineEvent::Strayed
            }
            RaceEvent::Overshot { distance, .. } => TimelineEvent::Overshot {
                distance: if distance.is_finite() {
                    distance.max(0.0)
                } else {
                    0.0
                },
            },
            RaceEvent::Lost { .. } => TimelineEvent::Lost,
            RaceEvent::Returned { .. } => TimelineEvent::Returned,
            RaceEvent::Accident { .. } => TimelineEvent::Accident,
            RaceEvent::Death { .. } => TimelineEvent::Death,
            RaceEvent::MiracleFinish { .. } => TimelineEvent::MiracleFinish,
        };

        timeline.push(TimelineEntry {
            t,
            event: converted,
        });
    }

    // sort_by is stable -> input order is kept for equal (t, rank)
    timeline.sort_by(|a, b| match a.t.total_cmp(&b.t) {
        Ordering::Equal => a.event.rank().cmp(&b.event.rank()),
        ord => ord,
    });

    timeline
}

/// ScriptError describes a violation of the race script data contract. The simulation itself
/// tolerates all of them, see `validate`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    #[error("event {index} has a non-finite or negative timestamp {t}")]
    InvalidTime { index: usize, t: f64 },
    #[error("stray event {index} has an invalid duration {duration}")]
    InvalidDuration { index: usize, duration: f64 },
    #[error("overshoot event {index} has an invalid distance {distance}")]
    InvalidDistance { index: usize, distance: f64 },
    #[error("event at {t_event}s follows the terminal event at {t_terminal}s")]
    EventAfterTerminal { t_terminal: f64, t_event: f64 },
    #[error("outcome is finished but no valid finish time is set")]
    MissingFinishTime,
    #[error("finish time is set although the outcome is {0:?}")]
    UnexpectedFinishTime(Outcome),
}

/// validate checks a script against the data contract and returns the first violation found.
/// Validation is advisory: scripts failing it are still simulated, post-terminal events are
/// ignored by the integrator.
pub fn validate(script: &RaceScript) -> Result<(), ScriptError> {
    for (index, event) in script.events.iter().enumerate() {
        let t = event.t();
        if !t.is_finite() || t < 0.0 {
            return Err(ScriptError::InvalidTime { index, t });
        }

        match event {
            RaceEvent::Strayed { duration, .. } if !duration.is_finite() || *duration < 0.0 => {
                return Err(ScriptError::InvalidDuration {
                    index,
                    duration: *duration,
                })
            }
            RaceEvent::Overshot { distance, .. } if !distance.is_finite() || *distance < 0.0 => {
                return Err(ScriptError::InvalidDistance {
                    index,
                    distance: *distance,
                })
            }
            _ => {}
        }
    }

    let t_terminal = script
        .events
        .iter()
        .filter(|event| event.is_terminal())
        .map(|event| event.t())
        .fold(f64::INFINITY, f64::min);

    if let Some(t_event) = script
        .events
        .iter()
        .map(|event| event.t())
        .find(|&t| t > t_terminal)
    {
        return Err(ScriptError::EventAfterTerminal {
            t_terminal,
            t_event,
        });
    }

    match (script.outcome, script.finish_time) {
        (Outcome::Finished, None) => Err(ScriptError::MissingFinishTime),
        (Outcome::Finished, Some(t_fin)) if !t_fin.is_finite() || t_fin <= 0.0 => {
            Err(ScriptError::MissingFinishTime)
        }
        (Outcome::Finished, Some(_)) => Ok(()),
        (outcome, Some(_)) => Err(ScriptError::UnexpectedFinishTime(outcome)),
        (_, None) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(events: Vec<RaceEvent>) -> RaceScript {
        RaceScript {
            entity_id: "p1".to_owned(),
            events,
            outcome: Outcome::Dnf,
            finish_time: None,
            home_base_index: 0,
        }
    }

    fn kinds(timeline: &[TimelineEntry]) -> Vec<TimelineEvent> {
        timeline.iter().map(|entry| entry.event.clone()).collect()
    }

    #[test]
    fn strayed_gets_synthetic_end_marker() {
        let timeline = normalize(&script(vec![RaceEvent::Strayed {
            t: 100.0,
            duration: 50.0,
        }]));

        assert_eq!(
            timeline,
            vec![
                TimelineEntry {
                    t: 100.0,
                    event: TimelineEvent::Strayed
                },
                TimelineEntry {
                    t: 150.0,
                    event: TimelineEvent::StrayedEnd
                },
            ]
        );
    }

    #[test]
    fn events_are_sorted_by_time() {
        let timeline = normalize(&script(vec![
            RaceEvent::Returned { t: 300.0 },
            RaceEvent::Lost { t: 10.0 },
            RaceEvent::Overshot {
                t: 200.0,
                distance: 5.0,
            },
        ]));
        let times: Vec<f64> = timeline.iter().map(|entry| entry.t).collect();

        assert_eq!(times, vec![10.0, 200.0, 300.0]);
    }

    #[test]
    fn colliding_timestamps_follow_tie_break_order() {
        // all events at t = 100, given in reverse priority order
        let timeline = normalize(&script(vec![
            RaceEvent::JoinedGroup {
                t: 100.0,
                group_id: "g".to_owned(),
            },
            RaceEvent::Overshot {
                t: 100.0,
                distance: 20.0,
            },
            RaceEvent::Strayed {
                t: 100.0,
                duration: 30.0,
            },
            RaceEvent::Death { t: 100.0 },
            RaceEvent::Lost { t: 100.0 },
            RaceEvent::Returned { t: 100.0 },
            RaceEvent::Strayed {
                t: 70.0,
                duration: 30.0,
            },
        ]));

        assert_eq!(
            kinds(&timeline),
            vec![
                TimelineEvent::Strayed,
                TimelineEvent::StrayedEnd,
                TimelineEvent::Returned,
                TimelineEvent::Death,
                TimelineEvent::Lost,
                TimelineEvent::Strayed,
                TimelineEvent::Overshot { distance: 20.0 },
                TimelineEvent::JoinedGroup {
                    group_id: "g".to_owned()
                },
                TimelineEvent::StrayedEnd,
            ]
        );
    }

    #[test]
    fn same_rank_keeps_input_order() {
        let timeline = normalize(&script(vec![
            RaceEvent::Lost { t: 5.0 },
            RaceEvent::Accident { t: 5.0 },
            RaceEvent::Death { t: 5.0 },
        ]));

        assert_eq!(
            kinds(&timeline),
            vec![
                TimelineEvent::Lost,
                TimelineEvent::Accident,
                TimelineEvent::Death
            ]
        );
    }

    #[test]
    fn degenerate_events_are_dropped() {
        let timeline = normalize(&script(vec![
            RaceEvent::Strayed {
                t: 10.0,
                duration: 0.0,
            },
            RaceEvent::Lost { t: f64::NAN },
            RaceEvent::Overshot {
                t: 20.0,
                distance: -5.0,
            },
        ]));

        assert_eq!(
            kinds(&timeline),
            vec![TimelineEvent::Overshot { distance: 0.0 }]
        );
    }

    #[test]
    fn validate_accepts_clean_script() {
        let mut s = script(vec![
            RaceEvent::Strayed {
                t: 10.0,
                duration: 5.0,
            },
            RaceEvent::Death { t: 50.0 },
        ]);
        s.outcome = Outcome::Dead;

        assert_eq!(validate(&s), Ok(()));
    }

    #[test]
    fn validate_flags_events_after_death() {
        let s = script(vec![
            RaceEvent::Death { t: 50.0 },
            RaceEvent::Returned { t: 80.0 },
        ]);

        assert_eq!(
            validate(&s),
            Err(ScriptError::EventAfterTerminal {
                t_terminal: 50.0,
                t_event: 80.0
            })
        );
    }

    #[test]
    fn validate_flags_events_after_miracle_finish() {
        let s = script(vec![
            RaceEvent::Lost { t: 80.0 },
            RaceEvent::MiracleFinish { t: 60.0 },
        ]);

        assert_eq!(
            validate(&s),
            Err(ScriptError::EventAfterTerminal {
                t_terminal: 60.0,
                t_event: 80.0
            })
        );
    }

    #[test]
    fn validate_flags_finish_time_mismatch() {
        let mut s = script(vec![]);
        s.outcome = Outcome::Finished;
        assert_eq!(validate(&s), Err(ScriptError::MissingFinishTime));

        s.outcome = Outcome::Lost;
        s.finish_time = Some(100.0);
        assert_eq!(
            validate(&s),
            Err(ScriptError::UnexpectedFinishTime(Outcome::Lost))
        );
    }

    #[test]
    fn validate_flags_bad_payloads() {
        let s = script(vec![RaceEvent::Strayed {
            t: 10.0,
            duration: -1.0,
        }]);
        assert!(matches!(
            validate(&s),
            Err(ScriptError::InvalidDuration { index: 0, .. })
        ));

        let s = script(vec![RaceEvent::Lost { t: -3.0 }]);
        assert!(matches!(
            validate(&s),
            Err(ScriptError::InvalidTime { index: 0, .. })
        ));
    }
}

//! Integration tests for the strength engine, the projector and the insight entrypoint.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use habitforge_core::{
    compute_insight, compute_insight_report, AnalysisConfig, CompletionLog, DayState, EngineConfig,
    HabitHistory, HabitOracles, HabitProfile, IntensityLevel, LedgerFromLog, Projector,
    ScheduleRule, StrengthEngine, StrengthModel,
};

/// First habit day starts exactly at the default 04:00 boundary.
fn day_zero() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 4, 0, 0).unwrap()
}

fn date(offset: i64) -> NaiveDate {
    day_zero().date_naive() + Duration::days(offset)
}

fn after(days: i64) -> AnalysisConfig {
    EngineConfig::default().at(day_zero() + Duration::days(days))
}

fn daily_log(range: std::ops::Range<i64>) -> CompletionLog {
    CompletionLog::from_dates(range.map(date))
}

#[test]
fn test_scenario_a_thirty_daily_completions() {
    let habit = HabitProfile::new("floss", day_zero());
    let log = daily_log(0..30);
    let run = StrengthEngine::new(&ScheduleRule::Daily, &log)
        .simulate(&habit, &after(30))
        .unwrap();

    assert_eq!(run.points.len(), 30);
    let rate = run.model.growth_rate();
    let expected = 1.0 - (-rate * 30.0).exp();
    let strength = run.final_state.strength;
    assert!((strength - expected).abs() < 1e-9, "{strength} vs {expected}");
    assert!((strength - 0.90).abs() < 0.01, "got {strength}");
}

#[test]
fn test_scenario_b_decay_respects_floor() {
    let habit = HabitProfile::new("floss", day_zero());
    let log = daily_log(0..30);
    let run = StrengthEngine::new(&ScheduleRule::Daily, &log)
        .simulate(&habit, &after(40))
        .unwrap();

    let after_streak = run.points[29].strength;
    let peak = run.final_state.peak;
    let experience = habitforge_core::intensity::experience_floor(IntensityLevel::new(1), 30);
    let floor = (0.20 * peak).max(experience);

    let misses = &run.points[30..];
    assert_eq!(misses.len(), 10);
    assert!(misses.iter().all(|p| p.state == DayState::Missed));
    assert!(misses.iter().all(|p| p.strength >= floor - 1e-12));
    assert!(run.final_state.strength < after_streak);
    assert_eq!(peak, after_streak);
}

#[test]
fn test_scenario_c_fresh_bad_habit_starts_at_floor() {
    let habit = HabitProfile::new("vaping", day_zero()).bad_habit().with_intensity(4);
    let config = EngineConfig::default().at(day_zero());
    let log = CompletionLog::default();
    let ledger = LedgerFromLog::new(
        config.day_boundary().unwrap(),
        &ScheduleRule::Daily,
        &log,
        config.analysis_end,
    );
    let insight = compute_insight(
        &habit,
        &config,
        HabitOracles::new(&ScheduleRule::Daily, &log, &ledger),
    )
    .unwrap();

    assert!((insight.automation_percentage - 10.0).abs() < 1e-9);
    assert_eq!(insight.expected_completions, 0);
}

#[test]
fn test_scenario_d_avoidance_raises_control_monotonically() {
    let habit = HabitProfile::new("vaping", day_zero()).bad_habit().with_intensity(4);
    let log = CompletionLog::default();
    let run = StrengthEngine::new(&ScheduleRule::Daily, &log)
        .simulate(&habit, &after(60))
        .unwrap();

    assert_eq!(run.points.len(), 60);
    assert!(run.points.iter().all(|p| p.state == DayState::Avoided));
    assert!(run.points.windows(2).all(|w| w[1].strength > w[0].strength));
    assert!(run.final_state.strength > 0.85);
    assert!(run.final_state.strength <= 1.0);
    assert_eq!(run.points[59].streak_length, 60);
}

#[test]
fn test_scenario_e_target_already_met() {
    let habit = HabitProfile::new("floss", day_zero());
    let model = StrengthModel::new(IntensityLevel::new(1), false, &EngineConfig::default());
    let mut state = model.initial_state();
    state.strength = 1.0;
    state.peak = 1.0;
    let boundary = EngineConfig::default().at(day_zero()).day_boundary().unwrap();
    let projector = Projector::new(
        &habit,
        &ScheduleRule::Daily,
        &model,
        &state,
        boundary,
        day_zero(),
    );

    assert!(projector.estimate_days_and_completions_to_target(1.0).is_none());
    let predictions = projector.predictions(Default::default());
    assert_eq!(predictions.days_to_100, None);
    assert_eq!(predictions.completions_to_100, None);
    assert_eq!(predictions.days_to_95, None);
}

#[test]
fn test_insight_is_deterministic() {
    let history = HabitHistory::new(
        HabitProfile::new("read", day_zero()).with_intensity(3),
        ScheduleRule::Weekdays {
            days: vec![1, 2, 4, 6],
        },
        CompletionLog::from_dates((0..90).filter(|d| d % 3 != 0).map(date)),
    );
    let config = after(90);

    let first = history.report(&config).unwrap();
    let second = history.report(&config).unwrap();
    assert_eq!(first.points, second.points);
    assert_eq!(first.insight, second.insight);
    assert!(!first.points.is_empty());
}

#[test]
fn test_projection_matches_replayed_history() {
    for level in IntensityLevel::all() {
        let model = StrengthModel::new(level, false, &EngineConfig::default());
        let projected = model.project(&model.initial_state(), 25);

        let habit = HabitProfile::new("stretch", day_zero()).with_intensity(level.get());
        let log = daily_log(0..25);
        let run = StrengthEngine::new(&ScheduleRule::Daily, &log)
            .simulate(&habit, &after(25))
            .unwrap();

        assert_eq!(run.final_state.strength, projected.strength);
        assert_eq!(run.final_state, projected);
    }
}

#[test]
fn test_projector_continues_where_history_stops() {
    let mut settings = EngineConfig::default();
    settings.features.personalization = true;
    settings.features.context_consistency = true;

    let habit = HabitProfile::new("stretch", day_zero()).with_intensity(2);
    // Some misses so personalization sees a ratio below 1
    let history_log = CompletionLog::from_dates((0..20).filter(|d| d % 4 != 3).map(date));
    let history_run = StrengthEngine::new(&ScheduleRule::Daily, &history_log)
        .simulate(&habit, &settings.at(day_zero() + Duration::days(20)))
        .unwrap();
    let now = day_zero() + Duration::days(20);
    let projected = Projector::from_run(&habit, &ScheduleRule::Daily, &history_run, now)
        .project_future_strength(10);

    let mut replay_log = history_log.clone();
    for d in 20..30 {
        replay_log.record(date(d));
    }
    let replay = StrengthEngine::new(&ScheduleRule::Daily, &replay_log)
        .simulate(&habit, &settings.at(day_zero() + Duration::days(30)))
        .unwrap();

    assert_eq!(replay.final_state.strength, projected);
}

fn weekly_projection_and_replay(settings: &EngineConfig) -> (f64, f64) {
    // Mondays only; 2024-03-04 is a Monday
    let start = day_zero() + Duration::days(3);
    let schedule = ScheduleRule::Weekdays { days: vec![1] };
    let habit = HabitProfile::new("swim", start).with_intensity(2);
    let mondays = |weeks: std::ops::Range<i64>| weeks.map(|w| date(3 + 7 * w));

    // History ends on the boundary of the sixth Monday, after six unscheduled days
    let now = start + Duration::days(35);
    let history_log = CompletionLog::from_dates(mondays(0..5));
    let history_run = StrengthEngine::new(&schedule, &history_log)
        .simulate(&habit, &settings.at(now))
        .unwrap();
    let projected = Projector::from_run(&habit, &schedule, &history_run, now)
        .project_future_strength(28);

    let replay_log = CompletionLog::from_dates(mondays(0..9));
    let replay = StrengthEngine::new(&schedule, &replay_log)
        .simulate(&habit, &settings.at(start + Duration::days(63)))
        .unwrap();
    assert_eq!(replay.final_state.success_days, 9);
    (projected, replay.final_state.strength)
}

#[test]
fn test_weekly_projection_matches_replay() {
    let (projected, replayed) = weekly_projection_and_replay(&EngineConfig::default());
    assert_eq!(projected, replayed);

    // Drift across the weekly gaps keeps the result below back-to-back completions
    let model = StrengthModel::new(IntensityLevel::new(2), false, &EngineConfig::default());
    assert!(projected < model.project(&model.initial_state(), 9).strength);
}

#[test]
fn test_weekly_projection_matches_replay_with_adjustments() {
    let mut settings = EngineConfig::default();
    settings.features.personalization = true;
    settings.features.context_consistency = true;
    let (projected, replayed) = weekly_projection_and_replay(&settings);
    assert_eq!(projected, replayed);
}

#[test]
fn test_bad_habit_lapse_never_breaks_floor() {
    let habit = HabitProfile::new("snooze", day_zero()).bad_habit().with_intensity(2);
    let lapses = daily_log(10..40);
    let report = {
        let config = after(40);
        let ledger = LedgerFromLog::new(
            config.day_boundary().unwrap(),
            &ScheduleRule::Daily,
            &lapses,
            config.analysis_end,
        );
        compute_insight_report(
            &habit,
            &config,
            HabitOracles::new(&ScheduleRule::Daily, &lapses, &ledger),
        )
        .unwrap()
    };

    let floor_min = habitforge_core::BadHabitParams::for_level(IntensityLevel::new(2)).floor_min;
    assert!(report.points.iter().all(|p| p.strength >= floor_min));
    assert!(report.points[10..].iter().all(|p| p.state == DayState::Lapsed));
    assert_eq!(report.insight.actual_completions, 10);
    assert_eq!(report.insight.history_analysis.total_avoided_days, 10);
    assert_eq!(report.insight.history_analysis.total_gap_days, 30);
}

#[test]
fn test_sparse_schedule_only_emits_scheduled_points() {
    let history = HabitHistory::new(
        HabitProfile::new("long run", day_zero()),
        ScheduleRule::EveryNDays {
            interval: 7,
            anchor: date(0),
        },
        CompletionLog::from_dates((0..8).map(|w| date(w * 7))),
    );
    let report = history.report(&after(56)).unwrap();

    assert_eq!(report.points.len(), 8);
    assert!(report.points.iter().all(|p| p.state == DayState::Completed));
    assert_eq!(report.insight.current_streak, 8);
    assert_eq!(report.insight.raw_completion_rate, 1.0);
}

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use night_charger::config::{Config, TimeWindow};
use night_charger::ev::{BypassReason, EvChargeState, EvDecision, EvEvaluator, EvRequest, EvSession, EvSetResult};
use night_charger::logging::get_logger;
use night_charger::planner::EnergyBalance;

fn evaluator() -> EvEvaluator {
    EvEvaluator::new(&Config::default(), &get_logger("test"))
}

fn at(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn night() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 1, 0, 0).unwrap()
}

fn short_balance() -> EnergyBalance {
    EnergyBalance::new(2.0, 1.0, 8.0, 20.0, 1.15)
}

fn plenty_balance() -> EnergyBalance {
    EnergyBalance::new(10.0, 30.0, 5.0, 5.0, 1.15)
}

fn request(value: f64, time: NaiveTime, balance: EnergyBalance) -> EvRequest {
    EvRequest {
        new_value: value,
        old_value: 0.0,
        current_time: time,
        now: night(),
        timer_start: None,
        energy_balance: balance,
    }
}

#[test]
fn outside_window_is_saved_regardless_of_energy() {
    let ev = evaluator();
    for balance in [short_balance(), plenty_balance()] {
        let decision = ev.evaluate(&request(10.0, at(22, 0), balance));
        assert_eq!(decision.result(), EvSetResult::Saved);
        assert_eq!(decision.value(), 10.0);
        assert!(!decision.bypass_should_activate());
    }
    assert_eq!(
        ev.evaluate(&request(5.0, at(7, 0), short_balance())).result(),
        EvSetResult::Saved
    );
}

#[test]
fn zero_inside_window_resets() {
    let decision = evaluator().evaluate(&request(0.0, at(3, 0), short_balance()));
    assert_eq!(decision, EvDecision::Reset);
    assert_eq!(decision.reason(), "ev_set_to_zero");
    assert!(!decision.bypass_should_activate());
}

#[test]
fn sufficient_energy_keeps_bypass_off() {
    let decision = evaluator().evaluate(&request(5.0, at(2, 30), plenty_balance()));
    assert_eq!(decision.result(), EvSetResult::Processed);
    assert!(!decision.bypass_should_activate());
    assert_eq!(decision.bypass_reason(), Some(BypassReason::SufficientEnergy));
    assert!(decision.energy_balance().is_some());
}

#[test]
fn insufficient_energy_activates_bypass() {
    let decision = evaluator().evaluate(&request(20.0, at(0, 0), short_balance()));
    assert!(decision.bypass_should_activate());
    assert_eq!(decision.bypass_reason(), Some(BypassReason::InsufficientEnergy));
    assert!(!decision.is_timeout());
}

#[test]
fn timeout_forces_bypass_off_even_when_short() {
    let mut req = request(20.0, at(6, 30), short_balance());
    req.timer_start = Some(night() - Duration::hours(6));
    let decision = evaluator().evaluate(&req);
    assert!(decision.is_timeout());
    assert!(!decision.bypass_should_activate());
    assert_eq!(decision.bypass_reason(), Some(BypassReason::Timeout));
}

#[test]
fn oversized_request_is_clamped() {
    let decision = evaluator().evaluate(&request(500.0, at(1, 0), short_balance()));
    assert_eq!(decision.value(), 200.0);
}

#[test]
fn wrapping_request_window() {
    let mut config = Config::default();
    config.ev.request_window = TimeWindow::parse("23:00", "07:00").unwrap();
    let ev = EvEvaluator::new(&config, &get_logger("test"));
    assert!(ev.is_in_request_window(at(23, 30)));
    assert!(ev.is_in_request_window(at(3, 0)));
    assert!(!ev.is_in_request_window(at(12, 0)));
}

#[test]
fn session_walks_through_the_night() {
    let ev = evaluator();
    let mut session = EvSession::default();
    let start = night();

    // Evening request is saved for later
    let mut req = request(30.0, at(21, 0), short_balance());
    req.now = start - Duration::hours(4);
    session.apply(&ev.evaluate(&req), req.now);
    assert_eq!(session.state(req.now, ev.timeout_hours()), EvChargeState::Idle);

    // First in-window evaluation starts the timer
    let mut req = request(session.energy_kwh, at(1, 0), short_balance());
    req.old_value = session.energy_kwh;
    session.apply(&ev.evaluate(&req), start);
    assert!(session.bypass_active);
    assert_eq!(session.state(start, ev.timeout_hours()), EvChargeState::Charging);
    assert_eq!(ev.remaining_timeout_minutes(session.timer_start, start), 360);

    // Six hours later the periodic re-evaluation reports the timeout
    let later = start + Duration::hours(6);
    let mut req = request(session.energy_kwh, at(6, 59), short_balance());
    req.now = later;
    req.timer_start = session.timer_start;
    let decision = ev.evaluate(&req);
    assert!(decision.is_timeout());
    session.apply(&decision, later);
    assert!(!session.bypass_active);
    assert_eq!(session.energy_kwh, 30.0);
    assert_eq!(session.state(later, ev.timeout_hours()), EvChargeState::OverTimeout);

    session.close_window();
    assert_eq!(session.state(later, ev.timeout_hours()), EvChargeState::Idle);
}

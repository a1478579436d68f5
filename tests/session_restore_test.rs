use chrono::{Duration, Utc};
use night_charger::config::Config;
use night_charger::logging::get_logger;
use night_charger::session::{ChargeSessionManager, SessionSnapshot};
use serde_json::json;

#[test]
fn restore_session_state_and_trim_history() {
    let mut mgr = ChargeSessionManager::with_history_size(&Config::default(), &get_logger("test"), 5);

    let now = Utc::now();
    let earlier = (now - Duration::hours(3)).to_rfc3339();
    let now = now.to_rfc3339();

    // Build history larger than max_history_size
    let history: Vec<_> = (0..12)
        .map(|i| {
            json!({
                "id": format!("h{i}"),
                "start_time": earlier,
                "end_time": now,
                "start_soc_percent": 20.0,
                "end_soc_percent": 60.0,
                "charged_kwh": 4.0,
                "status": "Completed"
            })
        })
        .collect();

    let snapshot: SessionSnapshot = serde_json::from_value(json!({
        "current_session": {
            "id": "cur",
            "start_time": earlier,
            "end_time": null,
            "start_soc_percent": 25.0,
            "end_soc_percent": null,
            "charged_kwh": 0.0,
            "status": "Active"
        },
        "history": history,
    }))
    .unwrap();

    mgr.restore_state(snapshot);

    assert_eq!(mgr.current_session.as_ref().map(|s| s.id.as_str()), Some("cur"));
    assert!(mgr.last_session.is_none());

    let restored = mgr.get_state();
    assert_eq!(restored.history.len(), 5);
    assert_eq!(restored.history[0].id, "h7");

    // Restored active session can be finished normally
    let finished = mgr.end_session(45.0, Utc::now()).unwrap();
    assert!((finished.charged_kwh - 2.0).abs() < 1e-9);
}

use night_charger::error::NightChargerError;

#[test]
fn error_constructors() {
    assert!(matches!(
        NightChargerError::config("x"),
        NightChargerError::Config { .. }
    ));
    assert!(matches!(
        NightChargerError::validation("f", "m"),
        NightChargerError::Validation { .. }
    ));
    assert!(matches!(
        NightChargerError::serialization("x"),
        NightChargerError::Serialization { .. }
    ));
    assert!(matches!(NightChargerError::io("x"), NightChargerError::Io { .. }));
    assert!(matches!(
        NightChargerError::session("x"),
        NightChargerError::Session { .. }
    ));
}

#[test]
fn conversions_from_library_errors() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    assert!(matches!(
        NightChargerError::from(io),
        NightChargerError::Io { .. }
    ));

    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(
        NightChargerError::from(json_err),
        NightChargerError::Serialization { .. }
    ));
}

#[test]
fn display_messages() {
    let e = NightChargerError::validation("field", "bad");
    let s = format!("{}", e);
    assert!(s.contains("Validation error"));
    assert_eq!(
        NightChargerError::session("No active session to end").to_string(),
        "Session error: No active session to end"
    );
}

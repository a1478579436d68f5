use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use night_charger::config::ForecastConfig;
use night_charger::forecaster::{ConsumptionForecaster, ForecasterData};
use night_charger::logging::get_logger;
use serde_json::json;

fn forecaster() -> ConsumptionForecaster {
    ConsumptionForecaster::new(&ForecastConfig::default(), &get_logger("test"))
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
}

#[test]
fn hourly_readings_integrate_to_trapezoids() {
    let mut f = forecaster();
    f.add_power_reading(1000.0, t0());
    f.add_power_reading(1500.0, t0() + Duration::minutes(60));
    f.add_power_reading(2000.0, t0() + Duration::minutes(120));
    f.add_power_reading(1200.0, t0() + Duration::minutes(180));
    assert!((f.current_day_consumption() - 4.6).abs() < 1e-9);
}

#[test]
fn power_is_clamped_to_configured_limit() {
    let config = ForecastConfig {
        max_power_w: 2000.0,
        ..ForecastConfig::default()
    };
    let mut f = ConsumptionForecaster::new(&config, &get_logger("test"));
    f.add_power_reading(5000.0, t0());
    f.add_power_reading(5000.0, t0() + Duration::minutes(30));
    assert!((f.current_day_consumption() - 1.0).abs() < 1e-9);
}

#[test]
fn weekday_forecast_over_several_weeks() {
    let mut f = forecaster();
    // Three Mondays at 9, 12 and 15 kWh
    for (week, watts) in [(0, 9000.0), (1, 12_000.0), (2, 15_000.0)] {
        let monday = t0() + Duration::weeks(week);
        f.add_power_reading(watts, monday);
        f.add_power_reading(watts, monday + Duration::hours(1));
        let tuesday = (monday + Duration::days(1)).date_naive();
        f.close_day(tuesday.and_hms_opt(0, 0, 0).unwrap());
    }

    assert_eq!(f.get_weekday_average(0), 12.0);
    let sunday = NaiveDate::from_ymd_opt(2025, 6, 22).unwrap();
    assert_eq!(f.get_consumption_forecast(true, sunday, 10.0), 12.0);
    assert_eq!(f.get_consumption_forecast(true, sunday, 14.0), 14.0);
    assert_eq!(f.get_consumption_forecast(false, sunday, 10.0), 10.0);
}

#[test]
fn persisted_history_loads_sorted_and_bounded() {
    let history: Vec<_> = (1..=25)
        .rev()
        .map(|day| {
            let date = NaiveDate::from_ymd_opt(2025, 5, day).unwrap();
            json!({
                "date": date.to_string(),
                "weekday": chrono::Datelike::weekday(&date).num_days_from_monday(),
                "consumption_kwh": f64::from(day)
            })
        })
        .collect();
    let data: ForecasterData = serde_json::from_value(json!({ "history": history })).unwrap();

    let f = ConsumptionForecaster::from_data(data, &ForecastConfig::default(), &get_logger("test"));
    assert_eq!(f.history_count(), 21);
    assert_eq!(f.history()[0].date, NaiveDate::from_ymd_opt(2025, 5, 5).unwrap());
    assert!(f.history().windows(2).all(|w| w[0].date <= w[1].date));

    let exported = serde_json::to_value(f.to_data()).unwrap();
    assert_eq!(exported["history"][0]["date"], "2025-05-05");
}

#[test]
fn missing_history_key_loads_empty() {
    let data: ForecasterData = serde_json::from_value(json!({})).unwrap();
    let f = ConsumptionForecaster::from_data(data, &ForecastConfig::default(), &get_logger("test"));
    assert_eq!(f.history_count(), 0);
    assert!(f.weekday_averages().iter().all(|(_, avg)| *avg == 0.0));
}

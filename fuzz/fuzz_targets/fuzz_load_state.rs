#![no_main]
use libfuzzer_sys::fuzz_target;
use night_charger::config::Config;
use night_charger::forecaster::ConsumptionForecaster;
use night_charger::logging::get_logger;
use night_charger::persistence::PersistentState;
use night_charger::savings::SavingsAccountant;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(state) = PersistentState::from_json(raw) else {
        return;
    };

    // Restored components must answer queries on any loadable snapshot
    let config = Config::default();
    let logger = get_logger("fuzz");
    let forecaster = ConsumptionForecaster::from_data(state.consumption, &config.forecast, &logger);
    assert!(forecaster.history_count() <= config.forecast.history_days);
    for weekday in 0..7 {
        let _ = forecaster.get_weekday_average(weekday);
    }
    let savings = SavingsAccountant::from_data(state.savings, &config, &logger);
    let _ = savings.get_savings_summary();
    let _ = savings.average_daily_savings();
});

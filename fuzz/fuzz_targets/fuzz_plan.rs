#![no_main]
use libfuzzer_sys::fuzz_target;
use night_charger::config::{BatteryConfig, Config};
use night_charger::logging::get_logger;
use night_charger::planner::{ChargePlanner, PlanningInput};

fuzz_target!(|data: &[u8]| {
    // Interpret the input as four f64 values in little-endian order
    let mut values = data
        .chunks_exact(8)
        .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]));
    let (Some(soc), Some(consumption), Some(solar), Some(ev)) =
        (values.next(), values.next(), values.next(), values.next())
    else {
        return;
    };
    if ![soc, consumption, solar, ev].iter().all(|v| v.is_finite() && v.abs() < 1e6) {
        return;
    }

    let planner = ChargePlanner::new(&Config::default(), &get_logger("fuzz"));
    let battery = BatteryConfig::default();
    let input = PlanningInput::new(&battery, soc, consumption, solar).with_ev_energy(ev);
    let result = planner.calculate(&input);
    assert!(result.target_soc_percent >= battery.min_soc_reserve_percent);
    assert!(result.target_soc_percent <= 100.0);
    assert!(result.planned_charge_kwh >= 0.0);
});

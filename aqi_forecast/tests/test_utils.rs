use aqi_forecast::utils::{forecast_accuracy, future_dates};
use approx::assert_relative_eq;
use chrono::NaiveDate;

#[test]
fn test_future_dates_cross_month_end() {
    let last = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();
    let dates = future_dates(last, 4).unwrap();

    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        ]
    );
    assert!(future_dates(last, 0).unwrap().is_empty());
}

#[test]
fn test_forecast_accuracy() {
    let predicted = vec![None, Some(12.0), Some(18.0), Some(40.0)];
    let actual = vec![5.0, 10.0, 20.0, 40.0];

    let accuracy = forecast_accuracy(&predicted, &actual).unwrap();

    assert_eq!(accuracy.points, 3);
    assert_relative_eq!(accuracy.mae, 4.0 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(accuracy.rmse, (8.0f64 / 3.0).sqrt(), epsilon = 1e-12);
    assert_relative_eq!(accuracy.mape, (20.0 + 10.0 + 0.0) / 3.0, epsilon = 1e-9);
}

#[test]
fn test_forecast_accuracy_skips_zero_actuals() {
    let accuracy = forecast_accuracy(&[Some(1.0), Some(11.0)], &[0.0, 10.0]).unwrap();
    assert_relative_eq!(accuracy.mape, 10.0, epsilon = 1e-9);

    let all_zero = forecast_accuracy(&[Some(1.0)], &[0.0]).unwrap();
    assert!(all_zero.mape.is_nan());
}

#[test]
fn test_forecast_accuracy_errors() {
    assert!(forecast_accuracy(&[Some(1.0)], &[1.0, 2.0]).is_err());
    assert!(forecast_accuracy(&[None, None], &[1.0, 2.0]).is_err());
}

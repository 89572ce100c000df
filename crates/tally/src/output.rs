use chrono::SecondsFormat;
use tally_core::model::metric::Metric;
use tally_core::series::SeriesPoint;
use tally_store::StoreStatus;

pub fn print_value_human(metric: &Metric, value: f64) {
    let places = metric.places as usize;
    if metric.suffix.is_empty() {
        println!("{value:.places$}");
    } else {
        println!("{value:.places$} {}", metric.suffix);
    }
}

pub fn print_series_human(metric: &Metric, series: &[SeriesPoint]) {
    let places = metric.places as usize;
    for point in series {
        println!("{} {:.places$}", point.label, point.value);
    }
    println!("-- {} buckets --", series.len());
}

pub fn print_metrics_human(metrics: &[Metric]) {
    for metric in metrics {
        println!(
            "id={} name={} calc={} default={} places={} suffix={}",
            metric.id,
            metric.name,
            metric.calc_type.as_str(),
            metric.default_value,
            metric.places,
            metric.suffix
        );
    }
    println!("-- {} metrics --", metrics.len());
}

pub fn print_status_human(status: &StoreStatus) {
    println!("db_path={}", status.db_path);
    println!("db_size_bytes={}", status.db_size_bytes);
    println!(
        "metrics={} points={}",
        status.metrics_count, status.points_count
    );
    if let Some(oldest) = status.oldest_point {
        println!(
            "oldest_point={}",
            oldest.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
    }
    if let Some(newest) = status.newest_point {
        println!(
            "newest_point={}",
            newest.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
    }
}

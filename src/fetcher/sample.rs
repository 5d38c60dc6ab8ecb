//! Synthetic upstream payloads for test mode.

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

const CATEGORIES: [&str; 3] = ["A", "B", "C"];
const ITEM_COUNT: usize = 10;

/// Generate a sample document shaped like a typical list API response.
pub fn generate_sample(now: DateTime<Utc>) -> Value {
    let items: Vec<Value> = (1..=ITEM_COUNT)
        .map(|i| {
            let value = (fastrand::f64() * 10_000.0).round() / 100.0;
            json!({
                "id": format!("item_{}", i),
                "value": value,
                "label": format!("Sample Item {}", i),
                "active": fastrand::bool(),
                "category": CATEGORIES[fastrand::usize(..CATEGORIES.len())],
                "created_at": (now - Duration::days(fastrand::i64(0..=30))).to_rfc3339(),
            })
        })
        .collect();

    let values: Vec<f64> = items.iter().filter_map(|i| i["value"].as_f64()).collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;

    let count_of = |category: &str| items.iter().filter(|i| i["category"] == category).count();

    json!({
        "timestamp": now.to_rfc3339(),
        "request_id": format!("req_{}", fastrand::u32(10_000..100_000)),
        "status": "success",
        "data": { "items": items },
        "metadata": {
            "version": "1.0",
            "count": ITEM_COUNT,
            "generated_at": now.to_rfc3339(),
            "provider": "Sample Data Generator",
        },
        "statistics": {
            "min_value": min,
            "max_value": max,
            "avg_value": (avg * 100.0).round() / 100.0,
            "categories": {
                "A": count_of("A"),
                "B": count_of("B"),
                "C": count_of("C"),
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_shape() {
        let sample = generate_sample(Utc::now());
        let items = sample["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), ITEM_COUNT);
        assert_eq!(sample["status"], "success");

        let categories = &sample["statistics"]["categories"];
        let total: u64 = ["A", "B", "C"]
            .iter()
            .map(|c| categories[*c].as_u64().unwrap())
            .sum();
        assert_eq!(total, ITEM_COUNT as u64);
        assert!(sample["statistics"]["min_value"].as_f64() <= sample["statistics"]["max_value"].as_f64());
    }
}

use serde_json::{Map, Value};

/// Headline figure per operation, checked in order against the result.
const HEADLINES: [&str; 4] = [
    "total_tax_liability",
    "additional_deductions_needed",
    "total_withheld",
    "annual_liability",
];

/// Print only the answer: the recommended regime and its saving for a
/// comparison, otherwise the operation's headline amount.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => println!("{}", headline(map)),
        other => println!("{}", scalar(other)),
    }
}

fn headline(map: &Map<String, Value>) -> String {
    if let Some(regime) = map.get("recommended_regime") {
        let savings = map.get("savings").map(scalar).unwrap_or_default();
        return format!("{} {}", scalar(regime), savings).trim_end().to_string();
    }
    HEADLINES
        .iter()
        .find_map(|key| map.get(*key).filter(|v| !v.is_null()))
        .map(scalar)
        .or_else(|| map.iter().next().map(|(k, v)| format!("{}: {}", k, scalar(v))))
        .unwrap_or_default()
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_comparison_prints_regime_and_savings() {
        let result = json!({"legacy": {}, "recommended_regime": "simplified", "savings": "4160.00"});
        assert_eq!(headline(result.as_object().unwrap()), "simplified 4160.00");
    }

    #[test]
    fn test_calculation_prints_liability() {
        let result = json!({"regime": "legacy", "total_tax_liability": "117000.00"});
        assert_eq!(headline(result.as_object().unwrap()), "117000.00");
    }
}

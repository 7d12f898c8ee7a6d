//! 一次性 HTML 转换

use worktime::{convert_html, EngineConfig, SettingsSnapshot};

fn snapshot(income: Option<f64>) -> SettingsSnapshot {
    SettingsSnapshot::new(income, "EUR", "en", true)
}

#[test]
fn test_convert_utf8_document() {
    let input = "<html><head><title>$5 title</title></head><body><p>Only €20</p><s>€40</s></body></html>";
    let output = convert_html(input.as_bytes(), None, snapshot(Some(10.0)), &EngineConfig::default())
        .unwrap();
    let html = String::from_utf8(output).unwrap();

    assert!(html.contains("<p>Only €20 (2 h of work)</p>"), "{}", html);
    assert!(html.contains("<s>€40</s>"), "{}", html);
    assert!(html.contains("<title>$5 title</title>"), "{}", html);
}

#[test]
fn test_declared_charset_wins() {
    let mut input = b"<html><head><meta charset=\"windows-1252\"></head><body><p>".to_vec();
    input.extend_from_slice(b"\x8020");
    input.extend_from_slice(b"</p></body></html>");

    let output = convert_html(&input, Some("utf-8"), snapshot(Some(10.0)), &EngineConfig::default())
        .unwrap();

    let expected = b"\x8020 (2 h of work)";
    assert!(
        output.windows(expected.len()).any(|w| w == expected),
        "{}",
        String::from_utf8_lossy(&output)
    );
}

#[test]
fn test_inactive_snapshot_keeps_text() {
    let input = b"<p>Only $20</p>";
    let output = convert_html(input, None, snapshot(None), &EngineConfig::default()).unwrap();
    let html = String::from_utf8(output).unwrap();
    assert!(html.contains("<p>Only $20</p>"), "{}", html);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = EngineConfig {
        currencies: Vec::new(),
        ..EngineConfig::default()
    };
    assert!(convert_html(b"<p>$1</p>", None, snapshot(Some(1.0)), &config).is_err());
}

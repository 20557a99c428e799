use ad_insights::table::{ViewTable, render_table};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[test]
fn render_table_right_aligns_numeric_columns() {
    let headers = strings(&["platform", "spend"]);
    let rows = vec![strings(&["Facebook", "1200.50"]), strings(&["LinkedIn", "9.00"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(
        lines,
        vec![
            "platform    spend",
            "--------  -------",
            "Facebook  1200.50",
            "LinkedIn     9.00",
        ]
    );
}

#[test]
fn placeholders_do_not_break_numeric_alignment() {
    let headers = strings(&["day", "cpc"]);
    let rows = vec![strings(&["mon", "-"]), strings(&["tue", "1.25"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines[2], "mon     -");
    assert_eq!(lines[3], "tue  1.25");
}

#[test]
fn render_table_normalizes_control_characters() {
    let headers = strings(&["ad"]);
    let rows = vec![strings(&["line1\nline2\tvalue"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "line1 line2 value");
}

#[test]
fn render_table_counts_unicode_characters() {
    let headers = strings(&["kampanya", "ülke"]);
    let rows = vec![strings(&["Kış", "TUR"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines[0], "kampanya  ülke");
    assert_eq!(lines[2], "Kış       TUR");
}

#[test]
fn empty_view_reports_no_data() {
    let view = ViewTable::new("CPC anomalies", &["date", "cpc"]);
    assert_eq!(view.render(), "== CPC anomalies (0 row(s))\n(no data)\n");
}

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use ad_insights::{
    analysis::Analyzer, config::Settings, load_canonical, report::AnalysisReport,
};
use criterion::{Criterion, criterion_group, criterion_main};
use encoding_rs::UTF_8;
use tempfile::TempDir;

const PLATFORMS: [&str; 3] = ["facebook", "linkedin", "google"];
const COUNTRIES: [&str; 4] = ["Turkey", "USA", "Germany", "uk"];

fn generate_exports(rows_per_platform: usize) -> (TempDir, Vec<PathBuf>) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let mut paths = Vec::new();
    for platform in PLATFORMS {
        let path = temp_dir.path().join(format!("{platform}_export.csv"));
        let mut file = File::create(&path).expect("create csv");
        writeln!(
            file,
            "Date,Campaign Name,Ad Name,Amount Spent,Impressions,Reach,Clicks,Conversions,Country,Age,Gender"
        )
        .expect("header");
        for i in 0..rows_per_platform {
            let day = (i % 60) as i64;
            let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).expect("date")
                + chrono::Duration::days(day);
            let campaign = i % 12;
            let clicks = 20 + (i * 7) % 90;
            writeln!(
                file,
                "{date},Campaign {campaign},Creative_{}_v{},{:.2},{},{},{},{},{},{}-{},{}",
                campaign % 5,
                i % 3,
                clicks as f64 * 0.85,
                clicks * 40,
                clicks * 25,
                clicks,
                clicks / 9,
                COUNTRIES[i % COUNTRIES.len()],
                18 + (i % 4) * 10,
                27 + (i % 4) * 10,
                if i % 2 == 0 { "female" } else { "male" },
            )
            .expect("row");
        }
        paths.push(path);
    }
    (temp_dir, paths)
}

fn bench_pipeline(c: &mut Criterion) {
    let (_dir, paths) = generate_exports(20_000);
    let settings = Settings::default();

    c.bench_function("ingest_and_normalize", |b| {
        b.iter(|| load_canonical(&paths, &settings, None, UTF_8).expect("load"))
    });

    let (table, sources) = load_canonical(&paths, &settings, None, UTF_8).expect("load");
    c.bench_function("build_report", |b| {
        b.iter(|| {
            let analyzer = Analyzer::new(&table, &settings.analysis).expect("analyzer");
            AnalysisReport::build(&analyzer, sources.clone())
        })
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);

//! End-to-end run of the pipeline over in-memory sources.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use panel::{
    AnalysisMode, Calendar, CalendarPeriod, EntityId, EntityObservation, EntityProfile,
    EsgProvider, ExportEngine, FieldValue, Hypothesis, InMemoryStore, MemoryReference,
    MemorySource, PipelineConfig, Populator, RatingScale, ReportingFrequency, ThesisPipeline,
    fields,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("panel-it-{}-{name}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn profiles() -> Vec<EntityProfile> {
    vec![
        EntityProfile::new(EntityId::new("AAA LN Equity"))
            .with_name("Alpha")
            .with_industry("Utilities")
            .with_country("United Kingdom"),
        EntityProfile::new(EntityId::new("BBB FP Equity"))
            .with_name("Beta")
            .with_industry("Telecommunications")
            .with_country("France"),
    ]
}

fn ratings() -> Vec<EntityObservation> {
    let rating = |entity: &str, date: NaiveDate, ordinal: f64| {
        EntityObservation::new(EntityId::new(entity), date)
            .with_field(fields::ORDINAL_RATING, ordinal)
    };
    vec![
        rating("AAA LN Equity", date(2009, 6, 15), 14.0),
        rating("AAA LN Equity", date(2011, 6, 20), 15.0),
        rating("BBB FP Equity", date(2010, 1, 5), 16.0),
        rating("BBB FP Equity", date(2012, 3, 1), 13.0),
    ]
}

fn controls() -> Vec<EntityObservation> {
    let mut observations = Vec::new();
    for (entity, base) in [("AAA LN Equity", 10.0), ("BBB FP Equity", 20.0)] {
        for (i, year) in (2010..=2012).enumerate() {
            let step = i as f64;
            observations.push(
                EntityObservation::new(EntityId::new(entity), date(year, 12, 31))
                    .with_field(fields::control::SIZE, base + step)
                    .with_field(fields::control::LEVERAGE, 0.3 + step / 10.0)
                    .with_field(fields::control::INTEREST_COVERAGE, 5.0 - step)
                    .with_field(fields::control::OPER_MARGIN, 0.1 + base / 100.0 + step / 50.0),
            );
        }
    }
    observations
}

fn refinitiv() -> Vec<EntityObservation> {
    use fields::refinitiv::{ENV, GOV, SOCIAL, TOTAL};
    let mut observations = Vec::new();
    for (entity, base) in [("AAA LN Equity", 40.0), ("BBB FP Equity", 60.0)] {
        for year in 2010..=2012 {
            for month in 1..=12u32 {
                let score = base + f64::from(month) + f64::from(year - 2010) * 2.0;
                let last_day = date(year, month, 1)
                    .checked_add_months(chrono::Months::new(1))
                    .and_then(|d| d.pred_opt())
                    .unwrap();
                observations.push(
                    EntityObservation::new(EntityId::new(entity), last_day)
                        .with_field(TOTAL, score)
                        .with_field(ENV, score + 1.0)
                        .with_field(SOCIAL, score - 1.0)
                        .with_field(GOV, score + 2.0),
                );
            }
        }
    }
    observations
}

fn pipeline() -> ThesisPipeline {
    let config = PipelineConfig {
        start: (2010, 1),
        end: (2012, 12),
        store_path: None,
        winsorize: None,
        ..Default::default()
    };
    let mut pipeline = ThesisPipeline::new(config, Arc::new(InMemoryStore::new()));
    let registry = pipeline.registry_mut();
    registry.register_reference(Arc::new(MemoryReference::new(profiles())));
    registry.register_observations(Arc::new(MemorySource::new(
        "ratings",
        ReportingFrequency::Event,
        ratings(),
    )));
    registry.register_observations(Arc::new(MemorySource::new(
        "controls",
        ReportingFrequency::Annual,
        controls(),
    )));
    registry.register_observations(Arc::new(MemorySource::new(
        EsgProvider::Refinitiv.name(),
        ReportingFrequency::Monthly,
        refinitiv(),
    )));
    pipeline
}

#[tokio::test]
async fn test_h1_prepare_regress_and_export() {
    let mut pipeline = pipeline();
    let counts = pipeline.clean().await.unwrap();
    assert_eq!(counts["ratings"], 4);
    assert_eq!(counts["controls"], 6);
    assert_eq!(counts["refinitiv"], 72);

    let sheets = pipeline
        .prepare(Hypothesis::H1, Some(EsgProvider::Refinitiv))
        .await
        .unwrap();
    assert_eq!(sheets, vec!["h1_refinitiv".to_string()]);

    let h1 = pipeline.load_panel("h1_refinitiv").await.unwrap();
    // both companies are rated, scored and controlled in every month
    assert_eq!(h1.len(), 72);
    assert!(h1.has_column(fields::ORDINAL_RATING));
    assert!(h1.has_column(fields::COUNTRY));

    let out = scratch_dir("models");
    let specs = pipeline
        .regress(AnalysisMode::Endogeneity, &ExportEngine::new(&out))
        .await
        .unwrap();
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].name, "h1_refinitiv_lag12");
    // 12 and 24 leading months per company lose their lagged values
    assert_eq!(specs[0].observations, 48);
    assert_eq!(specs[1].observations, 24);
    assert!(out.join("h1_refinitiv_lag24.csv").exists());
    let spec = std::fs::read_to_string(out.join("h1_refinitiv_lag24.json")).unwrap();
    assert!(spec.contains("\"dependent\": \"ordinal_rating\""));

    let export = scratch_dir("export").join("h1.csv");
    pipeline.export("h1_refinitiv", &export).await.unwrap();
    assert!(std::fs::metadata(&export).unwrap().len() > 0);

    std::fs::remove_dir_all(out).ok();
    std::fs::remove_file(export).ok();
}

#[tokio::test]
async fn test_h2_datasets_are_stored() {
    let pipeline = pipeline();
    let sheets = pipeline.prepare(Hypothesis::H2, None).await.unwrap();
    assert_eq!(sheets, vec!["h2_monthly", "h2_yearly", "h2_summary"]);

    let monthly = pipeline.load_panel("h2_monthly").await.unwrap();
    assert!(!monthly.is_empty());
    assert!(monthly.has_column(fields::CREDIT_RTG_CHANGE));
    assert!(monthly.has_column(fields::ESG_RATED));
    assert!(
        monthly
            .numeric(fields::ESG_RATED)
            .iter()
            .all(|v| *v == Some(1.0))
    );

    let summary = pipeline.load_panel("h2_summary").await.unwrap();
    assert_eq!(summary.len(), 2);
}

#[tokio::test]
async fn test_describe_and_coverage() {
    let pipeline = pipeline();

    let stats = pipeline.describe(EsgProvider::Refinitiv).await.unwrap();
    assert_eq!(stats.height(), 3);

    let coverage = pipeline.coverage().await.unwrap();
    assert_eq!(coverage.height(), 2);

    let stored = pipeline.store().sheets().await.unwrap();
    assert!(stored.contains(&"describe_refinitiv".to_string()));
    assert!(stored.contains(&"coverage".to_string()));
}

#[test]
fn test_not_rated_action_clears_rating_state() {
    let entity = EntityId::new("AAA LN Equity");
    let feed = vec![
        EntityObservation::new(entity.clone(), date(2010, 1, 12))
            .with_field(fields::RATING, "BBB")
            .with_field(fields::OUTLOOK, "NEG"),
        EntityObservation::new(entity.clone(), date(2010, 3, 3)).with_field(fields::RATING, "NR"),
    ];
    let (ratings, report) = panel_etl::merge_ratings(vec![feed], RatingScale::Notched);
    assert!(report.is_clean());

    let calendar = Calendar::from_bounds((2010, 1), (2010, 4)).unwrap();
    let policy = ReportingFrequency::Event.default_fill();
    let series = Populator::new(&calendar, policy)
        .populate(&entity, &ratings)
        .unwrap();
    assert_eq!(series.len(), 4);

    let february = series.get(&CalendarPeriod::new(2010, 2).unwrap()).unwrap();
    assert_eq!(february.get(fields::GRADE), Some(&FieldValue::Text("investment".into())));
    assert_eq!(february.get(fields::OUTLOOK), Some(&FieldValue::Text("NEG".into())));

    let april = series.get(&CalendarPeriod::new(2010, 4).unwrap()).unwrap();
    assert_eq!(april.get(fields::ORDINAL_RATING), Some(&FieldValue::Number(0.0)));
    assert!(april.get(fields::GRADE).is_none());
    assert!(april.get(fields::OUTLOOK).is_none());
}

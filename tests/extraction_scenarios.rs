use anyhow::Result;
use rust_decimal::Decimal;

use holdings_extractor::{
    CorrectionAction, CorrectionRule, Decision, DuplicatePolicy, EngineConfig, ExtractionMethod,
    ExtractionPipeline, QualityGrade, RuleSet,
};

const BANK_X_STATEMENT: &str = "\
Portfolio statement as of 31.12.2024
BANK X NOTES 2.5% 2027
ISIN XS1234567890 Valor 1234567 USD 199'080
";

const TWO_HOLDINGS: &str = "\
ACME CORP SHARES
ISIN US0378331005 USD 100'000
NESTLE AG
ISIN CH0012032048 CHF 200'000
";

#[test]
fn test_unmatched_record_keeps_extracted_value() -> Result<()> {
    let report = ExtractionPipeline::default().extract(BANK_X_STATEMENT, None);

    assert_eq!(report.records.len(), 1);
    let record = &report.records[0];
    assert_eq!(record.identifier, "XS1234567890");
    assert_eq!(record.value, Decimal::from(199_080));
    assert!(!record.correction_applied);
    assert_eq!(record.name, "BANK X NOTES 2.5% 2027");
    assert_eq!(record.currency, "USD");
    assert_eq!(record.category, "Bonds");
    assert_eq!(report.decisions[0].decision, Decision::Accepted);
    Ok(())
}

#[test]
fn test_name_rule_overrides_value() -> Result<()> {
    let rules = RuleSet::new(vec![CorrectionRule::for_name(
        "BANK X",
        CorrectionAction::FixedValue {
            value: Decimal::from(150_000),
        },
        "BANK X notes restated by the custodian",
    )])?;
    let pipeline = ExtractionPipeline::new(EngineConfig::default(), rules)?;
    let report = pipeline.extract(BANK_X_STATEMENT, None);

    let record = &report.records[0];
    assert_eq!(record.value, Decimal::from(150_000));
    assert!(record.correction_applied);
    assert_eq!(
        record.correction_reason.as_deref(),
        Some("BANK X notes restated by the custodian")
    );
    assert_eq!(report.decisions[0].decision, Decision::Corrected);
    assert_eq!(report.decisions[0].original_value, Some(Decimal::from(199_080)));
    Ok(())
}

#[test]
fn test_matching_expected_total_reconciles_exactly() -> Result<()> {
    let report = ExtractionPipeline::default().extract(TWO_HOLDINGS, Some(Decimal::from(300_000)));

    let values: Vec<Decimal> = report.records.iter().map(|r| r.value).collect();
    assert_eq!(values, vec![Decimal::from(100_000), Decimal::from(200_000)]);
    assert_eq!(report.records[0].name, "ACME CORP SHARES");
    assert_eq!(report.records[1].currency, "CHF");
    assert_eq!(report.records[1].category, "Equities");

    let reconciliation = &report.reconciliation;
    assert_eq!(reconciliation.extracted_total, Decimal::from(300_000));
    assert_eq!(reconciliation.accuracy, Some(1.0));
    assert_eq!(reconciliation.valid_record_count, 2);
    assert_eq!(reconciliation.total_record_count, 2);
    assert_eq!(reconciliation.grade, QualityGrade::Excellent);
    Ok(())
}

#[test]
fn test_zero_totals_reconcile_without_nan() {
    let report = ExtractionPipeline::default().extract("No holdings this period.", Some(Decimal::ZERO));
    assert_eq!(report.reconciliation.extracted_total, Decimal::ZERO);
    assert_eq!(report.reconciliation.accuracy, Some(1.0));
}

#[test]
fn test_implausible_value_is_scaled_down() {
    let text = "ACME HOLDINGS XS1234567890 USD 50000000000\n";
    let report = ExtractionPipeline::default().extract(text, None);

    let record = &report.records[0];
    assert_eq!(record.value, Decimal::from(50_000_000));
    assert!(record.correction_applied);
    assert!(record
        .correction_reason
        .as_deref()
        .unwrap_or_default()
        .contains("scale correction"));
}

#[test]
fn test_out_of_range_value_is_dropped_with_reason() {
    let text = "TINY CORP XS1234567890 USD 250\n";
    let report = ExtractionPipeline::default().extract(text, None);

    assert!(report.records.is_empty());
    assert_eq!(report.reconciliation.total_record_count, 1);
    let entry = &report.decisions[0];
    assert_eq!(entry.decision, Decision::Rejected);
    assert!(entry.reason.as_deref().unwrap_or_default().contains("out of range"));
}

#[test]
fn test_value_on_following_line_is_found() {
    let text = "ACME 3% BOND 2030 XS1234567890\n\nMarket value EUR 75'500.00\n";
    let report = ExtractionPipeline::default().extract(text, None);

    let record = &report.records[0];
    assert_eq!(record.value, Decimal::from(75_500));
    assert_eq!(record.currency, "EUR");
    assert_eq!(record.method, ExtractionMethod::LabeledPattern);
}

#[test]
fn test_identical_input_gives_identical_output() -> Result<()> {
    let pipeline = ExtractionPipeline::default();
    let first = serde_json::to_string(&pipeline.extract(TWO_HOLDINGS, None))?;
    let second = serde_json::to_string(&pipeline.extract(TWO_HOLDINGS, None))?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_concurrent_runs_share_one_pipeline() {
    let pipeline = ExtractionPipeline::default();
    let expected = pipeline.extract(TWO_HOLDINGS, None);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| pipeline.extract(TWO_HOLDINGS, None)))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn test_corrected_records_always_carry_a_reason() {
    let text = "\
ALPHA NOTES XS1234567890 USD 50000000000
BETA SHARES US0378331005 USD 120'000
GAMMA FUND CH0012032048 CHF 900000000000
";
    let report = ExtractionPipeline::default().extract(text, None);
    for record in &report.records {
        if record.correction_applied {
            assert!(record.correction_reason.as_deref().map_or(false, |r| !r.is_empty()));
        }
    }
}

const REPEATED: &str = "\
ACME NOTES XS1234567890 USD 100'000
OTHER CORP SHARES US0378331005 USD 20'000
ACME NOTES XS1234567890 USD 150'000
";

fn with_policy(policy: DuplicatePolicy) -> Result<ExtractionPipeline> {
    let config = EngineConfig {
        duplicate_policy: policy,
        context_radius: 40,
        ..EngineConfig::default()
    };
    Ok(ExtractionPipeline::new(config, RuleSet::empty())?)
}

#[test]
fn test_duplicates_keep_one_record_by_default() -> Result<()> {
    let report = with_policy(DuplicatePolicy::KeepHighestConfidence)?.extract(REPEATED, None);
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.records[0].identifier, "XS1234567890");
    assert_eq!(report.reconciliation.total_record_count, 2);
    assert!(report.decisions.iter().any(|d| d.decision == Decision::Merged));
    Ok(())
}

#[test]
fn test_duplicates_can_be_summed() -> Result<()> {
    let report = with_policy(DuplicatePolicy::SumDuplicates)?.extract(REPEATED, None);
    assert_eq!(report.records[0].value, Decimal::from(250_000));
    assert_eq!(report.reconciliation.extracted_total, Decimal::from(270_000));
    Ok(())
}

#[test]
fn test_disagreeing_duplicates_are_flagged() -> Result<()> {
    let report = with_policy(DuplicatePolicy::FlagConflict)?.extract(REPEATED, None);
    assert!(report.records[0].conflict);
    assert_eq!(report.reconciliation.conflict_count, 1);
    assert!(report.decisions.iter().any(|d| d.decision == Decision::Conflict));
    Ok(())
}

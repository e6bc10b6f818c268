use crate::engine::{apply_operator, Engine, Evaluation, RuleResult};
use crate::mapping::Mapping;
use crate::outcomes::QcTests;
use crate::rules::{Operator, Rules};
use color_eyre::eyre::{Report, Result};
use indoc::indoc;
use uqcme_table::Table;

const MAPPING: &str = indoc! {"
    Sections:
      Assembly:
        N50:
          data:
            mapping: assembly_n50
          QC:
            mapping: N50
        Depth:
          data:
            mapping: depth_of_coverage
          QC:
            mapping: depth
    QC_overrides:
      assembly_type: short
      software: [spades, checkm]
"};

const RULES: &str = indoc! {"
    rule_id\tspecies\tassembly_type\tsoftware\tfield\toperator\tvalue
    R1\tall\tall\t\tGC\t>=\t40
    R2\tEscherichia coli\tall\tspades\tN50\t>\t50000
    R3\tall\tlong\t\tGC\t<=\t60
    R4\tall\tall\tflye\tGC\t>\t0
    R5\tall\tall\t\tdepth\t>=\t30
    R6\tall\tall\t\tcontamination\t<\t5
    R7\tall\tall\tcheckm\tspecies\tregex\tEscherichia|Salmonella
"};

const TESTS: &str = indoc! {"
    outcome_id\toutcome_name\tdescription\tpriority\tpassed_rule_conditions\tfailed_rule_conditions\taction_required
    PASS\tPassed\tAll rules passed\t1\t\t\tnone
    LOW_GC\tLow GC\tGC out of range\t2\t\tR1\treview
    SMALL_ASSEMBLY\tSmall assembly\tN50 too low\t3\t\tR2\tresequence
    WRONG_SPECIES\tWrong species\tUnexpected species\t4\t\tR7,R99\treject
"};

const DATA: &str = indoc! {"
    sample_name\tspecies\tGC\tassembly_n50\tassembly_type
    s1\tEscherichia coli\t50.5\t120000\t
    s2\tEscherichia coli \t35\t20000\tshort
    s3\tStaphylococcus aureus\t33\tNaN\tlong
    s4\t\tnull\t1\t
"};

fn engine() -> Result<Engine, Report> {
    Engine::new(
        Rules::from_reader(RULES.as_bytes())?,
        QcTests::from_reader(TESTS.as_bytes())?,
        Mapping::from_yaml(MAPPING)?,
    )
}

fn data() -> Result<Table<String>, Report> {
    Table::from_reader(DATA.as_bytes(), b'\t')
}

#[test]
fn numeric_operators() {
    assert!(apply_operator("40", Operator::GreaterEqual, "40", None));
    assert!(!apply_operator("39.9", Operator::GreaterEqual, "40", None));
    assert!(apply_operator("1e3", Operator::Greater, "999", None));
    assert!(apply_operator(" 5 ", Operator::Less, "5.5", None));
    assert!(apply_operator("5", Operator::LessEqual, "5", None));
    // a threshold that isn't a number fails the rule
    assert!(!apply_operator("5", Operator::LessEqual, "five", None));
}

#[test]
fn equality_operators() {
    assert!(apply_operator("50", Operator::Equal, "50.00", None));
    assert!(apply_operator("short", Operator::Equal, "short", None));
    assert!(!apply_operator("short", Operator::Equal, "Short", None));
    assert!(apply_operator("50", Operator::NotEqual, "51", None));
    assert!(!apply_operator("50.0", Operator::NotEqual, "50", None));
}

#[test]
fn missing_values_fail() {
    for missing in ["", " ", "null", "None", "NAN"] {
        for operator in [Operator::Equal, Operator::NotEqual, Operator::Contains, Operator::Regex] {
            assert!(!apply_operator(missing, operator, ".*", None));
        }
    }
}

#[test]
fn pattern_operators() -> Result<(), Report> {
    assert!(apply_operator("Escherichia coli", Operator::Contains, "coli", None));
    assert!(!apply_operator("Escherichia coli", Operator::Contains, "Coli", None));

    // invalid patterns fail rather than panic
    assert!(!apply_operator("abc", Operator::Regex, "(", None));

    // precompiled patterns take precedence over the threshold
    let regex = regex::Regex::new("^(?:abc)")?;
    assert!(apply_operator("abcdef", Operator::Regex, "xyz", Some(&regex)));
    Ok(())
}

#[test]
fn resolve_field() -> Result<(), Report> {
    let engine = engine()?;
    assert_eq!(engine.resolve_field("N50"), "assembly_n50");
    assert_eq!(engine.resolve_field("GC"), "GC");
    Ok(())
}

#[test]
fn sample_attributes() -> Result<(), Report> {
    let engine = engine()?;
    let data = data()?;
    assert_eq!(engine.sample_attributes(&data, 0), ("Escherichia coli".to_string(), "short".to_string()));
    // species are trimmed
    assert_eq!(engine.sample_attributes(&data, 1).0, "Escherichia coli");
    assert_eq!(engine.sample_attributes(&data, 2).1, "long");

    // a blank assembly type takes the first override
    let mapping = Mapping::from_yaml("QC_overrides:\n  assembly_type: [long, short]\n")?;
    let engine = Engine::new(Rules::default(), QcTests::default(), mapping)?;
    assert_eq!(engine.sample_attributes(&data, 0).1, "long");
    assert_eq!(engine.sample_attributes(&data, 3).1, "long");
    assert_eq!(engine.sample_attributes(&data, 1).1, "short");
    Ok(())
}

#[test]
fn skipped_rules_warn() -> Result<(), Report> {
    let engine = engine()?;
    let data = data()?;
    let mut evaluation = Evaluation::default();

    let r5 = engine.rules.get("R5").expect("R5");
    assert_eq!(engine.evaluate_rule(r5, &data, 0, &mut evaluation)?, RuleResult::Skip);
    let r6 = engine.rules.get("R6").expect("R6");
    assert_eq!(engine.evaluate_rule(r6, &data, 0, &mut evaluation)?, RuleResult::Skip);
    // the same warning is only recorded once
    assert_eq!(engine.evaluate_rule(r6, &data, 1, &mut evaluation)?, RuleResult::Skip);

    let warnings: Vec<_> = evaluation.warnings.iter().map(String::as_str).collect();
    assert_eq!(
        warnings,
        [
            "Field 'contamination' not found in sample data (no mapping defined in config)",
            "Field 'depth' (mapped to 'depth_of_coverage') not found in sample data",
        ]
    );
    assert_eq!(evaluation.skipped_rules.iter().collect::<Vec<_>>(), ["R5", "R6"]);
    Ok(())
}

#[test]
fn evaluate_samples() -> Result<(), Report> {
    let engine = engine()?;
    let evaluation = engine.evaluate(&data()?)?;
    assert_eq!(evaluation.results.len(), 4);

    // R3 is for long assemblies, R4 is for software that isn't allowed
    let s1 = &evaluation.results[0];
    assert_eq!(s1.sample_name, "s1");
    assert!(s1.failed_rules.is_empty());
    assert_eq!(s1.passed_rules, ["R1", "R2", "R7"]);
    assert_eq!(s1.qc_outcome(), "PASS");
    assert_eq!(s1.resolved.outcome_id, "PASS");
    assert_eq!(s1.resolved.action, "none");

    // low GC and small assembly, the higher priority wins
    let s2 = &evaluation.results[1];
    assert_eq!(s2.failed_rules, ["R1", "R2"]);
    assert_eq!(s2.qc_outcome(), "LOW_GC,SMALL_ASSEMBLY");
    assert_eq!(s2.resolved.outcome_id, "SMALL_ASSEMBLY");
    assert_eq!(s2.resolved.action, "resequence");

    // long assembly of another species
    let s3 = &evaluation.results[2];
    assert_eq!(s3.failed_rules, ["R1", "R7"]);
    assert_eq!(s3.passed_rules, ["R3"]);
    assert_eq!(s3.resolved.outcome_id, "WRONG_SPECIES");
    assert_eq!(s3.resolved.action, "reject");

    // no species: only rules for all species, missing values fail
    let s4 = &evaluation.results[3];
    assert_eq!(s4.failed_rules, ["R1", "R7"]);
    assert_eq!(s4.qc_outcome(), "LOW_GC,WRONG_SPECIES");

    assert_eq!(evaluation.skipped_rules.iter().collect::<Vec<_>>(), ["R5", "R6"]);
    Ok(())
}

#[test]
fn unmatched_failures_are_fail() -> Result<(), Report> {
    let tests = QcTests::from_reader(
        "outcome_id\toutcome_name\tdescription\tpriority\taction_required\nPASS\tPassed\t\t1\tnone\n"
            .as_bytes(),
    )?;
    let engine = Engine::new(Rules::from_reader(RULES.as_bytes())?, tests, Mapping::from_yaml(MAPPING)?)?;
    let evaluation = engine.evaluate(&data()?)?;

    let s2 = &evaluation.results[1];
    assert_eq!(s2.qc_outcome(), "FAIL");
    assert_eq!(s2.resolved.outcome_id, "FAIL");
    assert_eq!(s2.resolved.action, "none");
    Ok(())
}

#[test]
fn check_references() -> Result<(), Report> {
    let engine = engine()?;
    assert_eq!(engine.check_references(), ["QC test WRONG_SPECIES refers to unknown rule R99"]);
    Ok(())
}

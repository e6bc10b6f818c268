use crate::outcomes::{QcTests, FAIL, NO_ACTION, PASS};
use color_eyre::eyre::{Report, Result};
use indoc::indoc;
use std::collections::BTreeMap;

const TESTS: &str = indoc! {"
    outcome_id\toutcome_name\tdescription\tpriority\tpassed_rule_conditions\tfailed_rule_conditions\taction_required
    PASS\tPassed\tAll rules passed\t1\t\t\tnone
    GOOD_ASSEMBLY\tGood assembly\tAssembly rules passed\t1\tR1,R2\t\tnone
    LOW_COVERAGE\tLow coverage\tCoverage too low\t2\t\tR3\tresequence
    CONTAMINATED\tContaminated\tContamination found\t3\t\tR4,R5\treject
    LOW_GC_ONLY\tLow GC only\tGC failed, species ok\t3\tR6\tR1\treview
"};

fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[test]
fn read_tests() -> Result<(), Report> {
    let tests = QcTests::from_reader(TESTS.as_bytes())?;
    assert_eq!(tests.len(), 5);
    let contaminated = tests.get("CONTAMINATED").expect("test");
    assert_eq!(contaminated.priority, 3);
    assert_eq!(contaminated.failed_conditions(), ["R4", "R5"]);
    assert!(contaminated.passed_conditions().is_empty());
    Ok(())
}

#[test]
fn invalid_tests() {
    let header = "outcome_id\toutcome_name\tdescription\tpriority\taction_required\n";

    let text = format!("{header}A\tA\t\t1\tnone\nA\tA\t\t2\tnone\n");
    assert!(QcTests::from_reader(text.as_bytes()).is_err());

    let text = format!("{header}A\tA\t\t0\tnone\n");
    assert!(QcTests::from_reader(text.as_bytes()).is_err());

    let text = format!("{header}A\tA\t\thigh\tnone\n");
    assert!(QcTests::from_reader(text.as_bytes()).is_err());
}

#[test]
fn trailing_empty_fields_can_be_stripped() -> Result<(), Report> {
    let text = "outcome_id\toutcome_name\tdescription\tpriority\taction_required\tpassed_rule_conditions\tfailed_rule_conditions\nPASS\tPassed\t\t1\tnone\nLOW_GC\tLow GC\t\t2\treview\t\tR1\n";
    let tests = QcTests::from_reader(text.as_bytes())?;
    let pass = tests.get(PASS).expect("test");
    assert_eq!(pass.action_required, "none");
    assert!(pass.passed_conditions().is_empty());
    assert!(pass.failed_conditions().is_empty());
    assert_eq!(tests.get("LOW_GC").expect("test").failed_conditions(), ["R1"]);
    Ok(())
}

#[test]
fn no_conditions_match_without_failures() -> Result<(), Report> {
    let tests = QcTests::from_reader(TESTS.as_bytes())?;
    let pass = tests.get(PASS).expect("test");
    assert!(pass.matches(&[], &ids(&["R1"])));
    assert!(!pass.matches(&ids(&["R1"]), &[]));
    Ok(())
}

#[test]
fn passed_conditions_need_an_evaluated_rule() -> Result<(), Report> {
    let tests = QcTests::from_reader(TESTS.as_bytes())?;
    let good = tests.get("GOOD_ASSEMBLY").expect("test");

    // neither rule was evaluated
    assert!(!good.matches(&[], &ids(&["R3"])));
    // one evaluated and passed is enough
    assert!(good.matches(&ids(&["R3"]), &ids(&["R2"])));
    // any failure breaks it
    assert!(!good.matches(&ids(&["R1"]), &ids(&["R2"])));
    Ok(())
}

#[test]
fn both_conditions_must_hold() -> Result<(), Report> {
    let tests = QcTests::from_reader(TESTS.as_bytes())?;
    let low_gc = tests.get("LOW_GC_ONLY").expect("test");

    assert!(low_gc.matches(&ids(&["R1"]), &ids(&["R6"])));
    assert!(!low_gc.matches(&ids(&["R1", "R6"]), &[]));
    assert!(!low_gc.matches(&ids(&["R2"]), &ids(&["R6"])));
    Ok(())
}

#[test]
fn determine_outcomes() -> Result<(), Report> {
    let tests = QcTests::from_reader(TESTS.as_bytes())?;

    let outcomes = tests.determine(&[], &ids(&["R1", "R2", "R3"]));
    assert_eq!(outcomes, ["PASS", "GOOD_ASSEMBLY"]);

    let outcomes = tests.determine(&ids(&["R3", "R5"]), &ids(&["R1"]));
    assert_eq!(outcomes, ["GOOD_ASSEMBLY", "LOW_COVERAGE", "CONTAMINATED"]);

    // failures no test accounts for
    let outcomes = tests.determine(&ids(&["R9"]), &[]);
    assert_eq!(outcomes, [FAIL]);

    // nothing evaluated at all
    let outcomes = tests.determine(&[], &[]);
    assert_eq!(outcomes, [PASS]);
    Ok(())
}

#[test]
fn resolve_outcome() -> Result<(), Report> {
    let tests = QcTests::from_reader(TESTS.as_bytes())?;

    // no failures always pass
    let resolved = tests.resolve(&ids(&["PASS", "GOOD_ASSEMBLY"]), &[]);
    assert_eq!(resolved.outcome_id, PASS);
    assert_eq!(resolved.action, "none");
    assert_eq!(resolved.priority, Some(1));

    // highest priority wins
    let failed = ids(&["R3", "R5"]);
    let resolved = tests.resolve(&tests.determine(&failed, &[]), &failed);
    assert_eq!(resolved.outcome_id, "CONTAMINATED");
    assert_eq!(resolved.action, "reject");

    // first in file order wins ties
    let matched = ids(&["LOW_COVERAGE", "CONTAMINATED", "LOW_GC_ONLY"]);
    let resolved = tests.resolve(&matched, &ids(&["R1"]));
    assert_eq!(resolved.outcome_id, "CONTAMINATED");

    // generic failure
    let resolved = tests.resolve(&ids(&[FAIL]), &ids(&["R9"]));
    assert_eq!(resolved.outcome_id, FAIL);
    assert_eq!(resolved.action, NO_ACTION);
    assert_eq!(resolved.priority, None);
    Ok(())
}

#[test]
fn resolve_without_pass_test() -> Result<(), Report> {
    let tests = QcTests::default();
    let resolved = tests.resolve(&[], &[]);
    assert_eq!(resolved.outcome_id, PASS);
    assert_eq!(resolved.action, NO_ACTION);
    Ok(())
}

#[test]
fn apply_priorities() -> Result<(), Report> {
    let mut tests = QcTests::from_reader(TESTS.as_bytes())?;
    let priorities = BTreeMap::from([("LOW_COVERAGE".to_string(), 5), ("UNKNOWN".to_string(), 2)]);
    tests.apply_priorities(&priorities)?;
    assert_eq!(tests.get("LOW_COVERAGE").map(|t| t.priority), Some(5));

    let failed = ids(&["R3", "R5"]);
    let resolved = tests.resolve(&tests.determine(&failed, &[]), &failed);
    assert_eq!(resolved.outcome_id, "LOW_COVERAGE");

    let priorities = BTreeMap::from([("PASS".to_string(), 0)]);
    assert!(tests.apply_priorities(&priorities).is_err());
    Ok(())
}

use crate::rules::{Operator, Rule, Rules};
use color_eyre::eyre::{Report, Result};
use indoc::indoc;
use std::str::FromStr;
use strum::IntoEnumIterator;

const RULES: &str = indoc! {"
    rule_id\tspecies\tassembly_type\tsoftware\tfield\toperator\tvalue\tspecial_field\tnotes
    R1\tall\tall\t\tGC\t>=\t40\t\tignored column
    R2\tEscherichia coli\tshort\tspades\tN50\t>\t50000\t\t
    R3\tall\tlong\tflye\tspecies\tregex\tEscherichia|Shigella\t\t
    R4\tall\tall\t\tnotes\tcontains\tok\tcomment\t
"};

fn rule(species: &str, assembly_type: &str, software: &str) -> Rule {
    Rule {
        rule_id: "R".to_string(),
        species: species.to_string(),
        assembly_type: assembly_type.to_string(),
        software: software.to_string(),
        field: "GC".to_string(),
        operator: Operator::Equal,
        value: "50".to_string(),
        special_field: String::new(),
    }
}

#[test]
fn read_rules() -> Result<(), Report> {
    let rules = Rules::from_reader(RULES.as_bytes())?;
    assert_eq!(rules.len(), 4);

    let r2 = rules.get("R2").expect("R2");
    assert_eq!(r2.species, "Escherichia coli");
    assert_eq!(r2.operator, Operator::Greater);
    assert_eq!(r2.value, "50000");
    assert_eq!(rules.get("R4").map(|r| r.special_field.as_str()), Some("comment"));

    let ids: Vec<_> = rules.iter().map(|r| r.rule_id.as_str()).collect();
    assert_eq!(ids, ["R1", "R2", "R3", "R4"]);
    Ok(())
}

#[test]
fn optional_columns() -> Result<(), Report> {
    let text = "rule_id\tspecies\tassembly_type\tfield\toperator\tvalue\nR1\tall\tall\tGC\t<\t60\n";
    let rules = Rules::from_reader(text.as_bytes())?;
    assert_eq!(rules.rules[0].software, "");
    assert_eq!(rules.rules[0].special_field, "");
    Ok(())
}

#[test]
fn trailing_empty_fields_can_be_stripped() -> Result<(), Report> {
    let text = "rule_id\tspecies\tassembly_type\tsoftware\tfield\toperator\tvalue\tspecial_field\nR1\tall\tall\t\tGC\t>=\t40\nR2\tall\tall\t\tN50\t>\t50000\t\n";
    let rules = Rules::from_reader(text.as_bytes())?;
    assert_eq!(rules.len(), 2);
    assert_eq!(rules.rules[0].value, "40");
    assert_eq!(rules.rules[0].special_field, "");

    // extra fields are not
    let text = "rule_id\tspecies\tassembly_type\tfield\toperator\tvalue\nR1\tall\tall\tGC\t>=\t40\tx\n";
    assert!(Rules::from_reader(text.as_bytes()).is_err());
    Ok(())
}

#[test]
fn invalid_rules() {
    let header = "rule_id\tspecies\tassembly_type\tfield\toperator\tvalue\n";

    // duplicate id
    let text = format!("{header}R1\tall\tall\tGC\t<\t60\nR1\tall\tall\tGC\t>\t30\n");
    assert!(Rules::from_reader(text.as_bytes()).is_err());

    // unknown operator
    let text = format!("{header}R1\tall\tall\tGC\t~\t60\n");
    assert!(Rules::from_reader(text.as_bytes()).is_err());

    // pattern doesn't compile
    let text = format!("{header}R1\tall\tall\tGC\tregex\t(unclosed\n");
    assert!(Rules::from_reader(text.as_bytes()).is_err());

    // missing required column
    let text = "rule_id\tfield\toperator\tvalue\nR1\tGC\t<\t60\n";
    assert!(Rules::from_reader(text.as_bytes()).is_err());
}

#[test]
fn regex_is_anchored_at_start() -> Result<(), Report> {
    let rules = Rules::from_reader(RULES.as_bytes())?;
    let patterns = rules.compile()?;
    assert_eq!(patterns.len(), 1);

    let regex = &patterns["R3"];
    assert!(regex.is_match("Escherichia coli"));
    assert!(regex.is_match("Shigella sonnei"));
    assert!(!regex.is_match("Not Escherichia"));
    Ok(())
}

#[test]
fn operators() -> Result<(), Report> {
    for operator in Operator::iter() {
        assert_eq!(Operator::from_str(&operator.to_string())?, operator);
    }
    Ok(())
}

#[test]
fn species_scope() {
    let r = rule("Escherichia coli", "all", "");
    assert!(r.in_scope("Escherichia coli", "short", None));
    assert!(r.in_scope("  ESCHERICHIA COLI ", "short", None));
    assert!(!r.in_scope("Salmonella enterica", "short", None));
    // an empty species only matches 'all'
    assert!(!r.in_scope("", "short", None));
    assert!(rule("ALL", "all", "").in_scope("", "short", None));
    assert!(!rule("", "all", "").in_scope("", "short", None));
    assert!(!rule("", "all", "").in_scope("Escherichia coli", "short", None));
}

#[test]
fn assembly_type_scope() {
    let r = rule("all", "Short", "");
    assert!(r.in_scope("x", "short", None));
    assert!(!r.in_scope("x", "long", None));
    assert!(rule("all", "All", "").in_scope("x", "hybrid", None));
}

#[test]
fn software_scope() {
    let allowed = vec!["SPAdes".to_string(), "skesa".to_string()];

    assert!(rule("all", "all", "spades").in_scope("x", "short", Some(allowed.as_slice())));
    assert!(!rule("all", "all", "flye").in_scope("x", "short", Some(allowed.as_slice())));
    // rules without software always apply
    assert!(rule("all", "all", "").in_scope("x", "short", Some(allowed.as_slice())));
    // without an override every software applies
    assert!(rule("all", "all", "flye").in_scope("x", "short", None));
}

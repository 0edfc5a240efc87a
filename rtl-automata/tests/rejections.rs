//! Descriptions that must be rejected before anything is emitted.

use rstest::rstest;
use rtl_automata::{Error, Machine};

fn build(fixture: &str) -> Error {
    let path = format!("{}/tests/fail/{fixture}.yaml", env!("CARGO_MANIFEST_DIR"));
    let text = std::fs::read_to_string(&path).unwrap();
    Machine::from_yaml(&text).expect_err(fixture)
}

#[rstest]
#[case("unknown_output", "o2")]
#[case("unknown_output_index", "o1[2]")]
#[case("unknown_state", "S3")]
#[case("unknown_initial_state", "S0")]
fn reference_errors(#[case] fixture: &str, #[case] culprit: &str) {
    match build(fixture) {
        Error::Reference(message) => assert!(message.contains(culprit), "{message}"),
        other => panic!("{fixture}: unexpected {other:?}"),
    }
}

#[test]
fn second_default_arc() {
    match build("second_default_arc") {
        Error::Grammar { state, clause, .. } => {
            assert_eq!((state.as_str(), clause.as_str()), ("S1", "S1"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[rstest]
#[case("multi_key_port", "keys")]
#[case("state_named_next_register", "level_d")]
#[case("state_keyword", "begin")]
#[case("port_keyword", "wire")]
fn structural_errors(#[case] fixture: &str, #[case] culprit: &str) {
    match build(fixture) {
        Error::StructuralInput(message) => assert!(message.contains(culprit), "{message}"),
        other => panic!("{fixture}: unexpected {other:?}"),
    }
}

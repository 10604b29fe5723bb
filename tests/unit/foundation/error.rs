use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        FlythroughError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        FlythroughError::scene_read("x")
            .to_string()
            .contains("scene read error:")
    );
    assert!(
        FlythroughError::render("x")
            .to_string()
            .contains("render error:")
    );
    assert!(
        FlythroughError::interrupted("x")
            .to_string()
            .contains("interrupted:")
    );
    assert!(
        FlythroughError::format_negotiation("x")
            .to_string()
            .contains("format negotiation error:")
    );
    assert!(FlythroughError::sink("x").to_string().contains("sink error:"));
    assert!(
        FlythroughError::pipeline("x")
            .to_string()
            .contains("pipeline error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = FlythroughError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn only_interrupted_is_classified_as_interruption() {
    assert!(FlythroughError::interrupted("ctrl-c").is_interrupted());
    assert!(!FlythroughError::render("ctrl-c").is_interrupted());
    assert!(!FlythroughError::sink("ctrl-c").is_interrupted());
}

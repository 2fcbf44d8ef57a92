#![cfg(feature = "integration-tests")]

use std::{cell::RefCell, rc::Rc};

use fell_ngin::{config::SceneConfig, flow};

use crate::common::test_utils::ClosingForest;

mod common;

// winit allows one event loop per process, so the whole scene runs once here.
#[test]
fn forest_runs_and_fells_everything_on_close() {
    let config = SceneConfig::default();
    let window = config.window.clone();
    let counts = Rc::new(RefCell::new(Vec::new()));

    let result = flow::run(
        window,
        vec![ClosingForest::constructor(config, 10, counts.clone())],
    );

    assert!(result.is_ok(), "{:?}", result.err());
    // Three planted trees, all released on the first close, nothing left for the second.
    assert_eq!(*counts.borrow(), vec![3, 0, 0]);
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Full runs from a slice directory to a written report.

use std::path::Path;

use fibergt_processing::{Error, NetworkReport, Pipeline, PipelineConfig};
use image::{GrayImage, Luma};

/// Bright plus sign with 5-pixel arms on a dark 60×60 background.
fn write_plus(dir: &Path, name: &str) {
    let img = GrayImage::from_fn(60, 60, |x, y| {
        let horizontal = (5..55).contains(&x) && (28..33).contains(&y);
        let vertical = (28..33).contains(&x) && (5..55).contains(&y);
        if horizontal || vertical {
            Luma([220])
        } else {
            Luma([20])
        }
    });
    img.save(dir.join(name)).unwrap();
}

const CONFIG: &str = r#"{
    "weighting": ["length", "width", "fixed_width_conductance"],
    "params": {"junction_resistance": {"finite": 1.0}},
    "analyses": {
        "electronic": {"axis": 0, "boundary_1": [0, 15], "boundary_2": [45, 60]},
        "betweenness": {
            "boundary": {"axis": 0, "boundary_1": [0, 15], "boundary_2": [45, 60]},
            "weight": "length",
            "random_walk": "linear"
        },
        "nodal_connectivity": true
    }
}"#;

#[test]
fn plus_sign_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_plus(dir.path(), "slice0.png");
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, CONFIG).unwrap();

    let pipeline = Pipeline::new(PipelineConfig::from_path(&config_path).unwrap()).unwrap();
    let output = pipeline.run_directory(dir.path()).unwrap();
    let report = &output.report;

    assert!(output.graph.is_connected());
    assert!(report.structural["node_count"] >= 5.0);

    // only the left and right tips sit inside the slabs
    assert_eq!(report.electronic["source_terminals"], 1.0);
    assert_eq!(report.electronic["sink_terminals"], 1.0);
    let r = report.electronic["effective_resistance"];
    assert!(r.is_finite() && r > 0.0);

    // chords through the crossing widen the mean past the arm thickness
    let width = report.geometric["width_mean"];
    assert!(width > 4.0 && width < 30.0, "mean width {width}");
    assert!(report.betweenness["edge_max"] <= 1.0 + 1e-12);
    assert!(report.betweenness["random_walk_edge_max"] > 0.0);

    for stage in ["load", "extract", "build", "analysis", "total"] {
        assert!(report.timings_ms.contains_key(stage), "missing timing {stage}");
    }

    let out = dir.path().join("report.json");
    report.write(&out).unwrap();
    let reloaded = NetworkReport::from_json(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(&reloaded, report);
}

#[test]
fn directory_without_slices_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "no images here").unwrap();
    let err = Pipeline::default().run_directory(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        Error::Vision(fibergt_vision::Error::ImageDirectory(_))
    ));
}

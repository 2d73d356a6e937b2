//! Integration tests for the Page-Stripper stage.

mod common;

use common::{file_names, page_texts, workspace, write_corrupt, write_pdf};
use taxpack::{PageStripper, PipelineOptions, SkipCode};

#[test]
fn strips_leading_pages_and_moves_output() {
    let (_root, dirs) = workspace();
    let source = dirs.company.join("acme").join("FTFCS_0001.pdf");
    write_pdf(&source, &["cover", "instructions", "form p1", "form p2"]);

    let options = PipelineOptions::default();
    let report = PageStripper::new(&options)
        .run(&dirs.company, &dirs.federal)
        .unwrap();

    assert!(report.is_clean());
    let output = dirs.federal.join("FTFCS_0001.pdf");
    assert_eq!(report.value, vec![output.clone()]);
    assert_eq!(page_texts(&output), vec!["form p1", "form p2"]);
    assert!(!source.exists(), "source must be removed after a durable write");
}

#[test]
fn only_federal_filings_in_subfolders_are_touched() {
    let (_root, dirs) = workspace();
    write_pdf(&dirs.company.join("a").join("FTFCS_1.pdf"), &["c", "c", "keep"]);
    write_pdf(&dirs.company.join("a").join("STFCS_1.pdf"), &["c", "c", "state"]);
    write_pdf(&dirs.company.join("b").join("FTFCS_2.pdf"), &["c", "c", "keep"]);
    write_pdf(&dirs.company.join("FTFCS_loose.pdf"), &["c", "c", "loose"]);

    let options = PipelineOptions::default();
    let report = PageStripper::new(&options)
        .run(&dirs.company, &dirs.federal)
        .unwrap();

    assert_eq!(report.value.len(), 2);
    assert_eq!(file_names(&dirs.federal), vec!["FTFCS_1.pdf", "FTFCS_2.pdf"]);
    assert!(dirs.company.join("a").join("STFCS_1.pdf").exists());
    assert!(dirs.company.join("FTFCS_loose.pdf").exists());
}

#[test]
fn short_and_corrupt_files_are_skipped_and_kept() {
    let (_root, dirs) = workspace();
    let folder = dirs.company.join("acme");
    write_pdf(&folder.join("FTFCS_a.pdf"), &["only page"]);
    write_corrupt(&folder.join("FTFCS_b.pdf"));
    write_pdf(&folder.join("FTFCS_c.pdf"), &["c", "c", "body"]);

    let options = PipelineOptions::default();
    let report = PageStripper::new(&options)
        .run(&dirs.company, &dirs.federal)
        .unwrap();

    assert_eq!(report.value, vec![dirs.federal.join("FTFCS_c.pdf")]);
    assert_eq!(report.count(&SkipCode::InsufficientPages), 1);
    assert_eq!(report.count(&SkipCode::UnreadableDocument), 1);
    assert!(folder.join("FTFCS_a.pdf").exists());
    assert!(folder.join("FTFCS_b.pdf").exists());
    assert!(!folder.join("FTFCS_c.pdf").exists());
}

#[test]
fn failed_write_keeps_the_source() {
    let (_root, dirs) = workspace();
    let source = dirs.company.join("acme").join("FTFCS_0001.pdf");
    write_pdf(&source, &["c", "c", "body"]);
    // A directory squatting on the output name makes the rename fail.
    std::fs::create_dir_all(dirs.federal.join("FTFCS_0001.pdf")).unwrap();

    let options = PipelineOptions::default();
    let report = PageStripper::new(&options)
        .run(&dirs.company, &dirs.federal)
        .unwrap();

    assert!(report.value.is_empty());
    assert_eq!(report.count(&SkipCode::WriteFailed), 1);
    assert!(source.exists());
}

#[test]
fn custom_strip_count() {
    let (_root, dirs) = workspace();
    write_pdf(&dirs.company.join("x").join("FTFCS_1.pdf"), &["a", "b", "c"]);

    let options = PipelineOptions {
        strip_pages: 1,
        ..PipelineOptions::default()
    };
    PageStripper::new(&options)
        .run(&dirs.company, &dirs.federal)
        .unwrap();
    assert_eq!(page_texts(&dirs.federal.join("FTFCS_1.pdf")), vec!["b", "c"]);
}

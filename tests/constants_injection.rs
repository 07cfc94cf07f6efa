//! Constants injection over a copied families workspace.

use assert_matches::assert_matches;
use dcp_codegen::constants::{InjectOptions, inject_constants};
use dcp_codegen::writer::SafeFileWriter;
use dcp_codegen::{DocumentStatus, RegionMarkers};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

// =============================================================================
// Helpers
// =============================================================================

fn fixture_families() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/families")
}

/// Copy the fixture families into a scratch directory.
fn families_workspace() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    let root = fixture_families();
    for entry in WalkDir::new(&root) {
        let entry = entry.expect("walk fixtures");
        let relative = entry.path().strip_prefix(&root).expect("inside root");
        let target = dir.path().join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).expect("create dir");
        } else {
            fs::copy(entry.path(), &target).expect("copy fixture");
        }
    }
    dir
}

fn options(dir: &Path) -> InjectOptions {
    InjectOptions {
        families_dir: dir.to_path_buf(),
        family_files: Vec::new(),
        markers: RegionMarkers::default(),
    }
}

fn method_file(dir: &Path) -> PathBuf {
    dir.join("Method.contract.php")
}

// =============================================================================
// Injection
// =============================================================================

#[test]
fn test_constants_replace_region_in_declaration_order() {
    let dir = families_workspace();

    let report = inject_constants(&options(dir.path()), &SafeFileWriter::new());

    assert_eq!(report.written, 1, "{}", report.summary());
    assert!(!report.has_failures());
    let content = fs::read_to_string(method_file(dir.path())).unwrap();
    assert!(content.contains(
        "    /**ATTR**/\n\
         \x20   const ct_fr_ident = 'ct_fr_ident';\n\
         \x20   const ct_title = 'ct_title';\n\
         \x20   const ct_amount = 'ct_amount';\n\
         \x20   const ct_default_delay = 'ct_default_delay';\n\
         \x20   /**ATTR**/\n"
    ));
    assert!(!content.contains("ct_obsolete"));
    assert!(content.contains("return $this->getRawValue(self::ct_title);"));
}

#[test]
fn test_second_run_leaves_method_file_unchanged() {
    let dir = families_workspace();
    let writer = SafeFileWriter::new();
    inject_constants(&options(dir.path()), &writer);
    let first = fs::read_to_string(method_file(dir.path())).unwrap();

    let report = inject_constants(&options(dir.path()), &writer);

    assert_eq!(report.unchanged, 1);
    assert_eq!(report.written, 0);
    assert_eq!(fs::read_to_string(method_file(dir.path())).unwrap(), first);
}

#[test]
fn test_backup_keeps_previous_method_file() {
    let dir = families_workspace();
    let before = fs::read_to_string(method_file(dir.path())).unwrap();

    inject_constants(
        &options(dir.path()),
        &SafeFileWriter::new().with_backups(true),
    );

    let backup = dir.path().join("Method.contract.php.bak");
    assert_eq!(fs::read_to_string(backup).unwrap(), before);
}

#[test]
fn test_marker_rename_is_migrated() {
    let dir = families_workspace();
    let mut options = options(dir.path());
    options.markers = RegionMarkers::symmetric(dcp_codegen::Marker::migrating(
        "/**ATTR**/",
        "/**CONSTANTS**/",
    ));

    let report = inject_constants(&options, &SafeFileWriter::new());

    assert_eq!(report.written, 1);
    let content = fs::read_to_string(method_file(dir.path())).unwrap();
    assert_eq!(content.matches("/**CONSTANTS**/").count(), 2);
    assert!(!content.contains("/**ATTR**/"));
}

// =============================================================================
// Per-document failures
// =============================================================================

#[test]
fn test_missing_param_file_is_skipped_not_failed() {
    let dir = families_workspace();
    fs::remove_file(dir.path().join("contract/PARAM_CONTRACT.csv")).unwrap();
    let before = fs::read_to_string(method_file(dir.path())).unwrap();

    let report = inject_constants(&options(dir.path()), &SafeFileWriter::new());

    assert_eq!(report.skipped, 1);
    assert!(!report.has_failures());
    assert_matches!(
        &report.documents[0].status,
        DocumentStatus::Skipped { code: "source_missing", .. }
    );
    assert_eq!(fs::read_to_string(method_file(dir.path())).unwrap(), before);
}

#[test]
fn test_missing_marker_fails_without_touching_file() {
    let dir = families_workspace();
    let stripped = "<?php\nclass ContractMethods {}\n";
    fs::write(method_file(dir.path()), stripped).unwrap();

    let report = inject_constants(&options(dir.path()), &SafeFileWriter::new());

    assert!(report.has_failures());
    assert_matches!(
        &report.documents[0].status,
        DocumentStatus::Failed { code: "marker_not_found", .. }
    );
    assert_eq!(fs::read_to_string(method_file(dir.path())).unwrap(), stripped);
}

#[test]
fn test_unterminated_region_fails_without_touching_file() {
    let dir = families_workspace();
    let broken = "<?php\nclass ContractMethods {\n    /**ATTR**/\n    const a = 'a';\n}\n";
    fs::write(method_file(dir.path()), broken).unwrap();
    // Symmetric markers: a single occurrence never closes.
    let report = inject_constants(&options(dir.path()), &SafeFileWriter::new());

    assert_matches!(
        &report.documents[0].status,
        DocumentStatus::Failed { code: "unterminated_region", .. }
    );
    assert_eq!(fs::read_to_string(method_file(dir.path())).unwrap(), broken);
}

#[test]
fn test_second_method_file_in_struct_is_an_error() {
    let dir = families_workspace();
    let struct_file = dir.path().join("contract/STRUCT_CONTRACT.csv");
    let mut content = fs::read_to_string(&struct_file).unwrap();
    content = content.replace("END\n", "METHOD;Method.other.php\nEND\n");
    fs::write(&struct_file, content).unwrap();

    let report = inject_constants(&options(dir.path()), &SafeFileWriter::new());

    assert_matches!(
        &report.documents[0].status,
        DocumentStatus::Failed { code: "duplicate_method", .. }
    );
}

#[test]
fn test_duplicate_attribute_is_injected_once_with_warning() {
    let dir = families_workspace();
    let struct_file = dir.path().join("contract/STRUCT_CONTRACT.csv");
    let content = fs::read_to_string(&struct_file).unwrap().replace(
        "END\n",
        "ATTR;CT_TITLE;CT_FR_IDENT;Titre;N;N;text;50;W;;;;;;;\nEND\n",
    );
    fs::write(&struct_file, content).unwrap();

    let report = inject_constants(&options(dir.path()), &SafeFileWriter::new());

    assert_eq!(report.written, 1);
    assert_eq!(report.warning_count, 1);
    assert_eq!(
        report.documents[0].warnings,
        ["ct_title declared again at line 10 (first at line 7)"]
    );
    let content = fs::read_to_string(method_file(dir.path())).unwrap();
    assert_eq!(content.matches("const ct_title = 'ct_title';").count(), 1);
    assert!(content.contains(
        "    const ct_fr_ident = 'ct_fr_ident';\n    const ct_title = 'ct_title';\n"
    ));
}

#[test]
fn test_param_without_method_is_skipped() {
    let dir = families_workspace();
    fs::write(
        dir.path().join("contract/PARAM_CONTRACT.csv"),
        "BEGIN;;;;;CONTRACT\nEND\n",
    )
    .unwrap();

    let report = inject_constants(&options(dir.path()), &SafeFileWriter::new());

    assert_eq!(report.skipped, 1);
    assert!(!report.has_failures());
    assert_matches!(
        &report.documents[0].status,
        DocumentStatus::Skipped { code: "no_method_declared", .. }
    );
}

#[test]
fn test_missing_method_file_is_skipped() {
    let dir = families_workspace();
    fs::remove_file(method_file(dir.path())).unwrap();

    let report = inject_constants(&options(dir.path()), &SafeFileWriter::new());

    assert_eq!(report.skipped, 1);
    assert_matches!(
        &report.documents[0].status,
        DocumentStatus::Skipped { code: "source_missing", reason }
            if reason.starts_with("method file ")
    );
    assert!(!method_file(dir.path()).exists());
}

#[test]
fn test_failure_does_not_stop_the_batch() {
    let dir = families_workspace();
    let other = dir.path().join("invoice");
    fs::create_dir_all(&other).unwrap();
    fs::write(
        other.join("STRUCT_INVOICE.csv"),
        "BEGIN;;Facture;;;INVOICE\nATTR;IN_NUMBER;;Numéro\nEND\n",
    )
    .unwrap();
    fs::write(
        other.join("PARAM_INVOICE.csv"),
        "BEGIN;;;;;INVOICE\nMETHOD;Method.invoice.php\nEND\n",
    )
    .unwrap();
    fs::write(dir.path().join("Method.invoice.php"), "<?php\n").unwrap();

    let report = inject_constants(&options(dir.path()), &SafeFileWriter::new());

    assert_eq!(report.total(), 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.written, 1);
}

// =============================================================================
// Discovery
// =============================================================================

#[test]
fn test_only_struct_csv_files_are_discovered() {
    let dir = families_workspace();
    fs::write(dir.path().join("contract/NOTES.csv"), "ATTR;X\n").unwrap();
    fs::write(dir.path().join("contract/STRUCT_README.txt"), "ATTR;X\n").unwrap();

    let files = dcp_codegen::constants::discover_family_files(dir.path()).unwrap();

    assert_eq!(files, vec![dir.path().join("contract/STRUCT_CONTRACT.csv")]);
}

#[test]
fn test_unreadable_families_dir_fails_the_batch() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("Families");

    let report = inject_constants(&options(&missing), &SafeFileWriter::new());

    assert!(report.has_failures());
    assert_eq!(report.total(), 1);
    assert_matches!(
        &report.documents[0].status,
        DocumentStatus::Failed { code: "discovery_failed", .. }
    );
    assert_eq!(report.documents[0].source, missing);
}

#[test]
fn test_explicit_family_file_restricts_the_batch() {
    let dir = families_workspace();
    let mut options = options(dir.path());
    options.family_files = vec![dir.path().join("contract/STRUCT_CONTRACT.csv")];
    fs::write(dir.path().join("STRUCT_BROKEN.csv"), "METHOD;Missing.php\n").unwrap();

    let report = inject_constants(&options, &SafeFileWriter::new());

    assert_eq!(report.total(), 1);
    assert_eq!(report.written, 1);
}

//! End-to-end repository scenarios over the real filesystem

mod common;

use std::fs;

use common::fixtures::{load_fixture, temp_repository};
use imcite_core::{Citekey, RepoConfig, Repository};
use tempfile::TempDir;

// === The life of a paper ===

#[test]
fn test_import_attach_and_remove() {
    let (dir, repo) = temp_repository();

    let entry = imcite_bibtex::parse_one(&load_fixture("pagerank.bib")).unwrap();
    let citekey = repo.import(entry, None, false).unwrap();
    assert_eq!(citekey.as_str(), "Page99");

    let source = dir.path().join("downloads/pagerank.pdf");
    fs::create_dir_all(source.parent().unwrap()).unwrap();
    fs::write(&source, b"%PDF-1.4").unwrap();

    let stored = repo.attach_doc(&citekey, &source, false).unwrap();
    assert!(stored.ends_with("doc/Page99.pdf"));
    assert!(stored.exists());

    let paper = repo.load_paper(&citekey).unwrap();
    assert_eq!(repo.broker().document_path(&paper).unwrap(), stored);
    assert!(repo.citekeys().unwrap().contains(&citekey));

    repo.remove(&citekey).unwrap();
    assert!(repo.citekeys().unwrap().is_empty());
    assert!(!stored.exists());
}

#[test]
fn test_import_a_whole_export_file() {
    let (_dir, repo) = temp_repository();
    let parsed = imcite_bibtex::parse(&load_fixture("collection.bib"));
    assert!(parsed.issues.is_empty());

    let mut keys = Vec::new();
    for entry in parsed.entries {
        keys.push(repo.import(entry, None, false).unwrap());
    }

    assert_eq!(
        keys.iter().map(Citekey::as_str).collect::<Vec<_>>(),
        vec!["Turing1950", "Knuth1984", "Godel1931"]
    );
    assert_eq!(repo.citekeys().unwrap().len(), 3);
}

#[test]
fn test_reimport_same_record_gets_suffixed_key() {
    let (_dir, repo) = temp_repository();
    let raw = load_fixture("pagerank.bib");

    let first = repo
        .import(imcite_bibtex::parse_one(&raw).unwrap(), None, false)
        .unwrap();
    let second = repo
        .import(imcite_bibtex::parse_one(&raw).unwrap(), None, false)
        .unwrap();

    assert_eq!(first.as_str(), "Page99");
    assert_eq!(second.as_str(), "Page99a");
}

// === Renaming ===

#[test]
fn test_rename_moves_files_and_rewrites_the_stored_key() {
    let (dir, repo) = temp_repository();
    let root = dir.path().join("paperlib");

    let entry = imcite_bibtex::parse_one(&load_fixture("pagerank.bib")).unwrap();
    let old = repo.import(entry, None, false).unwrap();

    let source = dir.path().join("pagerank.pdf");
    fs::write(&source, b"%PDF").unwrap();
    repo.attach_doc(&old, &source, false).unwrap();
    fs::write(root.join("notes/Page99.md"), "# notes\n").unwrap();

    let new = repo.rename(&old, "PageBrin99").unwrap();
    assert_eq!(new.as_str(), "PageBrin99");
    assert!(!root.join("bib/Page99.bib").exists());
    assert!(root.join("doc/PageBrin99.pdf").exists());
    assert!(root.join("notes/PageBrin99.md").exists());

    let raw = fs::read_to_string(root.join("bib/PageBrin99.bib")).unwrap();
    assert!(raw.starts_with("@techreport{PageBrin99,"));
}

// === External documents ===

#[test]
fn test_external_document_round_trips_through_the_meta_file() {
    let (dir, repo) = temp_repository();
    let entry = imcite_bibtex::parse_one(&load_fixture("pagerank.bib")).unwrap();
    let k = repo.import(entry, None, false).unwrap();

    let external = dir.path().join("library/pagerank.pdf");
    fs::create_dir_all(external.parent().unwrap()).unwrap();
    fs::write(&external, b"%PDF").unwrap();

    let recorded = repo.attach_external(&k, &external).unwrap();
    assert_eq!(recorded, external);
    // The file stays where it is; nothing lands in the store.
    assert!(!dir.path().join("paperlib/doc/Page99.pdf").exists());

    let paper = repo.load_paper(&k).unwrap();
    assert_eq!(repo.broker().document_path(&paper).unwrap(), external);
}

// === Metadata as a shared file ===

#[test]
fn test_unknown_metadata_fields_survive_editing() {
    let (dir, repo) = temp_repository();
    let entry = imcite_bibtex::parse_one(&load_fixture("pagerank.bib")).unwrap();
    let k = repo.import(entry, None, false).unwrap();

    // Another tool wrote its own fields into the meta file.
    let meta_path = dir.path().join("paperlib/meta/Page99.yaml");
    fs::write(
        &meta_path,
        "tags: [search, seminal]\nrating: 5\nadded: 2016-03-01\n",
    )
    .unwrap();

    let mut paper = repo.load_paper(&k).unwrap();
    assert_eq!(paper.meta.tags(), vec!["search", "seminal"]);

    paper.meta.add_tag("web");
    repo.save_paper(&paper).unwrap();

    let raw = fs::read_to_string(&meta_path).unwrap();
    assert!(raw.contains("rating: 5"));
    assert!(raw.contains("web"));
}

// === Configuration ===

#[test]
fn test_config_round_trip_and_reopen() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config/imcite.toml");
    let config =
        RepoConfig::new(dir.path().join("paperlib")).with_docdir(dir.path().join("documents"));
    config.save(&config_path).unwrap();

    let loaded = RepoConfig::load(&config_path).unwrap();
    assert_eq!(loaded, config);

    let repo = Repository::create(&loaded).unwrap();
    let entry = imcite_bibtex::parse_one(&load_fixture("pagerank.bib")).unwrap();
    let citekey = repo.import(entry, None, false).unwrap();

    let source = dir.path().join("pagerank.pdf");
    fs::write(&source, b"%PDF").unwrap();
    let stored = repo.attach_doc(&citekey, &source, false).unwrap();
    // Documents land in the configured directory, not under the root.
    assert!(stored.starts_with(dir.path().join("documents")));
    assert!(stored.exists());

    // A fresh handle over the same config sees the paper.
    let reopened = Repository::open(&loaded).unwrap();
    assert!(reopened.citekeys().unwrap().contains(&citekey));
}

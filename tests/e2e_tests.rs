// End-to-End Pipeline tests
// History import, activity and a full scan against a file-backed database

mod common;

use scmsweep::history::HistoryImporter;
use scmsweep::model::{AuthorIdentity, BranchDetails, BranchKind, PoStats};
use scmsweep::repository::{Database, UnitOfWork};
use scmsweep::scanner::{ACTIVITY_FILE, ActivitySeries, GRAPHS, ModuleScanner, ScanOptions, update_activity};
use tempfile::TempDir;

use common::{FakeSource, Workspace, commit, svn_module};

const DE_PO: &str = r#"msgid ""
msgstr ""
"Content-Type: text/plain; charset=UTF-8\n"

msgid "Text Editor"
msgstr "Texteditor"

#, fuzzy
msgid "Edit text files"
msgstr "Textdateien"

msgid "Open"
msgstr ""
"#;

/// Create a test database in a temp directory
async fn create_db_in_dir(dir: &TempDir) -> Database {
    let db_path = dir.path().join("test.db");
    let db = Database::new(db_path.to_str().unwrap()).await.unwrap();
    db.init_schema().await.unwrap();
    db
}

#[tokio::test]
async fn test_svn_history_resumes() {
    let ws = Workspace::new();
    let db = create_db_in_dir(&ws.dir).await;
    let mut branch = svn_module("gedit");
    assert_eq!(branch.ident, "/mod/svn.gnome.org/gedit/trunk");
    db.save_branch(&branch).await.unwrap();

    let source = FakeSource::new(
        "gnome.org",
        vec![
            commit("40", AuthorIdentity::userid("jdoe"), 1_199_000_000, &["trunk/gedit/gedit.c"]),
            commit("41", AuthorIdentity::userid("jroe"), 1_199_100_000, &["trunk/po/de.po"]),
        ],
    );

    let first = HistoryImporter::new(&db).import_history(&mut branch, &source).await.unwrap();
    assert_eq!(first.imported, 2);
    let second = HistoryImporter::new(&db).import_history(&mut branch, &source).await.unwrap();
    assert!(second.skipped);

    let stored = db.get_branch(&branch.ident).await.unwrap().unwrap();
    assert_eq!(stored.mod_datetime, Some(1_199_100_000));
    assert_eq!(stored.mod_person.as_deref(), Some("/person/jroe@gnome.org"));
}

#[tokio::test]
async fn test_activity_output_is_written_once_per_week() {
    let ws = Workspace::new();
    let db = create_db_in_dir(&ws.dir).await;
    let mut branch = svn_module("gedit");
    db.save_branch(&branch).await.unwrap();

    let now = 1_200_000_000;
    let commits = (0..10).map(|i| commit(&i.to_string(), AuthorIdentity::userid("jdoe"), now - i * 3_600, &[])).collect();
    let source = FakeSource::new("gnome.org", commits);
    HistoryImporter::new(&db).import_history(&mut branch, &source).await.unwrap();

    let web = &ws.config.web_files_root;
    let mut unit = UnitOfWork::new();
    assert!(update_activity(&db, &mut branch, &mut unit, web, true, now).await.unwrap());
    unit.stage_branch(branch.clone());
    db.apply_unit(&unit, web).await.unwrap();
    assert!(branch.score > 0);

    let file = db.get_output_file(GRAPHS, &branch.ident, ACTIVITY_FILE).await.unwrap().unwrap();
    let series: ActivitySeries = serde_json::from_value(file.data.clone()).unwrap();
    assert_eq!(series.revcount, 10);
    let on_disk = std::fs::read(file.path_under(web)).unwrap();
    assert_eq!(serde_json::from_slice::<ActivitySeries>(&on_disk).unwrap(), series);

    // Same week, same commits: nothing to recompute
    let mut unit = UnitOfWork::new();
    assert!(!update_activity(&db, &mut branch, &mut unit, web, true, now).await.unwrap());
    assert!(unit.is_empty());
    // Unless stamps are ignored
    assert!(update_activity(&db, &mut branch, &mut unit, web, false, now).await.unwrap());
}

#[tokio::test]
async fn test_scan_translations_then_delete() {
    let ws = Workspace::new();
    let db = create_db_in_dir(&ws.dir).await;
    let module = svn_module("gedit");
    db.save_branch(&module).await.unwrap();
    ws.checkout(
        &module,
        &[
            ("po/POTFILES.in", "gedit/gedit.c\n"),
            ("po/LINGUAS", "# sorted\nde fr\n"),
            ("po/de.po", DE_PO),
            (".svn/entries", "10\n"),
        ],
    );

    let options = ScanOptions { history: false, timestamps: true, update: false };
    let report = ModuleScanner::new(&db, &ws.config, options).scan(module.clone()).await.unwrap();
    assert!(report.is_ok(), "{:?}", report.error);

    let domain_ident = "/i18n/svn.gnome.org/gedit/po/trunk";
    let domain = db.get_branch(domain_ident).await.unwrap().unwrap();
    assert_eq!(domain.kind(), BranchKind::Domain);
    assert_eq!(domain.parent.as_deref(), Some(module.ident.as_str()));
    assert_eq!(domain.scm_dir.as_deref(), Some("po"));

    let translations = db.children(domain_ident, Some(BranchKind::Translation)).await.unwrap();
    let idents: Vec<&str> = translations.iter().map(|t| t.ident.as_str()).collect();
    assert_eq!(idents, ["/l10n/de/i18n/svn.gnome.org/gedit/po/trunk", "/l10n/fr/i18n/svn.gnome.org/gedit/po/trunk"]);

    let de = &translations[0];
    assert!(de.error.is_none());
    let BranchDetails::Translation { stats: Some(stats), .. } = &de.details else {
        panic!("no statistics for {}", de.ident);
    };
    assert_eq!(*stats, PoStats { translated: 1, fuzzy: 1, untranslated: 1, ..Default::default() });
    assert_eq!(translations[1].error.as_deref(), Some("Missing fr.po"));

    // fr leaves LINGUAS: its record goes away with the next scan
    let linguas = ws.checkout_dir(&module).join("po/LINGUAS");
    std::fs::write(&linguas, "de\n").unwrap();
    common::touch_later(&linguas);
    let report = ModuleScanner::new(&db, &ws.config, options).scan(module.clone()).await.unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(db.children(domain_ident, Some(BranchKind::Translation)).await.unwrap().len(), 1);

    let deleted = db.delete_branch(&module.ident, &ws.config.web_files_root).await.unwrap();
    assert_eq!(deleted, 3);
    assert!(db.get_branch(domain_ident).await.unwrap().is_none());
}

// Database integration tests
// Tests SQLite operations in isolation using in-memory database

mod common;

use scmsweep::model::{
    BranchDetails, BranchKind, BranchRecord, CommitFile, Entity, EntityKind, LocalizedText, OutputFile, Relation,
    RelationKind, RevisionRecord, TranslationSubtype,
};
use scmsweep::repository::{Database, SCHEMA_VERSION, UnitOfWork};

use common::{git_module, setup_db};

fn child(parent: &BranchRecord, prefix: &str, name: &str, details: BranchDetails) -> BranchRecord {
    let ident = parent.child_ident(prefix, name).unwrap();
    let mut record = BranchRecord::new(ident, parent.repo.clone(), details);
    record.parent = Some(parent.ident.clone());
    record
}

fn revision(branch: &str, id: &str, person: &str, datetime: i64, files: &[&str]) -> RevisionRecord {
    RevisionRecord {
        ident: RevisionRecord::ident_for(branch, id),
        branch_ident: branch.to_string(),
        person_ident: person.to_string(),
        alias_ident: None,
        revision: id.to_string(),
        datetime,
        comment: String::new(),
        files: files.iter().map(|f| CommitFile::new(*f, id, None)).collect(),
    }
}

#[tokio::test]
async fn test_schema_init() {
    let db = common::create_test_db().await;

    // First init should return true (schema was rebuilt/created)
    let rebuilt = db.init_schema().await.unwrap();
    assert!(rebuilt, "First init_schema should return true");

    // Second init should return false (schema exists and version matches)
    let rebuilt = db.init_schema().await.unwrap();
    assert!(!rebuilt, "Second init_schema should return false");

    let version = db.get_metadata("schema_version").await;
    assert_eq!(version.as_deref(), Some(SCHEMA_VERSION));
}

#[tokio::test]
async fn test_metadata_roundtrip() {
    let db = setup_db().await;

    db.set_metadata("test_key", "test_value").await.unwrap();
    assert_eq!(db.get_metadata("test_key").await.as_deref(), Some("test_value"));

    db.set_metadata("test_key", "updated_value").await.unwrap();
    assert_eq!(db.get_metadata("test_key").await.as_deref(), Some("updated_value"));

    assert!(db.get_metadata("nonexistent").await.is_none());
}

#[tokio::test]
async fn test_branch_roundtrip() {
    let db = setup_db().await;
    let module = git_module("gedit");
    let mut translation = child(
        &module,
        "l10n",
        "ignored",
        BranchDetails::Translation { subtype: TranslationSubtype::Intltool, stats: None },
    );
    translation.ident = "/l10n/de/i18n/git.gnome.org/gedit/po/master".to_string();
    translation.name = LocalizedText::c("German");
    translation.name.insert("de", "Deutsch");
    translation.scm_dir = Some("po".into());
    translation.scm_file = Some("de.po".into());

    db.save_branch(&module).await.unwrap();
    db.save_branch(&translation).await.unwrap();

    let loaded = db.get_branch(&translation.ident).await.unwrap().unwrap();
    assert_eq!(loaded, translation);
    assert_eq!(loaded.kind(), BranchKind::Translation);

    let modules = db.select_branches(BranchKind::Module, Some("/mod/git.gnome.org/%")).await.unwrap();
    assert_eq!(modules.len(), 1);
    assert!(db.select_branches(BranchKind::Module, Some("/mod/svn%")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_branch_error_is_stored_and_cleared() {
    let db = setup_db().await;
    let module = git_module("gedit");
    db.save_branch(&module).await.unwrap();

    db.set_branch_error(&module.ident, Some("fatal: repository not found")).await.unwrap();
    let loaded = db.get_branch(&module.ident).await.unwrap().unwrap();
    assert_eq!(loaded.error.as_deref(), Some("fatal: repository not found"));

    db.set_branch_error(&module.ident, None).await.unwrap();
    assert!(db.get_branch(&module.ident).await.unwrap().unwrap().error.is_none());
}

#[tokio::test]
async fn test_delete_cascades() {
    let db = setup_db().await;
    let web = tempfile::TempDir::new().unwrap();
    let module = git_module("gedit");
    let app = child(&module, "app", "gedit", BranchDetails::Application { exec: Some("gedit".into()) });
    let doc = child(&module, "doc", "gedit", BranchDetails::Domain);
    let person = Entity::new("/person/jdoe@gnome.org", EntityKind::Person);

    let graph = OutputFile {
        kind: "graphs".into(),
        ident: module.ident.clone(),
        filename: "commits-0.json".into(),
        datetime: 0,
        data: serde_json::json!({"weeknum": 1}),
    };
    let graph_path = graph.path_under(web.path());
    std::fs::create_dir_all(graph_path.parent().unwrap()).unwrap();
    std::fs::write(&graph_path, "{}").unwrap();

    let mut unit = UnitOfWork::new();
    unit.stage_branch(module.clone());
    unit.stage_branch(app.clone());
    unit.stage_branch(doc.clone());
    unit.set_relations(RelationKind::Documentation, &app.ident, vec![Relation::documentation(&app.ident, &doc.ident)]);
    unit.set_relations(RelationKind::ModuleEntity, &module.ident, vec![Relation::maintainer(&module.ident, &person.ident)]);
    unit.output_file(graph);
    db.apply_unit(&unit, web.path()).await.unwrap();
    db.insert_revision(&revision(&module.ident, "abc", &person.ident, 10, &["README"]), &person).await.unwrap();

    let deleted = db.delete_branch(&module.ident, web.path()).await.unwrap();
    assert_eq!(deleted, 3);
    for ident in [&module.ident, &app.ident, &doc.ident] {
        assert!(db.get_branch(ident).await.unwrap().is_none());
    }
    assert!(db.relations(RelationKind::Documentation, &app.ident).await.unwrap().is_empty());
    assert!(db.last_revision(&module.ident).await.unwrap().is_none());
    assert!(!graph_path.exists());
    // People outlive the branches they worked on
    assert!(db.get_entity(&person.ident).await.unwrap().is_some());
}

#[tokio::test]
async fn test_apply_unit_reconciles_one_kind() {
    let db = setup_db().await;
    let web = tempfile::TempDir::new().unwrap();
    let module = git_module("gnome-utils");
    let kept = child(&module, "app", "baobab", BranchDetails::Application { exec: None });
    let stale = child(&module, "app", "logview", BranchDetails::Application { exec: None });
    let library = child(&module, "lib", "libgdict-1.0", BranchDetails::Library);

    let mut unit = UnitOfWork::new();
    for record in [&module, &kept, &stale, &library] {
        unit.stage_branch(record.clone());
    }
    db.apply_unit(&unit, web.path()).await.unwrap();

    let mut unit = UnitOfWork::new();
    unit.reconcile(&module.ident, BranchKind::Application, vec![kept.ident.clone()]);
    let summary = db.apply_unit(&unit, web.path()).await.unwrap();
    assert_eq!(summary.deleted, 1);

    let apps = db.children(&module.ident, Some(BranchKind::Application)).await.unwrap();
    assert_eq!(apps.iter().map(|a| a.ident.as_str()).collect::<Vec<_>>(), [kept.ident.as_str()]);
    assert_eq!(db.children(&module.ident, Some(BranchKind::Library)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unit_commits_timestamps_with_facts() {
    let db = setup_db().await;
    let web = tempfile::TempDir::new().unwrap();
    let module = git_module("gedit");

    let mut unit = UnitOfWork::new();
    unit.stage_branch(module.clone());
    unit.stamp("git.gnome.org/gedit/master/po/LINGUAS", "intltool.rs#linguas", 1234);
    assert_eq!(unit.staged_stamp("git.gnome.org/gedit/master/po/LINGUAS", "intltool.rs#linguas"), Some(1234));
    assert_eq!(db.get_timestamp("git.gnome.org/gedit/master/po/LINGUAS", "intltool.rs#linguas").await.unwrap(), None);

    db.apply_unit(&unit, web.path()).await.unwrap();
    assert_eq!(
        db.get_timestamp("git.gnome.org/gedit/master/po/LINGUAS", "intltool.rs#linguas").await.unwrap(),
        Some(1234)
    );
}

#[tokio::test]
async fn test_revisions_and_file_lookup() {
    let db = setup_db().await;
    let module = git_module("gedit");
    db.save_branch(&module).await.unwrap();
    let jane = Entity::new("/person/jdoe@gnome.org", EntityKind::Person);
    let john = Entity::new("/person/jroe@gnome.org", EntityKind::Person);

    db.insert_revision(&revision(&module.ident, "r1", &jane.ident, 100, &["help/C/gedit.xml"]), &jane).await.unwrap();
    db.insert_revision(&revision(&module.ident, "r2", &john.ident, 200, &["src/main.c"]), &john).await.unwrap();

    assert!(db.revision_exists(&RevisionRecord::ident_for(&module.ident, "r1")).await.unwrap());
    let last = db.last_revision(&module.ident).await.unwrap().unwrap();
    assert_eq!(last.revision, "r2");
    assert_eq!(last.files.len(), 1);
    assert_eq!(db.revision_datetimes(&module.ident).await.unwrap(), [100, 200]);

    let files = vec!["help/C/gedit.xml".to_string(), "help/C/legal.xml".to_string()];
    let found = db.last_revision_for_files(&module.ident, &files).await.unwrap();
    assert_eq!(found, Some((100, jane.ident.clone())));
    assert_eq!(db.last_revision_for_files(&module.ident, &[]).await.unwrap(), None);
}

#[tokio::test]
async fn test_entity_by_email() {
    let db: Database = setup_db().await;
    let mut jane = Entity::new("/person/jdoe@gnome.org", EntityKind::Person);
    jane.extend(Some("Jane Doe"), Some("jane@example.org"));
    db.save_entity(&jane).await.unwrap();

    let found = db.entity_by_email("jane@example.org").await.unwrap().unwrap();
    assert_eq!(found.ident, jane.ident);
    assert_eq!(found.display_name(), "Jane Doe");
    assert!(db.entity_by_email("nobody@example.org").await.unwrap().is_none());
}

use page_mirror::ProjectStore;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_save_then_load_round_trip() {
    let temp_dir = tempdir().unwrap();
    let store = ProjectStore::new(temp_dir.path());

    let mut project = store.create("site").unwrap();
    project.set_urls(vec![
        "https://example.com/b".to_string(),
        "https://example.com/a".to_string(),
        "https://example.com/b".to_string(),
    ]);
    project.set_replace_links(true);
    project.set_replace_forms(false);
    store.save(&mut project).unwrap();

    let loaded = store.load("site").unwrap().expect("project should exist");
    assert_eq!(loaded.urls(), project.urls());
    assert!(loaded.replace_links());
    assert!(!loaded.replace_forms());
    assert_eq!(loaded.base_dir(), temp_dir.path().join("projects").join("site"));
    assert_eq!(loaded.created_at(), project.created_at());
}

#[test]
fn test_load_unknown_project_is_none() {
    let temp_dir = tempdir().unwrap();
    let store = ProjectStore::new(temp_dir.path());
    assert!(store.load("nothing").unwrap().is_none());
}

#[test]
fn test_load_record_with_invalid_name_is_none() {
    let temp_dir = tempdir().unwrap();
    let store = ProjectStore::new(temp_dir.path());
    fs::create_dir_all(temp_dir.path().join("projects")).unwrap();
    fs::write(
        store.registry_path(),
        r#"{"a/b": {"urls": ["https://example.com/"], "replace_links": false, "timestamp": "2024-01-01T00:00:00"}}"#,
    )
    .unwrap();

    assert!(store.list().contains_key("a/b"));
    assert!(store.load("a/b").unwrap().is_none());
    assert!(!temp_dir.path().join("projects").join("a").exists());
}

#[test]
fn test_directories_exist_before_any_download() {
    let temp_dir = tempdir().unwrap();
    let store = ProjectStore::new(temp_dir.path());
    let project = store.create("fresh").unwrap();

    for dir in ["images", "js", "css", "fonts"] {
        assert!(project.base_dir().join(dir).is_dir(), "{} missing", dir);
    }
}

#[test]
fn test_save_overwrites_whole_record() {
    let temp_dir = tempdir().unwrap();
    let store = ProjectStore::new(temp_dir.path());

    let mut project = store.create("site").unwrap();
    project.set_urls(vec!["https://example.com/one".to_string()]);
    project.set_replace_forms(true);
    store.save(&mut project).unwrap();

    let mut replacement = store.create("site").unwrap();
    replacement.set_urls(vec!["https://example.com/two".to_string()]);
    store.save(&mut replacement).unwrap();

    let registry = store.list();
    assert_eq!(registry.len(), 1);
    let record = &registry["site"];
    assert_eq!(record.urls, vec!["https://example.com/two".to_string()]);
    assert!(!record.replace_forms);
}

#[test]
fn test_missing_or_corrupt_registry_reads_as_empty() {
    let temp_dir = tempdir().unwrap();
    let store = ProjectStore::new(temp_dir.path());
    assert!(store.list().is_empty());

    fs::create_dir_all(temp_dir.path().join("projects")).unwrap();
    fs::write(store.registry_path(), "{ not json").unwrap();
    assert!(store.list().is_empty());
    assert!(store.load("anything").unwrap().is_none());
}

#[test]
fn test_legacy_record_without_replace_forms() {
    let temp_dir = tempdir().unwrap();
    let store = ProjectStore::new(temp_dir.path());
    fs::create_dir_all(temp_dir.path().join("projects")).unwrap();
    fs::write(
        store.registry_path(),
        r#"{
            "old": {
                "urls": ["https://example.com/"],
                "replace_links": true,
                "timestamp": "2023-05-01T09:30:00.000001",
                "base_dir": "/somewhere/projects/old"
            }
        }"#,
    )
    .unwrap();

    let project = store.load("old").unwrap().expect("legacy project loads");
    assert!(project.replace_links());
    assert!(!project.replace_forms());
    assert_eq!(project.urls(), ["https://example.com/".to_string()]);
    assert_eq!(project.created_at().to_rfc3339(), "2023-05-01T09:30:00.000001+00:00");
}

#[test]
fn test_registry_keeps_other_projects() {
    let temp_dir = tempdir().unwrap();
    let store = ProjectStore::new(temp_dir.path());

    for name in ["alpha", "beta"] {
        let mut project = store.create(name).unwrap();
        project.add_url(format!("https://{}.example/", name));
        store.save(&mut project).unwrap();
    }

    let registry = store.list();
    assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["alpha", "beta"]);
    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.registry_path()).unwrap()).unwrap();
    assert!(raw["beta"]["timestamp"].is_string());
    assert_eq!(raw["alpha"]["urls"][0], "https://alpha.example/");
}

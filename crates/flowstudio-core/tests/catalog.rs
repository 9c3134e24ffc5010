use flowstudio_core::catalog::CatalogError;
use flowstudio_core::{FlowCatalog, FlowSession, Position, StudioConfig};
use serde_json::json;

fn catalog_in(root: &std::path::Path) -> (StudioConfig, FlowCatalog) {
    let mut config = StudioConfig::default();
    config.documents_root = root.to_path_buf();
    let catalog = FlowCatalog::new(&config);
    (config, catalog)
}

#[test]
fn listing_reports_graph_sizes() {
    let dir = tempfile::tempdir().unwrap();
    let (config, catalog) = catalog_in(dir.path());

    tokio_test::block_on(async {
        let location = catalog.create("orders").await.unwrap();
        let mut session = FlowSession::new(location, &config);
        session.load().await.unwrap();
        let a = session.add_node("trigger", Position::default(), json!({}));
        let b = session.add_node("action", Position::default(), json!({}));
        session.connect(&a, &b, None, None);
        session.close().await;

        // Stray files and hidden directories are not flows.
        std::fs::write(catalog.flows_root().join("notes.txt"), "x").unwrap();
        std::fs::create_dir_all(catalog.flows_root().join(".trash")).unwrap();

        let entries = catalog.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "orders");
        assert_eq!((entries[0].nodes, entries[0].edges), (2, 1));
        assert_eq!(entries[0].flow.as_ref().map(|f| f.name.as_str()), Some("orders"));
    });
}

#[test]
fn unreadable_document_is_listed_without_frontmatter() {
    let dir = tempfile::tempdir().unwrap();
    let (_, catalog) = catalog_in(dir.path());

    tokio_test::block_on(async {
        let location = catalog.create("broken").await.unwrap();
        std::fs::write(location.document_path(), "[[nodes]\n").unwrap();

        let entries = catalog.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].flow.is_none());
    });
}

#[test]
fn rename_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let (_, catalog) = catalog_in(dir.path());

    tokio_test::block_on(async {
        catalog.create("a").await.unwrap();
        catalog.create("b").await.unwrap();
        assert!(matches!(
            catalog.rename("a", "b").await,
            Err(CatalogError::AlreadyExists(_))
        ));
        assert!(matches!(
            catalog.rename("missing", "c").await,
            Err(CatalogError::NotFound(_))
        ));
    });
}

#[test]
fn watching_an_unknown_flow_does_not_create_it() {
    let dir = tempfile::tempdir().unwrap();
    let (config, catalog) = catalog_in(dir.path());

    tokio_test::block_on(async {
        let location = catalog.location("typo").unwrap();
        let session = FlowSession::open(location.clone(), &config).await.unwrap();
        session.close().await;
        assert!(location.flow_dir().is_dir());
        assert!(!location.document_path().exists());

        assert!(catalog.list().await.unwrap().is_empty());

        catalog.create("typo").await.unwrap();
        let entries = catalog.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].flow.as_ref().map(|f| f.name.as_str()), Some("typo"));
    });
}

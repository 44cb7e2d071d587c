use crate::{category, folder, file_metadata, usage_statistic, storage_config};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use super::setup_test_db;

/// Category create + lookup by canonical name
#[tokio::test]
async fn test_category_crud() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let name = format!("Cat_{}", Uuid::new_v4().simple());
    let created = category::create(&db, &name, "Test Category", ".pdf").await?;
    assert_eq!(created.name, name.to_lowercase());

    let found = category::find_by_name(&db, &name.to_uppercase()).await?;
    assert_eq!(found.map(|c| c.id), Some(created.id));

    category::Entity::delete_by_id(created.id).exec(&db).await?;
    Ok(())
}

/// Folder chain under a category, listed ordered by path
#[tokio::test]
async fn test_folder_chain() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let cat = category::create(&db, &format!("folders_{}", Uuid::new_v4().simple()), "Folders", "").await?;
    let year = folder::create(&db, cat.id, None, "2024", "2024").await?;
    let month = folder::create(&db, cat.id, Some(year.id), "january", "2024/january").await?;

    let found = folder::find_by_path(&db, cat.id, "2024/january").await?.unwrap();
    assert_eq!(found.id, month.id);
    assert_eq!(found.parent_id, Some(year.id));

    let listed = folder::list_by_category(&db, cat.id).await?;
    let paths: Vec<_> = listed.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["2024", "2024/january"]);

    assert!(folder::create(&db, cat.id, None, "x", "y").await.is_err());

    category::Entity::delete_by_id(cat.id).exec(&db).await?;
    Ok(())
}

/// File metadata exact/suffix lookup
#[tokio::test]
async fn test_file_metadata_lookup() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let cat = category::create(&db, &format!("files_{}", Uuid::new_v4().simple()), "Files", "").await?;
    let unique = Uuid::new_v4().simple().to_string();
    let url = format!("https://old-host.example.com/cdn/{}/report_{}.pdf", cat.name, unique);
    let created = file_metadata::create(&db, file_metadata::NewFileMetadata {
        file_path: format!("/srv/cdn/{}/report_{}.pdf", cat.name, unique),
        file_name: format!("report_{}.pdf", unique),
        content_type: "application/pdf".into(),
        file_size: 42,
        category_id: cat.id,
        folder_id: None,
        url: url.clone(),
        uploaded_by: "tests".into(),
    }).await?;

    assert_eq!(file_metadata::find_by_url(&db, &url).await?.map(|m| m.id), Some(created.id));
    let suffix = format!("/{}/report_{}.pdf", cat.name, unique);
    assert_eq!(file_metadata::find_by_url_suffix(&db, &suffix).await?.map(|m| m.id), Some(created.id));
    assert!(file_metadata::find_by_url_suffix(&db, &format!("/report_{}.pdf", Uuid::new_v4().simple())).await?.is_none());

    category::Entity::delete_by_id(cat.id).exec(&db).await?;
    Ok(())
}

/// Usage counters upsert per (date, category)
#[tokio::test]
async fn test_usage_statistic_upsert() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let cat = category::create(&db, &format!("usage_{}", Uuid::new_v4().simple()), "Usage", "").await?;
    let today = Utc::now().date_naive();
    let upload = usage_statistic::Delta { file_count: 1, storage_used_bytes: 100, upload_count: 1, ..Default::default() };
    let first = usage_statistic::record(&db, today, cat.id, upload).await?;
    let second = usage_statistic::record(&db, today, cat.id, upload).await?;
    assert_eq!(first.id, second.id);
    assert_eq!(second.file_count, 2);
    assert_eq!(second.storage_used_bytes, 200);
    assert_eq!(second.upload_count, 2);

    category::Entity::delete_by_id(cat.id).exec(&db).await?;
    Ok(())
}

/// Concurrent increments on a fresh (date, category) row all land
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_usage_statistic_concurrent_record() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let cat = category::create(&db, &format!("usage_race_{}", Uuid::new_v4().simple()), "Usage race", "").await?;
    let today = Utc::now().date_naive();
    let upload = usage_statistic::Delta { file_count: 1, storage_used_bytes: 10, upload_count: 1, ..Default::default() };

    let category_id = cat.id;
    let mut handles = Vec::new();
    for _ in 0..10 {
        let db = db.clone();
        handles.push(tokio::spawn(async move { usage_statistic::record(&db, today, category_id, upload).await }));
    }
    for handle in handles {
        handle.await??;
    }

    let rows = usage_statistic::Entity::find()
        .filter(usage_statistic::Column::CategoryId.eq(cat.id))
        .all(&db)
        .await?;
    assert_eq!(rows.len(), 1);
    assert_eq!((rows[0].file_count, rows[0].storage_used_bytes, rows[0].upload_count), (10, 100, 10));

    category::Entity::delete_by_id(cat.id).exec(&db).await?;
    Ok(())
}

/// Only one configuration row stays active
#[tokio::test]
async fn test_storage_config_activation() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let input = storage_config::NewStorageConfig {
        base_url: "https://cdn.example.com/".into(),
        storage_path: "/srv/cdn".into(),
        api_key: format!("key_{}", Uuid::new_v4()),
        max_file_size_mb: 25,
        allowed_file_types: ".pdf,.png".into(),
        enforce_authentication: false,
        allow_direct_access: true,
        enable_caching: true,
    };
    let first = storage_config::activate(&db, input.clone()).await?;
    let second = storage_config::activate(&db, input).await?;
    assert_eq!(second.base_url, "https://cdn.example.com");

    let active = storage_config::find_active(&db).await?.unwrap();
    assert_eq!(active.id, second.id);
    let first_after = storage_config::Entity::find_by_id(first.id).one(&db).await?.unwrap();
    assert!(!first_after.is_active);

    storage_config::Entity::delete_by_id(first.id).exec(&db).await?;
    storage_config::Entity::delete_by_id(second.id).exec(&db).await?;
    Ok(())
}
